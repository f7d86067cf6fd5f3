use std::borrow::Cow;

use super::transcript::{Role, Transcript};

/// How entry text is placed into markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkupMode {
    /// Text is substituted verbatim. Any markup in a question or an answer
    /// becomes live markup in the document.
    Raw,
    #[default]
    Escaped,
}

/// Escape the characters that are significant in HTML text and attributes.
pub fn escape_html(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }

    let mut escaped = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

pub fn render_entry(role: Role, text: &str, mode: MarkupMode) -> String {
    let text = match mode {
        MarkupMode::Raw => Cow::Borrowed(text),
        MarkupMode::Escaped => escape_html(text),
    };
    format!("<p><b>{}:</b> {}</p>", role.label(), text)
}

/// Render a whole transcript as a standalone page.
pub fn render_document(transcript: &Transcript, mode: MarkupMode) -> String {
    let mut html = String::from(concat!(
        "<!DOCTYPE html>\n<html>\n<head>\n",
        "<meta charset=\"utf-8\">\n<title>Solar Buddy</title>\n",
        "</head>\n<body>\n<div id=\"chat\">\n",
    ));
    for entry in transcript {
        html.push_str(&render_entry(entry.role, &entry.text, mode));
        html.push('\n');
    }
    html.push_str("</div>\n</body>\n</html>\n");
    html
}
