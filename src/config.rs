use std::path::PathBuf;

use eyre::{Result, WrapErr};
use url::Url;

use crate::cli::chat::render::MarkupMode;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
pub const SERVER_URL_ENV: &str = "SOLAR_BUDDY_URL";
pub const RAW_MARKUP_ENV: &str = "SOLAR_BUDDY_RAW_MARKUP";

/// Settings for one client session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: Url,
    pub markup_mode: MarkupMode,
    /// Where to export the transcript as HTML when the session ends.
    pub transcript_path: Option<PathBuf>,
}

impl ClientConfig {
    /// Build the configuration from already-parsed CLI values. The
    /// environment is read by the argument parser, not here.
    pub fn resolve(
        server_url: Option<&str>,
        raw_markup: bool,
        transcript_path: Option<PathBuf>,
    ) -> Result<Self> {
        Self::new(server_url.unwrap_or(DEFAULT_SERVER_URL), raw_markup, transcript_path)
    }

    pub fn new(
        server_url: &str,
        raw_markup: bool,
        transcript_path: Option<PathBuf>,
    ) -> Result<Self> {
        let server_url = Url::parse(server_url)
            .wrap_err_with(|| format!("Invalid Solar Buddy server URL: {}", server_url))?;

        let markup_mode = if raw_markup {
            MarkupMode::Raw
        } else {
            MarkupMode::Escaped
        };

        Ok(Self {
            server_url,
            markup_mode,
            transcript_path,
        })
    }
}
