//! The send path of the chat: echo the question, ask the server, render the
//! answer.
//!
//! A send is split in three so that nothing borrows [`ChatState`] while the
//! request is in flight:
//!
//! 1. [`begin_send`] checks the input and echoes it into the transcript.
//! 2. [`PendingExchange::resolve`] performs the one network round trip.
//! 3. [`finish_send`] renders the answer, or reports the failure.
//!
//! [`handle_send`] runs all three back to back. Callers that want several
//! questions in flight drive the steps themselves. Answers are then appended
//! in the order they complete.

use std::io;

use tracing::{debug, error, info};

use super::transcript::{Role, Transcript};
use super::view::ChatView;
use crate::ask_client::{AskTransport, ExchangeError, ExchangeOutcome};

/// Everything the chat screen holds between sends.
#[derive(Debug, Default)]
pub struct ChatState {
    pub transcript: Transcript,
    pub input: String,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug)]
pub enum SendOutcome {
    /// The input was empty; nothing happened.
    Skipped,
    Answered,
    Failed(ExchangeError),
}

/// A question that has been echoed but not yet sent.
#[derive(Debug)]
pub struct PendingExchange {
    question: String,
}

impl PendingExchange {
    pub fn question(&self) -> &str {
        &self.question
    }

    pub async fn resolve<T>(self, transport: &T) -> ResolvedExchange
    where
        T: AskTransport + ?Sized,
    {
        let outcome = transport.ask(&self.question).await;
        ResolvedExchange {
            question: self.question,
            outcome,
        }
    }
}

#[derive(Debug)]
pub struct ResolvedExchange {
    question: String,
    outcome: ExchangeOutcome,
}

impl ResolvedExchange {
    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn outcome(&self) -> &ExchangeOutcome {
        &self.outcome
    }
}

/// Returns `None` without touching anything when the input is empty.
pub fn begin_send<V>(state: &mut ChatState, view: &mut V) -> io::Result<Option<PendingExchange>>
where
    V: ChatView + ?Sized,
{
    if state.input.is_empty() {
        debug!("Ignoring send with empty input");
        return Ok(None);
    }

    let question = state.input.clone();
    state.transcript.push(Role::User, &question);
    view.append_message(Role::User, &question)?;

    Ok(Some(PendingExchange { question }))
}

pub fn finish_send<V>(
    state: &mut ChatState,
    view: &mut V,
    resolved: ResolvedExchange,
) -> io::Result<SendOutcome>
where
    V: ChatView + ?Sized,
{
    match resolved.outcome {
        Ok(answer) => {
            state.transcript.push(Role::Buddy, &answer);
            view.append_message(Role::Buddy, &answer)?;

            state.input.clear();
            view.clear_input();
            view.scroll_to_end()?;

            Ok(SendOutcome::Answered)
        }
        Err(e) => {
            // The question stays in the transcript and in the input so the
            // user can send it again.
            error!("Question {:?} failed: {}", resolved.question, e);
            view.show_failure(&e)?;
            Ok(SendOutcome::Failed(e))
        }
    }
}

pub async fn handle_send<V, T>(
    state: &mut ChatState,
    view: &mut V,
    transport: &T,
) -> io::Result<SendOutcome>
where
    V: ChatView + ?Sized,
    T: AskTransport + ?Sized,
{
    let Some(pending) = begin_send(state, view)? else {
        return Ok(SendOutcome::Skipped);
    };

    info!("Asking Solar Buddy");
    let resolved = pending.resolve(transport).await;
    finish_send(state, view, resolved)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use futures::stream::{FuturesUnordered, StreamExt};

    use super::*;
    use crate::ask_client::ContractViolation;
    use crate::cli::chat::render::MarkupMode;
    use crate::cli::chat::transcript::Entry;
    use crate::cli::chat::view::MarkupView;

    /// Answers from a fixed table, optionally after a delay, and records
    /// every question it is asked.
    #[derive(Default)]
    struct ScriptedTransport {
        answers: HashMap<String, (String, Duration)>,
        asked: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn answering(question: &str, answer: &str) -> Self {
            Self::default().with(question, answer, Duration::ZERO)
        }

        fn with(mut self, question: &str, answer: &str, delay: Duration) -> Self {
            self.answers
                .insert(question.to_string(), (answer.to_string(), delay));
            self
        }

        fn asked(&self) -> Vec<String> {
            self.asked.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AskTransport for ScriptedTransport {
        async fn ask(&self, question: &str) -> ExchangeOutcome {
            self.asked.lock().unwrap().push(question.to_string());
            match self.answers.get(question) {
                Some((answer, delay)) => {
                    tokio::time::sleep(*delay).await;
                    Ok(answer.clone())
                }
                None => Err(ContractViolation::MissingAnswer.into()),
            }
        }
    }

    struct UnreachableTransport;

    #[async_trait]
    impl AskTransport for UnreachableTransport {
        async fn ask(&self, _question: &str) -> ExchangeOutcome {
            let err = reqwest::Client::new()
                .get("not a url")
                .build()
                .expect_err("relative URL must not build");
            Err(ExchangeError::Network(err))
        }
    }

    fn state_with(input: &str) -> ChatState {
        ChatState {
            input: input.to_string(),
            ..ChatState::default()
        }
    }

    fn entry(role: Role, text: &str) -> Entry {
        Entry {
            role,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn empty_input_does_nothing() {
        let mut state = ChatState::new();
        let mut view = MarkupView::new(MarkupMode::Escaped);
        let transport = ScriptedTransport::default();

        let outcome = handle_send(&mut state, &mut view, &transport).await.unwrap();

        assert!(matches!(outcome, SendOutcome::Skipped));
        assert!(state.transcript.is_empty());
        assert!(view.inner_html().is_empty());
        assert_eq!(view.input_clears(), 0);
        assert!(transport.asked().is_empty());
    }

    #[tokio::test]
    async fn whitespace_is_still_sent() {
        let mut state = state_with(" ");
        let mut view = MarkupView::new(MarkupMode::Escaped);
        let transport = ScriptedTransport::answering(" ", "Please type something ☀️");

        let outcome = handle_send(&mut state, &mut view, &transport).await.unwrap();

        assert!(matches!(outcome, SendOutcome::Answered));
        assert_eq!(transport.asked(), vec![" ".to_string()]);
    }

    #[test]
    fn question_is_echoed_before_sending() {
        let mut state = state_with("is it sunny?");
        let mut view = MarkupView::new(MarkupMode::Escaped);

        let pending = begin_send(&mut state, &mut view).unwrap().unwrap();

        assert_eq!(pending.question(), "is it sunny?");
        assert_eq!(state.transcript.entries(), &[entry(Role::User, "is it sunny?")]);
        assert_eq!(view.inner_html(), "<p><b>You:</b> is it sunny?</p>");
        // Input is only cleared once an answer arrives.
        assert_eq!(state.input, "is it sunny?");
    }

    #[tokio::test]
    async fn answer_follows_question() {
        let mut state = state_with("life?");
        let mut view = MarkupView::new(MarkupMode::Escaped);
        let transport = ScriptedTransport::answering("life?", "42");

        let outcome = handle_send(&mut state, &mut view, &transport).await.unwrap();

        assert!(matches!(outcome, SendOutcome::Answered));
        assert_eq!(
            state.transcript.entries(),
            &[entry(Role::User, "life?"), entry(Role::Buddy, "42")]
        );
        assert_eq!(
            view.inner_html(),
            "<p><b>You:</b> life?</p><p><b>Solar Buddy:</b> 42</p>"
        );
        assert_eq!(transport.asked(), vec!["life?".to_string()]);
    }

    #[tokio::test]
    async fn input_is_cleared_and_view_scrolled_after_answer() {
        let mut state = state_with("hello");
        let mut view = MarkupView::new(MarkupMode::Escaped);
        let transport = ScriptedTransport::answering(
            "hello",
            "Hey! Ready to learn something about solar energy?",
        );

        handle_send(&mut state, &mut view, &transport).await.unwrap();

        assert_eq!(state.input, "");
        assert_eq!(view.input_clears(), 1);
        assert_eq!(view.scroll_top(), view.scroll_height());
    }

    #[tokio::test]
    async fn raw_markup_is_rendered_verbatim() {
        let mut state = state_with("<img src=x>");
        let mut view = MarkupView::new(MarkupMode::Raw);
        let transport = ScriptedTransport::answering("<img src=x>", "<b>bold</b>");

        handle_send(&mut state, &mut view, &transport).await.unwrap();

        assert_eq!(
            view.inner_html(),
            "<p><b>You:</b> <img src=x></p><p><b>Solar Buddy:</b> <b>bold</b></p>"
        );
    }

    #[tokio::test]
    async fn network_failure_leaves_only_the_question() {
        let mut state = state_with("weather in Dubai?");
        let mut view = MarkupView::new(MarkupMode::Escaped);

        let outcome = handle_send(&mut state, &mut view, &UnreachableTransport)
            .await
            .unwrap();

        assert!(matches!(outcome, SendOutcome::Failed(ExchangeError::Network(_))));
        assert_eq!(
            state.transcript.entries(),
            &[entry(Role::User, "weather in Dubai?")]
        );
        assert_eq!(state.input, "weather in Dubai?");
        assert_eq!(view.input_clears(), 0);
        assert_eq!(view.notices().len(), 1);
    }

    #[tokio::test]
    async fn contract_failure_is_reported() {
        let mut state = state_with("unknown");
        let mut view = MarkupView::new(MarkupMode::Escaped);
        let transport = ScriptedTransport::default();

        let outcome = handle_send(&mut state, &mut view, &transport).await.unwrap();

        assert!(matches!(
            outcome,
            SendOutcome::Failed(ExchangeError::Contract(ContractViolation::MissingAnswer))
        ));
        assert_eq!(state.transcript.len(), 1);
        assert!(!view.inner_html().contains("Solar Buddy"));
    }

    #[tokio::test]
    async fn concurrent_answers_land_in_completion_order() {
        let mut state = ChatState::new();
        let mut view = MarkupView::new(MarkupMode::Escaped);
        let transport = ScriptedTransport::default()
            .with("slow", "slow answer", Duration::from_millis(100))
            .with("fast", "fast answer", Duration::from_millis(1));

        let mut in_flight = FuturesUnordered::new();
        for question in ["slow", "fast"] {
            state.input = question.to_string();
            let pending = begin_send(&mut state, &mut view).unwrap().unwrap();
            in_flight.push(pending.resolve(&transport));
        }

        while let Some(resolved) = in_flight.next().await {
            finish_send(&mut state, &mut view, resolved).unwrap();
        }

        assert_eq!(
            state.transcript.entries(),
            &[
                entry(Role::User, "slow"),
                entry(Role::User, "fast"),
                entry(Role::Buddy, "fast answer"),
                entry(Role::Buddy, "slow answer"),
            ]
        );
        assert_eq!(transport.asked().len(), 2);
    }
}
