use async_trait::async_trait;
use reqwest::{Request, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Path of the question endpoint, resolved against the server origin.
pub const ASK_PATH: &str = "/ask";

#[derive(Debug, Serialize)]
pub struct AskRequest<'a> {
    pub question: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct AskResponse {
    pub answer: String,
}

/// Ways the server can break the `{question} -> {answer}` contract.
#[derive(Debug, Error)]
pub enum ContractViolation {
    #[error("server answered with status {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },

    #[error("response body is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("response has no string `answer` field")]
    MissingAnswer,
}

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("could not reach Solar Buddy: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected reply from Solar Buddy: {0}")]
    Contract(#[from] ContractViolation),
}

/// Tagged result of one question/answer round trip.
pub type ExchangeOutcome = Result<String, ExchangeError>;

/// Anything that can turn a question into an answer.
#[async_trait]
pub trait AskTransport: Send + Sync {
    async fn ask(&self, question: &str) -> ExchangeOutcome;
}

#[derive(Clone)]
pub struct AskClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl AskClient {
    pub fn new(base_url: &Url) -> Result<Self, url::ParseError> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &Url) -> Result<Self, url::ParseError> {
        // ASK_PATH is absolute, so any path on the base URL is replaced.
        let endpoint = base_url.join(ASK_PATH)?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn build_request(&self, question: &str) -> reqwest::Result<Request> {
        self.client
            .post(self.endpoint.clone())
            .json(&AskRequest { question })
            .build()
    }

    pub async fn ask(&self, question: &str) -> ExchangeOutcome {
        let request = self.build_request(question)?;
        debug!("POST {} question={:?}", self.endpoint, question);

        let response = self.client.execute(request).await?;
        let status = response.status();
        let body = response.text().await?;

        debug!("Received {} from {}: {}", status, self.endpoint, body);

        parse_answer(status, &body).map_err(|violation| {
            debug!("Response from {} rejected: {}", self.endpoint, violation);
            ExchangeError::from(violation)
        })
    }
}

#[async_trait]
impl AskTransport for AskClient {
    async fn ask(&self, question: &str) -> ExchangeOutcome {
        AskClient::ask(self, question).await
    }
}

/// Extract the answer from a raw response.
///
/// Only a 2xx body of the form `{"answer": "<text>"}` is accepted. Extra
/// fields are ignored.
pub fn parse_answer(status: StatusCode, body: &str) -> Result<String, ContractViolation> {
    if !status.is_success() {
        return Err(ContractViolation::HttpStatus {
            status,
            body: body.to_string(),
        });
    }

    let value: Value = serde_json::from_str(body).map_err(ContractViolation::InvalidJson)?;
    let response: AskResponse =
        serde_json::from_value(value).map_err(|_| ContractViolation::MissingAnswer)?;

    Ok(response.answer)
}
