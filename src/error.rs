use std::time::Duration;

/// Everything that can stop a submission. None of these are retried.
#[derive(thiserror::Error, Debug)]
pub enum SubmitError {
    #[error("{variable} environment variable not present{}", actions_hint(.variable))]
    MissingConfiguration { variable: &'static str },
    #[error("{variable} environment variable is not valid unicode")]
    InvalidConfiguration { variable: &'static str },
    #[error("could not canonicalize submission record: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("signing secret rejected as HMAC key")]
    InvalidKey,
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("unexpected HTTP {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
    #[error("{reason} in response: {body}")]
    MalformedResponse { reason: String, body: String },
}

impl SubmitError {
    pub fn malformed(reason: impl Into<String>, body: impl Into<String>) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
            body: body.into(),
        }
    }
}

fn actions_hint(variable: &str) -> &'static str {
    if variable.starts_with("GITHUB_") {
        "; is this running inside GitHub Actions?"
    } else {
        ""
    }
}
