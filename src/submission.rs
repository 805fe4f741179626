//! Sends the signed application to B12 and reads the receipt back.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info};

use crate::error::SubmitError;
use crate::model::receipt_response::ReceiptResponse;
use crate::model::submission_record::SubmissionRecord;
use crate::security::{SIGNATURE_HEADER, sign, signature_header};
use crate::settings::Settings;

/// Applies to the whole exchange, connect through reading the body.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

pub struct Submitter {
    endpoint: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl Submitter {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, SubmitError> {
        // No idle pool: the single connection is closed once the exchange finishes.
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(SubmitError::Network)?;

        Ok(Self {
            endpoint: endpoint.into(),
            timeout,
            client,
        })
    }

    /// POSTs the record once and returns the receipt. Never retries.
    pub async fn submit(
        &self,
        record: &SubmissionRecord,
        secret: &[u8],
    ) -> Result<String, SubmitError> {
        let body = record.canonical_bytes()?;
        let signature = signature_header(&sign(secret, &body)?);

        info!("Submitting application for {} to {}", record.email, self.endpoint);
        debug!("{SIGNATURE_HEADER}: {signature} ({} byte body)", body.len());

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(SIGNATURE_HEADER, signature)
            .body(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;

        interpret_response(status, &text)
    }

    fn transport_error(&self, e: reqwest::Error) -> SubmitError {
        if e.is_timeout() {
            SubmitError::Timeout(self.timeout)
        } else {
            SubmitError::Network(e)
        }
    }
}

/// Anything but a 200 carrying a non-empty `receipt` string is a failure.
pub fn interpret_response(status: u16, body: &str) -> Result<String, SubmitError> {
    if status != 200 {
        return Err(SubmitError::UnexpectedStatus {
            status,
            body: body.to_owned(),
        });
    }

    ReceiptResponse::parse(body)?.into_receipt(body)
}

/// Builds, signs and sends the application described by `settings`.
pub async fn submit_application(settings: &Settings) -> Result<String, SubmitError> {
    // Computed once: the timestamp is part of the signed bytes.
    let record = SubmissionRecord::new(settings, SubmissionRecord::timestamp_now());
    let submitter = Submitter::new(&settings.submission_url, REQUEST_TIMEOUT)?;

    let receipt = submitter.submit(&record, settings.signing_secret()).await?;
    info!("Submission accepted");
    Ok(receipt)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::Router;
    use axum::body::Bytes;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;

    use super::*;
    use crate::security::verify;
    use crate::settings::tests::{ada_env, settings_from};

    const SECRET: &[u8] = b"test-secret";
    const PATH: &str = "/apply/submission";

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}{PATH}")
    }

    fn scripted(status: StatusCode, body: &'static str) -> Router {
        Router::new().route(PATH, post(move || async move { (status, body) }))
    }

    /// Behaves like the real endpoint: checks headers, signature and canonical form.
    async fn receive(headers: HeaderMap, body: Bytes) -> (StatusCode, String) {
        let content_type = headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if content_type != JSON_CONTENT_TYPE {
            return (StatusCode::UNSUPPORTED_MEDIA_TYPE, content_type.to_owned());
        }

        let signature = headers
            .get("x-signature-256")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !verify(SECRET, &body, signature) {
            return (StatusCode::UNAUTHORIZED, r#"{"error":"bad signature"}"#.into());
        }

        let Ok(record) = serde_json::from_slice::<SubmissionRecord>(&body) else {
            return (StatusCode::BAD_REQUEST, r#"{"error":"bad json"}"#.into());
        };
        if record.canonical_bytes().unwrap() != body.as_ref() {
            return (StatusCode::BAD_REQUEST, r#"{"error":"not canonical"}"#.into());
        }

        (StatusCode::OK, r#"{"receipt":"abc123"}"#.into())
    }

    fn ada_record() -> SubmissionRecord {
        let settings = settings_from(&ada_env()).unwrap();
        SubmissionRecord::new(&settings, "2026-02-09T16:59:37.571Z")
    }

    #[test]
    fn non_200_carries_status_and_body() {
        let err = interpret_response(400, r#"{"error":"bad"}"#).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("400"));
        assert!(message.contains(r#"{"error":"bad"}"#));

        assert!(matches!(
            interpret_response(201, r#"{"receipt":"abc123"}"#),
            Err(SubmitError::UnexpectedStatus { status: 201, .. })
        ));
    }

    #[test]
    fn ok_with_non_object_body_fails() {
        assert!(matches!(
            interpret_response(200, r#"["abc123"]"#),
            Err(SubmitError::MalformedResponse { .. })
        ));
    }

    #[tokio::test]
    async fn signed_submission_returns_receipt() {
        let url = serve(Router::new().route(PATH, post(receive))).await;
        let submitter = Submitter::new(url, REQUEST_TIMEOUT).unwrap();

        let receipt = submitter.submit(&ada_record(), SECRET).await.unwrap();
        assert_eq!(receipt, "abc123");
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected_by_server() {
        let url = serve(Router::new().route(PATH, post(receive))).await;
        let submitter = Submitter::new(url, REQUEST_TIMEOUT).unwrap();

        match submitter.submit(&ada_record(), b"wrong").await {
            Err(SubmitError::UnexpectedStatus { status, body }) => {
                assert_eq!(status, 401);
                assert!(body.contains("bad signature"));
            }
            other => panic!("expected 401, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn bad_request_is_reported() {
        let url = serve(scripted(StatusCode::BAD_REQUEST, r#"{"error":"bad"}"#)).await;
        let submitter = Submitter::new(url, REQUEST_TIMEOUT).unwrap();

        let err = submitter.submit(&ada_record(), SECRET).await.unwrap_err();
        assert!(matches!(err, SubmitError::UnexpectedStatus { status: 400, .. }));
        assert!(err.to_string().contains(r#"{"error":"bad"}"#));
    }

    #[tokio::test]
    async fn ok_without_receipt_fails() {
        let url = serve(scripted(StatusCode::OK, "{}")).await;
        let submitter = Submitter::new(url, REQUEST_TIMEOUT).unwrap();

        let err = submitter.submit(&ada_record(), SECRET).await.unwrap_err();
        assert!(matches!(err, SubmitError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let app = Router::new().route(
            PATH,
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                r#"{"receipt":"late"}"#
            }),
        );
        let url = serve(app).await;
        let submitter = Submitter::new(url, Duration::from_millis(200)).unwrap();

        let err = submitter.submit(&ada_record(), SECRET).await.unwrap_err();
        assert!(matches!(err, SubmitError::Timeout(d) if d == Duration::from_millis(200)));
    }

    #[tokio::test]
    async fn refused_connection_is_a_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let submitter = Submitter::new(format!("http://{addr}{PATH}"), REQUEST_TIMEOUT).unwrap();
        let err = submitter.submit(&ada_record(), SECRET).await.unwrap_err();
        assert!(matches!(err, SubmitError::Network(_)));
    }

    #[tokio::test]
    async fn submit_application_uses_environment() {
        let url = serve(Router::new().route(PATH, post(receive))).await;
        let mut env = ada_env();
        env.insert("B12_SUBMISSION_URL", url);
        env.insert("B12_SIGNING_SECRET", "test-secret".into());

        let settings = settings_from(&env).unwrap();
        assert_eq!(submit_application(&settings).await.unwrap(), "abc123");
    }

    #[tokio::test]
    async fn missing_run_id_never_reaches_the_network() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            PATH,
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    r#"{"receipt":"abc123"}"#
                }
            }),
        );
        let url = serve(app).await;

        let mut env = ada_env();
        env.insert("B12_SUBMISSION_URL", url);
        env.remove("GITHUB_RUN_ID");

        let result = match settings_from(&env) {
            Ok(settings) => submit_application(&settings).await,
            Err(e) => Err(e),
        };

        assert!(matches!(
            result,
            Err(SubmitError::MissingConfiguration { variable: "GITHUB_RUN_ID" })
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
