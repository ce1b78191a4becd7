use alloc::borrow::Cow;
use core::error::Error as _;
use std::env;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{CompletionRequest, CompletionService, ServiceError};

pub const GEMINI_BASE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Environment variables searched for a key, in order.
const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

pub const MISSING_API_KEY: &str = "No API key found. Set GEMINI_API_KEY or \
API_KEY, or `api_key` in the configuration file.";

const BLOCKING_FINISH_REASONS: [&str; 5] =
    ["SAFETY", "RECITATION", "BLOCKLIST", "PROHIBITED_CONTENT", "SPII"];

#[derive(Serialize)]
struct RequestPart<'text> {
    text: &'text str,
}

#[derive(Serialize)]
struct RequestContent<'text> {
    role: &'static str,
    parts: [RequestPart<'text>; 1],
}

#[derive(Serialize)]
struct GeminiRequest<'text> {
    contents: [RequestContent<'text>; 1],
}

impl<'text> GeminiRequest<'text> {
    const fn new(prompt: &'text str) -> Self {
        Self {
            contents: [RequestContent {
                role: "user",
                parts: [RequestPart { text: prompt }],
            }],
        }
    }
}

#[derive(Deserialize)]
struct ResponsePart<'text> {
    #[serde(borrow, default)]
    text: Cow<'text, str>,
}

#[derive(Deserialize)]
struct ResponseContent<'text> {
    #[serde(borrow, default)]
    parts: Vec<ResponsePart<'text>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate<'text> {
    #[serde(borrow, default)]
    content: Option<ResponseContent<'text>>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse<'text> {
    #[serde(borrow, default)]
    candidates: Vec<GeminiCandidate<'text>>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[non_exhaustive]
pub struct GeminiService {
    api_key: Option<String>,
    base_url: String,
    client: Client,
}

impl GeminiService {
    #[inline]
    #[must_use]
    pub fn new(api_key: Option<String>, base_url: Option<String>) -> Self {
        let mut base_url =
            base_url.unwrap_or_else(|| GEMINI_BASE_URL.to_owned());
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Self {
            api_key,
            base_url,
            client: Client::new(),
        }
    }

    /// Creates the service with a key taken from `GEMINI_API_KEY`, then
    /// `API_KEY`, then `configured_key`.
    ///
    /// Without any key the service is still created; every request then
    /// fails with [`ServiceError::InvalidApiKey`].
    #[inline]
    #[must_use]
    pub fn from_env(
        configured_key: Option<String>,
        base_url: Option<String>,
    ) -> Self {
        let candidates = API_KEY_VARS
            .iter()
            .map(|var| env::var(var).ok())
            .chain([configured_key]);
        let api_key = first_api_key(candidates);
        if api_key.is_none() {
            warn!("{MISSING_API_KEY}");
        }

        Self::new(api_key, base_url)
    }

    fn url(&self, model: &str) -> String {
        format!("{}{model}:generateContent", self.base_url)
    }
}

#[async_trait]
impl CompletionService for GeminiService {
    #[inline]
    fn name(&self) -> &'static str {
        "Gemini"
    }

    #[inline]
    async fn complete(
        &self,
        request: CompletionRequest<'_>,
    ) -> Result<String, ServiceError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ServiceError::InvalidApiKey(MISSING_API_KEY.to_owned()));
        };

        let response = self
            .client
            .post(self.url(request.model))
            .header(API_KEY_HEADER, api_key)
            .json(&GeminiRequest::new(request.prompt))
            .send()
            .await
            .map_err(|err| ServiceError::NetworkError(describe(&err)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| ServiceError::NetworkError(describe(&err)))?;

        parse_response(status, &body)
    }
}

fn first_api_key<I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    candidates
        .into_iter()
        .flatten()
        .map(|key| key.trim().to_owned())
        .find(|key| !key.is_empty())
}

// reqwest's top-level message rarely names the cause, so the source chain is
// appended.
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn parse_response(status: StatusCode, body: &str) -> Result<String, ServiceError> {
    if !status.is_success() {
        return Err(api_error(status, body));
    }

    let response: GeminiResponse<'_> = serde_json::from_str(body)
        .map_err(|err| ServiceError::UnexpectedResponse(err.to_string()))?;

    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason);
        return Err(reason.map_or_else(
            || {
                ServiceError::UnexpectedResponse(
                    "response contained no candidates".to_owned(),
                )
            },
            |reason| ServiceError::Blocked(format!("prompt blocked due to {reason}")),
        ));
    };

    if let Some(reason) = candidate
        .finish_reason
        .as_deref()
        .filter(|reason| BLOCKING_FINISH_REASONS.contains(reason))
    {
        return Err(ServiceError::Blocked(format!(
            "candidate was blocked due to {reason}"
        )));
    }

    Ok(candidate
        .content
        .map(|content| content.parts.into_iter().map(|part| part.text).collect())
        .unwrap_or_default())
}

fn api_error(status: StatusCode, body: &str) -> ServiceError {
    let message = serde_json::from_str::<ApiErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| status.to_string());

    match status {
        StatusCode::BAD_REQUEST if message.contains("API key") => {
            ServiceError::InvalidApiKey(message)
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ServiceError::Authentication(message)
        }
        StatusCode::NOT_FOUND => ServiceError::UnknownModel(message),
        StatusCode::TOO_MANY_REQUESTS => ServiceError::RateLimitExceeded(message),
        StatusCode::SERVICE_UNAVAILABLE => ServiceError::ModelOverloaded(message),
        _ if status.is_server_error() => ServiceError::ServerError(message),
        _ => ServiceError::Rejected {
            status: status.as_u16(),
            message,
        },
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests should panic on failure.")]
mod tests {
    use std::net::TcpListener;

    use super::*;

    #[test]
    fn joins_text_of_the_first_candidate() {
        let body = r#"{
            "candidates": [
                {
                    "content": {
                        "role": "model",
                        "parts": [{"text": "Water ferns "}, {"text": "weekly.\n"}]
                    },
                    "finishReason": "STOP"
                },
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }"#;

        assert_eq!(
            parse_response(StatusCode::OK, body),
            Ok("Water ferns weekly.\n".to_owned())
        );
    }

    #[test]
    fn escaped_text_is_decoded() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Use \"rain\" water."}]}}]}"#;

        assert_eq!(
            parse_response(StatusCode::OK, body),
            Ok("Use \"rain\" water.".to_owned())
        );
    }

    #[test]
    fn blocked_prompt_is_reported() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;

        assert_eq!(
            parse_response(StatusCode::OK, body),
            Err(ServiceError::Blocked("prompt blocked due to SAFETY".to_owned()))
        );
    }

    #[test]
    fn blocked_candidate_is_reported() {
        let body = r#"{"candidates":[{"finishReason":"RECITATION"}]}"#;

        assert_eq!(
            parse_response(StatusCode::OK, body),
            Err(ServiceError::Blocked(
                "candidate was blocked due to RECITATION".to_owned()
            ))
        );
    }

    #[test]
    fn missing_candidates_are_unexpected() {
        assert!(matches!(
            parse_response(StatusCode::OK, "{}"),
            Err(ServiceError::UnexpectedResponse(_))
        ));
        assert!(matches!(
            parse_response(StatusCode::OK, "<html>"),
            Err(ServiceError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn invalid_key_is_recognised() {
        let body = r#"{"error": {
            "code": 400,
            "message": "API key not valid. Please pass a valid API key.",
            "status": "INVALID_ARGUMENT"
        }}"#;

        let err = parse_response(StatusCode::BAD_REQUEST, body).unwrap_err();

        assert_eq!(
            err.to_string(),
            "Invalid API key: API key not valid. Please pass a valid API key."
        );
    }

    #[test]
    fn status_codes_map_to_errors() {
        let body = r#"{"error": {"message": "details"}}"#;
        let cases = [
            (StatusCode::UNAUTHORIZED, ServiceError::Authentication("details".to_owned())),
            (StatusCode::FORBIDDEN, ServiceError::Authentication("details".to_owned())),
            (StatusCode::NOT_FOUND, ServiceError::UnknownModel("details".to_owned())),
            (
                StatusCode::TOO_MANY_REQUESTS,
                ServiceError::RateLimitExceeded("details".to_owned()),
            ),
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ServiceError::ModelOverloaded("details".to_owned()),
            ),
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ServiceError::ServerError("details".to_owned()),
            ),
            (
                StatusCode::BAD_REQUEST,
                ServiceError::Rejected {
                    status: 400,
                    message: "details".to_owned(),
                },
            ),
        ];

        for (status, expected) in cases {
            assert_eq!(parse_response(status, body), Err(expected), "{status}");
        }
    }

    #[test]
    fn unparsable_error_body_falls_back_to_status() {
        assert_eq!(
            parse_response(StatusCode::BAD_GATEWAY, "upstream down"),
            Err(ServiceError::ServerError("502 Bad Gateway".to_owned()))
        );
    }

    #[test]
    fn request_body_matches_the_api_shape() {
        let json = serde_json::to_value(GeminiRequest::new("Human: hi")).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "contents": [{"role": "user", "parts": [{"text": "Human: hi"}]}]
            })
        );
    }

    #[test]
    fn url_names_the_model() {
        let service = GeminiService::new(Some("key".to_owned()), None);
        assert_eq!(
            service.url("gemini-1.5-pro-latest"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-pro-latest:generateContent"
        );

        let service =
            GeminiService::new(Some("key".to_owned()), Some("http://localhost:8080/models".to_owned()));
        assert_eq!(
            service.url("m"),
            "http://localhost:8080/models/m:generateContent"
        );
    }

    #[test]
    fn first_non_blank_key_wins() {
        assert_eq!(
            first_api_key([None, Some("  ".to_owned()), Some(" abc ".to_owned())]),
            Some("abc".to_owned())
        );
        assert_eq!(first_api_key([None, None]), None);
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_network_error() {
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let service = GeminiService::new(
            Some("key".to_owned()),
            Some(format!("http://127.0.0.1:{port}/")),
        );

        let result = service
            .complete(CompletionRequest::new("gemini-1.5-pro-latest", "hi"))
            .await;

        assert!(matches!(result, Err(ServiceError::NetworkError(_))));
    }

    #[tokio::test]
    async fn requests_without_a_key_fail_inline() {
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let service =
            GeminiService::new(None, Some(format!("http://127.0.0.1:{port}/")));

        let err = service
            .complete(CompletionRequest::new("gemini-1.5-pro-latest", "hi"))
            .await
            .unwrap_err();

        assert_eq!(err, ServiceError::InvalidApiKey(MISSING_API_KEY.to_owned()));
        assert_eq!(
            err.to_string(),
            "Invalid API key: No API key found. Set GEMINI_API_KEY or API_KEY, \
             or `api_key` in the configuration file."
        );
    }
}
