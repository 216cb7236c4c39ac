//! Request Dispatcher
//!
//! Selects the backend for an input and mode, builds the request, and returns
//! the raw response or a descriptive error. Holds no mutable state.
//!
//! # Endpoints
//! | Input | Mode | Request |
//! |-------|------|---------|
//! | file | local / cloud | `POST {vision}/image`, octet-stream body |
//! | url | local / cloud | `POST {vision}/url`, `{"url": ...}` or `{"Url": ...}` |
//! | soil | soil | `POST {scoring_url}`, columnar frame, bearer token |
//! | label | (chat) | `POST {chat}/chat`, `{"fruit": ...}` |
//!
//! Cloud vision requests carry a `Prediction-Key` header. Image URLs and soil
//! samples are validated here as well, so no invalid input reaches a backend.
//!
//! Every call races the request against a [`CancellationToken`]; once the
//! token fires the response is dropped and [`Error::Cancelled`] returned.

use crate::request::{Input, RawResponse, RequestContext};
use agrivision_common::config::Endpoints;
use agrivision_common::crop::decode_recommendation;
use agrivision_common::types::VisionResponse;
use agrivision_common::{AdviceTranscript, Error, Mode, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Map, Value};
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Header carrying the cloud vision API key (`Prediction-Key`)
pub const PREDICTION_KEY_HEADER: &str = "prediction-key";

/// `agrivision/<version>+<git>.<profile>`
pub const USER_AGENT: &str = concat!("agrivision/", env!("AGRIVISION_BUILD_ID"));

const VISION_SERVICE: &str = "Vision API";
const CHAT_SERVICE: &str = "advisory chat";

/// HTTP front for all prediction backends
#[derive(Debug, Clone)]
pub struct Dispatcher {
    http_client: Client,
    endpoints: Endpoints,
}

impl Dispatcher {
    /// Build a dispatcher with a shared client honoring the configured timeout
    pub fn new(endpoints: Endpoints) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(endpoints.timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            http_client,
            endpoints,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Send one prediction request, abandoning it if `cancel` fires first
    pub async fn dispatch(
        &self,
        ctx: &RequestContext,
        cancel: &CancellationToken,
    ) -> Result<RawResponse> {
        info!(
            request_id = %ctx.id,
            input = ctx.input.kind(),
            mode = %ctx.mode,
            "Dispatching prediction request"
        );

        let result = with_cancel(cancel, self.send(ctx)).await;

        match &result {
            Ok(_) => debug!(request_id = %ctx.id, "Prediction request complete"),
            Err(Error::Cancelled) => info!(request_id = %ctx.id, "Prediction request cancelled"),
            Err(e) => warn!(request_id = %ctx.id, error = %e, "Prediction request failed"),
        }
        result
    }

    /// Ask the advisory chat about `label`
    pub async fn advise(&self, label: &str, cancel: &CancellationToken) -> Result<AdviceTranscript> {
        let label = label.trim();
        if label.is_empty() {
            return Err(Error::Validation("No label to ask advice about.".to_string()));
        }

        let url = join(&self.endpoints.chat_url, "chat");
        debug!(%url, fruit = label, "Requesting advice");

        let request = self.http_client.post(&url).json(&json!({ "fruit": label }));
        let transcript = with_cancel(cancel, async {
            let response = send_checked(request).await?;
            response
                .json::<AdviceTranscript>()
                .await
                .map_err(|e| Error::parse(CHAT_SERVICE, e.to_string()))
        })
        .await?;

        info!(
            fruit = %transcript.fruit,
            turns = transcript.responses.len(),
            "Advice received"
        );
        Ok(transcript)
    }

    async fn send(&self, ctx: &RequestContext) -> Result<RawResponse> {
        match (&ctx.input, ctx.mode) {
            (Input::File(image), Mode::Local | Mode::Cloud) => {
                let url = join(self.vision_base(ctx.mode), "image");
                let request = self
                    .http_client
                    .post(&url)
                    .headers(self.vision_headers(ctx.mode)?)
                    .header(CONTENT_TYPE, "application/octet-stream")
                    .body(image.bytes.clone());
                debug!(%url, size = image.len(), "Uploading image");
                self.vision(request).await
            }
            (Input::Url(raw), Mode::Local | Mode::Cloud) => {
                let image_url = self.endpoints.url_policy.validate(raw)?;
                let url = join(self.vision_base(ctx.mode), "url");
                let mut body = Map::new();
                body.insert(
                    self.endpoints.url_field.as_str().to_string(),
                    Value::String(image_url.clone()),
                );
                let request = self
                    .http_client
                    .post(&url)
                    .headers(self.vision_headers(ctx.mode)?)
                    .json(&body);
                debug!(%url, image_url = %image_url, "Submitting image URL");
                self.vision(request).await
            }
            (Input::Soil(sample), Mode::Soil) => {
                sample.validate()?;
                let token = self.endpoints.scoring_token.as_deref().ok_or_else(|| {
                    Error::Config("Soil analysis requires a scoring token".to_string())
                })?;
                let request = self
                    .http_client
                    .post(&self.endpoints.scoring_url)
                    .bearer_auth(token)
                    .json(&sample.to_payload());
                debug!(url = %self.endpoints.scoring_url, "Scoring soil sample");

                let response = send_checked(request).await?;
                let raw: Value = response.json().await.map_err(|e| {
                    Error::parse("crop recommendation model", e.to_string())
                })?;
                Ok(RawResponse::Crop(decode_recommendation(raw)?))
            }
            (input, mode) => Err(Error::Validation(format!(
                "Cannot send {} input in {} mode",
                input.kind(),
                mode
            ))),
        }
    }

    async fn vision(&self, request: RequestBuilder) -> Result<RawResponse> {
        let response = send_checked(request).await?;
        let body: VisionResponse = response
            .json()
            .await
            .map_err(|e| Error::parse(VISION_SERVICE, e.to_string()))?;
        Ok(RawResponse::Vision(body))
    }

    fn vision_base(&self, mode: Mode) -> &str {
        match mode {
            Mode::Cloud => &self.endpoints.cloud_vision_url,
            _ => &self.endpoints.local_vision_url,
        }
    }

    fn vision_headers(&self, mode: Mode) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if mode == Mode::Cloud {
            let key = self.endpoints.prediction_key.as_deref().ok_or_else(|| {
                Error::Config("Cloud vision requires a prediction key".to_string())
            })?;
            let value = HeaderValue::from_str(key)
                .map_err(|_| Error::Config("Prediction key contains invalid characters".to_string()))?;
            headers.insert(HeaderName::from_static(PREDICTION_KEY_HEADER), value);
        }
        Ok(headers)
    }
}

/// Send and map non-2xx to [`Error::Network`] with the body text
async fn send_checked(request: RequestBuilder) -> Result<Response> {
    let response = request
        .send()
        .await
        .map_err(|e| Error::Transport(e.to_string()))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::Network {
        status: status.as_u16(),
        body,
    })
}

async fn with_cancel<T>(
    cancel: &CancellationToken,
    work: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = work => result,
    }
}

fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_handles_trailing_slash() {
        assert_eq!(join("http://h:5000/", "image"), "http://h:5000/image");
        assert_eq!(join("http://h:5000", "url"), "http://h:5000/url");
    }

    #[test]
    fn cloud_headers_need_a_key() {
        let dispatcher = Dispatcher::new(Endpoints::default()).unwrap();
        assert!(matches!(dispatcher.vision_headers(Mode::Cloud), Err(Error::Config(_))));
        assert!(dispatcher.vision_headers(Mode::Local).unwrap().is_empty());
    }

    #[test]
    fn cloud_headers_carry_the_key() {
        let endpoints = Endpoints {
            prediction_key: Some("k-123".to_string()),
            ..Endpoints::default()
        };
        let dispatcher = Dispatcher::new(endpoints).unwrap();
        let headers = dispatcher.vision_headers(Mode::Cloud).unwrap();
        assert_eq!(headers.get(PREDICTION_KEY_HEADER).unwrap(), "k-123");
    }

    #[tokio::test]
    async fn mismatched_mode_is_rejected_without_network() {
        let dispatcher = Dispatcher::new(Endpoints::default()).unwrap();
        let ctx = RequestContext::new(Input::Url("https://x.test/a.jpg".into()), Mode::Soil);
        let err = dispatcher
            .dispatch(&ctx, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let dispatcher = Dispatcher::new(Endpoints::default()).unwrap();
        let ctx = RequestContext::new(Input::Url("https://x.test/a.jpg".into()), Mode::Local);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = dispatcher.dispatch(&ctx, &cancel).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }
}
