use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use super::prompt::{build_prompt, SYSTEM_INSTRUCTION};
use super::suggestion::{parse_reply, AdvisorHint};
use crate::game::GameState;
use crate::utils;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdvisorConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_owned()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_owned()
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoint: default_endpoint(),
            temperature: default_temperature(),
        }
    }
}

impl AdvisorConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn request_url(&self, api_key: &str) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.endpoint.trim_end_matches('/'),
            self.model,
            api_key
        )
    }

    /// `generateContent` payload asking for a JSON reply.
    pub fn request_body(&self, prompt: &str) -> Value {
        json!({
            "systemInstruction": { "parts": [{ "text": SYSTEM_INSTRUCTION.as_str() }] },
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "temperature": self.temperature,
            },
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum AdvisorError {
    #[error("API key is not configured")]
    MissingCredential,
    #[error("advisor request failed: {message}")]
    Network { message: String },
    #[error("advisor reply could not be read: {message}")]
    MalformedResponse { message: String },
    #[error("a newer hint request replaced this one")]
    Superseded,
}

/// Pulls the generated text out of a `generateContent` response body.
pub fn extract_text(body: &str) -> Result<String, AdvisorError> {
    let response: Value =
        serde_json::from_str(body).map_err(|error| AdvisorError::MalformedResponse {
            message: error.to_string(),
        })?;

    if let Some(message) = response.pointer("/error/message").and_then(Value::as_str) {
        return Err(AdvisorError::Network {
            message: message.to_owned(),
        });
    }

    let parts = response
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or_else(|| AdvisorError::MalformedResponse {
            message: "response has no candidates".to_owned(),
        })?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    if text.trim().is_empty() {
        return Err(AdvisorError::MalformedResponse {
            message: "response text is empty".to_owned(),
        });
    }
    Ok(text)
}

/// Hands out request tickets; only the most recently issued one stays current.
#[derive(Debug, Clone, Default)]
pub struct HintGate {
    latest: Rc<Cell<u64>>,
}

#[derive(Debug, Clone)]
pub struct HintTicket {
    id: u64,
    latest: Rc<Cell<u64>>,
}

impl HintGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> HintTicket {
        let id = self.latest.get() + 1;
        self.latest.set(id);
        HintTicket {
            id,
            latest: Rc::clone(&self.latest),
        }
    }

    /// Invalidates every outstanding ticket, e.g. on a new deal.
    pub fn cancel_all(&self) {
        self.latest.set(self.latest.get() + 1);
    }
}

impl HintTicket {
    pub fn is_current(&self) -> bool {
        self.latest.get() == self.id
    }

    pub fn ensure_current(&self) -> Result<(), AdvisorError> {
        if self.is_current() {
            Ok(())
        } else {
            Err(AdvisorError::Superseded)
        }
    }
}

fn network_error(error: wasm_bindgen::JsValue) -> AdvisorError {
    AdvisorError::Network {
        message: error.as_string().unwrap_or_else(|| format!("{error:?}")),
    }
}

/// POSTs one `generateContent` request and returns the raw response body.
pub async fn post_json(url: &str, body: &Value) -> Result<String, AdvisorError> {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{Request, RequestInit, RequestMode, Response};

    let payload = serde_json::to_string(body).map_err(|error| AdvisorError::MalformedResponse {
        message: error.to_string(),
    })?;

    let init = RequestInit::new();
    init.set_method("POST");
    init.set_mode(RequestMode::Cors);
    init.set_body(&wasm_bindgen::JsValue::from_str(&payload));

    let request = Request::new_with_str_and_init(url, &init).map_err(network_error)?;
    request
        .headers()
        .set("Content-Type", "application/json")
        .map_err(network_error)?;

    let window = web_sys::window().ok_or_else(|| AdvisorError::Network {
        message: "no window to fetch from".to_owned(),
    })?;
    let response = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(network_error)?;
    let response: Response = response.dyn_into().map_err(network_error)?;

    let text = JsFuture::from(response.text().map_err(network_error)?)
        .await
        .map_err(network_error)?
        .as_string()
        .unwrap_or_default();
    if !response.ok() && text.is_empty() {
        return Err(AdvisorError::Network {
            message: format!("HTTP {}", response.status()),
        });
    }
    Ok(text)
}

async fn ask(
    config: AdvisorConfig,
    api_key: String,
    snapshot: GameState,
    ticket: &HintTicket,
    delay_ms: u32,
) -> Result<AdvisorHint, AdvisorError> {
    if api_key.trim().is_empty() {
        return Err(AdvisorError::MissingCredential);
    }
    if delay_ms > 0 {
        gloo_timers::future::TimeoutFuture::new(delay_ms).await;
    }
    ticket.ensure_current()?;

    let prompt = build_prompt(&snapshot);
    let body = post_json(&config.request_url(&api_key), &config.request_body(&prompt)).await?;
    ticket.ensure_current()?;

    let reply = parse_reply(&extract_text(&body)?)?;
    Ok(AdvisorHint::evaluate(reply, &snapshot))
}

/// Asks the advisor about `snapshot`. The optional delay debounces bursts of
/// requests; a ticket that stops being current at any await point yields
/// `Superseded`.
pub async fn request_hint(
    config: AdvisorConfig,
    api_key: String,
    snapshot: GameState,
    ticket: HintTicket,
    delay_ms: u32,
) -> Result<AdvisorHint, AdvisorError> {
    utils::log(&format!("hint #{} requested from {}", ticket.id, config.model));
    let result = ask(config, api_key, snapshot, &ticket, delay_ms).await;
    match &result {
        Ok(hint) => {
            if let Some(rejection) = &hint.rejection {
                utils::warn(&format!("advisor suggestion rejected: {rejection}"));
            }
        }
        Err(AdvisorError::Superseded) => {
            utils::log(&format!("hint #{} superseded", ticket.id));
        }
        Err(error) => utils::warn(&format!("hint #{} failed: {error}", ticket.id)),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config: AdvisorConfig = serde_json::from_str(r#"{"model":"gemini-pro"}"#).unwrap();
        assert_eq!(config.model, "gemini-pro");
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(AdvisorConfig::default().model, DEFAULT_MODEL);
    }

    #[test]
    fn url_names_model_and_key() {
        let config = AdvisorConfig::default().with_model("m1");
        assert_eq!(
            config.request_url("k"),
            "https://generativelanguage.googleapis.com/v1beta/models/m1:generateContent?key=k"
        );
    }

    #[test]
    fn body_requests_json_at_low_temperature() {
        let body = AdvisorConfig::default().request_body("board");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "board");
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        let temperature = body["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.2).abs() < 1e-6);
        assert!(body["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Klondike"));
    }

    #[test]
    fn text_is_joined_across_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"{\"move\":"},{"text":"{\"type\":\"draw\"}}"}]}}]}"#;
        assert_eq!(extract_text(body).unwrap(), r#"{"move":{"type":"draw"}}"#);
    }

    #[test]
    fn api_errors_and_empty_candidates_are_reported() {
        let denied = r#"{"error":{"code":403,"message":"API key not valid"}}"#;
        assert_eq!(
            extract_text(denied),
            Err(AdvisorError::Network {
                message: "API key not valid".to_owned()
            })
        );
        assert!(matches!(
            extract_text(r#"{"candidates":[]}"#),
            Err(AdvisorError::MalformedResponse { .. })
        ));
        assert!(matches!(
            extract_text("<html>"),
            Err(AdvisorError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn only_latest_ticket_is_current() {
        let gate = HintGate::new();
        let first = gate.issue();
        assert!(first.is_current());

        let second = gate.issue();
        assert!(!first.is_current());
        assert_eq!(first.ensure_current(), Err(AdvisorError::Superseded));
        assert!(second.is_current());

        gate.cancel_all();
        assert!(!second.is_current());
    }

    #[test]
    fn missing_credential_message() {
        assert_eq!(
            AdvisorError::MissingCredential.to_string(),
            "API key is not configured"
        );
    }
}
