// Path: crates/client/src/runtime_client.rs

use aether_types::app::{ActionRequest, ActionResult, ControlAck, ControlCommand};
use anyhow::{anyhow, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

const ERROR_SNIPPET_LEN: usize = 160;

/// Turns a non-success response into an error carrying the server's `code`.
async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status();
    if status.is_success() {
        return resp
            .json::<T>()
            .await
            .map_err(|e| anyhow!("failed to decode response: {e}"));
    }
    let body = resp.text().await.unwrap_or_default();
    let code = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("code"))
                .and_then(Value::as_str)
                .map(str::to_string)
        });
    match code {
        Some(code) => Err(anyhow!("HTTP {}: {}", status.as_u16(), code)),
        None => Err(anyhow!(
            "HTTP {}: {}",
            status.as_u16(),
            body.chars().take(ERROR_SNIPPET_LEN).collect::<String>()
        )),
    }
}

/// A client for one runtime instance.
#[derive(Clone, Debug)]
pub struct RuntimeClient {
    pub base: String,
    client: Client,
}

impl RuntimeClient {
    /// `base` is the server origin, e.g. `http://127.0.0.1:8000`.
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// The WebSocket URL of the observation stream.
    pub fn observe_url(&self) -> String {
        let ws_base = if let Some(rest) = self.base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base.clone()
        };
        format!("{ws_base}/observe")
    }

    /// Sends a UI command. Success only means the command slot was overwritten.
    pub async fn control(&self, command: &ControlCommand) -> Result<ControlAck> {
        tracing::debug!(target: "client", action = %command.action, selector = %command.selector, "control");
        let resp = self
            .client
            .post(self.url("/control"))
            .json(command)
            .send()
            .await?;
        decode(resp).await
    }

    /// Submits an Action Gateway request. Gateway rejections come back as
    /// `Ok(ActionResult::Error(..))`; only transport-level problems are `Err`.
    pub async fn ton(&self, request: &ActionRequest) -> Result<ActionResult> {
        let resp = self
            .client
            .post(self.url("/ton"))
            .json(request)
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn ton_balance(&self, address: &str) -> Result<ActionResult> {
        self.ton(&ActionRequest::Balance {
            address: address.to_string(),
        })
        .await
    }

    pub async fn ton_call(&self, address: &str, method: &str, params: Vec<Value>) -> Result<ActionResult> {
        self.ton(&ActionRequest::Call {
            address: address.to_string(),
            method: method.to_string(),
            params,
        })
        .await
    }

    /// Renderer side: replaces the snapshot slot with `snapshot`, sent verbatim.
    pub async fn publish_snapshot(&self, snapshot: &str) -> Result<()> {
        let resp = self
            .client
            .post(self.url("/snapshot"))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(snapshot.to_string())
            .send()
            .await?;
        decode::<Value>(resp).await.map(|_| ())
    }

    /// Renderer side: the latest command, or `None` if nothing was ever sent.
    pub async fn current_command(&self) -> Result<Option<ControlCommand>> {
        let resp = self.client.get(self.url("/command")).send().await?;
        decode(resp).await
    }

    pub async fn healthz(&self) -> Result<bool> {
        let resp = self.client.get(self.url("/healthz")).send().await?;
        Ok(resp.status().is_success())
    }
}
