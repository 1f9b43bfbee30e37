//! SignalWire Fabric REST client and the startup registration of the
//! external SWML handler that routes calls to `/santa`.

use std::time::Duration;

use santa_core::config::SignalWireConfig;
use santa_core::errors::ApplicationError;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

const HANDLERS_PATH: &str = "/resources/external_swml_handlers";
const CREATE_RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum FabricError {
    #[error("fabric request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("fabric returned status {status} for {path}: {body}")]
    Status { path: String, status: u16, body: String },
    #[error("fabric response for {path} is not valid JSON: {source}")]
    Decode { path: String, source: serde_json::Error },
    #[error("fabric response for {path} is missing `{field}`")]
    MissingField { path: String, field: &'static str },
}

impl From<FabricError> for ApplicationError {
    fn from(error: FabricError) -> Self {
        Self::Integration(error.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandlerSummary {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandlerAddress {
    pub id: String,
    pub audio: Option<String>,
}

/// The handler this process routes calls through.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RegisteredHandler {
    pub handler_id: String,
    pub address_id: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Default)]
pub struct HandlerRegistry {
    current: RwLock<Option<RegisteredHandler>>,
}

impl HandlerRegistry {
    pub async fn set(&self, handler: RegisteredHandler) {
        *self.current.write().await = Some(handler);
    }

    pub async fn get(&self) -> Option<RegisteredHandler> {
        self.current.read().await.clone()
    }
}

#[derive(Clone, Debug)]
pub struct FabricClient {
    client: reqwest::Client,
    base_url: String,
    project_id: String,
    token: SecretString,
}

impl FabricClient {
    /// `None` when the space, project or token is missing.
    pub fn from_config(config: &SignalWireConfig) -> Result<Option<Self>, FabricError> {
        let Some(host) = config.host().filter(|_| config.is_configured()) else {
            return Ok(None);
        };
        let client =
            reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;

        Ok(Some(Self {
            client,
            base_url: format!("https://{host}/api/fabric"),
            project_id: config.project_id.clone(),
            token: config.token.clone(),
        }))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub async fn list_handlers(&self) -> Result<Vec<HandlerSummary>, FabricError> {
        let payload = self.get_json(HANDLERS_PATH).await?;
        let handlers = payload
            .get("data")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(handler_summary).collect())
            .unwrap_or_default();
        Ok(handlers)
    }

    pub async fn handler_address(
        &self,
        handler_id: &str,
    ) -> Result<Option<HandlerAddress>, FabricError> {
        let payload = self.get_json(&format!("{HANDLERS_PATH}/{handler_id}/addresses")).await?;
        let address = payload
            .get("data")
            .and_then(Value::as_array)
            .and_then(|entries| entries.first())
            .and_then(|entry| {
                Some(HandlerAddress {
                    id: entry.get("id")?.as_str()?.to_string(),
                    audio: entry
                        .pointer("/channels/audio")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                })
            });
        Ok(address)
    }

    pub async fn update_handler(&self, handler_id: &str, url: &str) -> Result<(), FabricError> {
        let path = format!("{HANDLERS_PATH}/{handler_id}");
        let body = json!({ "primary_request_url": url, "primary_request_method": "POST" });
        self.send_json(self.client.put(self.url(&path)), &path, &body).await?;
        Ok(())
    }

    /// Creates a calling handler named `name` and returns its id.
    pub async fn create_handler(&self, name: &str, url: &str) -> Result<String, FabricError> {
        let body = json!({
            "name": name,
            "used_for": "calling",
            "primary_request_url": url,
            "primary_request_method": "POST",
        });
        let payload =
            self.send_json(self.client.post(self.url(HANDLERS_PATH)), HANDLERS_PATH, &body).await?;
        payload
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(FabricError::MissingField { path: HANDLERS_PATH.to_string(), field: "id" })
    }

    pub async fn create_guest_token(
        &self,
        address_id: &str,
        expire_at: i64,
    ) -> Result<String, FabricError> {
        let path = "/guests/tokens";
        let body = json!({ "allowed_addresses": [address_id], "expire_at": expire_at });
        let payload = self.send_json(self.client.post(self.url(path)), path, &body).await?;
        payload
            .get("token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .ok_or(FabricError::MissingField { path: path.to_string(), field: "token" })
    }

    /// First handler named `name` that already has an address.
    pub async fn find_registered(
        &self,
        name: &str,
    ) -> Result<Option<RegisteredHandler>, FabricError> {
        for handler in self.list_handlers().await? {
            if handler.name != name {
                continue;
            }
            if let Some(address) = self.handler_address(&handler.id).await? {
                return Ok(Some(RegisteredHandler {
                    handler_id: handler.id,
                    address_id: Some(address.id),
                    address: address.audio,
                }));
            }
        }
        Ok(None)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json(&self, path: &str) -> Result<Value, FabricError> {
        let request = self
            .client
            .get(self.url(path))
            .basic_auth(&self.project_id, Some(self.token.expose_secret()))
            .header("Accept", "application/json");
        read_json(request.send().await?, path).await
    }

    async fn send_json(
        &self,
        request: reqwest::RequestBuilder,
        path: &str,
        body: &Value,
    ) -> Result<Value, FabricError> {
        let response = request
            .basic_auth(&self.project_id, Some(self.token.expose_secret()))
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;
        read_json(response, path).await
    }
}

async fn read_json(response: reqwest::Response, path: &str) -> Result<Value, FabricError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(FabricError::Status { path: path.to_string(), status: status.as_u16(), body });
    }
    let text = response.text().await?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text)
        .map_err(|source| FabricError::Decode { path: path.to_string(), source })
}

fn handler_summary(entry: &Value) -> Option<HandlerSummary> {
    let name = entry
        .pointer("/swml_webhook/name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .or_else(|| entry.get("display_name").and_then(Value::as_str))?;

    Some(HandlerSummary {
        id: entry.get("id")?.as_str()?.to_string(),
        name: name.to_string(),
    })
}

/// Existing handler named `agent_name`. A failed lookup counts as "none"
/// so registration can still try to create one.
async fn lookup_registered(
    client: &FabricClient,
    agent_name: &str,
) -> Option<RegisteredHandler> {
    match client.find_registered(agent_name).await {
        Ok(found) => found,
        Err(error) => {
            warn!(
                event_name = "system.fabric.handler_lookup_failed",
                correlation_id = "bootstrap",
                agent_name,
                error = %error,
                "failed to look up existing SWML handlers"
            );
            None
        }
    }
}

/// Makes sure a handler named `agent_name` points at `handler_url`.
///
/// An existing handler always gets its URL rewritten since the API masks
/// stored credentials. When creation fails another worker may have won the
/// race, so the lookup is retried once after a short pause. If that finds
/// nothing, the create error is returned.
pub async fn register_handler(
    client: &FabricClient,
    agent_name: &str,
    handler_url: &str,
) -> Result<RegisteredHandler, FabricError> {
    if let Some(existing) = lookup_registered(client, agent_name).await {
        match client.update_handler(&existing.handler_id, handler_url).await {
            Ok(()) => info!(
                event_name = "system.fabric.handler_updated",
                correlation_id = "bootstrap",
                handler_id = %existing.handler_id,
                agent_name,
                "SWML handler updated"
            ),
            Err(error) => warn!(
                event_name = "system.fabric.handler_update_failed",
                correlation_id = "bootstrap",
                handler_id = %existing.handler_id,
                error = %error,
                "failed to update SWML handler URL"
            ),
        }
        return Ok(existing);
    }

    let created = async {
        let handler_id = client.create_handler(agent_name, handler_url).await?;
        let address = client.handler_address(&handler_id).await?;
        Ok::<_, FabricError>(RegisteredHandler {
            handler_id,
            address_id: address.as_ref().map(|address| address.id.clone()),
            address: address.and_then(|address| address.audio),
        })
    }
    .await;

    match created {
        Ok(handler) => {
            if handler.address_id.is_none() {
                warn!(
                    event_name = "system.fabric.handler_without_address",
                    correlation_id = "bootstrap",
                    handler_id = %handler.handler_id,
                    "created SWML handler has no address"
                );
            }
            info!(
                event_name = "system.fabric.handler_created",
                correlation_id = "bootstrap",
                handler_id = %handler.handler_id,
                agent_name,
                "SWML handler created"
            );
            Ok(handler)
        }
        Err(error) => {
            warn!(
                event_name = "system.fabric.handler_create_failed",
                correlation_id = "bootstrap",
                error = %error,
                "failed to create SWML handler, retrying lookup"
            );
            tokio::time::sleep(CREATE_RETRY_DELAY).await;
            lookup_registered(client, agent_name).await.ok_or(error)
        }
    }
}
