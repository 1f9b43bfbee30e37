//! SWAIG function call payloads and results.
//!
//! The platform POSTs a [`FunctionCall`] to the agent's web hook whenever the
//! model invokes a tool and expects a [`FunctionResult`] back. Results carry
//! the text the model should speak plus an ordered list of actions.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::swml::SWML_VERSION;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct FunctionCall {
    pub function: String,
    #[serde(default)]
    pub argument: FunctionArgument,
    #[serde(default)]
    pub global_data: Value,
    #[serde(default)]
    pub call_id: Option<String>,
    #[serde(default)]
    pub meta_data: Value,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct FunctionArgument {
    #[serde(default)]
    pub parsed: Vec<Value>,
    #[serde(default)]
    pub raw: Option<String>,
}

impl FunctionCall {
    /// The model's arguments as a JSON object. Prefers the platform's parsed
    /// form and falls back to decoding `raw`.
    pub fn arguments(&self) -> Value {
        if let Some(parsed) = self.argument.parsed.first() {
            return parsed.clone();
        }

        self.argument
            .raw
            .as_deref()
            .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
            .filter(Value::is_object)
            .unwrap_or_else(|| json!({}))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FunctionResult {
    pub response: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub action: Vec<Value>,
}

impl FunctionResult {
    pub fn new(response: impl Into<String>) -> Self {
        Self { response: response.into(), action: Vec::new() }
    }

    pub fn set_global_data(mut self, data: Value) -> Self {
        self.action.push(json!({ "set_global_data": data }));
        self
    }

    pub fn change_step(mut self, step: &str) -> Self {
        self.action.push(json!({ "change_step": step }));
        self
    }

    /// Pushes an event to the browser client through an inline SWML
    /// `user_event` verb.
    pub fn user_event(mut self, event: Value) -> Self {
        self.action.push(json!({
            "SWML": {
                "version": SWML_VERSION,
                "sections": { "main": [ { "user_event": { "event": event } } ] },
            }
        }));
        self
    }

    pub fn global_data(&self) -> Option<&Value> {
        self.action.iter().rev().find_map(|action| action.get("set_global_data"))
    }

    pub fn step(&self) -> Option<&str> {
        self.action.iter().rev().find_map(|action| action.get("change_step")?.as_str())
    }

    pub fn user_events(&self) -> Vec<&Value> {
        self.action
            .iter()
            .filter_map(|action| action.pointer("/SWML/sections/main/0/user_event/event"))
            .collect()
    }
}
