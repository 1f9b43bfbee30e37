use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::errors::DomainError;

/// Key under which the conversation's gift state lives in the call's global data.
pub const GIFT_STATE_KEY: &str = "gift_state";

/// A gift option as shown to the child and pushed to the web UI.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gift {
    #[serde(default)]
    pub id: usize,
    pub title: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub rating: String,
    #[serde(default)]
    pub asin: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStep {
    #[default]
    Greeting,
    CollectingWishes,
    SearchingGifts,
    PresentingOptions,
    ConfirmingSelection,
    SendingGift,
    GiftConfirmed,
    SearchFailed,
}

impl ConversationStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::CollectingWishes => "collecting_wishes",
            Self::SearchingGifts => "searching_gifts",
            Self::PresentingOptions => "presenting_options",
            Self::ConfirmingSelection => "confirming_selection",
            Self::SendingGift => "sending_gift",
            Self::GiftConfirmed => "gift_confirmed",
            Self::SearchFailed => "search_failed",
        }
    }
}

impl std::fmt::Display for ConversationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call gift selection state. The platform echoes global data back on
/// every function call, so this is the only memory the agent has of a call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiftState {
    #[serde(default)]
    pub gift_search_results: Vec<Gift>,
    #[serde(default, deserialize_with = "or_default")]
    pub selected_gift: Option<Gift>,
    #[serde(default, deserialize_with = "or_default")]
    pub search_query: String,
    #[serde(default, deserialize_with = "or_default")]
    pub state: ConversationStep,
    #[serde(default, deserialize_with = "or_default", skip_serializing_if = "std::ops::Not::not")]
    pub nice_list_checked: bool,
    #[serde(default, deserialize_with = "or_default", skip_serializing_if = "Option::is_none")]
    pub child_name: Option<String>,
}

/// Null or unrecognised values fall back to the field default so one bad
/// field does not discard the search results stored next to it.
fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

impl GiftState {
    /// Reads the state out of a call's global data, falling back to a fresh
    /// greeting state when it is missing or cannot be decoded.
    pub fn from_global_data(global_data: &Value) -> Self {
        global_data
            .get(GIFT_STATE_KEY)
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default()
    }

    /// Writes the state back under [`GIFT_STATE_KEY`], keeping any other keys
    /// already present in the global data.
    pub fn store_into(&self, global_data: &mut Value) -> Result<(), serde_json::Error> {
        let encoded = serde_json::to_value(self)?;
        if !global_data.is_object() {
            *global_data = Value::Object(Map::new());
        }
        if let Some(map) = global_data.as_object_mut() {
            map.insert(GIFT_STATE_KEY.to_string(), encoded);
        }
        Ok(())
    }

    /// Looks up a 1-based option number among the last search results.
    pub fn choose(&self, choice: i64) -> Result<&Gift, DomainError> {
        if self.gift_search_results.is_empty() {
            return Err(DomainError::NoSearchResults);
        }

        let available = self.gift_search_results.len();
        usize::try_from(choice)
            .ok()
            .filter(|index| (1..=available).contains(index))
            .map(|index| &self.gift_search_results[index - 1])
            .ok_or(DomainError::GiftChoiceOutOfRange { choice, available })
    }
}

/// Truncates on character boundaries so multi-byte titles never split.
pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{truncate_chars, ConversationStep, Gift, GiftState};
    use crate::errors::DomainError;

    fn gift(id: usize, title: &str) -> Gift {
        Gift { id, title: title.to_string(), price: "$19.99".to_string(), ..Gift::default() }
    }

    #[test]
    fn missing_state_defaults_to_greeting() {
        let state = GiftState::from_global_data(&json!({}));

        assert_eq!(state.state, ConversationStep::Greeting);
        assert!(state.gift_search_results.is_empty());
        assert!(state.selected_gift.is_none());
    }

    #[test]
    fn malformed_state_defaults_to_greeting() {
        let state = GiftState::from_global_data(&json!({"gift_state": "not an object"}));

        assert_eq!(state, GiftState::default());
    }

    #[test]
    fn bad_step_keeps_search_results() {
        let global = json!({"gift_state": {
            "gift_search_results": [{"id": 1, "title": "Sled"}],
            "state": null,
            "search_query": 42
        }});

        let state = GiftState::from_global_data(&global);

        assert_eq!(state.gift_search_results.len(), 1);
        assert_eq!(state.state, ConversationStep::Greeting);
        assert_eq!(state.search_query, "");
        assert_eq!(state.choose(1).map(|gift| gift.title.as_str()), Ok("Sled"));
    }

    #[test]
    fn unknown_step_falls_back_to_greeting() {
        let global = json!({"gift_state": {
            "gift_search_results": [{"id": 1, "title": "Sled"}, {"id": 2, "title": "Kite"}],
            "state": "wrapping_presents"
        }});

        let state = GiftState::from_global_data(&global);

        assert_eq!(state.state, ConversationStep::Greeting);
        assert_eq!(state.gift_search_results.len(), 2);
    }

    #[test]
    fn store_into_preserves_unrelated_global_data() {
        let mut global = json!({"caller": "+15550100"});
        let state = GiftState {
            gift_search_results: vec![gift(1, "Sled")],
            search_query: "sled".to_string(),
            state: ConversationStep::PresentingOptions,
            ..GiftState::default()
        };

        state.store_into(&mut global).expect("state should encode");

        assert_eq!(global["caller"], "+15550100");
        assert_eq!(global["gift_state"]["state"], "presenting_options");
        assert_eq!(global["gift_state"]["gift_search_results"][0]["title"], "Sled");
        assert_eq!(GiftState::from_global_data(&global), state);
    }

    #[test]
    fn store_into_replaces_non_object_global_data() {
        let mut global = json!(null);

        GiftState::default().store_into(&mut global).expect("state should encode");

        assert_eq!(global["gift_state"]["state"], "greeting");
    }

    #[test]
    fn choose_uses_one_based_options() {
        let state = GiftState {
            gift_search_results: vec![gift(1, "Sled"), gift(2, "Kite")],
            ..GiftState::default()
        };

        assert_eq!(state.choose(2).map(|gift| gift.title.as_str()), Ok("Kite"));
        assert_eq!(
            state.choose(0),
            Err(DomainError::GiftChoiceOutOfRange { choice: 0, available: 2 })
        );
        assert_eq!(
            state.choose(3),
            Err(DomainError::GiftChoiceOutOfRange { choice: 3, available: 2 })
        );
        assert_eq!(
            state.choose(-1),
            Err(DomainError::GiftChoiceOutOfRange { choice: -1, available: 2 })
        );
    }

    #[test]
    fn choose_without_results_asks_for_search() {
        assert_eq!(GiftState::default().choose(1), Err(DomainError::NoSearchResults));
    }

    #[test]
    fn truncate_chars_respects_multibyte_boundaries() {
        assert_eq!(truncate_chars("🎁🎄🦌", 2), "🎁🎄");
        assert_eq!(truncate_chars("sled", 10), "sled");
    }
}
