use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use santa_core::domain::gift::{truncate_chars, ConversationStep, Gift, GiftState};
use santa_core::errors::{ApplicationError, DomainError};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::GiftSearch;
use crate::swaig::FunctionResult;
use crate::swml::FunctionDefinition;

const MAX_PRESENTED_OPTIONS: usize = 4;

/// Everything a tool sees of the call that invoked it.
#[derive(Clone, Debug, Default)]
pub struct ToolContext {
    pub arguments: Value,
    pub global_data: Value,
    pub call_id: Option<String>,
}

impl ToolContext {
    fn gift_state(&self) -> GiftState {
        GiftState::from_global_data(&self.global_data)
    }

    /// Attaches `state` to `result` as the call's new global data.
    fn save(&self, result: FunctionResult, state: &GiftState) -> Result<FunctionResult> {
        let mut global_data = self.global_data.clone();
        state.store_into(&mut global_data)?;
        Ok(result.set_global_data(global_data))
    }

    fn string_argument(&self, key: &str) -> Option<String> {
        self.arguments
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    /// Integer argument that also accepts numeric strings, which models
    /// occasionally send.
    fn integer_argument(&self, key: &str) -> Option<i64> {
        match self.arguments.get(key)? {
            Value::Number(number) => number.as_i64().or_else(|| number.as_f64().map(|v| v as i64)),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn parameters(&self) -> Value;
    async fn execute(&self, context: ToolContext) -> Result<FunctionResult>;
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown SWAIG function `{0}`")]
    UnknownFunction(String),
    #[error("SWAIG function `{name}` failed: {message}")]
    Failed { name: String, message: String },
}

impl From<ToolError> for ApplicationError {
    fn from(error: ToolError) -> Self {
        match error {
            ToolError::UnknownFunction(name) => DomainError::UnknownFunction(name).into(),
            failed @ ToolError::Failed { .. } => Self::Integration(failed.to_string()),
        }
    }
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    /// The Santa agent's three functions backed by `catalog`.
    pub fn santa(catalog: Arc<dyn GiftSearch>) -> Self {
        let mut registry = Self::default();
        registry.register(SearchGiftsTool::new(catalog));
        registry.register(SelectGiftTool);
        registry.register(CheckNiceListTool);
        registry
    }

    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), Box::new(tool)).is_none() {
            self.order.push(name);
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// SWAIG definitions in registration order.
    pub fn definitions(&self) -> Vec<FunctionDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| FunctionDefinition {
                function: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect()
    }

    pub async fn dispatch(
        &self,
        name: &str,
        context: ToolContext,
    ) -> Result<FunctionResult, ToolError> {
        let tool =
            self.tools.get(name).ok_or_else(|| ToolError::UnknownFunction(name.to_string()))?;
        tool.execute(context).await.map_err(|error| ToolError::Failed {
            name: name.to_string(),
            message: format!("{error:#}"),
        })
    }
}

pub struct SearchGiftsTool {
    catalog: Arc<dyn GiftSearch>,
}

impl SearchGiftsTool {
    pub fn new(catalog: Arc<dyn GiftSearch>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Tool for SearchGiftsTool {
    fn name(&self) -> &'static str {
        "search_gifts"
    }

    fn description(&self) -> &'static str {
        "Search for gift ideas based on what the child wants"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to search for (e.g., 'lego sets', 'dolls', 'video games for kids')"
                },
                "child_age": {
                    "type": "integer",
                    "description": "Approximate age of the child (optional)",
                    "minimum": 3,
                    "maximum": 16
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, context: ToolContext) -> Result<FunctionResult> {
        let Some(query) = context.string_argument("query") else {
            return Ok(FunctionResult::new(
                "Ho ho ho! Tell me what you're wishing for and I'll check my workshop right away!",
            ));
        };
        let child_age = context.integer_argument("child_age");
        let mut state = context.gift_state();

        debug!(
            event_name = "agent.tool.search_gifts",
            call_id = context.call_id.as_deref().unwrap_or("unknown"),
            query = %query,
            child_age = ?child_age,
            "searching gifts"
        );

        let products = self.catalog.search(&query).await;
        if products.is_empty() {
            info!(
                event_name = "agent.tool.search_gifts.empty",
                call_id = context.call_id.as_deref().unwrap_or("unknown"),
                query = %query,
                "gift search returned no products"
            );
            state.gift_search_results.clear();
            state.search_query = query.clone();
            state.state = ConversationStep::SearchFailed;

            let result = FunctionResult::new(
                "Oh dear! I'm having trouble reaching my workshop catalog right now. Let me check again... \
Can you tell me more about what kind of gift you're looking for?",
            );
            return Ok(context
                .save(result, &state)?
                .user_event(json!({ "type": "search_failed", "query": query })));
        }

        let gifts: Vec<Gift> = products
            .into_iter()
            .take(MAX_PRESENTED_OPTIONS)
            .enumerate()
            .map(|(index, product)| present_gift(index + 1, product))
            .collect();
        let response = describe_options(&gifts);

        info!(
            event_name = "agent.tool.search_gifts.found",
            call_id = context.call_id.as_deref().unwrap_or("unknown"),
            query = %query,
            gift_count = gifts.len(),
            "gift options presented"
        );

        state.gift_search_results = gifts.clone();
        state.search_query = query.clone();
        state.state = ConversationStep::PresentingOptions;

        Ok(context
            .save(FunctionResult::new(response), &state)?
            .change_step(ConversationStep::PresentingOptions.as_str())
            .user_event(json!({ "type": "gifts_found", "gifts": gifts, "query": query })))
    }
}

fn present_gift(id: usize, product: Gift) -> Gift {
    let description = if product.description.trim().is_empty() {
        format!("{} - Perfect for children!", product.title)
    } else {
        truncate_chars(&product.description, 200)
    };
    let price = if product.price.trim().is_empty() {
        "Price upon request".to_string()
    } else {
        product.price
    };
    let title =
        if product.title.trim().is_empty() { "Mystery Gift".to_string() } else { product.title };

    Gift { id, title, price, description, ..product }
}

fn describe_options(gifts: &[Gift]) -> String {
    let mut response = String::from(
        "Ho ho ho! I found some wonderful gifts that would be perfect! Let me tell you about each one:\n\n",
    );

    for gift in gifts {
        response.push_str(&format!("Option {}: {}\n", gift.id, gift.title));
        response.push_str(&format!("   Price: {}\n", gift.price));
        if !gift.rating.is_empty() {
            response.push_str(&format!("   Rating: {} stars\n", gift.rating));
        }
        if !gift.description.is_empty() {
            response.push_str(&format!(
                "   Description: {}...\n",
                truncate_chars(&gift.description, 100)
            ));
        }
        response.push('\n');
    }

    response.push_str(
        "I can see all these wonderful gifts on my magical display here at the North Pole! ",
    );
    response.push_str(&format!(
        "Which one would you like? Just tell me the number - {}!",
        option_choices(gifts.len())
    ));
    response
}

/// "option 1", "option 1 or 2", "option 1, 2, or 3", ...
fn option_choices(count: usize) -> String {
    match count {
        0 | 1 => "option 1".to_string(),
        2 => "option 1 or 2".to_string(),
        _ => {
            let leading: Vec<String> = (1..count).map(|number| number.to_string()).collect();
            format!("option {}, or {count}", leading.join(", "))
        }
    }
}

pub struct SelectGiftTool;

#[async_trait]
impl Tool for SelectGiftTool {
    fn name(&self) -> &'static str {
        "select_gift"
    }

    fn description(&self) -> &'static str {
        "Select a specific gift from the search results"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "gift_choice": {
                    "type": "integer",
                    "description": "The option number (1, 2, 3, or 4)",
                    "minimum": 1,
                    "maximum": 4
                }
            },
            "required": ["gift_choice"]
        })
    }

    async fn execute(&self, context: ToolContext) -> Result<FunctionResult> {
        let choice = context.integer_argument("gift_choice").unwrap_or(0);
        let mut state = context.gift_state();

        let selected = match state.choose(choice) {
            Ok(gift) => gift.clone(),
            Err(DomainError::NoSearchResults) => {
                return Ok(FunctionResult::new(
                    "Oh my! I need to search for gifts first. What kind of gift would you like for Christmas?",
                ));
            }
            Err(DomainError::GiftChoiceOutOfRange { available, .. }) => {
                debug!(
                    event_name = "agent.tool.select_gift.out_of_range",
                    call_id = context.call_id.as_deref().unwrap_or("unknown"),
                    choice,
                    available,
                    "gift choice outside presented options"
                );
                return Ok(FunctionResult::new(format!(
                    "Oh my! I don't see option {choice}. Please choose from options 1 to {available}. \
Which one would you like?"
                )));
            }
            Err(error) => return Err(error.into()),
        };

        info!(
            event_name = "agent.tool.select_gift.confirmed",
            call_id = context.call_id.as_deref().unwrap_or("unknown"),
            gift_title = %selected.title,
            gift_price = %selected.price,
            "gift selected"
        );

        let response = describe_selection(&selected);
        state.selected_gift = Some(selected.clone());
        state.state = ConversationStep::GiftConfirmed;

        Ok(context
            .save(FunctionResult::new(response), &state)?
            .change_step(ConversationStep::GiftConfirmed.as_str())
            .user_event(json!({ "type": "gift_selected", "gift": selected })))
    }
}

fn describe_selection(gift: &Gift) -> String {
    let price = if gift.price.is_empty() { "Check listing" } else { gift.price.as_str() };
    let mut response = String::from("Ho ho ho! What a wonderful choice! You've selected:\n\n");
    response.push_str(&format!("**{}**\n", gift.title));
    response.push_str(&format!("Price: {price}\n"));
    if !gift.rating.is_empty() {
        response.push_str(&format!("Rating: {} stars - Other children love this!\n", gift.rating));
    }
    if !gift.description.is_empty() {
        response.push_str(&format!(
            "\nThis gift is perfect because: {}\n",
            truncate_chars(&gift.description, 150)
        ));
    }
    response.push_str("\nThe elves are already preparing this special gift for you! ");
    response.push_str("I can see it appearing on my list right now. ");
    response.push_str("\nWould you like to search for anything else from Santa's workshop?");
    response
}

pub struct CheckNiceListTool;

impl CheckNiceListTool {
    fn announcements(name: &str) -> [String; 4] {
        [
            format!(
                "Let me check my big magical book here at the North Pole... *pages rustling*... \
Oh yes! I found it! {name} is definitely on the NICE LIST! You've been wonderful this year!"
            ),
            format!(
                "Ho ho ho! {name}! Let me see... *checking list twice*... YES! You're on my nice list! \
I can see all the kind things you've done this year!"
            ),
            format!(
                "My special list says {name} has been absolutely wonderful! The elves have been telling \
me such good things about you! Keep up the fantastic work!"
            ),
            format!(
                "The elves are so excited! They just told me that {name} is on the nice list! \
They've been watching and you've been so good!"
            ),
        ]
    }
}

#[async_trait]
impl Tool for CheckNiceListTool {
    fn name(&self) -> &'static str {
        "check_nice_list"
    }

    fn description(&self) -> &'static str {
        "Check if a child is on the nice list"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "The child's name"
                }
            },
            "required": ["name"]
        })
    }

    async fn execute(&self, context: ToolContext) -> Result<FunctionResult> {
        let name = context.string_argument("name").unwrap_or_else(|| "dear child".to_string());
        let mut state = context.gift_state();

        let announcements = Self::announcements(&name);
        let mut response = announcements
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| announcements[0].clone());
        response.push_str(&format!("\n\n✨ {name} - NICE LIST STATUS: CONFIRMED! ✨"));
        response.push_str("\n\nYou're going to have a magical Christmas!");

        info!(
            event_name = "agent.tool.check_nice_list",
            call_id = context.call_id.as_deref().unwrap_or("unknown"),
            child_name = %name,
            "nice list checked"
        );

        state.nice_list_checked = true;
        state.child_name = Some(name.clone());

        Ok(context
            .save(FunctionResult::new(response), &state)?
            .user_event(json!({ "type": "nice_list_checked", "name": name, "status": "nice" })))
    }
}
