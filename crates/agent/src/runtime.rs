use std::sync::Arc;

use santa_core::config::MediaConfig;
use santa_core::domain::gift::{GiftState, GIFT_STATE_KEY};
use serde_json::Value;
use tracing::{debug, warn};

use crate::catalog::GiftSearch;
use crate::persona::{self, MediaUrls, BACKGROUND_FILE_VOLUME, POST_PROMPT, SPEECH_HINTS};
use crate::swaig::{FunctionCall, FunctionResult};
use crate::swml::AgentDocument;
use crate::tools::{ToolContext, ToolError, ToolRegistry};

/// What the server knows about the inbound SWML fetch.
#[derive(Clone, Debug, Default)]
pub struct SwmlRequestContext {
    pub host: Option<String>,
    pub forwarded_proto: Option<String>,
    /// Fully qualified SWAIG web hook, credentials included.
    pub web_hook_url: Option<String>,
}

pub struct AgentRuntime {
    tools: ToolRegistry,
    catalog: Arc<dyn GiftSearch>,
    christmas_year: String,
    media: MediaConfig,
}

impl AgentRuntime {
    pub fn new(
        catalog: Arc<dyn GiftSearch>,
        christmas_year: impl Into<String>,
        media: MediaConfig,
    ) -> Self {
        Self {
            tools: ToolRegistry::santa(catalog.clone()),
            catalog,
            christmas_year: christmas_year.into(),
            media,
        }
    }

    pub fn catalog_is_live(&self) -> bool {
        self.catalog.is_live()
    }

    pub fn render_document(&self, request: &SwmlRequestContext) -> Value {
        let media = MediaUrls::from_request(
            request.host.as_deref(),
            request.forwarded_proto.as_deref(),
            &self.media,
        );

        let mut document = AgentDocument::new();
        document.record_call(true);
        for section in persona::prompt_sections(&self.christmas_year) {
            document.add_section(section);
        }
        document
            .set_param("video_idle_file", media.video_idle)
            .set_param("video_talking_file", media.video_talking)
            .set_param("background_file", media.background)
            .set_param("background_file_volume", BACKGROUND_FILE_VOLUME)
            .add_language(persona::language())
            .add_hints(SPEECH_HINTS.iter().copied());

        if let Some(url) = &self.media.post_prompt_url {
            document.set_post_prompt(POST_PROMPT, url.clone());
        }

        match serde_json::to_value(GiftState::default()) {
            Ok(state) => {
                document.set_global_data(GIFT_STATE_KEY, state);
            }
            Err(error) => warn!(
                event_name = "agent.swml.global_data_failed",
                error = %error,
                "initial gift state could not be encoded"
            ),
        }

        for definition in self.tools.definitions() {
            document.add_function(definition);
        }
        if let Some(url) = &request.web_hook_url {
            document.set_web_hook_url(url.clone());
        }

        debug!(
            event_name = "agent.swml.rendered",
            base_url = %media.base_url,
            function_count = self.tools.len(),
            "SWML document rendered"
        );
        document.render()
    }

    pub async fn handle_function_call(
        &self,
        call: FunctionCall,
    ) -> Result<FunctionResult, ToolError> {
        let context = ToolContext {
            arguments: call.arguments(),
            global_data: call.global_data,
            call_id: call.call_id,
        };
        self.tools.dispatch(&call.function, context).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use santa_core::config::MediaConfig;
    use serde_json::json;

    use super::{AgentRuntime, SwmlRequestContext};
    use crate::catalog::FallbackCatalog;
    use crate::swaig::FunctionCall;
    use crate::tools::ToolError;

    fn runtime(media: MediaConfig) -> AgentRuntime {
        AgentRuntime::new(Arc::new(FallbackCatalog), "2025", media)
    }

    #[test]
    fn document_carries_persona_media_and_functions() {
        let runtime = runtime(MediaConfig::default());
        let document = runtime.render_document(&SwmlRequestContext {
            host: Some("santa.example.com".to_string()),
            forwarded_proto: Some("https".to_string()),
            web_hook_url: Some("https://santa:pw@santa.example.com/santa/swaig/".to_string()),
        });

        let main = document["sections"]["main"].as_array().expect("main section");
        assert_eq!(main[1]["record_call"]["format"], "mp4");

        let ai = &main[2]["ai"];
        assert_eq!(ai["prompt"]["pom"].as_array().map(Vec::len), Some(4));
        assert_eq!(ai["params"]["video_idle_file"], "https://santa.example.com/santa_idle.mp4");
        assert_eq!(ai["params"]["background_file"], "https://santa.example.com/background.mp3");
        assert_eq!(ai["params"]["background_file_volume"], -10);
        assert_eq!(ai["languages"][0]["code"], "en-US");
        assert_eq!(ai["global_data"]["gift_state"]["state"], "greeting");
        assert_eq!(
            ai["SWAIG"]["defaults"]["web_hook_url"],
            "https://santa:pw@santa.example.com/santa/swaig/"
        );
        let functions: Vec<_> = ai["SWAIG"]["functions"]
            .as_array()
            .expect("functions")
            .iter()
            .map(|function| function["function"].as_str().unwrap_or_default().to_string())
            .collect();
        assert_eq!(functions, ["search_gifts", "select_gift", "check_nice_list"]);
        assert!(ai.get("post_prompt").is_none());
    }

    #[test]
    fn post_prompt_is_rendered_when_configured() {
        let runtime = runtime(MediaConfig {
            post_prompt_url: Some("https://hooks.example.com/summary".to_string()),
            ..MediaConfig::default()
        });

        let document = runtime.render_document(&SwmlRequestContext::default());
        let ai = &document["sections"]["main"][2]["ai"];

        assert_eq!(ai["post_prompt_url"], "https://hooks.example.com/summary");
        assert!(ai["post_prompt"]["text"].as_str().unwrap_or_default().starts_with("Summarize"));
        assert_eq!(ai["params"]["video_talking_file"], "http://localhost:5000/santa_talking.mp4");
    }

    #[tokio::test]
    async fn function_calls_are_dispatched_with_their_global_data() {
        let runtime = runtime(MediaConfig::default());
        let call: FunctionCall = serde_json::from_value(json!({
            "function": "search_gifts",
            "argument": {"parsed": [{"query": "lego"}]},
            "global_data": {"caller": "web"},
            "call_id": "call-9"
        }))
        .expect("decode");

        let result = runtime.handle_function_call(call).await.expect("dispatch");
        let global = result.global_data().expect("global data");

        assert_eq!(global["caller"], "web");
        assert_eq!(global["gift_state"]["search_query"], "lego");
        assert_eq!(global["gift_state"]["gift_search_results"].as_array().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn unknown_functions_surface_as_errors() {
        let runtime = runtime(MediaConfig::default());
        let call: FunctionCall =
            serde_json::from_value(json!({"function": "fly_sleigh"})).expect("decode");

        let error = runtime.handle_function_call(call).await.expect_err("unknown function");

        assert!(matches!(error, ToolError::UnknownFunction(_)));
    }
}
