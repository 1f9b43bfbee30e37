use serde::Serialize;
use serde_json::{json, Map, Value};

pub const SWML_VERSION: &str = "1.0.0";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PromptSection {
    pub title: String,
    pub body: String,
}

impl PromptSection {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self { title: title.into(), body: body.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Language {
    pub name: String,
    pub code: String,
    pub voice: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FunctionDefinition {
    pub function: String,
    pub description: String,
    pub parameters: Value,
}

/// Builder for the SWML document returned when the platform fetches the
/// agent. Only populated fields are rendered.
#[derive(Clone, Debug, Default)]
pub struct AgentDocument {
    record_call: bool,
    sections: Vec<PromptSection>,
    post_prompt: Option<String>,
    post_prompt_url: Option<String>,
    params: Map<String, Value>,
    languages: Vec<Language>,
    hints: Vec<String>,
    global_data: Map<String, Value>,
    web_hook_url: Option<String>,
    functions: Vec<FunctionDefinition>,
}

impl AgentDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_call(&mut self, enabled: bool) -> &mut Self {
        self.record_call = enabled;
        self
    }

    pub fn add_section(&mut self, section: PromptSection) -> &mut Self {
        self.sections.push(section);
        self
    }

    pub fn set_post_prompt(&mut self, text: impl Into<String>, url: impl Into<String>) -> &mut Self {
        self.post_prompt = Some(text.into());
        self.post_prompt_url = Some(url.into());
        self
    }

    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn add_language(&mut self, language: Language) -> &mut Self {
        self.languages.push(language);
        self
    }

    pub fn add_hints<I, S>(&mut self, hints: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hints.extend(hints.into_iter().map(Into::into));
        self
    }

    pub fn set_global_data(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.global_data.insert(key.into(), value);
        self
    }

    pub fn set_web_hook_url(&mut self, url: impl Into<String>) -> &mut Self {
        self.web_hook_url = Some(url.into());
        self
    }

    pub fn add_function(&mut self, function: FunctionDefinition) -> &mut Self {
        self.functions.push(function);
        self
    }

    pub fn render(&self) -> Value {
        let mut ai = Map::new();
        ai.insert("prompt".to_string(), json!({ "pom": self.sections }));

        if let Some(text) = &self.post_prompt {
            ai.insert("post_prompt".to_string(), json!({ "text": text }));
        }
        if let Some(url) = &self.post_prompt_url {
            ai.insert("post_prompt_url".to_string(), json!(url));
        }
        if !self.params.is_empty() {
            ai.insert("params".to_string(), Value::Object(self.params.clone()));
        }
        if !self.languages.is_empty() {
            ai.insert("languages".to_string(), json!(self.languages));
        }
        if !self.hints.is_empty() {
            ai.insert("hints".to_string(), json!(self.hints));
        }
        if !self.global_data.is_empty() {
            ai.insert("global_data".to_string(), Value::Object(self.global_data.clone()));
        }
        if !self.functions.is_empty() || self.web_hook_url.is_some() {
            let mut swaig = Map::new();
            if let Some(url) = &self.web_hook_url {
                swaig.insert("defaults".to_string(), json!({ "web_hook_url": url }));
            }
            swaig.insert("functions".to_string(), json!(self.functions));
            ai.insert("SWAIG".to_string(), Value::Object(swaig));
        }

        let mut main = vec![json!({ "answer": {} })];
        if self.record_call {
            main.push(json!({ "record_call": { "format": "mp4", "stereo": true } }));
        }
        main.push(json!({ "ai": Value::Object(ai) }));

        json!({
            "version": SWML_VERSION,
            "sections": { "main": main },
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{AgentDocument, FunctionDefinition, Language, PromptSection};

    #[test]
    fn minimal_document_answers_and_runs_ai() {
        let document = AgentDocument::new().render();

        assert_eq!(document["version"], "1.0.0");
        let main = document["sections"]["main"].as_array().expect("main section");
        assert_eq!(main.len(), 2);
        assert_eq!(main[0], json!({"answer": {}}));
        assert_eq!(main[1]["ai"]["prompt"]["pom"], json!([]));
        assert!(main[1]["ai"].get("SWAIG").is_none());
        assert!(main[1]["ai"].get("post_prompt").is_none());
    }

    #[test]
    fn full_document_renders_every_ai_field() {
        let mut document = AgentDocument::new();
        document
            .record_call(true)
            .add_section(PromptSection::new("Personality", "Jolly."))
            .set_post_prompt("Summarize.", "https://hooks.example.com/summary")
            .set_param("background_file_volume", -10)
            .add_language(Language {
                name: "English".to_string(),
                code: "en-US".to_string(),
                voice: "elevenlabs.voice".to_string(),
            })
            .add_hints(["sled", "reindeer"])
            .set_global_data("gift_state", json!({"state": "greeting"}))
            .set_web_hook_url("https://u:p@santa.example.com/santa/swaig/")
            .add_function(FunctionDefinition {
                function: "check_nice_list".to_string(),
                description: "Check the list".to_string(),
                parameters: json!({"type": "object"}),
            });

        let rendered = document.render();
        let main = rendered["sections"]["main"].as_array().expect("main section");
        assert_eq!(main[1], json!({"record_call": {"format": "mp4", "stereo": true}}));

        let ai = &main[2]["ai"];
        assert_eq!(ai["prompt"]["pom"][0], json!({"title": "Personality", "body": "Jolly."}));
        assert_eq!(ai["post_prompt"]["text"], "Summarize.");
        assert_eq!(ai["post_prompt_url"], "https://hooks.example.com/summary");
        assert_eq!(ai["params"]["background_file_volume"], -10);
        assert_eq!(ai["languages"][0]["voice"], "elevenlabs.voice");
        assert_eq!(ai["hints"], json!(["sled", "reindeer"]));
        assert_eq!(ai["global_data"]["gift_state"]["state"], "greeting");
        assert_eq!(
            ai["SWAIG"]["defaults"]["web_hook_url"],
            "https://u:p@santa.example.com/santa/swaig/"
        );
        assert_eq!(ai["SWAIG"]["functions"][0]["function"], "check_nice_list");
    }
}
