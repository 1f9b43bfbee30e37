use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use santa_core::config::{AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

use super::CommandResult;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                2,
            );
        }
    };

    CommandResult { exit_code: 0, output: render(&config) }
}

pub fn render(config: &AppConfig) -> String {
    let file_path = detect_config_path();
    let file_doc = load_config_file_doc(file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, file_doc.as_ref(), file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "server.bind_address",
        &config.server.bind_address,
        source("server.bind_address", &["HOST"]),
    ));
    lines.push(render_line(
        "server.port",
        &config.server.port.to_string(),
        source("server.port", &["PORT"]),
    ));
    lines.push(render_line(
        "server.web_dir",
        &config.server.web_dir.display().to_string(),
        source("server.web_dir", &["SANTA_WEB_DIR"]),
    ));
    lines.push(render_line(
        "server.public_url",
        config.server.public_url.as_deref().unwrap_or("<unset>"),
        source("server.public_url", &["SWML_PROXY_URL_BASE", "APP_URL"]),
    ));
    lines.push(render_line(
        "server.graceful_shutdown_secs",
        &config.server.graceful_shutdown_secs.to_string(),
        source("server.graceful_shutdown_secs", &["SANTA_SERVER_GRACEFUL_SHUTDOWN_SECS"]),
    ));

    lines.push(render_line(
        "signalwire.space_name",
        or_unset(&config.signalwire.space_name),
        source("signalwire.space_name", &["SIGNALWIRE_SPACE_NAME"]),
    ));
    lines.push(render_line(
        "signalwire.project_id",
        or_unset(&config.signalwire.project_id),
        source("signalwire.project_id", &["SIGNALWIRE_PROJECT_ID"]),
    ));
    lines.push(render_line(
        "signalwire.token",
        &redact_secret(Some(&config.signalwire.token)),
        source("signalwire.token", &["SIGNALWIRE_TOKEN"]),
    ));
    lines.push(render_line(
        "signalwire.agent_name",
        &config.signalwire.agent_name,
        source("signalwire.agent_name", &["AGENT_NAME"]),
    ));
    lines.push(render_line(
        "signalwire.timeout_secs",
        &config.signalwire.timeout_secs.to_string(),
        source("signalwire.timeout_secs", &["SIGNALWIRE_TIMEOUT_SECS"]),
    ));

    lines.push(render_line(
        "auth.user",
        config.auth.user.as_deref().unwrap_or("<generated at startup>"),
        source("auth.user", &["SWML_BASIC_AUTH_USER"]),
    ));
    lines.push(render_line(
        "auth.password",
        &redact_secret(config.auth.password.as_ref()),
        source("auth.password", &["SWML_BASIC_AUTH_PASSWORD"]),
    ));

    lines.push(render_line(
        "gifts.rapidapi_key",
        &redact_secret(config.gifts.rapidapi_key.as_ref()),
        source("gifts.rapidapi_key", &["RAPIDAPI_KEY"]),
    ));
    lines.push(render_line(
        "gifts.rapidapi_host",
        &config.gifts.rapidapi_host,
        source("gifts.rapidapi_host", &["RAPIDAPI_HOST"]),
    ));
    lines.push(render_line(
        "gifts.min_price",
        &config.gifts.min_price.to_string(),
        source("gifts.min_price", &["MIN_GIFT_PRICE"]),
    ));
    lines.push(render_line(
        "gifts.max_price",
        &config.gifts.max_price.to_string(),
        source("gifts.max_price", &["MAX_GIFT_PRICE"]),
    ));
    lines.push(render_line(
        "gifts.christmas_year",
        &config.gifts.christmas_year,
        source("gifts.christmas_year", &["CHRISTMAS_YEAR"]),
    ));
    lines.push(render_line(
        "gifts.timeout_secs",
        &config.gifts.timeout_secs.to_string(),
        source("gifts.timeout_secs", &[]),
    ));

    lines.push(render_line(
        "media.post_prompt_url",
        config.media.post_prompt_url.as_deref().unwrap_or("<unset>"),
        source("media.post_prompt_url", &["POST_PROMPT_URL"]),
    ));
    lines.push(render_line(
        "media.video_idle_url",
        config.media.video_idle_url.as_deref().unwrap_or("<derived from request host>"),
        source("media.video_idle_url", &["VIDEO_IDLE_URL"]),
    ));
    lines.push(render_line(
        "media.video_talking_url",
        config.media.video_talking_url.as_deref().unwrap_or("<derived from request host>"),
        source("media.video_talking_url", &["VIDEO_TALKING_URL"]),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", &["SANTA_LOGGING_LEVEL", "SANTA_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source("logging.format", &["SANTA_LOGGING_FORMAT", "SANTA_LOG_FORMAT"]),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("santa.toml"), PathBuf::from("config/santa.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    // Blank values are ignored by the loader, so they never count as a source.
    let is_set = |key: &&&str| env::var(key).is_ok_and(|value| !value.trim().is_empty());
    if let Some(env_key) = env_keys.iter().find(is_set) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn or_unset(value: &str) -> &str {
    if value.trim().is_empty() {
        "<unset>"
    } else {
        value
    }
}

fn redact_secret(secret: Option<&SecretString>) -> String {
    match secret.map(|secret| secret.expose_secret().trim()) {
        None | Some("") => "<unset>".to_string(),
        Some(_) => "<redacted>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use santa_core::config::AppConfig;

    use super::{contains_path, field_source, redact_secret, render};

    #[test]
    fn render_redacts_every_secret() {
        let mut config = AppConfig::default();
        config.signalwire.token = "PT-very-secret".to_string().into();
        config.auth.password = Some("cookies".to_string().into());
        config.gifts.rapidapi_key = Some("rapid-secret".to_string().into());

        let output = render(&config);

        assert!(output.contains("- signalwire.token = <redacted>"));
        assert!(output.contains("- auth.password = <redacted>"));
        assert!(output.contains("- gifts.rapidapi_key = <redacted>"));
        assert!(!output.contains("PT-very-secret"));
        assert!(!output.contains("cookies"));
        assert!(!output.contains("rapid-secret"));
    }

    #[test]
    fn render_lists_timeouts_and_media_overrides() {
        let mut config = AppConfig::default();
        config.media.video_idle_url = Some("https://cdn.example.com/idle.mp4".to_string());

        let output = render(&config);

        assert!(output.contains("- server.graceful_shutdown_secs = 15 "));
        assert!(output.contains("- signalwire.timeout_secs = 10 "));
        assert!(output.contains("- gifts.timeout_secs = 10 "));
        assert!(output.contains("- media.video_idle_url = https://cdn.example.com/idle.mp4 "));
        assert!(output.contains("- media.video_talking_url = <derived from request host> "));
    }

    #[test]
    fn blank_env_values_are_not_reported_as_source() {
        std::env::set_var("SANTA_CLI_TEST_BLANK_PROXY", "  ");
        std::env::set_var("SANTA_CLI_TEST_APP_URL", "https://santa.example.com");
        std::env::set_var("SANTA_CLI_TEST_BLANK_PORT", "");

        let public_url = field_source(
            "server.public_url",
            &["SANTA_CLI_TEST_BLANK_PROXY", "SANTA_CLI_TEST_APP_URL"],
            None,
            None,
        );
        let port = field_source("server.port", &["SANTA_CLI_TEST_BLANK_PORT"], None, None);

        std::env::remove_var("SANTA_CLI_TEST_BLANK_PROXY");
        std::env::remove_var("SANTA_CLI_TEST_APP_URL");
        std::env::remove_var("SANTA_CLI_TEST_BLANK_PORT");

        assert_eq!(public_url, "env (SANTA_CLI_TEST_APP_URL)");
        assert_eq!(port, "default");
    }

    #[test]
    fn empty_secrets_render_as_unset() {
        assert_eq!(redact_secret(None), "<unset>");
        assert_eq!(redact_secret(Some(&"  ".to_string().into())), "<unset>");
    }

    #[test]
    fn nested_keys_are_found_in_file_documents() {
        let doc: toml::Value = "[gifts]\nmin_price = \"5.00\"".parse().expect("toml");

        assert!(contains_path(&doc, "gifts.min_price"));
        assert!(!contains_path(&doc, "gifts.max_price"));
    }
}
