use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_RAPIDAPI_HOST: &str = "real-time-amazon-data.p.rapidapi.com";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub signalwire: SignalWireConfig,
    pub auth: AuthConfig,
    pub gifts: GiftConfig,
    pub media: MediaConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub web_dir: PathBuf,
    /// Externally reachable base URL the platform uses to call back into us.
    pub public_url: Option<String>,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SignalWireConfig {
    pub space_name: String,
    pub project_id: String,
    pub token: SecretString,
    pub agent_name: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Default)]
pub struct AuthConfig {
    pub user: Option<String>,
    pub password: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct GiftConfig {
    pub rapidapi_key: Option<SecretString>,
    pub rapidapi_host: String,
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub christmas_year: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Default)]
pub struct MediaConfig {
    pub post_prompt_url: Option<String>,
    pub video_idle_url: Option<String>,
    pub video_talking_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub web_dir: Option<PathBuf>,
    pub public_url: Option<String>,
    pub log_level: Option<String>,
    pub signalwire_space_name: Option<String>,
    pub signalwire_project_id: Option<String>,
    pub signalwire_token: Option<String>,
    pub auth_user: Option<String>,
    pub auth_password: Option<String>,
    pub rapidapi_key: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 5000,
                web_dir: PathBuf::from("web"),
                public_url: None,
                graceful_shutdown_secs: 15,
            },
            signalwire: SignalWireConfig {
                space_name: String::new(),
                project_id: String::new(),
                token: String::new().into(),
                agent_name: "santa".to_string(),
                timeout_secs: 10,
            },
            auth: AuthConfig::default(),
            gifts: GiftConfig {
                rapidapi_key: None,
                rapidapi_host: DEFAULT_RAPIDAPI_HOST.to_string(),
                min_price: Decimal::new(1000, 2),
                max_price: Decimal::new(10000, 2),
                christmas_year: "2025".to_string(),
                timeout_secs: 10,
            },
            media: MediaConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl SignalWireConfig {
    /// Full API host for the space. A space given as a bare name gets the
    /// `.signalwire.com` suffix; anything containing a dot is used verbatim.
    pub fn host(&self) -> Option<String> {
        let space = self.space_name.trim();
        if space.is_empty() {
            return None;
        }
        if space.contains('.') {
            return Some(space.to_string());
        }
        Some(format!("{space}.signalwire.com"))
    }

    pub fn is_configured(&self) -> bool {
        self.host().is_some()
            && !self.project_id.trim().is_empty()
            && !self.token.expose_secret().trim().is_empty() // ubs:ignore
    }
}

impl AuthConfig {
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.user, &self.password) {
            (Some(user), Some(password)) => Some((user.as_str(), password.expose_secret())),
            _ => None,
        }
    }
}

impl GiftConfig {
    pub fn has_api_key(&self) -> bool {
        self.rapidapi_key.as_ref().map(|key| !key.expose_secret().trim().is_empty()).unwrap_or(false)
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("santa.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(web_dir) = server.web_dir {
                self.server.web_dir = web_dir;
            }
            if let Some(public_url) = server.public_url {
                self.server.public_url = Some(public_url);
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(signalwire) = patch.signalwire {
            if let Some(space_name) = signalwire.space_name {
                self.signalwire.space_name = space_name;
            }
            if let Some(project_id) = signalwire.project_id {
                self.signalwire.project_id = project_id;
            }
            if let Some(signalwire_token_value) = signalwire.token {
                self.signalwire.token = secret_value(signalwire_token_value); // ubs:ignore
            }
            if let Some(agent_name) = signalwire.agent_name {
                self.signalwire.agent_name = agent_name;
            }
            if let Some(timeout_secs) = signalwire.timeout_secs {
                self.signalwire.timeout_secs = timeout_secs;
            }
        }

        if let Some(auth) = patch.auth {
            if let Some(user) = auth.user {
                self.auth.user = Some(user);
            }
            if let Some(auth_password_value) = auth.password {
                self.auth.password = Some(secret_value(auth_password_value)); // ubs:ignore
            }
        }

        if let Some(gifts) = patch.gifts {
            if let Some(rapidapi_key_value) = gifts.rapidapi_key {
                self.gifts.rapidapi_key = Some(secret_value(rapidapi_key_value)); // ubs:ignore
            }
            if let Some(rapidapi_host) = gifts.rapidapi_host {
                self.gifts.rapidapi_host = rapidapi_host;
            }
            if let Some(min_price) = gifts.min_price {
                self.gifts.min_price = min_price;
            }
            if let Some(max_price) = gifts.max_price {
                self.gifts.max_price = max_price;
            }
            if let Some(christmas_year) = gifts.christmas_year {
                self.gifts.christmas_year = christmas_year;
            }
            if let Some(timeout_secs) = gifts.timeout_secs {
                self.gifts.timeout_secs = timeout_secs;
            }
        }

        if let Some(media) = patch.media {
            if let Some(post_prompt_url) = media.post_prompt_url {
                self.media.post_prompt_url = Some(post_prompt_url);
            }
            if let Some(video_idle_url) = media.video_idle_url {
                self.media.video_idle_url = Some(video_idle_url);
            }
            if let Some(video_talking_url) = media.video_talking_url {
                self.media.video_talking_url = Some(video_talking_url);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("HOST") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("PORT") {
            self.server.port = parse_u16("PORT", &value)?;
        }
        if let Some(value) = read_env("SANTA_WEB_DIR") {
            self.server.web_dir = PathBuf::from(value);
        }
        if let Some(value) = read_env("SWML_PROXY_URL_BASE").or_else(|| read_env("APP_URL")) {
            self.server.public_url = Some(value);
        }
        if let Some(value) = read_env("SANTA_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("SANTA_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("SIGNALWIRE_SPACE_NAME") {
            self.signalwire.space_name = value;
        }
        if let Some(value) = read_env("SIGNALWIRE_PROJECT_ID") {
            self.signalwire.project_id = value;
        }
        if let Some(value) = read_env("SIGNALWIRE_TOKEN") {
            self.signalwire.token = secret_value(value); // ubs:ignore
        }
        if let Some(value) = read_env("AGENT_NAME") {
            self.signalwire.agent_name = value;
        }
        if let Some(value) = read_env("SIGNALWIRE_TIMEOUT_SECS") {
            self.signalwire.timeout_secs = parse_u64("SIGNALWIRE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SWML_BASIC_AUTH_USER") {
            self.auth.user = Some(value);
        }
        if let Some(value) = read_env("SWML_BASIC_AUTH_PASSWORD") {
            self.auth.password = Some(secret_value(value)); // ubs:ignore
        }

        if let Some(value) = read_env("RAPIDAPI_KEY") {
            self.gifts.rapidapi_key = Some(secret_value(value)); // ubs:ignore
        }
        if let Some(value) = read_env("RAPIDAPI_HOST") {
            self.gifts.rapidapi_host = value;
        }
        if let Some(value) = read_env("MIN_GIFT_PRICE") {
            self.gifts.min_price = parse_decimal("MIN_GIFT_PRICE", &value)?;
        }
        if let Some(value) = read_env("MAX_GIFT_PRICE") {
            self.gifts.max_price = parse_decimal("MAX_GIFT_PRICE", &value)?;
        }
        if let Some(value) = read_env("CHRISTMAS_YEAR") {
            self.gifts.christmas_year = value;
        }

        if let Some(value) = read_env("POST_PROMPT_URL") {
            self.media.post_prompt_url = Some(value);
        }
        if let Some(value) = read_env("VIDEO_IDLE_URL") {
            self.media.video_idle_url = Some(value);
        }
        if let Some(value) = read_env("VIDEO_TALKING_URL") {
            self.media.video_talking_url = Some(value);
        }

        let log_level = read_env("SANTA_LOGGING_LEVEL").or_else(|| read_env("SANTA_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SANTA_LOGGING_FORMAT").or_else(|| read_env("SANTA_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(web_dir) = overrides.web_dir {
            self.server.web_dir = web_dir;
        }
        if let Some(public_url) = overrides.public_url {
            self.server.public_url = Some(public_url);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(space_name) = overrides.signalwire_space_name {
            self.signalwire.space_name = space_name;
        }
        if let Some(project_id) = overrides.signalwire_project_id {
            self.signalwire.project_id = project_id;
        }
        if let Some(signalwire_token) = overrides.signalwire_token {
            self.signalwire.token = secret_value(signalwire_token); // ubs:ignore
        }
        if let Some(auth_user) = overrides.auth_user {
            self.auth.user = Some(auth_user);
        }
        if let Some(auth_password) = overrides.auth_password {
            self.auth.password = Some(secret_value(auth_password)); // ubs:ignore
        }
        if let Some(rapidapi_key) = overrides.rapidapi_key {
            self.gifts.rapidapi_key = Some(secret_value(rapidapi_key)); // ubs:ignore
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_server(&self.server)?;
        validate_signalwire(&self.signalwire)?;
        validate_auth(&self.auth)?;
        validate_gifts(&self.gifts)?;
        validate_media(&self.media)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("santa.toml"), PathBuf::from("config/santa.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

fn validate_timeout(field: &str, timeout_secs: u64) -> Result<(), ConfigError> {
    if timeout_secs == 0 || timeout_secs > 300 {
        return Err(ConfigError::Validation(format!("{field} must be in range 1..=300")));
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    if let Some(public_url) = &server.public_url {
        validate_http_url("server.public_url (SWML_PROXY_URL_BASE/APP_URL)", public_url)?;
    }

    Ok(())
}

fn validate_signalwire(signalwire: &SignalWireConfig) -> Result<(), ConfigError> {
    validate_timeout("signalwire.timeout_secs", signalwire.timeout_secs)?;

    if signalwire.agent_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "signalwire.agent_name (AGENT_NAME) must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_auth(auth: &AuthConfig) -> Result<(), ConfigError> {
    let has_user = auth.user.as_ref().map(|user| !user.trim().is_empty()).unwrap_or(false);
    let has_password = auth
        .password
        .as_ref()
        .map(|password| !password.expose_secret().is_empty()) // ubs:ignore
        .unwrap_or(false);

    if has_user != has_password {
        return Err(ConfigError::Validation(
            "SWML_BASIC_AUTH_USER and SWML_BASIC_AUTH_PASSWORD must be set together".to_string(),
        ));
    }

    if auth.user.as_deref().map(|user| user.contains(':')).unwrap_or(false) {
        return Err(ConfigError::Validation(
            "SWML_BASIC_AUTH_USER must not contain `:`".to_string(),
        ));
    }

    Ok(())
}

fn validate_gifts(gifts: &GiftConfig) -> Result<(), ConfigError> {
    validate_timeout("gifts.timeout_secs", gifts.timeout_secs)?;

    if gifts.min_price < Decimal::ZERO {
        return Err(ConfigError::Validation(
            "gifts.min_price (MIN_GIFT_PRICE) must not be negative".to_string(),
        ));
    }

    if gifts.min_price > gifts.max_price {
        return Err(ConfigError::Validation(format!(
            "gifts.min_price ({}) must not exceed gifts.max_price ({})",
            gifts.min_price, gifts.max_price
        )));
    }

    if gifts.rapidapi_host.trim().is_empty() {
        return Err(ConfigError::Validation(
            "gifts.rapidapi_host (RAPIDAPI_HOST) must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_media(media: &MediaConfig) -> Result<(), ConfigError> {
    if let Some(url) = &media.post_prompt_url {
        validate_http_url("media.post_prompt_url (POST_PROMPT_URL)", url)?;
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.trim().parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    value.trim().parse::<Decimal>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    server: Option<ServerPatch>,
    signalwire: Option<SignalWirePatch>,
    auth: Option<AuthPatch>,
    gifts: Option<GiftPatch>,
    media: Option<MediaPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    web_dir: Option<PathBuf>,
    public_url: Option<String>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SignalWirePatch {
    space_name: Option<String>,
    project_id: Option<String>,
    token: Option<String>,
    agent_name: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthPatch {
    user: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GiftPatch {
    rapidapi_key: Option<String>,
    rapidapi_host: Option<String>,
    min_price: Option<Decimal>,
    max_price: Option<Decimal>,
    christmas_year: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct MediaPatch {
    post_prompt_url: Option<String>,
    video_idle_url: Option<String>,
    video_talking_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
