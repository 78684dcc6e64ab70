//! Loader for Parlor configuration with YAML + environment overlays.
//!
//! Every section has defaults, so an empty source set yields a usable
//! configuration. Environment variables use the `PARLOR__` prefix with `__`
//! between path segments (`PARLOR__ENDPOINT__URL`). String values may refer
//! to other variables with `${VAR}`; expansion happens after merging.
use config::{Config, ConfigError, Environment, File};
use parlor_common::{ReplyOrdering, SameTargetPolicy, observability::LogFormat};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000/chat";
pub const DEFAULT_SLOGAN: &str = "Her Questions. Our Answers. Her Power.";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ParlorConfig {
    pub version: Option<String>,
    pub endpoint: EndpointConfig,
    pub typewriter: TypewriterConfig,
    pub intro: IntroConfig,
    pub logging: LoggingConfig,
}

/// Where user messages are posted.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub url: String,
    pub auth_token: Option<String>,
    /// No timeout unless set.
    pub timeout_secs: Option<u64>,
    pub retries: usize,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ENDPOINT.to_string(),
            auth_token: None,
            timeout_secs: None,
            retries: 0,
        }
    }
}

impl EndpointConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TypewriterConfig {
    pub char_interval_ms: u64,
    pub same_target: SameTargetPolicy,
    pub ordering: ReplyOrdering,
}

impl Default for TypewriterConfig {
    fn default() -> Self {
        Self {
            char_interval_ms: 20,
            same_target: SameTargetPolicy::default(),
            ordering: ReplyOrdering::default(),
        }
    }
}

impl TypewriterConfig {
    pub fn char_interval(&self) -> Duration {
        Duration::from_millis(self.char_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IntroConfig {
    pub enabled: bool,
    pub slogan: String,
    pub delay_ms: u64,
    pub char_interval_ms: u64,
}

impl Default for IntroConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            slogan: DEFAULT_SLOGAN.to_string(),
            delay_ms: 2200,
            char_interval_ms: 70,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub filter: String,
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            filter: "info".to_string(),
            dir: None,
        }
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct ParlorConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for ParlorConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ParlorConfigLoader {
    /// Start with defaults plus `PARLOR__` env overrides.
    ///
    /// ```
    /// use parlor_config::{ParlorConfigLoader, DEFAULT_ENDPOINT};
    ///
    /// let config = ParlorConfigLoader::new().load().expect("defaults load");
    ///
    /// assert_eq!(config.endpoint.url, DEFAULT_ENDPOINT);
    /// assert_eq!(config.typewriter.char_interval_ms, 20);
    /// assert!(config.intro.enabled);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; the format is inferred from the suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is skipped when missing.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    ///
    /// ```
    /// use parlor_common::SameTargetPolicy;
    /// use parlor_config::ParlorConfigLoader;
    ///
    /// let cfg = ParlorConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// version: "test"
    /// typewriter:
    ///   char_interval_ms: 5
    ///   same_target: queue
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.version.as_deref(), Some("test"));
    /// assert_eq!(cfg.typewriter.char_interval_ms, 5);
    /// assert_eq!(cfg.typewriter.same_target, SameTargetPolicy::Queue);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources.
    ///
    /// Environment variables are added last so they win over every file.
    pub fn load(self) -> Result<ParlorConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("PARLOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}
