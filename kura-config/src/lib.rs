//! Loader for workspace configuration with YAML + environment overlays.
//!
//! Sources are merged in the order they are attached; `KURA__`-prefixed
//! environment variables are applied last and win over every file
//! (`KURA__UPSTREAM__MODEL=gemini-2.5-pro` sets `upstream.model`).
//! After merging, `${VAR}` placeholders in string values are expanded
//! from the process environment.
//!
//! ```yaml
//! version: "1"
//! upstream:
//!   provider: gemini
//!   api_key: "${GEMINI_API_KEY}"
//!   model: gemini-2.5-flash
//!   timeout_secs: 60
//! logging:
//!   format: text
//!   filter: info
//!   emit_stderr: false
//! ```
use config::{Config, ConfigError, Environment, File, FileFormat};
use kura_common::observability::{LogConfig, LogFormat};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "KURA";
const ENV_SEPARATOR: &str = "__";

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KuraConfig {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Gemini,
}

/// Connection details for the hosted model.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub provider: Provider,
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Gemini,
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            timeout_secs: 60,
        }
    }
}

impl UpstreamConfig {
    /// The configured key, if it is usable.
    ///
    /// Blank values and placeholders whose variable was never set (still
    /// spelled `${VAR}` after expansion) count as absent.
    ///
    /// ```
    /// use kura_config::UpstreamConfig;
    ///
    /// let mut cfg = UpstreamConfig::default();
    /// assert_eq!(cfg.credential(), None);
    ///
    /// cfg.api_key = Some("${GEMINI_API_KEY}".into());
    /// assert_eq!(cfg.credential(), None);
    ///
    /// cfg.api_key = Some(" AIza-example ".into());
    /// assert_eq!(cfg.credential(), Some("AIza-example"));
    /// ```
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && !key.contains("${"))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub filter: String,
    pub emit_stderr: bool,
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            filter: "info".to_string(),
            emit_stderr: false,
            dir: None,
        }
    }
}

impl LoggingConfig {
    pub fn to_log_config(&self, app_name: &'static str) -> LogConfig {
        LogConfig {
            app_name,
            log_dir: self.dir.clone(),
            emit_stderr: self.emit_stderr,
            format: self.format,
            default_filter: self.filter.clone(),
        }
    }
}

/// `~/.config/kura/kura.yaml` (platform equivalent), when a config dir exists.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("kura").join("kura.yaml"))
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
pub struct KuraConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for KuraConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl KuraConfigLoader {
    /// Start with no files; environment overrides are applied by [`load`](Self::load).
    ///
    /// ```
    /// use kura_config::{KuraConfigLoader, DEFAULT_GEMINI_MODEL};
    ///
    /// let config = KuraConfigLoader::new().load().expect("defaults load");
    /// assert_eq!(config.upstream.model, DEFAULT_GEMINI_MODEL);
    /// assert_eq!(config.upstream.timeout_secs, 60);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; the format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is silently skipped when missing, so deployments
    /// can rely purely on environment variables.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use kura_config::KuraConfigLoader;
    /// use kura_common::observability::LogFormat;
    ///
    /// let cfg = KuraConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// version: "test"
    /// upstream:
    ///   provider: gemini
    ///   model: "gemini-2.5-pro"
    /// logging:
    ///   format: json
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.version.as_deref(), Some("test"));
    /// assert_eq!(cfg.upstream.model, "gemini-2.5-pro");
    /// assert_eq!(cfg.logging.format, LogFormat::Json);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self.builder.add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    ///
    /// ```
    /// use kura_config::KuraConfigLoader;
    ///
    /// unsafe { std::env::set_var("KURA_DOC_KEY", "injected-from-env"); }
    ///
    /// let config = KuraConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// upstream:
    ///   api_key: "${KURA_DOC_KEY}"
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.upstream.credential(), Some("injected-from-env"));
    ///
    /// unsafe { std::env::remove_var("KURA_DOC_KEY"); }
    /// ```
    pub fn load(self) -> Result<KuraConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        // Env values stay strings until here; `config` coerces them per target field type.
        Config::try_from(&v)?.try_deserialize()
    }
}
