//! Configuration Loader
//!
//! Layers defaults, an optional TOML file and environment variables using the
//! `config` crate, then applies legacy URL variables and validates the result.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::debug;

use super::error::ConfigResult;
use super::OrchestratorConfig;

/// Environment variable naming an optional configuration file
pub const CONFIG_PATH_ENV: &str = "ANALYSIS_CONFIG_PATH";

/// Prefix for structured environment overrides (`ANALYSIS__ENGINE__TIMEOUT_MS`)
const ENV_PREFIX: &str = "ANALYSIS";
const ENV_SEPARATOR: &str = "__";

/// Builder-style loader; the environment is injectable so tests never touch process state
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    path: Option<PathBuf>,
    env: Option<HashMap<String, String>>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader reading the process environment, with the file from `ANALYSIS_CONFIG_PATH`
    pub fn from_env() -> Self {
        let path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        Self { path, env: None }
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Replace the process environment with an explicit variable map
    pub fn with_env_vars(mut self, vars: HashMap<String, String>) -> Self {
        self.env = Some(vars);
        self
    }

    pub fn load(&self) -> ConfigResult<OrchestratorConfig> {
        let mut builder = config::Config::builder();

        if let Some(path) = &self.path {
            debug!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(
                config::File::from(path.as_path())
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }

        let env_source = config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .source(self.env.clone());
        builder = builder.add_source(env_source);

        let mut config: OrchestratorConfig = builder.build()?.try_deserialize()?;
        self.apply_legacy_overrides(&mut config);
        config.validate()?;

        debug!(
            engine_url = %config.engine.base_url,
            cache_enabled = config.cache.enabled,
            workers = config.queue.worker_count,
            sync_threshold = config.dispatch.sync_threshold,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    fn apply_legacy_overrides(&self, config: &mut OrchestratorConfig) {
        if let Some(url) = self.var("NLP_SERVICE_URL") {
            config.engine.base_url = url;
        }
        if let Some(url) = self.var("REDIS_URL") {
            config.cache.redis_url = url;
        }
        if let Some(url) = self.var("DATABASE_URL") {
            config.queue.database_url = url;
        }
    }

    fn var(&self, name: &str) -> Option<String> {
        let value = match &self.env {
            Some(vars) => vars.get(name).cloned(),
            None => std::env::var(name).ok(),
        };
        value.filter(|v| !v.is_empty())
    }
}
