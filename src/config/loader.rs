use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat, Map};

use crate::config::{
    models::AppConfig,
    validation::{AppConfigValidator, ValidationError},
};

/// Directory searched for configuration layers when none is given
pub const DEFAULT_CONFIG_DIR: &str = "configs";

/// Prefix for environment overrides, e.g. `APP_SERVER_PORT` -> `server.port`
pub const ENV_PREFIX: &str = "APP";

/// File layers in ascending precedence, with whether each one must exist
const FILE_LAYERS: [(&str, bool); 3] = [("default", true), ("local", false), ("private", false)];

/// Errors raised while assembling the configuration
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Invalid UTF-8 path: {0}")]
    InvalidPath(PathBuf),

    #[error("Failed to build config from {dir}")]
    Build {
        dir: PathBuf,
        #[source]
        source: config::ConfigError,
    },

    #[error("Failed to deserialize config from {dir}")]
    Deserialize {
        dir: PathBuf,
        #[source]
        source: config::ConfigError,
    },

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Merges `default`, `local`, `private` YAML files and `APP_*` environment
/// variables into one [`AppConfig`].
///
/// Missing optional layers are skipped; a missing `default` layer, malformed
/// YAML or a type mismatch aborts the load.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    dir: PathBuf,
    env_prefix: String,
    env_source: Option<Map<String, String>>,
}

impl ConfigLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            env_prefix: ENV_PREFIX.to_string(),
            env_source: None,
        }
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Read overrides from `vars` instead of the process environment.
    pub fn with_env_source(mut self, vars: Map<String, String>) -> Self {
        self.env_source = Some(vars);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load and validate the configuration
    pub fn load(&self) -> Result<AppConfig, LoadError> {
        let config = self.load_unchecked()?;
        AppConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Load without semantic validation (used by the `validate` command to
    /// report decode and validation failures separately)
    pub fn load_unchecked(&self) -> Result<AppConfig, LoadError> {
        let mut builder = Config::builder();

        for (name, required) in FILE_LAYERS {
            let path = self.dir.join(name);
            let base_name = path
                .to_str()
                .ok_or_else(|| LoadError::InvalidPath(path.clone()))?;

            builder = builder.add_source(
                File::with_name(base_name)
                    .format(FileFormat::Yaml)
                    .required(required),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix(&self.env_prefix)
                .separator("_")
                .source(self.env_source.clone()),
        );

        let settings = builder.build().map_err(|source| LoadError::Build {
            dir: self.dir.clone(),
            source,
        })?;

        settings
            .try_deserialize::<AppConfig>()
            .map_err(|source| LoadError::Deserialize {
                dir: self.dir.clone(),
                source,
            })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_DIR)
    }
}

/// Load configuration from `dir` using the process environment
pub fn load_config(dir: impl Into<PathBuf>) -> Result<AppConfig, LoadError> {
    ConfigLoader::new(dir).load()
}
