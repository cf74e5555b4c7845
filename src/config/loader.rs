//! Settings loading from TOML files and `KEYSPACE_*` variables
//!
//! Directory mode reads `default.toml` (required), then the environment
//! overlay and `local.toml` (both optional). Single-file mode reads exactly
//! one file. Either way `KEYSPACE_*` variables are applied last, with `__`
//! between sections: `KEYSPACE_CACHE__REDIS__URL` sets `cache.redis.url`.

use std::path::{Path, PathBuf};

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, File, FileFormat};

use crate::config::environment::Environment;
use crate::config::error::ConfigError;
use crate::config::settings::Settings;

/// Directory holding the layered files
pub const CONFIG_DIR_VAR: &str = "KEYSPACE_CONFIG_DIR";

/// Single file replacing the layered directory
pub const CONFIG_FILE_VAR: &str = "KEYSPACE_CONFIG_FILE";

const DEFAULT_CONFIG_DIR: &str = "config";
const ENV_PREFIX: &str = "KEYSPACE";

/// Where the settings files come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Layered { dir: PathBuf, environment: Environment },
    File(PathBuf),
}

impl ConfigSource {
    /// Files in increasing priority, each paired with whether it must exist.
    fn files(&self) -> Vec<(PathBuf, bool)> {
        match self {
            ConfigSource::File(path) => vec![(path.clone(), true)],
            ConfigSource::Layered { dir, environment } => vec![
                (dir.join("default.toml"), true),
                (dir.join(environment.overlay_file()), false),
                (dir.join("local.toml"), false),
            ],
        }
    }
}

/// Builds [`Settings`] from a [`ConfigSource`] plus the process environment
#[derive(Debug)]
pub struct ConfigLoader {
    source: ConfigSource,
}

impl ConfigLoader {
    pub fn new(source: ConfigSource) -> Self {
        Self { source }
    }

    /// Pick the source from `KEYSPACE_CONFIG_FILE`, `KEYSPACE_CONFIG_DIR`
    /// and `KEYSPACE_APP_ENV`.
    ///
    /// # Errors
    /// - both `KEYSPACE_CONFIG_FILE` and `KEYSPACE_CONFIG_DIR` are set
    /// - `KEYSPACE_APP_ENV` names no known environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let dir = std::env::var_os(CONFIG_DIR_VAR);
        let file = std::env::var_os(CONFIG_FILE_VAR);

        let source = match (file, dir) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::mutual_exclusivity(format!(
                    "{CONFIG_DIR_VAR} and {CONFIG_FILE_VAR} cannot both be set"
                )));
            }
            (Some(file), None) => ConfigSource::File(file.into()),
            (None, dir) => ConfigSource::Layered {
                dir: dir.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR), PathBuf::from),
                environment: Environment::from_env()?,
            },
        };

        Ok(Self::new(source))
    }

    /// Read only `path`, whatever the environment selected.
    pub fn with_config_file(self, path: impl Into<PathBuf>) -> Self {
        Self::new(ConfigSource::File(path.into()))
    }

    /// Use another overlay. Has no effect in single-file mode.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        if let ConfigSource::Layered {
            environment: current,
            ..
        } = &mut self.source
        {
            *current = environment;
        }
        self
    }

    /// Read every source, apply variables, then validate.
    pub fn load(&self) -> Result<Settings, ConfigError> {
        let mut builder = Config::builder();
        for (path, required) in self.source.files() {
            builder = add_file(builder, &path, required)?;
        }

        let settings: Settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        settings.validate()?;
        tracing::debug!(source = ?self.source, "Loaded settings");
        Ok(settings)
    }
}

fn add_file(
    builder: ConfigBuilder<DefaultState>,
    path: &Path,
    required: bool,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    if required && !path.is_file() {
        return Err(ConfigError::file_not_found(path.display().to_string()));
    }
    Ok(builder.add_source(File::from(path).format(FileFormat::Toml).required(required)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::environment::APP_ENV_VAR;
    use std::ffi::{OsStr, OsString};
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // the process environment is shared by every test in the binary
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const TOUCHED_VARS: &[&str] = &[
        CONFIG_DIR_VAR,
        CONFIG_FILE_VAR,
        APP_ENV_VAR,
        "KEYSPACE_CACHE__PREFIX",
        "KEYSPACE_CACHE__EMBEDDED__BATCH_SIZE",
    ];

    /// Clears the variables above and puts the old values back on drop.
    struct ScopedEnv {
        saved: Vec<(&'static str, Option<OsString>)>,
    }

    impl ScopedEnv {
        fn clean() -> Self {
            let saved = TOUCHED_VARS
                .iter()
                .map(|key| (*key, std::env::var_os(key)))
                .collect();
            for key in TOUCHED_VARS {
                unsafe { std::env::remove_var(key) };
            }
            Self { saved }
        }

        fn set(&self, key: &str, value: impl AsRef<OsStr>) {
            assert!(TOUCHED_VARS.iter().any(|v| *v == key), "{key} would leak past the test");
            unsafe { std::env::set_var(key, value) };
        }
    }

    impl Drop for ScopedEnv {
        fn drop(&mut self) {
            for (key, value) in &self.saved {
                unsafe {
                    match value {
                        Some(value) => std::env::set_var(key, value),
                        None => std::env::remove_var(key),
                    }
                }
            }
        }
    }

    const DEFAULT_TOML: &str = r#"
[cache]
backend = "embedded"
prefix = "base"

[cache.embedded]
directory = "tmp/base"
batch_size = 100
"#;

    fn config_dir(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    #[test]
    fn test_layered_file_order() {
        let source = ConfigSource::Layered {
            dir: PathBuf::from("conf"),
            environment: Environment::Production,
        };
        assert_eq!(
            source.files(),
            vec![
                (PathBuf::from("conf/default.toml"), true),
                (PathBuf::from("conf/production.toml"), false),
                (PathBuf::from("conf/local.toml"), false),
            ]
        );
    }

    #[test]
    fn test_environment_ignored_in_single_file_mode() {
        let loader = ConfigLoader::new(ConfigSource::File(PathBuf::from("one.toml")))
            .with_environment(Environment::Production);
        assert_eq!(loader.source, ConfigSource::File(PathBuf::from("one.toml")));
    }

    #[test]
    fn test_from_env_defaults_to_config_dir() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _env = ScopedEnv::clean();

        let loader = ConfigLoader::from_env().unwrap();
        assert_eq!(
            loader.source,
            ConfigSource::Layered {
                dir: PathBuf::from("config"),
                environment: Environment::Development,
            }
        );
    }

    #[test]
    fn test_from_env_dir_and_file_conflict() {
        let _lock = ENV_LOCK.lock().unwrap();
        let env = ScopedEnv::clean();
        env.set(CONFIG_DIR_VAR, "/etc/keyspace");
        env.set(CONFIG_FILE_VAR, "/etc/keyspace.toml");

        assert!(matches!(
            ConfigLoader::from_env(),
            Err(ConfigError::MutualExclusivityError(_))
        ));
    }

    #[test]
    fn test_from_env_rejects_unknown_environment() {
        let _lock = ENV_LOCK.lock().unwrap();
        let env = ScopedEnv::clean();
        env.set(APP_ENV_VAR, "qa");

        assert!(matches!(
            ConfigLoader::from_env(),
            Err(ConfigError::EnvVarError(_))
        ));
    }

    #[test]
    fn test_missing_default_toml() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _env = ScopedEnv::clean();
        let dir = config_dir(&[]);

        let loader = ConfigLoader::new(ConfigSource::Layered {
            dir: dir.path().to_path_buf(),
            environment: Environment::Development,
        });
        match loader.load() {
            Err(ConfigError::FileNotFound(path)) => assert!(path.ends_with("default.toml")),
            other => panic!("expected FileNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_precedence_chain() {
        let _lock = ENV_LOCK.lock().unwrap();
        let env = ScopedEnv::clean();

        let production = r#"
[cache]
backend = "redis"
prefix = "prod"

[cache.redis]
url = "redis://prod-cache:6379"
pool_size = 32
"#;
        let local = r#"
[cache.redis]
url = "redis://localhost:6380"
"#;
        let dir = config_dir(&[
            ("default.toml", DEFAULT_TOML),
            ("production.toml", production),
            ("local.toml", local),
        ]);
        env.set(CONFIG_DIR_VAR, dir.path());
        env.set(APP_ENV_VAR, "prod");
        env.set("KEYSPACE_CACHE__PREFIX", "from-env");

        let settings = ConfigLoader::from_env().unwrap().load().unwrap();

        assert_eq!(settings.cache.prefix, "from-env");
        assert_eq!(settings.cache.redis.url, "redis://localhost:6380");
        assert_eq!(settings.cache.redis.pool_size, 32);
        assert_eq!(settings.cache.backend, "redis");
        assert_eq!(settings.cache.embedded.directory, "tmp/base");
    }

    #[test]
    fn test_missing_overlay_is_fine() {
        let _lock = ENV_LOCK.lock().unwrap();
        let env = ScopedEnv::clean();
        let dir = config_dir(&[("default.toml", DEFAULT_TOML)]);
        env.set(CONFIG_DIR_VAR, dir.path());
        env.set(APP_ENV_VAR, "staging");
        env.set("KEYSPACE_CACHE__EMBEDDED__BATCH_SIZE", "250");

        let settings = ConfigLoader::from_env().unwrap().load().unwrap();
        assert_eq!(settings.cache.prefix, "base");
        assert_eq!(settings.cache.embedded.batch_size, 250);
        assert_eq!(settings.cache.redis.pool_size, 10);
    }

    #[test]
    fn test_single_file_still_takes_variables() {
        let _lock = ENV_LOCK.lock().unwrap();
        let env = ScopedEnv::clean();
        let dir = config_dir(&[("single.toml", "[cache]\nbackend = \"redis\"\n")]);
        env.set("KEYSPACE_CACHE__PREFIX", "overridden");

        let settings = ConfigLoader::from_env()
            .unwrap()
            .with_config_file(dir.path().join("single.toml"))
            .load()
            .unwrap();

        assert_eq!(settings.cache.backend, "redis");
        assert_eq!(settings.cache.prefix, "overridden");
    }

    #[test]
    fn test_invalid_backend_fails_validation() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _env = ScopedEnv::clean();
        let dir = config_dir(&[("bad.toml", "[cache]\nbackend = \"memcached\"\n")]);

        let result = ConfigLoader::new(ConfigSource::File(dir.path().join("bad.toml"))).load();
        assert!(matches!(
            result,
            Err(ConfigError::ValidationError { ref field, .. }) if field == "cache.backend"
        ));
    }
}
