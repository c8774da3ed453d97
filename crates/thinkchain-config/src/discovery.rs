use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thinkchain_utils::ConfigError;
use tracing::{debug, warn};

use super::{CliArgs, Config, ConfigSource, Defaults, EngineConfig, LlmConfig, OpenRouterConfig};

/// Directory searched for during upward discovery
pub const CONFIG_DIR: &str = ".thinkchain";
pub const CONFIG_FILE: &str = "config.toml";

/// Keys reported with `default` attribution before any layer is applied
const DEFAULT_KEYS: &[&str] = &[
    "request_timeout",
    "verbose",
    "llm_provider",
    "openrouter_api_key_env",
    "openrouter_base_url",
    "openrouter_model",
    "site_url",
    "app_name",
    "max_retries",
    "retry_delay_ms",
    "min_request_interval_ms",
    "input_cost_per_1k",
    "output_cost_per_1k",
    "max_attempts",
    "pass_score",
    "improvement_threshold",
    "max_improvement_attempts",
];

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
struct TomlConfig {
    defaults: Option<Defaults>,
    llm: Option<LlmConfig>,
    engine: Option<EngineConfig>,
}

/// Move `value` into `slot` when present and record where it came from.
fn layer<T>(
    slot: &mut Option<T>,
    value: Option<T>,
    key: &str,
    source: &ConfigSource,
    attribution: &mut HashMap<String, ConfigSource>,
) {
    if value.is_some() {
        *slot = value;
        attribution.insert(key.to_string(), source.clone());
    }
}

fn parse_env<T: FromStr>(key: &str, raw: Option<String>) -> Result<Option<T>, ConfigError> {
    match raw {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: format!("'{raw}' is not a valid value"),
            }),
    }
}

impl Config {
    /// Discover and load configuration with precedence: CLI > env > file > defaults
    ///
    /// Loads `.env` from the current directory first (existing variables win),
    /// then searches upward from the current directory for the config file.
    pub fn discover(cli_args: &CliArgs) -> Result<Self> {
        let start_dir = std::env::current_dir().context("Failed to get current directory")?;
        load_dotenv(&start_dir);
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover configuration starting from a specific directory, reading the
    /// process environment.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self> {
        Self::discover_with_env(start_dir, cli_args, |key| {
            std::env::var(key).ok().filter(|v| !v.is_empty())
        })
    }

    /// Path-and-environment-driven discovery.
    ///
    /// `env` is consulted instead of the process environment so tests can run
    /// without touching process-global state.
    pub fn discover_with_env<F>(start_dir: &Path, cli_args: &CliArgs, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut source_attribution = HashMap::new();
        for key in DEFAULT_KEYS {
            source_attribution.insert((*key).to_string(), ConfigSource::Default);
        }

        let mut defaults = Defaults::default();
        let mut llm = LlmConfig {
            provider: Some("openrouter".to_string()),
            openrouter: Some(OpenRouterConfig::default()),
        };
        let mut engine = EngineConfig::default();

        let config_path = match &cli_args.config_path {
            Some(explicit) => {
                if !explicit.exists() {
                    return Err(ConfigError::NotFound {
                        path: explicit.display().to_string(),
                    }
                    .into());
                }
                Some(explicit.clone())
            }
            None => match env("THINKCHAIN_HOME") {
                Some(home) => {
                    let candidate = PathBuf::from(home).join(CONFIG_FILE);
                    candidate.exists().then_some(candidate)
                }
                None => Self::discover_config_file_from(start_dir)?,
            },
        };

        if let Some(path) = &config_path {
            debug!(path = %path.display(), "Loading configuration file");
            let file_config = Self::load_config_file(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?;
            let src = ConfigSource::Config;
            let attr = &mut source_attribution;

            if let Some(fd) = file_config.defaults {
                layer(&mut defaults.model, fd.model, "model", &src, attr);
                layer(&mut defaults.max_tokens, fd.max_tokens, "max_tokens", &src, attr);
                layer(&mut defaults.temperature, fd.temperature, "temperature", &src, attr);
                layer(
                    &mut defaults.request_timeout,
                    fd.request_timeout,
                    "request_timeout",
                    &src,
                    attr,
                );
                layer(&mut defaults.verbose, fd.verbose, "verbose", &src, attr);
            }

            if let Some(fl) = file_config.llm {
                layer(&mut llm.provider, fl.provider, "llm_provider", &src, attr);
                if let (Some(fo), Some(or)) = (fl.openrouter, llm.openrouter.as_mut()) {
                    layer(&mut or.api_key_env, fo.api_key_env, "openrouter_api_key_env", &src, attr);
                    layer(&mut or.base_url, fo.base_url, "openrouter_base_url", &src, attr);
                    layer(&mut or.model, fo.model, "openrouter_model", &src, attr);
                    layer(&mut or.site_url, fo.site_url, "site_url", &src, attr);
                    layer(&mut or.app_name, fo.app_name, "app_name", &src, attr);
                    layer(&mut or.max_retries, fo.max_retries, "max_retries", &src, attr);
                    layer(&mut or.retry_delay_ms, fo.retry_delay_ms, "retry_delay_ms", &src, attr);
                    layer(
                        &mut or.min_request_interval_ms,
                        fo.min_request_interval_ms,
                        "min_request_interval_ms",
                        &src,
                        attr,
                    );
                    layer(&mut or.budget, fo.budget, "llm_budget", &src, attr);
                    layer(
                        &mut or.input_cost_per_1k,
                        fo.input_cost_per_1k,
                        "input_cost_per_1k",
                        &src,
                        attr,
                    );
                    layer(
                        &mut or.output_cost_per_1k,
                        fo.output_cost_per_1k,
                        "output_cost_per_1k",
                        &src,
                        attr,
                    );
                }
            }

            if let Some(fe) = file_config.engine {
                layer(&mut engine.max_attempts, fe.max_attempts, "max_attempts", &src, attr);
                layer(&mut engine.pass_score, fe.pass_score, "pass_score", &src, attr);
                layer(
                    &mut engine.improvement_threshold,
                    fe.improvement_threshold,
                    "improvement_threshold",
                    &src,
                    attr,
                );
                layer(
                    &mut engine.max_improvement_attempts,
                    fe.max_improvement_attempts,
                    "max_improvement_attempts",
                    &src,
                    attr,
                );
            }
        }

        // Environment (overrides config file)
        {
            let src = ConfigSource::Env;
            let attr = &mut source_attribution;
            layer(&mut defaults.model, env("THINKCHAIN_MODEL"), "model", &src, attr);
            layer(
                &mut defaults.request_timeout,
                parse_env("THINKCHAIN_REQUEST_TIMEOUT", env("THINKCHAIN_REQUEST_TIMEOUT"))?,
                "request_timeout",
                &src,
                attr,
            );
            layer(
                &mut llm.provider,
                env("THINKCHAIN_LLM_PROVIDER"),
                "llm_provider",
                &src,
                attr,
            );
            layer(
                &mut engine.max_attempts,
                parse_env("THINKCHAIN_MAX_ATTEMPTS", env("THINKCHAIN_MAX_ATTEMPTS"))?,
                "max_attempts",
                &src,
                attr,
            );
            if let Some(or) = llm.openrouter.as_mut() {
                layer(&mut or.site_url, env("SITE_URL"), "site_url", &src, attr);
                layer(&mut or.app_name, env("APP_NAME"), "app_name", &src, attr);
                layer(
                    &mut or.budget,
                    parse_env("THINKCHAIN_LLM_BUDGET", env("THINKCHAIN_LLM_BUDGET"))?,
                    "llm_budget",
                    &src,
                    attr,
                );
            }
        }

        // CLI overrides (highest priority)
        {
            let src = ConfigSource::Cli;
            let attr = &mut source_attribution;
            layer(&mut defaults.model, cli_args.model.clone(), "model", &src, attr);
            layer(
                &mut defaults.request_timeout,
                cli_args.request_timeout,
                "request_timeout",
                &src,
                attr,
            );
            layer(&mut defaults.verbose, cli_args.verbose, "verbose", &src, attr);
            layer(
                &mut engine.max_attempts,
                cli_args.max_attempts,
                "max_attempts",
                &src,
                attr,
            );
        }

        let config = Self {
            defaults,
            llm,
            engine,
            source_attribution,
        };

        config.validate()?;

        Ok(config)
    }

    /// Walk up from `start_dir` looking for `.thinkchain/config.toml`,
    /// stopping at repository root markers or the filesystem root.
    pub fn discover_config_file_from(start_dir: &Path) -> Result<Option<PathBuf>> {
        let mut current_dir = start_dir.to_path_buf();

        loop {
            let config_path = current_dir.join(CONFIG_DIR).join(CONFIG_FILE);
            if config_path.exists() {
                return Ok(Some(config_path));
            }

            if current_dir.join(".git").exists()
                || current_dir.join(".hg").exists()
                || current_dir.join(".svn").exists()
            {
                break;
            }

            match current_dir.parent() {
                Some(parent) => current_dir = parent.to_path_buf(),
                None => break,
            }
        }

        Ok(None)
    }

    fn load_config_file(path: &Path) -> Result<TomlConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: TomlConfig = toml::from_str(&content).map_err(|e| {
            ConfigError::InvalidFile(format!("{}: {}", path.display(), e.message()))
        })?;
        Ok(config)
    }
}

/// Load `KEY=value` pairs from `<dir>/.env` without overriding variables
/// already present in the environment.
pub fn load_dotenv(dir: &Path) {
    let path = dir.join(".env");
    match dotenvy::from_path(&path) {
        Ok(()) => debug!(path = %path.display(), "Loaded environment file"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Ignoring unreadable environment file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let cfg_dir = dir.join(CONFIG_DIR);
        fs::create_dir_all(&cfg_dir).unwrap();
        let path = cfg_dir.join(CONFIG_FILE);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_defaults_without_file() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();

        let config = Config::discover_with_env(temp.path(), &CliArgs::default(), no_env).unwrap();

        assert_eq!(config.engine.max_attempts, Some(3));
        assert_eq!(config.engine.pass_score, Some(80.0));
        assert_eq!(config.provider(), "openrouter");
        assert_eq!(config.openrouter().site_url.as_deref(), Some("http://localhost:3000"));
        assert_eq!(
            config.source_attribution.get("max_attempts"),
            Some(&ConfigSource::Default)
        );
    }

    #[test]
    fn test_upward_discovery_stops_at_repo_root() {
        let temp = TempDir::new().unwrap();
        let repo = temp.path().join("repo");
        let nested = repo.join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::create_dir(repo.join(".git")).unwrap();
        // Above the repository root; must not be picked up.
        write_config(temp.path(), "[engine]\nmax_attempts = 9\n");

        assert_eq!(Config::discover_config_file_from(&nested).unwrap(), None);

        let expected = write_config(&repo, "[engine]\nmax_attempts = 5\n");
        assert_eq!(
            Config::discover_config_file_from(&nested).unwrap(),
            Some(expected)
        );
    }

    #[test]
    fn test_precedence_cli_over_env_over_file() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(
            temp.path(),
            r#"
[defaults]
model = "file-model"

[llm.openrouter]
app_name = "FromFile"
site_url = "https://file.example"

[engine]
max_attempts = 4
"#,
        );

        let env = |key: &str| match key {
            "THINKCHAIN_MODEL" => Some("env-model".to_string()),
            "APP_NAME" => Some("FromEnv".to_string()),
            _ => None,
        };
        let cli = CliArgs {
            model: Some("cli-model".to_string()),
            ..CliArgs::default()
        };

        let config = Config::discover_with_env(temp.path(), &cli, env).unwrap();

        assert_eq!(config.defaults.model.as_deref(), Some("cli-model"));
        assert_eq!(config.source_attribution["model"], ConfigSource::Cli);
        let or = config.openrouter();
        assert_eq!(or.app_name.as_deref(), Some("FromEnv"));
        assert_eq!(config.source_attribution["app_name"], ConfigSource::Env);
        assert_eq!(or.site_url.as_deref(), Some("https://file.example"));
        assert_eq!(config.source_attribution["site_url"], ConfigSource::Config);
        assert_eq!(config.engine.max_attempts, Some(4));
    }

    #[test]
    fn test_thinkchain_home_overrides_discovery() {
        let temp = TempDir::new().unwrap();
        let home = temp.path().join("home");
        fs::create_dir_all(&home).unwrap();
        fs::write(home.join(CONFIG_FILE), "[engine]\npass_score = 70\n").unwrap();
        let work = temp.path().join("work");
        fs::create_dir_all(work.join(".git")).unwrap();

        let home_str = home.display().to_string();
        let env = move |key: &str| (key == "THINKCHAIN_HOME").then(|| home_str.clone());

        let config = Config::discover_with_env(&work, &CliArgs::default(), env).unwrap();
        assert_eq!(config.engine.pass_score, Some(70.0));
    }

    #[test]
    fn test_explicit_missing_config_is_error() {
        let temp = TempDir::new().unwrap();
        let cli = CliArgs {
            config_path: Some(temp.path().join("nope.toml")),
            ..CliArgs::default()
        };
        let err = Config::discover_with_env(temp.path(), &cli, no_env).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        write_config(temp.path(), "[engine\nmax_attempts = ");
        let err = Config::discover_with_env(temp.path(), &CliArgs::default(), no_env).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid configuration file"));
    }

    #[test]
    fn test_bad_env_number_is_invalid_value() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        let env = |key: &str| (key == "THINKCHAIN_MAX_ATTEMPTS").then(|| "three".to_string());
        let err = Config::discover_with_env(temp.path(), &CliArgs::default(), env).unwrap_err();
        assert!(err.to_string().contains("THINKCHAIN_MAX_ATTEMPTS"));
    }
}
