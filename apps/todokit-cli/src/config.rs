use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use todokit_api::ApiClientConfig;

/// Prefix of environment overrides; `__` separates nesting levels,
/// e.g. `TODOKIT__API__BASE_URL`.
pub const ENV_PREFIX: &str = "TODOKIT__";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    #[serde(default)]
    pub api: ApiClientConfig,

    /// Where the signed-in session is kept; defaults to the user config dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_file: Option<PathBuf>,
}

/// Values given on the command line, applied last
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub base_url: Option<String>,
    pub session_file: Option<PathBuf>,
    pub insecure: bool,
}

impl CliConfig {
    /// Layers defaults, the YAML file (if any) and `TODOKIT__*` variables.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = file {
            if !path.is_file() {
                anyhow::bail!("config file does not exist: {}", path.display());
            }
            figment = figment.merge(Yaml::file(path));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        figment
            .extract()
            .context("failed to load todokit configuration")
    }

    pub fn apply_cli_overrides(&mut self, overrides: &CliOverrides) {
        if let Some(url) = &overrides.base_url {
            self.api.base_url.clone_from(url);
        }
        if let Some(path) = &overrides.session_file {
            self.session_file = Some(path.clone());
        }
        if overrides.insecure {
            self.api.allow_insecure_http = true;
        }
    }

    pub fn session_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.session_file {
            return Ok(path.clone());
        }
        let base = dirs::config_dir().context("no user config directory; pass --session-file")?;
        Ok(base.join("todokit").join("session.json"))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_without_file_or_env() {
        Jail::expect_with(|_jail| {
            let cfg = CliConfig::load(None).map_err(|e| e.to_string())?;
            assert_eq!(cfg.api.base_url, "http://localhost:8000/api/v1");
            assert!(cfg.session_file.is_none());
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "todokit.yaml",
                r"
api:
  base_url: https://todo.example.com/api/v1
  request_timeout_secs: 10
session_file: /tmp/todokit-session.json
",
            )?;
            jail.set_env("TODOKIT__API__REQUEST_TIMEOUT_SECS", "5");

            let cfg = CliConfig::load(Some(Path::new("todokit.yaml"))).map_err(|e| e.to_string())?;
            assert_eq!(cfg.api.base_url, "https://todo.example.com/api/v1");
            assert_eq!(cfg.api.request_timeout_secs, 5);
            assert_eq!(
                cfg.session_file.as_deref(),
                Some(Path::new("/tmp/todokit-session.json"))
            );
            Ok(())
        });
    }

    #[test]
    fn unknown_key_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("todokit.yaml", "api:\n  base_uri: nope\n")?;
            let result = CliConfig::load(Some(Path::new("todokit.yaml")));
            assert!(result.is_err());
            Ok(())
        });
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = CliConfig::load(Some(Path::new("/definitely/not/here.yaml"))).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn cli_overrides_win() {
        let mut cfg = CliConfig::default();
        cfg.apply_cli_overrides(&CliOverrides {
            base_url: Some("http://10.0.0.5:8000/api/v1".to_owned()),
            session_file: Some(PathBuf::from("s.json")),
            insecure: true,
        });
        assert_eq!(cfg.api.base_url, "http://10.0.0.5:8000/api/v1");
        assert!(cfg.api.allow_insecure_http);
        assert_eq!(cfg.session_path().unwrap(), PathBuf::from("s.json"));
    }
}
