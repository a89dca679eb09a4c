//! CLI configuration loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use coursequiz_core::EngineConfig;

/// Top-level coursequiz configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseQuizConfig {
    /// Engine defaults; quiz files and CLI flags override these.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Where completion payloads are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./coursequiz-results")
}

impl Default for CourseQuizConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            output_dir: default_output_dir(),
        }
    }
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order:
/// 1. `coursequiz.toml` in the current directory
/// 2. `~/.config/coursequiz/config.toml`
///
/// Environment variable overrides: `COURSEQUIZ_PASS_RATE`,
/// `COURSEQUIZ_AUTO_ADVANCE_MS`.
pub fn load_config_from(path: Option<&Path>) -> Result<CourseQuizConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("coursequiz.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|dir| dir.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<CourseQuizConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => CourseQuizConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;

    Ok(config)
}

fn apply_env_overrides(
    config: &mut CourseQuizConfig,
    var: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(rate) = var("COURSEQUIZ_PASS_RATE") {
        config.engine.minimum_pass_rate = rate
            .trim()
            .parse()
            .with_context(|| format!("invalid COURSEQUIZ_PASS_RATE: '{rate}'"))?;
    }
    if let Some(ms) = var("COURSEQUIZ_AUTO_ADVANCE_MS") {
        config.engine.auto_advance_ms = ms
            .trim()
            .parse()
            .with_context(|| format!("invalid COURSEQUIZ_AUTO_ADVANCE_MS: '{ms}'"))?;
    }
    Ok(())
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("coursequiz"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = CourseQuizConfig::default();
        assert_eq!(config.engine.minimum_pass_rate, 0.8);
        assert_eq!(config.engine.auto_advance_ms, 0);
        assert_eq!(config.output_dir, PathBuf::from("./coursequiz-results"));
    }

    #[test]
    fn parse_config_file() {
        let toml_str = r#"
output_dir = "results"

[engine]
minimum_pass_rate = 0.6
auto_advance_ms = 2000
"#;
        let config: CourseQuizConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.engine.minimum_pass_rate, 0.6);
        assert_eq!(config.engine.auto_advance_ms, 2000);
        assert_eq!(config.engine.tick_ms, 100);
        assert_eq!(config.output_dir, PathBuf::from("results"));
    }

    #[test]
    fn explicit_missing_path_fails() {
        let result = load_config_from(Some(Path::new("/definitely/not/here.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn env_overrides() {
        let mut config = CourseQuizConfig::default();
        apply_env_overrides(&mut config, |name| match name {
            "COURSEQUIZ_PASS_RATE" => Some("0.5".into()),
            "COURSEQUIZ_AUTO_ADVANCE_MS" => Some(" 750 ".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.engine.minimum_pass_rate, 0.5);
        assert_eq!(config.engine.auto_advance_ms, 750);

        let bad = apply_env_overrides(&mut config, |name| {
            (name == "COURSEQUIZ_PASS_RATE").then(|| "lots".to_string())
        });
        assert!(bad.is_err());
    }
}
