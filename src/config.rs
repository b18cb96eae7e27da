use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub aws: AwsConfig,
    pub estimate: EstimateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    /// Region the estimate is priced for.
    pub region: String,
    /// Region the Pricing API endpoint lives in. The Pricing API is only
    /// served from a couple of regions regardless of what is being priced.
    pub pricing_endpoint_region: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateConfig {
    /// Worker pool size for per-host processing.
    pub workers: usize,
    /// Retry attempts for transient pricing/catalog API failures.
    pub retry_attempts: u32,
    /// Per-call deadline for remote lookups, in seconds.
    pub request_timeout_secs: u64,
    /// Use the built-in instance reference table instead of fetching the
    /// live catalog from EC2.
    pub builtin_catalog: bool,
    /// Instance types below this share of total cost are grouped into
    /// "Other" in the PDF pie chart.
    pub pie_threshold_pct: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aws: AwsConfig {
                region: "us-east-1".to_string(),
                pricing_endpoint_region: "us-east-1".to_string(),
            },
            estimate: EstimateConfig {
                workers: 5,
                retry_attempts: 5,
                request_timeout_secs: 30,
                builtin_catalog: false,
                pie_threshold_pct: 5.0,
            },
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p.to_path_buf()
        } else {
            // Try .migratectl.toml in current dir, then ~/.config/migratectl/config.toml
            let local = PathBuf::from(".migratectl.toml");
            if local.exists() {
                local
            } else {
                dirs::config_dir()
                    .map(|d| d.join("migratectl").join("config.toml"))
                    .unwrap_or_else(|| PathBuf::from(".migratectl.toml"))
            }
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config: {}", config_path.display()))?;
            let config: Config = toml::from_str(&content).with_context(|| {
                format!(
                    "Failed to parse config: {}\n  Tip: Run 'migratectl init' to create a fresh config file",
                    config_path.display()
                )
            })?;
            config.validate()?;
            Ok(config)
        } else {
            if path.is_some() {
                eprintln!("WARNING: Config file not found: {}", config_path.display());
                eprintln!("   Using default configuration. Run 'migratectl init' to create a config file.");
            }
            Ok(Config::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.estimate.workers == 0 {
            anyhow::bail!("estimate.workers must be at least 1");
        }
        if self.estimate.request_timeout_secs == 0 {
            anyhow::bail!("estimate.request_timeout_secs must be at least 1");
        }
        Ok(())
    }
}

pub fn init_config(output: &Path) -> Result<()> {
    let config = Config::default();
    config.save(output)?;
    println!("Created config file: {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.aws.region, "us-east-1");
        assert_eq!(config.estimate.workers, 5);
        assert_eq!(config.estimate.retry_attempts, 5);
        assert!(!config.estimate.builtin_catalog);
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.toml");

        let mut config = Config::default();
        config.aws.region = "eu-west-1".to_string();
        config.estimate.workers = 12;
        assert!(config.save(&config_path).is_ok());
        assert!(config_path.exists());

        let loaded = Config::load(Some(&config_path)).unwrap();
        assert_eq!(loaded.aws.region, "eu-west-1");
        assert_eq!(loaded.estimate.workers, 12);
    }

    #[test]
    fn test_config_load_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let fake_path = temp_dir.path().join("nonexistent.toml");

        // Should return default config
        let config = Config::load(Some(&fake_path)).unwrap();
        assert_eq!(config.estimate.workers, 5);
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");
        std::fs::write(&config_path, "invalid toml content {").unwrap();

        let result = Config::load(Some(&config_path));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_rejects_zero_workers() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("zero.toml");
        let mut config = Config::default();
        config.estimate.workers = 0;
        config.save(&config_path).unwrap();

        assert!(Config::load(Some(&config_path)).is_err());
    }

    #[test]
    fn test_init_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("init_test.toml");

        assert!(init_config(&config_path).is_ok());
        assert!(config_path.exists());

        let config = Config::load(Some(&config_path)).unwrap();
        assert_eq!(config.estimate.workers, 5);
    }
}
