use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing;

#[derive(Debug, Clone, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub company: CompanyConfig,
    #[serde(default)]
    pub carry_forward: CarryForwardConfig,
    #[serde(default)]
    pub logbook: LogbookConfig,
}

impl CoreConfig {
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join("config.toml");
        let mut cfg = if path.exists() {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            toml::from_str::<CoreConfig>(&text)
                .with_context(|| format!("parsing config file {}", path.display()))?
        } else {
            tracing::info!(
                "No config file found at {}. Using CoreConfig::default().",
                path.display()
            );
            CoreConfig::default()
        };
        cfg.resolve_paths(root);
        Ok(cfg)
    }

    /// Defaults rooted at `root`, ignoring any config file on disk.
    pub fn rooted_at(root: &Path) -> Self {
        let mut cfg = CoreConfig::default();
        cfg.resolve_paths(root);
        cfg
    }

    fn resolve_paths(&mut self, root: &Path) {
        self.store.path = absolutize(root, &self.store.path);
        self.logbook.path = absolutize(root, &self.logbook.path);
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            system: SystemConfig::default(),
            store: StoreConfig::default(),
            company: CompanyConfig::default(),
            carry_forward: CarryForwardConfig::default(),
            logbook: LogbookConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "SystemConfig::default_name")]
    pub name: String,
}

impl SystemConfig {
    fn default_name() -> String {
        "juego-empresas".to_string()
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            name: Self::default_name(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "StoreConfig::default_path")]
    pub path: PathBuf,
    #[serde(default = "StoreConfig::default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl StoreConfig {
    fn default_path() -> PathBuf {
        PathBuf::from("captop.db")
    }

    fn default_busy_timeout_ms() -> u64 {
        5_000
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
            busy_timeout_ms: Self::default_busy_timeout_ms(),
        }
    }
}

/// Seed values applied to every newly created company.
#[derive(Debug, Clone, Deserialize)]
pub struct CompanyConfig {
    #[serde(default = "CompanyConfig::default_starting_cash_usd")]
    pub starting_cash_usd: f64,
    #[serde(default)]
    pub starting_period: u32,
    #[serde(default = "CompanyConfig::default_exchange_rate")]
    pub exchange_rate: f64,
}

impl CompanyConfig {
    fn default_starting_cash_usd() -> f64 {
        100_000.0
    }

    fn default_exchange_rate() -> f64 {
        950.0
    }
}

impl Default for CompanyConfig {
    fn default() -> Self {
        Self {
            starting_cash_usd: Self::default_starting_cash_usd(),
            starting_period: 0,
            exchange_rate: Self::default_exchange_rate(),
        }
    }
}

/// The product line × country grid tracked by the stock carry-forward queries.
#[derive(Debug, Clone, Deserialize)]
pub struct CarryForwardConfig {
    #[serde(default = "CarryForwardConfig::default_product_lines")]
    pub product_lines: Vec<String>,
    #[serde(default = "CarryForwardConfig::default_countries")]
    pub countries: Vec<String>,
}

impl CarryForwardConfig {
    fn default_product_lines() -> Vec<String> {
        vec!["home".into(), "pro".into()]
    }

    fn default_countries() -> Vec<String> {
        ["Argentina", "Brasil", "Chile", "Colombia", "Mexico"]
            .iter()
            .map(|c| c.to_string())
            .collect()
    }
}

impl Default for CarryForwardConfig {
    fn default() -> Self {
        Self {
            product_lines: Self::default_product_lines(),
            countries: Self::default_countries(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogbookConfig {
    #[serde(default = "LogbookConfig::default_enabled")]
    pub enabled: bool,
    #[serde(default = "LogbookConfig::default_path")]
    pub path: PathBuf,
}

impl LogbookConfig {
    fn default_enabled() -> bool {
        true
    }

    fn default_path() -> PathBuf {
        PathBuf::from("logbook/operations.jsonl")
    }
}

impl Default for LogbookConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            path: Self::default_path(),
        }
    }
}

fn absolutize(root: &Path, value: &Path) -> PathBuf {
    if value.is_absolute() {
        value.to_path_buf()
    } else {
        root.join(value)
    }
}
