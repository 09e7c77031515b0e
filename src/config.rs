use crate::mining::MiningMode;
use crate::valuation::Rates;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "capminer.toml")]
    pub config: String,

    /// Wallet directory override
    #[arg(long)]
    pub wallet_dir: Option<PathBuf>,

    /// Log level override (trace/debug/info/warn/error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Subcommand; the interactive menu runs when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a mining session for a rig
    Mine {
        /// Wallet ID
        wallet: String,

        /// Mining mode
        #[arg(value_enum, default_value_t = MiningMode::Kinetic)]
        mode: MiningMode,
    },

    /// Create a new rig wallet
    Create {
        /// Wallet ID
        wallet: String,

        /// Rig display label (defaults to the wallet ID)
        #[arg(long)]
        rig: Option<String>,
    },

    /// Show a rig dashboard
    Dashboard {
        /// Wallet ID
        wallet: String,
    },

    /// List all wallets
    List,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub wallet: WalletConfig,

    #[serde(default)]
    pub rates: Rates,

    #[serde(default)]
    pub mining: MiningSection,

    #[serde(default)]
    pub payout: PayoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// 钱包文件目录
    pub dir: PathBuf,
    /// 钱包文件静态加密
    pub encrypt: bool,
    /// Torrent 胶囊输出目录，None 则写进钱包目录
    pub capsule_export_dir: Option<PathBuf>,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("wallets"),
            encrypt: false,
            capsule_export_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningSection {
    pub reward_interval_secs: u64,
    pub session_duration_secs: u64,

    #[serde(with = "rust_decimal::serde::float")]
    pub base_hash_power: Decimal,

    #[serde(with = "rust_decimal::serde::float")]
    pub hash_growth_rate: Decimal,

    #[serde(with = "rust_decimal::serde::float")]
    pub halving_multiplier: Decimal,

    #[serde(with = "rust_decimal::serde::float")]
    pub debt_passive_usd: Decimal,

    pub debug_sha_boost: bool,
}

impl Default for MiningSection {
    fn default() -> Self {
        Self {
            reward_interval_secs: 60,
            session_duration_secs: 36_000,
            base_hash_power: Decimal::from(10_000u32),
            hash_growth_rate: Decimal::new(1, 3), // 0.001
            halving_multiplier: Decimal::from(79_000u32),
            debt_passive_usd: Decimal::new(1, 4), // 0.0001
            debug_sha_boost: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutConfig {
    #[serde(with = "rust_decimal::serde::float")]
    pub threshold_usd: Decimal,

    #[serde(with = "rust_decimal::serde::float")]
    pub initial_world_debt_usd: Decimal,
}

impl Default for PayoutConfig {
    fn default() -> Self {
        Self {
            threshold_usd: Decimal::new(500, 2), // 5.00
            // 31,300,000,000,000.00 USD
            initial_world_debt_usd: Decimal::new(3_130_000_000_000_000, 2),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            wallet: WalletConfig::default(),
            rates: Rates::default(),
            mining: MiningSection::default(),
            payout: PayoutConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let config_content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&config_content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        config.validate()?;

        Ok(config)
    }

    /// 配置文件缺失时退回默认配置
    pub fn load_or_default(path: &str) -> Result<Self> {
        if std::path::Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let config_content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, config_content)
            .with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        // 验证日志配置
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.to_lowercase().as_str()) {
            anyhow::bail!(
                "Log level '{}' is invalid (expected one of {:?})",
                self.general.log_level,
                valid_levels
            );
        }

        // 验证钱包目录
        if self.wallet.dir.as_os_str().is_empty() {
            anyhow::bail!("Wallet directory must not be empty");
        }

        // 验证汇率：MB 汇率参与除法，必须为正
        if self.rates.mb_usd <= Decimal::ZERO {
            anyhow::bail!("MB USD rate must be greater than 0");
        }
        for (name, rate) in [
            ("cache_usd", self.rates.cache_usd),
            ("kwh_usd", self.rates.kwh_usd),
            ("bandwidth_usd", self.rates.bandwidth_usd),
            ("torrent_usd", self.rates.torrent_usd),
        ] {
            if rate < Decimal::ZERO {
                anyhow::bail!("Rate '{}' must not be negative", name);
            }
        }

        // 验证挖矿配置
        if self.mining.reward_interval_secs == 0 {
            anyhow::bail!("Mining reward interval must be greater than 0");
        }
        if self.mining.session_duration_secs == 0 {
            anyhow::bail!("Mining session duration must be greater than 0");
        }
        if self.mining.base_hash_power <= Decimal::ZERO {
            anyhow::bail!("Base hash power must be greater than 0");
        }
        if self.mining.hash_growth_rate < Decimal::ZERO {
            anyhow::bail!("Hash growth rate must not be negative");
        }
        if self.mining.halving_multiplier <= Decimal::ZERO {
            anyhow::bail!("Halving multiplier must be greater than 0");
        }
        if self.mining.debt_passive_usd < Decimal::ZERO {
            anyhow::bail!("Passive debt income must not be negative");
        }

        // 验证提现配置
        if self.payout.threshold_usd <= Decimal::ZERO {
            anyhow::bail!("Payout threshold must be greater than 0");
        }
        if self.payout.initial_world_debt_usd <= Decimal::ZERO {
            anyhow::bail!("Initial world debt must be greater than 0");
        }

        Ok(())
    }

    /// 检查配置是否有效
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

#[cfg(test)]
#[path = "config/tests.rs"]
mod tests;
