//! 挖矿模拟
//!
//! 定时抽取胶囊类型并按算力缩放生成奖励。没有真实工作量证明，
//! SHA-256 仅用于展示性的胶囊哈希。

pub mod manager;
pub mod reward;

use crate::config::Config;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

pub use manager::MiningManager;
pub use reward::{RewardParams, RewardTick, CAPSULE_TYPES};

/// 挖矿模式
///
/// 模式名称是展示性的；cache 模式额外把奖励记入 Cache MB，
/// sha 模式允许触发永久算力加成。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MiningMode {
    Kinetic,
    Wifi,
    Sha,
    Cache,
}

impl std::fmt::Display for MiningMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MiningMode::Kinetic => "kinetic",
            MiningMode::Wifi => "wifi",
            MiningMode::Sha => "sha",
            MiningMode::Cache => "cache",
        };
        f.write_str(name)
    }
}

/// 挖矿状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MiningState {
    /// 未启动
    Stopped,
    /// 正在启动
    Starting,
    /// 运行中
    Running,
    /// 正在停止
    Stopping,
    /// 错误状态
    Error(String),
}

/// 会话统计
#[derive(Debug, Clone, Default)]
pub struct MiningStats {
    pub start_time: Option<SystemTime>,
    pub ticks: u64,
    pub sha_boosts: u64,
    pub torrent_payloads: u64,
    pub total_capsule_mb: Decimal,
    pub total_kwh: Decimal,
    pub total_bandwidth: Decimal,
    pub total_hash_gain: Decimal,
}

impl MiningStats {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn start(&mut self) {
        self.start_time = Some(SystemTime::now());
    }

    pub fn uptime(&self) -> Duration {
        self.start_time
            .and_then(|t| SystemTime::now().duration_since(t).ok())
            .unwrap_or(Duration::from_secs(0))
    }

    pub fn record_tick(&mut self, tick: &RewardTick) {
        self.ticks += 1;
        self.total_capsule_mb = self.total_capsule_mb.saturating_add(tick.reward_mb);
        self.total_kwh = self.total_kwh.saturating_add(tick.reward_kwh);
        self.total_bandwidth = self.total_bandwidth.saturating_add(tick.reward_bandwidth);
        self.total_hash_gain = self.total_hash_gain.saturating_add(tick.hash_gain);
        if tick.sha_boost.is_some() {
            self.sha_boosts += 1;
        }
        if tick.torrent_mb.is_some() {
            self.torrent_payloads += 1;
        }
    }
}

/// 挖矿运行配置
#[derive(Debug, Clone)]
pub struct MiningConfig {
    /// 奖励间隔
    pub reward_interval: Duration,
    /// 会话最长时长
    pub session_duration: Duration,
    /// 缩放基准算力
    pub base_hash_power: Decimal,
    /// 每次奖励的永久算力增长率
    pub hash_growth_rate: Decimal,
    /// 奖励乘数
    pub halving_multiplier: Decimal,
    /// 世界债务钱包每次奖励的被动 USD 收益
    pub debt_passive_usd: Decimal,
    /// 调试：首个奖励强制 SHA 加成
    pub debug_sha_boost: bool,
    /// Torrent 胶囊文件输出目录，None 则跟随钱包目录
    pub capsule_export_dir: Option<PathBuf>,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            reward_interval: Duration::from_secs(60),
            session_duration: Duration::from_secs(36_000),
            base_hash_power: Decimal::from(10_000u32),
            hash_growth_rate: Decimal::new(1, 3), // 0.001
            halving_multiplier: Decimal::from(79_000u32),
            debt_passive_usd: Decimal::new(1, 4), // 0.0001
            debug_sha_boost: false,
            capsule_export_dir: None,
        }
    }
}

impl From<&Config> for MiningConfig {
    fn from(config: &Config) -> Self {
        Self {
            reward_interval: Duration::from_secs(config.mining.reward_interval_secs),
            session_duration: Duration::from_secs(config.mining.session_duration_secs),
            base_hash_power: config.mining.base_hash_power,
            hash_growth_rate: config.mining.hash_growth_rate,
            halving_multiplier: config.mining.halving_multiplier,
            debt_passive_usd: config.mining.debt_passive_usd,
            debug_sha_boost: config.mining.debug_sha_boost,
            capsule_export_dir: config.wallet.capsule_export_dir.clone(),
        }
    }
}
