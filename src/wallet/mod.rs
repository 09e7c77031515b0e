//! 钱包数据模型
//!
//! 每个矿机（rig）对应一个 JSON 钱包文件，余额在内存中以高精度
//! Decimal 表示，落盘时转为浮点数。

pub mod crypto;
pub mod ledger;
pub mod store;

use crate::error::LedgerError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use ledger::{Ledger, WithdrawalRequest};
pub use store::WalletStore;

/// 捐赠收款钱包（系统保留 ID）
pub const DONATION_WALLET_ID: &str = "WM-CPH0O7J3";
/// 世界债务钱包（系统保留 ID）
pub const WORLD_DEBT_WALLET_ID: &str = "WD-P4Y29G7B";
/// 世界债务钱包固定的节点 ID
pub const WORLD_DEBT_NODE_ID: Uuid = uuid::uuid!("9efae649-eb1f-4ef0-ac97-ed4df6d2942f");

/// 判断是否为系统保留钱包 ID
pub fn is_reserved_wallet_id(wallet_id: &str) -> bool {
    wallet_id == DONATION_WALLET_ID || wallet_id == WORLD_DEBT_WALLET_ID
}

/// 资源类型
///
/// 旧版脚本的资源集合互不一致，这里统一为固定的六种。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    CapsuleMb,
    CacheMb,
    RealKwh,
    BandwidthMbps,
    TorrentMb,
    WattsToken,
}

impl Resource {
    /// 全部资源
    pub const ALL: [Resource; 6] = [
        Resource::CapsuleMb,
        Resource::CacheMb,
        Resource::RealKwh,
        Resource::BandwidthMbps,
        Resource::TorrentMb,
        Resource::WattsToken,
    ];

    /// 参与 USD 估值的资源（Watts Token 本身即 USD 计价，不参与折算）
    pub const USD_BACKED: [Resource; 5] = [
        Resource::CapsuleMb,
        Resource::CacheMb,
        Resource::RealKwh,
        Resource::BandwidthMbps,
        Resource::TorrentMb,
    ];

    /// 展示名称
    pub fn label(&self) -> &'static str {
        match self {
            Resource::CapsuleMb => "Capsule MB",
            Resource::CacheMb => "Cache MB",
            Resource::RealKwh => "Real kWh",
            Resource::BandwidthMbps => "Bandwidth MB/s",
            Resource::TorrentMb => "Torrent MB",
            Resource::WattsToken => "Watts Token",
        }
    }

    /// 钱包字段名
    pub fn key(&self) -> &'static str {
        match self {
            Resource::CapsuleMb => "capsule_value_mb",
            Resource::CacheMb => "cache_value_mb",
            Resource::RealKwh => "real_kwh",
            Resource::BandwidthMbps => "bandwidth_mbps",
            Resource::TorrentMb => "torrent_value_mb",
            Resource::WattsToken => "watts_token",
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

fn default_node_id() -> Uuid {
    Uuid::nil()
}

/// 钱包记录
///
/// 余额字段落盘为 JSON 浮点数，读入时还原为 Decimal；缺失字段
/// 以默认值回填，保证旧文件可以继续加载。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub wallet_id: String,

    /// 展示用矿机标签，缺失时回填为钱包 ID
    #[serde(default)]
    pub rig_id: String,

    /// 节点 ID，仅用于展示与日志；nil 表示待分配
    #[serde(default = "default_node_id")]
    pub node_id: Uuid,

    #[serde(with = "rust_decimal::serde::float", default)]
    pub capsule_value_mb: Decimal,

    #[serde(with = "rust_decimal::serde::float", default)]
    pub cache_value_mb: Decimal,

    #[serde(with = "rust_decimal::serde::float", default)]
    pub real_kwh: Decimal,

    #[serde(
        rename = "bandwidth_MBps",
        with = "rust_decimal::serde::float",
        default
    )]
    pub bandwidth_mbps: Decimal,

    #[serde(with = "rust_decimal::serde::float", default)]
    pub torrent_value_mb: Decimal,

    #[serde(with = "rust_decimal::serde::float", default)]
    pub watts_token: Decimal,

    /// 永久算力，奖励规模的缩放基数
    #[serde(with = "rust_decimal::serde::float", default)]
    pub rig_hash_power: Decimal,

    #[serde(with = "rust_decimal::serde::float", default)]
    pub world_debt_paid_usd: Decimal,

    /// BTC 提现地址，可为空
    #[serde(default)]
    pub btc_address: String,

    /// SHA 加成标记，瞬态字段，不落盘
    #[serde(skip)]
    pub sha_boost_active: bool,
}

impl Wallet {
    /// 创建零余额钱包
    pub fn new(wallet_id: &str, rig_id: &str, base_hash_power: Decimal) -> Self {
        Self {
            wallet_id: wallet_id.to_string(),
            rig_id: rig_id.to_string(),
            node_id: Uuid::new_v4(),
            capsule_value_mb: Decimal::ZERO,
            cache_value_mb: Decimal::ZERO,
            real_kwh: Decimal::ZERO,
            bandwidth_mbps: Decimal::ZERO,
            torrent_value_mb: Decimal::ZERO,
            watts_token: Decimal::ZERO,
            rig_hash_power: base_hash_power,
            world_debt_paid_usd: Decimal::ZERO,
            btc_address: String::new(),
            sha_boost_active: false,
        }
    }

    pub fn is_system(&self) -> bool {
        is_reserved_wallet_id(&self.wallet_id)
    }

    pub fn balance(&self, resource: Resource) -> Decimal {
        match resource {
            Resource::CapsuleMb => self.capsule_value_mb,
            Resource::CacheMb => self.cache_value_mb,
            Resource::RealKwh => self.real_kwh,
            Resource::BandwidthMbps => self.bandwidth_mbps,
            Resource::TorrentMb => self.torrent_value_mb,
            Resource::WattsToken => self.watts_token,
        }
    }

    pub fn balance_mut(&mut self, resource: Resource) -> &mut Decimal {
        match resource {
            Resource::CapsuleMb => &mut self.capsule_value_mb,
            Resource::CacheMb => &mut self.cache_value_mb,
            Resource::RealKwh => &mut self.real_kwh,
            Resource::BandwidthMbps => &mut self.bandwidth_mbps,
            Resource::TorrentMb => &mut self.torrent_value_mb,
            Resource::WattsToken => &mut self.watts_token,
        }
    }

    /// 入账，长时间挖矿可能逼近 Decimal 上限，饱和处理
    pub fn credit(&mut self, resource: Resource, amount: Decimal) {
        let balance = self.balance_mut(resource);
        *balance = balance.saturating_add(amount);
    }

    /// 出账，余额不足返回错误
    pub fn debit(&mut self, resource: Resource, amount: Decimal) -> Result<(), LedgerError> {
        let balance = self.balance_mut(resource);
        if *balance < amount {
            return Err(LedgerError::InsufficientBalance {
                resource: resource.label().to_string(),
                available: balance.to_string(),
                requested: amount.to_string(),
            });
        }
        *balance -= amount;
        Ok(())
    }

    /// 有效算力 = 永久算力 × (1 + Cache MB / 1000)
    pub fn effective_hash_power(&self) -> Decimal {
        let bonus = self.cache_value_mb / Decimal::from(1000u32);
        let effective = self
            .rig_hash_power
            .saturating_mul(Decimal::ONE.saturating_add(bonus));
        effective.round_dp(6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_wallet() -> Wallet {
        Wallet::new("test-rig-01", "test rig", Decimal::from(10_000u32))
    }

    #[test]
    fn test_new_wallet_is_zeroed() {
        let wallet = test_wallet();
        for resource in Resource::ALL {
            assert_eq!(wallet.balance(resource), Decimal::ZERO);
        }
        assert_eq!(wallet.rig_hash_power, Decimal::from(10_000u32));
        assert!(!wallet.node_id.is_nil());
        assert!(!wallet.sha_boost_active);
    }

    #[test]
    fn test_credit_and_debit() {
        let mut wallet = test_wallet();
        wallet.credit(Resource::CapsuleMb, Decimal::from(100u32));
        assert_eq!(wallet.capsule_value_mb, Decimal::from(100u32));

        wallet.debit(Resource::CapsuleMb, Decimal::from(40u32)).unwrap();
        assert_eq!(wallet.capsule_value_mb, Decimal::from(60u32));

        // 透支被拒绝，余额不变
        let err = wallet.debit(Resource::CapsuleMb, Decimal::from(61u32));
        assert!(err.is_err());
        assert_eq!(wallet.capsule_value_mb, Decimal::from(60u32));
    }

    #[test]
    fn test_effective_hash_power_cache_bonus() {
        let mut wallet = test_wallet();
        assert_eq!(wallet.effective_hash_power(), Decimal::from(10_000u32));

        // 1000 MB 缓存翻倍有效算力
        wallet.cache_value_mb = Decimal::from(1000u32);
        assert_eq!(wallet.effective_hash_power(), Decimal::from(20_000u32));
    }

    #[test]
    fn test_reserved_wallet_ids() {
        assert!(is_reserved_wallet_id(DONATION_WALLET_ID));
        assert!(is_reserved_wallet_id(WORLD_DEBT_WALLET_ID));
        assert!(!is_reserved_wallet_id("alice"));
    }
}
