//! 估值计算
//!
//! 净值是余额与固定汇率的点积，不存在市场价格。

use crate::wallet::{Resource, Wallet};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 固定汇率表（每单位资源折算 USD）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rates {
    #[serde(with = "rust_decimal::serde::float")]
    pub mb_usd: Decimal,

    #[serde(with = "rust_decimal::serde::float")]
    pub cache_usd: Decimal,

    #[serde(with = "rust_decimal::serde::float")]
    pub kwh_usd: Decimal,

    #[serde(with = "rust_decimal::serde::float")]
    pub bandwidth_usd: Decimal,

    #[serde(with = "rust_decimal::serde::float")]
    pub torrent_usd: Decimal,
}

impl Default for Rates {
    fn default() -> Self {
        Self {
            mb_usd: Decimal::new(500, 2),       // 5.00
            cache_usd: Decimal::new(42, 2),     // 0.42
            kwh_usd: Decimal::new(17, 2),       // 0.17
            bandwidth_usd: Decimal::new(42, 2), // 0.42
            torrent_usd: Decimal::new(500, 2),  // Torrent MB 与 Capsule MB 同价
        }
    }
}

impl Rates {
    /// 单一资源的汇率；Watts Token 本身即 USD 计价
    pub fn rate(&self, resource: Resource) -> Decimal {
        match resource {
            Resource::CapsuleMb => self.mb_usd,
            Resource::CacheMb => self.cache_usd,
            Resource::RealKwh => self.kwh_usd,
            Resource::BandwidthMbps => self.bandwidth_usd,
            Resource::TorrentMb => self.torrent_usd,
            Resource::WattsToken => Decimal::ONE,
        }
    }

    /// 钱包的 USD 总估值（不含 Watts Token）
    pub fn total_usd(&self, wallet: &Wallet) -> Decimal {
        Resource::USD_BACKED.iter().fold(Decimal::ZERO, |acc, &r| {
            acc.saturating_add(wallet.balance(r).saturating_mul(self.rate(r)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet_with_capsule(mb: Decimal) -> Wallet {
        let mut wallet = Wallet::new("alice", "alice", Decimal::from(10_000u32));
        wallet.capsule_value_mb = mb;
        wallet
    }

    #[test]
    fn test_total_usd_is_dot_product() {
        let rates = Rates::default();
        let mut wallet = wallet_with_capsule(Decimal::from(10u32));
        wallet.cache_value_mb = Decimal::from(100u32);
        wallet.real_kwh = Decimal::from(200u32);

        // 10*5.00 + 100*0.42 + 200*0.17 = 50 + 42 + 34
        assert_eq!(rates.total_usd(&wallet), Decimal::from(126u32));
    }

    #[test]
    fn test_capsule_only_valuation() {
        let rates = Rates::default();
        let wallet = wallet_with_capsule(Decimal::from(100u32));
        assert_eq!(rates.total_usd(&wallet), Decimal::from(500u32));
    }

    #[test]
    fn test_watts_token_excluded_from_valuation() {
        let rates = Rates::default();
        let mut wallet = wallet_with_capsule(Decimal::ZERO);
        wallet.watts_token = Decimal::from(1000u32);
        assert_eq!(rates.total_usd(&wallet), Decimal::ZERO);
    }

    #[test]
    fn test_valuation_non_negative_for_non_negative_balances() {
        let rates = Rates::default();
        let mut wallet = wallet_with_capsule(Decimal::new(1, 6));
        wallet.bandwidth_mbps = Decimal::new(3, 3);
        assert!(rates.total_usd(&wallet) >= Decimal::ZERO);
    }
}
