//! 资源转账与捐赠账本
//!
//! 所有变更遵循「先校验后提交」：在内存副本上完成全部检查与运
//! 算，然后先落收款方、再落付款方，任何路径都不会出现只扣款不
//! 入账的钱包状态。

use crate::error::{LedgerError, RigError, StoreError};
use crate::valuation::Rates;
use crate::wallet::{
    is_reserved_wallet_id, Resource, Wallet, WalletStore, DONATION_WALLET_ID,
    WORLD_DEBT_WALLET_ID,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const WITHDRAWAL_REQUESTS_FILE: &str = "withdrawal_requests.json";

/// 账本配置
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Cache MB 捐赠的算力放大倍数
    pub cache_donation_amplifier: Decimal,
    /// Watts Token 提现门槛（USD）
    pub payout_threshold_usd: Decimal,
    /// 初始世界债务（USD）
    pub initial_world_debt_usd: Decimal,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            cache_donation_amplifier: Decimal::from(79_000u32),
            payout_threshold_usd: Decimal::new(500, 2),
            // 31,300,000,000,000.00 USD
            initial_world_debt_usd: Decimal::new(3_130_000_000_000_000, 2),
        }
    }
}

impl From<&crate::config::Config> for LedgerConfig {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            // Cache MB 捐赠与奖励共用同一个乘数
            cache_donation_amplifier: config.mining.halving_multiplier,
            payout_threshold_usd: config.payout.threshold_usd,
            initial_world_debt_usd: config.payout.initial_world_debt_usd,
        }
    }
}

/// 提现申请，追加写入钱包目录下的申请文件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub wallet_id: String,
    pub node_id: Uuid,
    pub btc_address: String,

    #[serde(with = "rust_decimal::serde::float")]
    pub amount_usd: Decimal,

    pub requested_at: DateTime<Utc>,
}

/// 账本：跨钱包的资源移动都经由这里
pub struct Ledger {
    store: Arc<WalletStore>,
    rates: Rates,
    config: LedgerConfig,
}

impl Ledger {
    pub fn new(store: Arc<WalletStore>, rates: Rates, config: LedgerConfig) -> Self {
        Self {
            store,
            rates,
            config,
        }
    }

    pub fn rates(&self) -> &Rates {
        &self.rates
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    fn ensure_positive(amount: Decimal) -> Result<(), LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount {
                amount: amount.to_string(),
            });
        }
        Ok(())
    }

    /// 系统钱包缺失时按需补建
    fn system_wallet(&self, wallet_id: &str) -> Result<Wallet, StoreError> {
        match self.store.load(wallet_id) {
            Ok(wallet) => Ok(wallet),
            Err(StoreError::WalletNotFound { .. }) => {
                self.store.init_system_wallets()?;
                self.store.load(wallet_id)
            }
            Err(e) => Err(e),
        }
    }

    /// 单一资源转账；目标钱包不存在时自动创建
    pub fn transfer(
        &self,
        from_id: &str,
        to_id: &str,
        resource: Resource,
        amount: Decimal,
    ) -> Result<(), RigError> {
        Self::ensure_positive(amount)?;
        if from_id == to_id {
            return Err(LedgerError::SelfTransfer {
                wallet_id: from_id.to_string(),
            }
            .into());
        }
        if is_reserved_wallet_id(to_id) {
            return Err(LedgerError::SystemWalletTarget {
                wallet_id: to_id.to_string(),
            }
            .into());
        }

        let mut sender = self.store.load(from_id)?;
        sender.debit(resource, amount)?;

        let mut receiver = match self.store.load(to_id) {
            Ok(wallet) => wallet,
            Err(StoreError::WalletNotFound { .. }) => self.store.create(to_id, None)?,
            Err(e) => return Err(e.into()),
        };
        receiver.credit(resource, amount);

        // 收款方先落盘
        self.store.save(&receiver)?;
        self.store.save(&sender)?;

        info!(
            "✅ Sent {} {} from {} to {}",
            amount,
            resource.label(),
            from_id,
            to_id
        );
        Ok(())
    }

    /// 按 USD 价值转账：付款方五种 USD 资产按比例缩减，收款方按
    /// 比例放大；收款方没有估值时折算成 Capsule MB 入账
    pub fn transfer_usd(
        &self,
        from_id: &str,
        to_id: &str,
        amount_usd: Decimal,
    ) -> Result<(), RigError> {
        Self::ensure_positive(amount_usd)?;
        if from_id == to_id {
            return Err(LedgerError::SelfTransfer {
                wallet_id: from_id.to_string(),
            }
            .into());
        }
        if is_reserved_wallet_id(to_id) {
            return Err(LedgerError::SystemWalletTarget {
                wallet_id: to_id.to_string(),
            }
            .into());
        }

        let mut sender = self.store.load(from_id)?;
        let total = self.rates.total_usd(&sender);
        if total.is_zero() {
            return Err(LedgerError::ZeroValuation {
                wallet_id: from_id.to_string(),
            }
            .into());
        }
        if amount_usd > total {
            return Err(LedgerError::InsufficientBalance {
                resource: "USD value".to_string(),
                available: total.to_string(),
                requested: amount_usd.to_string(),
            }
            .into());
        }

        let proportion = amount_usd
            .checked_div(total)
            .ok_or(LedgerError::Overflow {
                operation: "usd proportion".to_string(),
            })?;
        Self::scale_usd_backed(&mut sender, Decimal::ONE - proportion);

        let mut receiver = match self.store.load(to_id) {
            Ok(wallet) => wallet,
            Err(StoreError::WalletNotFound { .. }) => self.store.create(to_id, None)?,
            Err(e) => return Err(e.into()),
        };

        let receiver_total = self.rates.total_usd(&receiver);
        if receiver_total > Decimal::ZERO {
            let factor = receiver_total
                .saturating_add(amount_usd)
                .checked_div(receiver_total)
                .ok_or(LedgerError::Overflow {
                    operation: "usd scale-up factor".to_string(),
                })?;
            Self::scale_usd_backed(&mut receiver, factor);
        } else {
            let mb = amount_usd
                .checked_div(self.rates.mb_usd)
                .ok_or(LedgerError::Overflow {
                    operation: "usd to capsule conversion".to_string(),
                })?;
            receiver.credit(Resource::CapsuleMb, mb);
        }

        self.store.save(&receiver)?;
        self.store.save(&sender)?;

        info!("✅ Sent {} USD value from {} to {}", amount_usd, from_id, to_id);
        Ok(())
    }

    fn scale_usd_backed(wallet: &mut Wallet, factor: Decimal) {
        for resource in Resource::USD_BACKED {
            let balance = wallet.balance_mut(resource);
            *balance = balance.saturating_mul(factor);
        }
    }

    /// 捐赠给系统捐赠钱包并按 1:1 获得算力；Cache MB 享受放大倍数。
    /// 返回获得的算力。
    pub fn donate(
        &self,
        from_id: &str,
        resource: Resource,
        amount: Decimal,
    ) -> Result<Decimal, RigError> {
        Self::ensure_positive(amount)?;
        if is_reserved_wallet_id(from_id) {
            return Err(LedgerError::SystemWalletActor {
                wallet_id: from_id.to_string(),
            }
            .into());
        }

        let mut sender = self.store.load(from_id)?;
        sender.debit(resource, amount)?;

        let mut hash_gain = amount;
        if resource == Resource::CacheMb {
            hash_gain = hash_gain.saturating_mul(self.config.cache_donation_amplifier);
        }
        sender.rig_hash_power = sender.rig_hash_power.saturating_add(hash_gain);

        let mut sink = self.system_wallet(DONATION_WALLET_ID)?;
        sink.credit(resource, amount);

        self.store.save(&sink)?;
        self.store.save(&sender)?;

        info!(
            "🙏 {} donated {} {} → 🚀 +{} hash power",
            from_id,
            amount,
            resource.label(),
            hash_gain
        );
        Ok(hash_gain)
    }

    /// 向世界债务钱包捐出 USD 价值；付款方按比例缩减，债务钱包
    /// 以 Capsule/Torrent MB 入账
    pub fn contribute_world_debt(&self, from_id: &str, amount_usd: Decimal) -> Result<(), RigError> {
        Self::ensure_positive(amount_usd)?;
        if is_reserved_wallet_id(from_id) {
            return Err(LedgerError::SystemWalletActor {
                wallet_id: from_id.to_string(),
            }
            .into());
        }

        let mut sender = self.store.load(from_id)?;
        let total = self.rates.total_usd(&sender);
        if total.is_zero() {
            return Err(LedgerError::ZeroValuation {
                wallet_id: from_id.to_string(),
            }
            .into());
        }
        if amount_usd > total {
            return Err(LedgerError::InsufficientBalance {
                resource: "USD value".to_string(),
                available: total.to_string(),
                requested: amount_usd.to_string(),
            }
            .into());
        }

        let proportion = amount_usd
            .checked_div(total)
            .ok_or(LedgerError::Overflow {
                operation: "debt proportion".to_string(),
            })?;
        Self::scale_usd_backed(&mut sender, Decimal::ONE - proportion);
        sender.world_debt_paid_usd = sender.world_debt_paid_usd.saturating_add(amount_usd);

        let mb = amount_usd
            .checked_div(self.rates.mb_usd)
            .ok_or(LedgerError::Overflow {
                operation: "usd to capsule conversion".to_string(),
            })?;
        let mut debt_wallet = self.system_wallet(WORLD_DEBT_WALLET_ID)?;
        debt_wallet.credit(Resource::CapsuleMb, mb);
        debt_wallet.credit(Resource::TorrentMb, mb);

        self.store.save(&debt_wallet)?;
        self.store.save(&sender)?;

        info!(
            "🌍 {} contributed {} USD to the world debt fund",
            from_id, amount_usd
        );
        Ok(())
    }

    /// Watts Token 提现：达到门槛且设置了 BTC 地址才放行
    pub fn cash_out(&self, from_id: &str) -> Result<WithdrawalRequest, RigError> {
        let mut sender = self.store.load(from_id)?;

        if sender.btc_address.is_empty() {
            return Err(LedgerError::NoPayoutAddress {
                wallet_id: from_id.to_string(),
            }
            .into());
        }
        let threshold = self.config.payout_threshold_usd;
        if sender.watts_token < threshold {
            return Err(LedgerError::BelowPayoutThreshold {
                available: sender.watts_token.to_string(),
                threshold: threshold.to_string(),
            }
            .into());
        }

        sender.debit(Resource::WattsToken, threshold)?;

        let request = WithdrawalRequest {
            wallet_id: sender.wallet_id.clone(),
            node_id: sender.node_id,
            btc_address: sender.btc_address.clone(),
            amount_usd: threshold,
            requested_at: Utc::now(),
        };

        let mut requests = self.withdrawal_requests()?;
        requests.push(request.clone());
        self.save_withdrawal_requests(&requests)?;

        let mut sink = self.system_wallet(DONATION_WALLET_ID)?;
        sink.credit(Resource::WattsToken, threshold);

        self.store.save(&sink)?;
        self.store.save(&sender)?;

        info!(
            "✅ Cash-out request recorded: {} USD for {} → {}",
            threshold, request.wallet_id, request.btc_address
        );
        Ok(request)
    }

    /// 读取全部待处理提现申请
    pub fn withdrawal_requests(&self) -> Result<Vec<WithdrawalRequest>, RigError> {
        let path = self.store.dir().join(WITHDRAWAL_REQUESTS_FILE);
        let raw = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    error: e.to_string(),
                }
                .into())
            }
        };
        let requests = serde_json::from_slice(&raw).map_err(|e| StoreError::Corrupted {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Ok(requests)
    }

    fn save_withdrawal_requests(&self, requests: &[WithdrawalRequest]) -> Result<(), RigError> {
        let path = self.store.dir().join(WITHDRAWAL_REQUESTS_FILE);
        let json = serde_json::to_vec_pretty(requests).map_err(|e| StoreError::Serialize {
            wallet_id: WITHDRAWAL_REQUESTS_FILE.to_string(),
            error: e.to_string(),
        })?;
        std::fs::write(&path, json).map_err(|e| StoreError::Io {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Ok(())
    }
}
