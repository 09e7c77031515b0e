//! 挖矿会话管理器
//!
//! 一次只允许一个会话。奖励循环每秒轮询一次，便于及时响应停止
//! 请求；奖励间隔到期才真正发奖。

use crate::error::{MiningError, RigError};
use crate::mining::{reward, MiningConfig, MiningMode, MiningState, MiningStats};
use crate::mining::reward::RewardParams;
use crate::valuation::Rates;
use crate::utils::format_quantity;
use crate::wallet::{Resource, WalletStore, WORLD_DEBT_WALLET_ID};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// 统计摘要的输出周期（按奖励次数计）
const STATS_SUMMARY_EVERY: u64 = 10;

pub struct MiningManager {
    store: Arc<WalletStore>,
    rates: Rates,
    config: MiningConfig,
    state: Arc<RwLock<MiningState>>,
    stats: Arc<RwLock<MiningStats>>,
    running: Arc<RwLock<bool>>,
    loop_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl MiningManager {
    pub fn new(store: Arc<WalletStore>, rates: Rates, config: MiningConfig) -> Self {
        Self {
            store,
            rates,
            config,
            state: Arc::new(RwLock::new(MiningState::Stopped)),
            stats: Arc::new(RwLock::new(MiningStats::new())),
            running: Arc::new(RwLock::new(false)),
            loop_handle: Mutex::new(None),
        }
    }

    pub async fn state(&self) -> MiningState {
        self.state.read().await.clone()
    }

    pub async fn stats(&self) -> MiningStats {
        self.stats.read().await.clone()
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// 启动挖矿会话
    pub async fn start(&self, wallet_id: &str, mode: MiningMode) -> Result<(), RigError> {
        if *self.running.read().await {
            warn!("Mining session is already running");
            return Err(MiningError::AlreadyRunning.into());
        }

        // 开工前确认钱包可用
        let wallet = self.store.load(wallet_id)?;
        if wallet.is_system() {
            return Err(MiningError::WalletUnavailable {
                wallet_id: wallet_id.to_string(),
                reason: "system wallets cannot mine".to_string(),
            }
            .into());
        }

        *self.state.write().await = MiningState::Starting;
        *self.running.write().await = true;
        *self.stats.write().await = MiningStats::new();
        self.stats.write().await.start();

        let handle = tokio::spawn(mining_loop(
            self.store.clone(),
            self.rates.clone(),
            self.config.clone(),
            self.state.clone(),
            self.stats.clone(),
            self.running.clone(),
            wallet_id.to_string(),
            mode,
        ));
        *self.loop_handle.lock().await = Some(handle);

        *self.state.write().await = MiningState::Running;
        info!(
            "⛏️ Mining session started: rig {} mode {} (effective {} H/s)",
            wallet_id,
            mode,
            format_quantity(wallet.effective_hash_power())
        );
        Ok(())
    }

    /// 停止挖矿会话
    pub async fn stop(&self) -> Result<(), RigError> {
        if !*self.running.read().await {
            debug!("Mining session is not running");
            // 会话可能已自行结束，收掉残留句柄
            if let Some(handle) = self.loop_handle.lock().await.take() {
                let _ = handle.await;
            }
            return Ok(());
        }

        *self.state.write().await = MiningState::Stopping;
        *self.running.write().await = false;

        if let Some(handle) = self.loop_handle.lock().await.take() {
            let _ = handle.await;
        }

        let stats = self.stats.read().await.clone();
        info!(
            "🛑 Mining session stopped after {} ticks ({:.0?} uptime)",
            stats.ticks,
            stats.uptime()
        );
        Ok(())
    }
}

/// 世界债务钱包的被动收益：每次奖励折算成 Capsule MB 入账
fn passive_debt_tick(store: &WalletStore, rates: &Rates, usd: Decimal) {
    let mut debt_wallet = match store.load(WORLD_DEBT_WALLET_ID) {
        Ok(wallet) => wallet,
        // 系统钱包未初始化时跳过，不让被动收益拦住挖矿
        Err(e) => {
            debug!("Passive debt tick skipped: {}", e);
            return;
        }
    };
    let mb = match usd.checked_div(rates.mb_usd) {
        Some(mb) => mb,
        None => return,
    };
    debt_wallet.credit(Resource::CapsuleMb, mb);
    if let Err(e) = store.save(&debt_wallet) {
        warn!("⚠️ Failed to persist passive debt income: {}", e);
    }
}

#[allow(clippy::too_many_arguments)]
async fn mining_loop(
    store: Arc<WalletStore>,
    rates: Rates,
    config: MiningConfig,
    state: Arc<RwLock<MiningState>>,
    stats: Arc<RwLock<MiningStats>>,
    running: Arc<RwLock<bool>>,
    wallet_id: String,
    mode: MiningMode,
) {
    let params = RewardParams {
        base_hash_power: config.base_hash_power,
        hash_growth_rate: config.hash_growth_rate,
        halving_multiplier: config.halving_multiplier,
    };
    let capsule_dir = config
        .capsule_export_dir
        .clone()
        .unwrap_or_else(|| store.dir().to_path_buf());

    let started = Instant::now();
    let mut last_reward: Option<Instant> = None;
    let mut first_tick = true;
    let mut poll = tokio::time::interval(Duration::from_secs(1));
    let mut failure: Option<String> = None;

    loop {
        poll.tick().await;

        if !*running.read().await {
            break;
        }
        if started.elapsed() >= config.session_duration {
            info!("⏱️ Session duration reached, stopping mining");
            break;
        }
        let due = match last_reward {
            Some(at) => at.elapsed() >= config.reward_interval,
            None => true,
        };
        if !due {
            continue;
        }
        last_reward = Some(Instant::now());

        // 每次发奖重新加载钱包，避免覆盖外部转账
        let mut wallet = match store.load(&wallet_id) {
            Ok(wallet) => wallet,
            Err(e) => {
                error!("⚠️ Wallet unavailable, stopping mining: {}", e);
                failure = Some(e.to_string());
                break;
            }
        };

        passive_debt_tick(&store, &rates, config.debt_passive_usd);

        let force_sha = config.debug_sha_boost && first_tick;
        first_tick = false;

        let tick = reward::roll_tick(&wallet, mode, &params, force_sha, &mut rand::thread_rng());
        reward::apply_tick(&mut wallet, mode, &tick);

        if let Some(boost) = tick.sha_boost {
            info!("🌠 SHA boost PERMANENT +{} H/s", format_quantity(boost));
        }
        if tick.torrent_mb.is_some() {
            match reward::write_torrent_capsule(&capsule_dir, &wallet, &tick) {
                Ok(path) => info!(
                    "🏴‍☠️ Torrent payload +{} MB → {}",
                    format_quantity(tick.torrent_mb.unwrap_or(Decimal::ZERO)),
                    path.display()
                ),
                Err(e) => warn!("⚠️ Torrent capsule write failed: {}", e),
            }
        }

        if let Err(e) = store.save(&wallet) {
            error!("⚠️ Failed to persist mining reward: {}", e);
            failure = Some(e.to_string());
            break;
        }

        stats.write().await.record_tick(&tick);

        let total_usd = rates.total_usd(&wallet);
        info!(
            "💎 {} capsule | +{} MB | +{} kWh | +{} MB/s | hash {} (effective {}) | total ${} | {}…",
            tick.capsule_type,
            format_quantity(tick.reward_mb),
            format_quantity(tick.reward_kwh),
            format_quantity(tick.reward_bandwidth),
            format_quantity(wallet.rig_hash_power),
            format_quantity(tick.effective_hash_power),
            format_quantity(total_usd),
            &tick.capsule_hash[..10]
        );

        let snapshot = stats.read().await.clone();
        if snapshot.ticks % STATS_SUMMARY_EVERY == 0 {
            info!(
                "📊 Session: {} ticks | {} MB | {} kWh | {} boosts | {} torrents",
                snapshot.ticks,
                format_quantity(snapshot.total_capsule_mb),
                format_quantity(snapshot.total_kwh),
                snapshot.sha_boosts,
                snapshot.torrent_payloads
            );
        }
    }

    *running.write().await = false;
    *state.write().await = match failure {
        Some(message) => MiningState::Error(message),
        None => MiningState::Stopped,
    };
}
