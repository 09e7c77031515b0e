use capminer_rs::mining::{MiningConfig, MiningManager, MiningMode};
use capminer_rs::valuation::Rates;
use capminer_rs::wallet::{WalletStore, DONATION_WALLET_ID, WORLD_DEBT_WALLET_ID};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

fn fixture() -> Arc<WalletStore> {
    let dir = std::env::temp_dir().join(format!("capminer_mine_{}", uuid::Uuid::new_v4()));
    let store = Arc::new(WalletStore::open(dir, Decimal::from(10_000u32), false).unwrap());
    store.init_system_wallets().unwrap();
    store
}

fn quick_config() -> MiningConfig {
    MiningConfig {
        session_duration: Duration::from_secs(30),
        ..MiningConfig::default()
    }
}

/// 首个奖励立即发放：短会话也至少记账一次
#[tokio::test]
async fn test_mining_session_credits_wallet() {
    let store = fixture();
    store.create("miner", None).unwrap();

    let manager = MiningManager::new(store.clone(), Rates::default(), quick_config());
    manager.start("miner", MiningMode::Cache).await.unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    manager.stop().await.unwrap();

    let stats = manager.stats().await;
    assert!(stats.ticks >= 1);

    let wallet = store.load("miner").unwrap();
    assert!(wallet.capsule_value_mb > Decimal::ZERO);
    // cache 模式同时记入 Cache MB
    assert_eq!(wallet.cache_value_mb, wallet.capsule_value_mb);
    assert!(wallet.real_kwh > Decimal::ZERO);
    // 永久算力增长
    assert!(wallet.rig_hash_power > Decimal::from(10_000u32));

    // 世界债务钱包的被动收益也已入账
    let debt = store.load(WORLD_DEBT_WALLET_ID).unwrap();
    assert!(debt.capsule_value_mb > Decimal::ZERO);
}

#[tokio::test]
async fn test_debug_sha_boost_on_first_tick() {
    let store = fixture();
    store.create("sha-miner", None).unwrap();

    let config = MiningConfig {
        debug_sha_boost: true,
        ..quick_config()
    };
    let manager = MiningManager::new(store.clone(), Rates::default(), config);
    manager.start("sha-miner", MiningMode::Sha).await.unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    manager.stop().await.unwrap();

    assert!(manager.stats().await.sha_boosts >= 1);
    let wallet = store.load("sha-miner").unwrap();
    // 10000 + 25% 加成之后继续增长
    assert!(wallet.rig_hash_power >= Decimal::from(12_500u32));
}

#[tokio::test]
async fn test_system_wallets_cannot_mine() {
    let store = fixture();
    let manager = MiningManager::new(store, Rates::default(), quick_config());

    assert!(manager
        .start(DONATION_WALLET_ID, MiningMode::Kinetic)
        .await
        .is_err());
    assert!(!manager.is_running().await);
}

#[tokio::test]
async fn test_concurrent_sessions_rejected() {
    let store = fixture();
    store.create("busy", None).unwrap();

    let manager = MiningManager::new(store, Rates::default(), quick_config());
    manager.start("busy", MiningMode::Kinetic).await.unwrap();

    assert!(manager.start("busy", MiningMode::Wifi).await.is_err());

    manager.stop().await.unwrap();
    assert!(!manager.is_running().await);
}

#[tokio::test]
async fn test_missing_wallet_cannot_mine() {
    let store = fixture();
    let manager = MiningManager::new(store, Rates::default(), quick_config());
    assert!(manager.start("ghost", MiningMode::Kinetic).await.is_err());
}
