use capminer_rs::valuation::Rates;
use capminer_rs::wallet::ledger::{Ledger, LedgerConfig};
use capminer_rs::wallet::{Resource, WalletStore, DONATION_WALLET_ID, WORLD_DEBT_WALLET_ID};
use rust_decimal::Decimal;
use std::sync::Arc;

fn fixture() -> (Arc<WalletStore>, Ledger) {
    let dir = std::env::temp_dir().join(format!("capminer_it_{}", uuid::Uuid::new_v4()));
    let store = Arc::new(WalletStore::open(dir, Decimal::from(10_000u32), false).unwrap());
    store.init_system_wallets().unwrap();
    let ledger = Ledger::new(store.clone(), Rates::default(), LedgerConfig::default());
    (store, ledger)
}

fn fund(store: &WalletStore, wallet_id: &str, resource: Resource, amount: Decimal) {
    let mut wallet = store.create(wallet_id, None).unwrap();
    wallet.credit(resource, amount);
    store.save(&wallet).unwrap();
}

/// 基准场景：alice 持有 100 Capsule MB，估值 500 USD；
/// 转出 40 MB 后 alice 60 / bob 40，总量不变
#[test]
fn test_alice_bob_scenario() {
    let (store, ledger) = fixture();
    let rates = Rates::default();

    fund(&store, "alice", Resource::CapsuleMb, Decimal::from(100u32));

    let alice = store.load("alice").unwrap();
    assert_eq!(alice.cache_value_mb, Decimal::ZERO);
    assert_eq!(rates.total_usd(&alice), Decimal::from(500u32));

    ledger
        .transfer("alice", "bob", Resource::CapsuleMb, Decimal::from(40u32))
        .unwrap();

    let alice = store.load("alice").unwrap();
    let bob = store.load("bob").unwrap();
    assert_eq!(alice.capsule_value_mb, Decimal::from(60u32));
    assert_eq!(bob.capsule_value_mb, Decimal::from(40u32));
    assert_eq!(
        alice.capsule_value_mb + bob.capsule_value_mb,
        Decimal::from(100u32)
    );
}

#[test]
fn test_transfer_conserves_every_resource() {
    let (store, ledger) = fixture();

    for resource in Resource::ALL {
        let from = format!("src-{}", resource.key());
        let to = format!("dst-{}", resource.key());
        fund(&store, &from, resource, Decimal::from(10u32));

        ledger
            .transfer(&from, &to, resource, Decimal::new(25, 1)) // 2.5
            .unwrap();

        let sender = store.load(&from).unwrap();
        let receiver = store.load(&to).unwrap();
        assert_eq!(sender.balance(resource), Decimal::new(75, 1));
        assert_eq!(receiver.balance(resource), Decimal::new(25, 1));
        assert_eq!(
            sender.balance(resource) + receiver.balance(resource),
            Decimal::from(10u32)
        );
    }
}

/// USD 价值转账在双方都有估值时按比例缩放，总估值守恒
#[test]
fn test_usd_transfer_conserves_total_valuation() {
    let (store, ledger) = fixture();
    let rates = Rates::default();

    // alice: 10 MB = 50 USD；bob: 100 Cache MB = 42 USD
    fund(&store, "alice", Resource::CapsuleMb, Decimal::from(10u32));
    fund(&store, "bob", Resource::CacheMb, Decimal::from(100u32));

    let before = rates.total_usd(&store.load("alice").unwrap())
        + rates.total_usd(&store.load("bob").unwrap());

    ledger
        .transfer_usd("alice", "bob", Decimal::from(25u32))
        .unwrap();

    let alice = store.load("alice").unwrap();
    let bob = store.load("bob").unwrap();
    let after = rates.total_usd(&alice) + rates.total_usd(&bob);

    assert_eq!(alice.capsule_value_mb, Decimal::from(5u32));

    // 比例缩放引入的舍入不应超过微小误差
    let bob_drift = (rates.total_usd(&bob) - Decimal::from(67u32)).abs();
    assert!(bob_drift < Decimal::new(1, 12), "receiver drift: {}", bob_drift);
    let drift = (after - before).abs();
    assert!(drift < Decimal::new(1, 12), "valuation drift: {}", drift);
}

#[test]
fn test_usd_transfer_rejected_when_sender_has_no_valuation() {
    let (store, ledger) = fixture();
    store.create("empty", None).unwrap();

    assert!(ledger.transfer_usd("empty", "bob", Decimal::ONE).is_err());
    // 失败的转账不会创建收款钱包
    assert!(!store.exists("bob"));
}

#[test]
fn test_reserved_wallets_cannot_be_created_or_targeted() {
    let (store, ledger) = fixture();
    fund(&store, "alice", Resource::CapsuleMb, Decimal::from(10u32));

    assert!(store.create(DONATION_WALLET_ID, None).is_err());
    assert!(store.create(WORLD_DEBT_WALLET_ID, None).is_err());

    assert!(ledger
        .transfer("alice", DONATION_WALLET_ID, Resource::CapsuleMb, Decimal::ONE)
        .is_err());
    assert!(ledger
        .transfer("alice", WORLD_DEBT_WALLET_ID, Resource::CapsuleMb, Decimal::ONE)
        .is_err());
}

#[test]
fn test_donation_moves_resource_and_grants_hash_power() {
    let (store, ledger) = fixture();
    fund(&store, "alice", Resource::CapsuleMb, Decimal::from(50u32));

    let gain = ledger
        .donate("alice", Resource::CapsuleMb, Decimal::from(50u32))
        .unwrap();
    // Capsule MB 捐赠 1:1 折算算力
    assert_eq!(gain, Decimal::from(50u32));

    let alice = store.load("alice").unwrap();
    let sink = store.load(DONATION_WALLET_ID).unwrap();
    assert_eq!(alice.capsule_value_mb, Decimal::ZERO);
    assert_eq!(alice.rig_hash_power, Decimal::from(10_050u32));
    assert_eq!(sink.capsule_value_mb, Decimal::from(50u32));
}

#[test]
fn test_world_debt_contribution() {
    let (store, ledger) = fixture();
    // 20 MB = 100 USD
    fund(&store, "alice", Resource::CapsuleMb, Decimal::from(20u32));

    ledger
        .contribute_world_debt("alice", Decimal::from(50u32))
        .unwrap();

    let alice = store.load("alice").unwrap();
    let debt = store.load(WORLD_DEBT_WALLET_ID).unwrap();

    // 一半价值捐出
    assert_eq!(alice.capsule_value_mb, Decimal::from(10u32));
    assert_eq!(alice.world_debt_paid_usd, Decimal::from(50u32));
    // 债务钱包按 MB 汇率入账 Capsule 与 Torrent
    assert_eq!(debt.capsule_value_mb, Decimal::from(10u32));
    assert_eq!(debt.torrent_value_mb, Decimal::from(10u32));
}

#[test]
fn test_cash_out_flow_credits_donation_sink() {
    let (store, ledger) = fixture();
    fund(&store, "alice", Resource::WattsToken, Decimal::from(6u32));

    let mut alice = store.load("alice").unwrap();
    alice.btc_address = "bc1qintegration".to_string();
    store.save(&alice).unwrap();

    let request = ledger.cash_out("alice").unwrap();
    assert_eq!(request.amount_usd, Decimal::new(500, 2));
    assert_eq!(request.btc_address, "bc1qintegration");

    let alice = store.load("alice").unwrap();
    let sink = store.load(DONATION_WALLET_ID).unwrap();
    assert_eq!(alice.watts_token, Decimal::ONE);
    assert_eq!(sink.watts_token, Decimal::new(500, 2));
    assert_eq!(ledger.withdrawal_requests().unwrap().len(), 1);
}
