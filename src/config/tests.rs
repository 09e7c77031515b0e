use super::*;

#[test]
fn test_config_default() {
    let config = Config::default();

    // 测试默认值
    assert_eq!(config.general.log_level, "info");
    assert!(config.general.log_file.is_none());

    assert_eq!(config.wallet.dir, PathBuf::from("wallets"));
    assert!(!config.wallet.encrypt);

    assert_eq!(config.rates.mb_usd, Decimal::new(500, 2));
    assert_eq!(config.rates.cache_usd, Decimal::new(42, 2));
    assert_eq!(config.rates.kwh_usd, Decimal::new(17, 2));

    assert_eq!(config.mining.reward_interval_secs, 60);
    assert_eq!(config.mining.session_duration_secs, 36_000);
    assert_eq!(config.mining.base_hash_power, Decimal::from(10_000u32));
    assert_eq!(config.mining.halving_multiplier, Decimal::from(79_000u32));

    assert_eq!(config.payout.threshold_usd, Decimal::new(500, 2));
}

#[test]
fn test_config_validation() {
    let mut config = Config::default();

    // 测试有效配置
    assert!(config.is_valid());

    // MB 汇率为零非法（参与除法）
    config.rates.mb_usd = Decimal::ZERO;
    assert!(!config.is_valid());
    config.rates.mb_usd = Decimal::new(500, 2);
    assert!(config.is_valid());

    // 奖励间隔为零非法
    config.mining.reward_interval_secs = 0;
    assert!(!config.is_valid());
    config.mining.reward_interval_secs = 60;

    // 非法日志级别
    config.general.log_level = "loud".to_string();
    assert!(!config.is_valid());
}

#[test]
fn test_config_load_from_toml() {
    let config_content = r#"
[general]
log_level = "debug"

[wallet]
dir = "test_wallets"
encrypt = true

[rates]
mb_usd = 5.0
cache_usd = 0.42
kwh_usd = 0.17
bandwidth_usd = 0.42
torrent_usd = 5.0

[mining]
reward_interval_secs = 30
session_duration_secs = 600
base_hash_power = 10000.0
hash_growth_rate = 0.001
halving_multiplier = 79000.0
debt_passive_usd = 0.0001
debug_sha_boost = true

[payout]
threshold_usd = 5.0
initial_world_debt_usd = 31300000000000.0
"#;

    // 写入临时文件
    let temp_file = std::env::temp_dir().join(format!(
        "capminer_config_{}.toml",
        uuid::Uuid::new_v4()
    ));
    std::fs::write(&temp_file, config_content).expect("Failed to write test config");

    // 测试配置加载
    let config = Config::load(temp_file.to_str().unwrap()).expect("Failed to load config");
    assert_eq!(config.general.log_level, "debug");
    assert_eq!(config.wallet.dir, PathBuf::from("test_wallets"));
    assert!(config.wallet.encrypt);
    assert_eq!(config.mining.reward_interval_secs, 30);
    assert!(config.mining.debug_sha_boost);
    assert_eq!(config.rates.mb_usd, Decimal::new(500, 2));

    let _ = std::fs::remove_file(&temp_file);
}

#[test]
fn test_config_partial_toml_uses_defaults() {
    let config_content = r#"
[general]
log_level = "warn"
"#;

    let config: Config = toml::from_str(config_content).expect("Failed to parse partial config");
    assert_eq!(config.general.log_level, "warn");
    // 其余段落回落默认值
    assert_eq!(config.wallet.dir, PathBuf::from("wallets"));
    assert_eq!(config.mining.reward_interval_secs, 60);
    assert_eq!(config.rates.mb_usd, Decimal::new(500, 2));
}

#[test]
fn test_config_save_load_roundtrip() {
    let temp_file = std::env::temp_dir().join(format!(
        "capminer_config_rt_{}.toml",
        uuid::Uuid::new_v4()
    ));

    let mut config = Config::default();
    config.mining.reward_interval_secs = 15;
    config.save(temp_file.to_str().unwrap()).expect("save failed");

    let loaded = Config::load(temp_file.to_str().unwrap()).expect("load failed");
    assert_eq!(loaded.mining.reward_interval_secs, 15);
    assert_eq!(loaded.rates.mb_usd, config.rates.mb_usd);

    let _ = std::fs::remove_file(&temp_file);
}

#[test]
fn test_load_or_default_missing_file() {
    let config = Config::load_or_default("/nonexistent/capminer.toml").expect("should fall back");
    assert_eq!(config.mining.reward_interval_secs, 60);
}
