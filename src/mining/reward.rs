//! 奖励计算
//!
//! 奖励数额 = 骰子 × (有效算力 / 基准算力) × 乘数。全部是符号性
//! 算术，胶囊哈希只是展示用的 SHA-256 十六进制串。

use crate::error::StoreError;
use crate::mining::MiningMode;
use crate::wallet::Wallet;
use chrono::Utc;
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::f64::consts::PI;
use std::path::{Path, PathBuf};

/// 胶囊类型池
pub const CAPSULE_TYPES: [&str; 25] = [
    "Formula_Power",
    "Y7K DOLLAR",
    "bricks dollar",
    "2piE",
    "TE",
    "TE2pi",
    "Manierism",
    "Handrichism",
    "teЛ²",
    "E²Л",
    "RAM",
    "SDRAM",
    "SHA",
    "Nuclear",
    "Onshore",
    "Gigabyte",
    "Terabyte",
    "Petabyte",
    "PIB",
    "Electrism",
    "Pirate",
    "Torrent",
    "Bootleg",
    "Seeder",
    "Swarm",
];

/// 命中后追加 Torrent MB 的胶囊类型
const TORRENT_LABELS: [&str; 5] = ["pirate", "torrent", "bootleg", "seeder", "swarm"];

const BLOCK_HEADER: &str = "CAPMINER_BLOCK_HEADER_2025";

pub fn is_torrent_label(label: &str) -> bool {
    TORRENT_LABELS.contains(&label.to_lowercase().as_str())
}

/// 展示用叠加常量
fn overlay_constants() -> (String, String) {
    let tepi2 = format!("TEPI2_CONST_{:.2e}", 9e16 * PI * PI);
    let e2pi = format!("E2PI_CONST_{:.2e}", (9e16f64).powi(2) * PI);
    (tepi2, e2pi)
}

/// 胶囊哈希，仅用于展示
pub fn capsule_hash(capsule_type: &str, effective_hash_power: Decimal) -> String {
    let sha_block = hex::encode(Sha256::digest(BLOCK_HEADER.as_bytes()));
    let (tepi2, e2pi) = overlay_constants();
    let pre_image = format!(
        "{}{}{}{}{}",
        capsule_type, sha_block, effective_hash_power, tepi2, e2pi
    );
    hex::encode(Sha256::digest(pre_image.as_bytes()))
}

/// kWh 叠加公式：MB × 熵 × 谐振 / 阻值
pub fn overlay_formula(mb: Decimal) -> Decimal {
    let entropy = Decimal::new(85, 2); // 0.85
    let resonance = Decimal::new(12, 1); // 1.2
    let resistance = Decimal::new(5, 1); // 0.5
    mb.saturating_mul(entropy)
        .saturating_mul(resonance)
        .checked_div(resistance)
        .unwrap_or(Decimal::MAX)
}

/// 奖励参数
#[derive(Debug, Clone)]
pub struct RewardParams {
    pub base_hash_power: Decimal,
    pub hash_growth_rate: Decimal,
    pub halving_multiplier: Decimal,
}

/// 单次奖励结果
#[derive(Debug, Clone)]
pub struct RewardTick {
    pub capsule_type: &'static str,
    pub capsule_hash: String,
    pub effective_hash_power: Decimal,
    pub reward_mb: Decimal,
    pub reward_kwh: Decimal,
    pub reward_bandwidth: Decimal,
    pub hash_gain: Decimal,
    /// SHA 模式命中 SHA 胶囊时的永久算力加成
    pub sha_boost: Option<Decimal>,
    /// Torrent 类胶囊的附加 Torrent MB
    pub torrent_mb: Option<Decimal>,
}

/// 抽取一次奖励；不修改钱包
pub fn roll_tick(
    wallet: &Wallet,
    mode: MiningMode,
    params: &RewardParams,
    force_sha: bool,
    rng: &mut impl Rng,
) -> RewardTick {
    let mut capsule_type = CAPSULE_TYPES[rng.gen_range(0..CAPSULE_TYPES.len())];
    if force_sha && mode == MiningMode::Sha {
        capsule_type = "SHA";
    }

    // 有效算力在加成之前取值
    let effective = wallet.effective_hash_power();
    let capsule_hash = capsule_hash(capsule_type, effective);

    let sha_boost = if mode == MiningMode::Sha && capsule_type == "SHA" {
        Some(
            wallet
                .rig_hash_power
                .checked_div(Decimal::from(4u32))
                .unwrap_or(Decimal::ZERO),
        )
    } else {
        None
    };

    let scaling = effective
        .checked_div(params.base_hash_power)
        .unwrap_or(Decimal::ONE);

    let die = Decimal::from(rng.gen_range(1..=15u32));
    let reward_mb = die
        .saturating_mul(scaling)
        .saturating_mul(params.halving_multiplier);
    let reward_kwh = overlay_formula(reward_mb);

    let bandwidth_die = Decimal::from(rng.gen_range(1..=15u32));
    let reward_bandwidth = bandwidth_die
        .saturating_mul(scaling)
        .saturating_mul(params.halving_multiplier);

    // 算力增长按加成后的永久算力计
    let boosted = wallet
        .rig_hash_power
        .saturating_add(sha_boost.unwrap_or(Decimal::ZERO));
    let hash_gain = boosted.saturating_mul(params.hash_growth_rate);

    let torrent_mb = if is_torrent_label(capsule_type) {
        Some(
            reward_mb
                .checked_div(Decimal::from(2u32))
                .unwrap_or(Decimal::ZERO),
        )
    } else {
        None
    };

    RewardTick {
        capsule_type,
        capsule_hash,
        effective_hash_power: effective,
        reward_mb,
        reward_kwh,
        reward_bandwidth,
        hash_gain,
        sha_boost,
        torrent_mb,
    }
}

/// 把奖励记入钱包
pub fn apply_tick(wallet: &mut Wallet, mode: MiningMode, tick: &RewardTick) {
    wallet.capsule_value_mb = wallet.capsule_value_mb.saturating_add(tick.reward_mb);
    if mode == MiningMode::Cache {
        wallet.cache_value_mb = wallet.cache_value_mb.saturating_add(tick.reward_mb);
    }

    if let Some(boost) = tick.sha_boost {
        wallet.rig_hash_power = wallet.rig_hash_power.saturating_add(boost);
        wallet.sha_boost_active = true;
    } else {
        wallet.sha_boost_active = false;
    }
    wallet.rig_hash_power = wallet.rig_hash_power.saturating_add(tick.hash_gain);

    wallet.real_kwh = wallet.real_kwh.saturating_add(tick.reward_kwh);
    wallet.bandwidth_mbps = wallet.bandwidth_mbps.saturating_add(tick.reward_bandwidth);

    if let Some(torrent_mb) = tick.torrent_mb {
        wallet.torrent_value_mb = wallet.torrent_value_mb.saturating_add(torrent_mb);
    }
}

#[derive(Debug, Serialize)]
struct TorrentCapsule<'a> {
    capsule_type: &'a str,
    wallet_id: &'a str,
    node_id: String,
    reward_mb: f64,
    timestamp: i64,
}

/// 落盘 Torrent 胶囊文件
pub fn write_torrent_capsule(
    dir: &Path,
    wallet: &Wallet,
    tick: &RewardTick,
) -> Result<PathBuf, StoreError> {
    let torrent_mb = tick.torrent_mb.unwrap_or(Decimal::ZERO);
    let capsule = TorrentCapsule {
        capsule_type: tick.capsule_type,
        wallet_id: &wallet.wallet_id,
        node_id: wallet.node_id.to_string(),
        reward_mb: torrent_mb.to_f64().unwrap_or(f64::MAX),
        timestamp: Utc::now().timestamp(),
    };

    let path = dir.join(format!(
        "{}_{}_capsule.torrent",
        wallet.wallet_id, tick.capsule_type
    ));
    let json = serde_json::to_vec_pretty(&capsule).map_err(|e| StoreError::Serialize {
        wallet_id: wallet.wallet_id.clone(),
        error: e.to_string(),
    })?;
    std::fs::write(&path, json).map_err(|e| StoreError::Io {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn params() -> RewardParams {
        RewardParams {
            base_hash_power: Decimal::from(10_000u32),
            hash_growth_rate: Decimal::new(1, 3),
            halving_multiplier: Decimal::from(79_000u32),
        }
    }

    fn wallet() -> Wallet {
        Wallet::new("miner", "miner rig", Decimal::from(10_000u32))
    }

    #[test]
    fn test_overlay_formula() {
        // 100 * 0.85 * 1.2 / 0.5 = 204
        assert_eq!(overlay_formula(Decimal::from(100u32)), Decimal::from(204u32));
    }

    #[test]
    fn test_reward_scales_with_hash_power() {
        let params = params();
        let baseline = wallet();
        let mut strong = wallet();
        strong.rig_hash_power = Decimal::from(20_000u32);

        // 相同种子 → 相同骰子，只有缩放因子不同
        let mut rng_a = StdRng::seed_from_u64(7);
        let mut rng_b = StdRng::seed_from_u64(7);
        let tick_a = roll_tick(&baseline, MiningMode::Kinetic, &params, false, &mut rng_a);
        let tick_b = roll_tick(&strong, MiningMode::Kinetic, &params, false, &mut rng_b);

        assert_eq!(tick_b.reward_mb, tick_a.reward_mb * Decimal::from(2u32));
    }

    #[test]
    fn test_reward_bounds_at_base_hash_power() {
        let params = params();
        let wallet = wallet();
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..100 {
            let tick = roll_tick(&wallet, MiningMode::Kinetic, &params, false, &mut rng);
            // 骰子 1..=15，基准算力缩放为 1
            assert!(tick.reward_mb >= Decimal::from(79_000u32));
            assert!(tick.reward_mb <= Decimal::from(1_185_000u32));
            assert_eq!(tick.reward_kwh, overlay_formula(tick.reward_mb));
        }
    }

    #[test]
    fn test_forced_sha_boost() {
        let params = params();
        let mut wallet = wallet();
        let mut rng = StdRng::seed_from_u64(1);

        let tick = roll_tick(&wallet, MiningMode::Sha, &params, true, &mut rng);
        assert_eq!(tick.capsule_type, "SHA");
        // 永久算力 +25%
        assert_eq!(tick.sha_boost, Some(Decimal::from(2_500u32)));

        apply_tick(&mut wallet, MiningMode::Sha, &tick);
        assert!(wallet.sha_boost_active);
        // 12500 + 12500 * 0.001
        assert_eq!(
            wallet.rig_hash_power,
            Decimal::from(12_500u32) + Decimal::new(125, 1)
        );
    }

    #[test]
    fn test_sha_capsule_without_sha_mode_has_no_boost() {
        let params = params();
        let wallet = wallet();
        let mut rng = StdRng::seed_from_u64(1);

        let tick = roll_tick(&wallet, MiningMode::Kinetic, &params, false, &mut rng);
        if tick.capsule_type == "SHA" {
            assert!(tick.sha_boost.is_none());
        }
    }

    #[test]
    fn test_cache_mode_credits_cache_too() {
        let params = params();
        let mut wallet = wallet();
        let mut rng = StdRng::seed_from_u64(3);

        let tick = roll_tick(&wallet, MiningMode::Cache, &params, false, &mut rng);
        apply_tick(&mut wallet, MiningMode::Cache, &tick);

        assert_eq!(wallet.capsule_value_mb, tick.reward_mb);
        assert_eq!(wallet.cache_value_mb, tick.reward_mb);
    }

    #[test]
    fn test_torrent_label_grants_half_reward() {
        assert!(is_torrent_label("Pirate"));
        assert!(is_torrent_label("swarm"));
        assert!(!is_torrent_label("SHA"));

        let params = params();
        let wallet = wallet();
        // 扫到命中 torrent 类胶囊为止
        for seed in 0..200u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let tick = roll_tick(&wallet, MiningMode::Kinetic, &params, false, &mut rng);
            if let Some(torrent_mb) = tick.torrent_mb {
                assert_eq!(torrent_mb * Decimal::from(2u32), tick.reward_mb);
                return;
            }
        }
        panic!("no torrent capsule in 200 seeded rolls");
    }

    #[test]
    fn test_capsule_hash_is_stable_hex() {
        let a = capsule_hash("RAM", Decimal::from(10_000u32));
        let b = capsule_hash("RAM", Decimal::from(10_000u32));
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));

        // 不同胶囊类型得到不同哈希
        assert_ne!(a, capsule_hash("SDRAM", Decimal::from(10_000u32)));
    }

    #[test]
    fn test_write_torrent_capsule_file() {
        let dir = std::env::temp_dir().join(format!("capminer_capsule_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();

        let params = params();
        let wallet = wallet();
        for seed in 0..200u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let tick = roll_tick(&wallet, MiningMode::Kinetic, &params, false, &mut rng);
            if tick.torrent_mb.is_some() {
                let path = write_torrent_capsule(&dir, &wallet, &tick).unwrap();
                let raw = std::fs::read_to_string(&path).unwrap();
                assert!(raw.contains("\"wallet_id\": \"miner\""));
                return;
            }
        }
        panic!("no torrent capsule in 200 seeded rolls");
    }
}
