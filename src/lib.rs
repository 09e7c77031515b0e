//! CapMiner-RS - 胶囊矿机钱包账本与挖矿模拟器
//!
//! CapMiner-RS 维护本地 JSON 钱包（每台矿机一个文件），按固定
//! 汇率把各类资源余额折算成虚构的 USD 价值，并在定时奖励循环中
//! 为钱包记账：
//! - 钱包存储：原子写入、缺失字段回填、可选静态加密
//! - 账本：转账 / 捐赠 / 世界债务 / 提现，全部先校验后提交
//! - 挖矿循环：随机胶囊类型 + 算力缩放的符号性奖励
//!
//! ## 说明
//!
//! 算力、SHA 加成与区块奖励都是展示性的数字，没有工作量证明，
//! 也没有任何网络共识。

pub mod config;
pub mod error;
pub mod logging;
pub mod menu;
pub mod mining;
pub mod utils;
pub mod valuation;
pub mod wallet;

pub use config::Config;
pub use error::RigError;
pub use mining::MiningManager;
pub use valuation::Rates;
pub use wallet::{Ledger, Wallet, WalletStore};

/// 程序版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 程序名称
pub const NAME: &str = "capminer-rs";
