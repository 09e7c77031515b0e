use thiserror::Error;

#[derive(Error, Debug)]
pub enum RigError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Mining error: {0}")]
    Mining(#[from] MiningError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("System error: {0}")]
    System(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Wallet not found: {wallet_id}")]
    WalletNotFound { wallet_id: String },

    #[error("Wallet ID is reserved for system use: {wallet_id}")]
    ReservedWalletId { wallet_id: String },

    #[error("Invalid wallet ID: {wallet_id}, reason: {reason}")]
    InvalidWalletId { wallet_id: String, reason: String },

    #[error("Wallet file corrupted: {path}, error: {error}")]
    Corrupted { path: String, error: String },

    #[error("Wallet I/O error: {path}, error: {error}")]
    Io { path: String, error: String },

    #[error("Wallet serialization failed: {wallet_id}, error: {error}")]
    Serialize { wallet_id: String, error: String },

    #[error("Crypto error: {0}")]
    Crypto(String),
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Amount must be positive: {amount}")]
    NonPositiveAmount { amount: String },

    #[error("Insufficient {resource} balance: available {available}, requested {requested}")]
    InsufficientBalance {
        resource: String,
        available: String,
        requested: String,
    },

    #[error("Wallet has no USD-backed value to draw from: {wallet_id}")]
    ZeroValuation { wallet_id: String },

    #[error("Cannot send to system wallet directly: {wallet_id}")]
    SystemWalletTarget { wallet_id: String },

    #[error("System wallet cannot perform this operation: {wallet_id}")]
    SystemWalletActor { wallet_id: String },

    #[error("Cannot transfer a wallet to itself: {wallet_id}")]
    SelfTransfer { wallet_id: String },

    #[error("No BTC payout address set: {wallet_id}")]
    NoPayoutAddress { wallet_id: String },

    #[error("Below payout threshold: available {available}, threshold {threshold}")]
    BelowPayoutThreshold {
        available: String,
        threshold: String,
    },

    #[error("Numeric overflow during {operation}")]
    Overflow { operation: String },
}

#[derive(Error, Debug)]
pub enum MiningError {
    #[error("Mining session already running")]
    AlreadyRunning,

    #[error("Mining session not running")]
    NotRunning,

    #[error("Wallet unavailable for mining: {wallet_id}, reason: {reason}")]
    WalletUnavailable { wallet_id: String, reason: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Parse error: {error}")]
    ParseError { error: String },

    #[error("Validation error: {field}, reason: {reason}")]
    ValidationError { field: String, reason: String },

    #[error("Invalid value: {field}, value: {value}, reason: {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

// 错误统计
#[derive(Debug, Default)]
pub struct ErrorStats {
    pub store_errors: u64,
    pub ledger_errors: u64,
    pub mining_errors: u64,
    pub total_errors: u64,
}

impl ErrorStats {
    pub fn record_error(&mut self, error: &RigError) {
        self.total_errors += 1;

        match error {
            RigError::Store(_) => self.store_errors += 1,
            RigError::Ledger(_) => self.ledger_errors += 1,
            RigError::Mining(_) => self.mining_errors += 1,
            _ => {}
        }
    }

    pub fn reset(&mut self) {
        *self = Default::default();
    }
}
