//! 钱包文件存储
//!
//! 每个钱包对应 `<wallet_id>_wallet.json`，整体覆盖写入；写入先落
//! 临时文件再原子重命名，崩溃不会留下半个钱包文件。

use crate::error::StoreError;
use crate::wallet::crypto::WalletCipher;
use crate::wallet::{
    is_reserved_wallet_id, Wallet, DONATION_WALLET_ID, WORLD_DEBT_NODE_ID, WORLD_DEBT_WALLET_ID,
};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

const WALLET_FILE_SUFFIX: &str = "_wallet.json";
const KEY_FILE_NAME: &str = "wallet.key";

/// 钱包存储
pub struct WalletStore {
    dir: PathBuf,
    base_hash_power: Decimal,
    cipher: Option<WalletCipher>,
}

impl WalletStore {
    /// 打开钱包目录，必要时创建；`encrypt` 开启静态加密
    pub fn open(dir: PathBuf, base_hash_power: Decimal, encrypt: bool) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::Io {
            path: dir.display().to_string(),
            error: e.to_string(),
        })?;

        let cipher = if encrypt {
            Some(WalletCipher::load_or_generate(&dir.join(KEY_FILE_NAME))?)
        } else {
            None
        };

        Ok(Self {
            dir,
            base_hash_power,
            cipher,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn base_hash_power(&self) -> Decimal {
        self.base_hash_power
    }

    fn wallet_path(&self, wallet_id: &str) -> PathBuf {
        self.dir.join(format!("{}{}", wallet_id, WALLET_FILE_SUFFIX))
    }

    pub fn exists(&self, wallet_id: &str) -> bool {
        self.wallet_path(wallet_id).exists()
    }

    /// 钱包 ID 充当文件名主干，拒绝无法安全落盘的 ID
    fn validate_wallet_id(wallet_id: &str) -> Result<(), StoreError> {
        if wallet_id.is_empty() {
            return Err(StoreError::InvalidWalletId {
                wallet_id: wallet_id.to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if wallet_id.len() > 64 {
            return Err(StoreError::InvalidWalletId {
                wallet_id: wallet_id.to_string(),
                reason: "must be at most 64 characters".to_string(),
            });
        }
        if wallet_id.starts_with('.') {
            return Err(StoreError::InvalidWalletId {
                wallet_id: wallet_id.to_string(),
                reason: "must not start with a dot".to_string(),
            });
        }
        if !wallet_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(StoreError::InvalidWalletId {
                wallet_id: wallet_id.to_string(),
                reason: "only ASCII letters, digits, '-', '_' and '.' are allowed".to_string(),
            });
        }
        Ok(())
    }

    /// 读取钱包，缺失字段回填，修复后的记录会回写磁盘
    pub fn load(&self, wallet_id: &str) -> Result<Wallet, StoreError> {
        let path = self.wallet_path(wallet_id);
        let raw = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::WalletNotFound {
                    wallet_id: wallet_id.to_string(),
                })
            }
            Err(e) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    error: e.to_string(),
                })
            }
        };

        // 加密信封与历史明文文件都可加载
        let raw = match &self.cipher {
            Some(cipher) if WalletCipher::is_sealed(&raw) => cipher.open(&raw)?,
            _ => raw,
        };

        let mut wallet: Wallet =
            serde_json::from_slice(&raw).map_err(|e| StoreError::Corrupted {
                path: path.display().to_string(),
                error: e.to_string(),
            })?;

        // 文件名是主键
        wallet.wallet_id = wallet_id.to_string();

        let mut repaired = false;
        if wallet.rig_id.is_empty() {
            wallet.rig_id = wallet_id.to_string();
            repaired = true;
        }
        if wallet.rig_hash_power <= Decimal::ZERO {
            wallet.rig_hash_power = self.base_hash_power;
            repaired = true;
        }
        if wallet_id == WORLD_DEBT_WALLET_ID {
            // 世界债务钱包的节点 ID 固定，漂移即修复
            if wallet.node_id != WORLD_DEBT_NODE_ID {
                wallet.node_id = WORLD_DEBT_NODE_ID;
                repaired = true;
            }
        } else if wallet.node_id.is_nil() {
            wallet.node_id = Uuid::new_v4();
            repaired = true;
        }

        if repaired {
            debug!("Repaired wallet record on load: {}", wallet_id);
            self.save(&wallet)?;
        }

        Ok(wallet)
    }

    /// 保存钱包：临时文件 + 原子重命名
    pub fn save(&self, wallet: &Wallet) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(wallet).map_err(|e| StoreError::Serialize {
            wallet_id: wallet.wallet_id.clone(),
            error: e.to_string(),
        })?;

        let payload = match &self.cipher {
            Some(cipher) => cipher.seal(&json)?,
            None => json,
        };

        let path = self.wallet_path(&wallet.wallet_id);
        let tmp = self
            .dir
            .join(format!(".{}{}.tmp", wallet.wallet_id, WALLET_FILE_SUFFIX));

        std::fs::write(&tmp, &payload).map_err(|e| StoreError::Io {
            path: tmp.display().to_string(),
            error: e.to_string(),
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| StoreError::Io {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        Ok(())
    }

    /// 创建钱包；已存在则返回现有记录，系统保留 ID 被拒绝
    pub fn create(&self, wallet_id: &str, rig_id: Option<&str>) -> Result<Wallet, StoreError> {
        Self::validate_wallet_id(wallet_id)?;

        if is_reserved_wallet_id(wallet_id) {
            return Err(StoreError::ReservedWalletId {
                wallet_id: wallet_id.to_string(),
            });
        }

        if self.exists(wallet_id) {
            return self.load(wallet_id);
        }

        let wallet = Wallet::new(
            wallet_id,
            rig_id.unwrap_or(wallet_id),
            self.base_hash_power,
        );
        self.save(&wallet)?;
        info!(
            "🛠️ Created wallet {} (rig '{}', node {})",
            wallet.wallet_id, wallet.rig_id, wallet.node_id
        );

        Ok(wallet)
    }

    /// 初始化两个系统钱包（捐赠、世界债务）
    pub fn init_system_wallets(&self) -> Result<(), StoreError> {
        if !self.exists(DONATION_WALLET_ID) {
            info!("🛠️ Initializing donation wallet: {}", DONATION_WALLET_ID);
            let wallet = Wallet::new(DONATION_WALLET_ID, "donations", self.base_hash_power);
            self.save(&wallet)?;
        }

        if !self.exists(WORLD_DEBT_WALLET_ID) {
            info!("🛠️ Initializing world debt wallet: {}", WORLD_DEBT_WALLET_ID);
            let mut wallet = Wallet::new(
                WORLD_DEBT_WALLET_ID,
                "world debt fund",
                self.base_hash_power,
            );
            wallet.node_id = WORLD_DEBT_NODE_ID;
            self.save(&wallet)?;
        }

        Ok(())
    }

    /// 列出全部钱包 ID，系统钱包排在最前
    pub fn list_ids(&self) -> Result<Vec<String>, StoreError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| StoreError::Io {
            path: self.dir.display().to_string(),
            error: e.to_string(),
        })?;

        let mut ids: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter_map(|name| name.strip_suffix(WALLET_FILE_SUFFIX).map(str::to_string))
            .filter(|stem| !stem.starts_with('.'))
            .collect();

        ids.sort_by_key(|id| {
            (
                id != WORLD_DEBT_WALLET_ID,
                id != DONATION_WALLET_ID,
                id.clone(),
            )
        });

        Ok(ids)
    }

    /// 加载全部钱包，损坏的文件跳过并告警
    pub fn list(&self) -> Result<Vec<Wallet>, StoreError> {
        let mut wallets = Vec::new();
        for id in self.list_ids()? {
            match self.load(&id) {
                Ok(wallet) => wallets.push(wallet),
                Err(e) => warn!("⚠️ Skipping unreadable wallet {}: {}", id, e),
            }
        }
        Ok(wallets)
    }
}
