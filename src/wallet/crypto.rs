//! 钱包文件静态加密
//!
//! 可选的 AES-256-GCM 信封：密钥生成后存放在钱包目录旁的密钥
//! 文件中，钱包 JSON 整体加密落盘。

use crate::error::StoreError;
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// 加密信封
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedWallet {
    /// 密文（Base64 编码）
    pub data: String,
    /// 随机数（Base64 编码）
    pub nonce: String,
}

/// 钱包加密器，单密钥方案
pub struct WalletCipher {
    cipher: Aes256Gcm,
}

impl WalletCipher {
    /// 从密钥文件加载密钥，文件不存在则生成新密钥并写入
    pub fn load_or_generate(key_path: &Path) -> Result<Self, StoreError> {
        let key_bytes: Vec<u8> = if key_path.exists() {
            let encoded = std::fs::read_to_string(key_path).map_err(|e| StoreError::Io {
                path: key_path.display().to_string(),
                error: e.to_string(),
            })?;
            general_purpose::STANDARD
                .decode(encoded.trim())
                .map_err(|e| StoreError::Crypto(format!("Key file decode failed: {}", e)))?
        } else {
            let key = Aes256Gcm::generate_key(&mut OsRng);
            let encoded = general_purpose::STANDARD.encode(&key);
            std::fs::write(key_path, encoded).map_err(|e| StoreError::Io {
                path: key_path.display().to_string(),
                error: e.to_string(),
            })?;
            debug!("Generated new wallet encryption key: {}", key_path.display());
            key.to_vec()
        };

        if key_bytes.len() != 32 {
            return Err(StoreError::Crypto(
                "Wallet encryption key must be 32 bytes".to_string(),
            ));
        }

        let key = Key::<Aes256Gcm>::from_slice(&key_bytes);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// 加密钱包 JSON
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, StoreError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| StoreError::Crypto(format!("Wallet encryption failed: {}", e)))?;

        let sealed = SealedWallet {
            data: general_purpose::STANDARD.encode(&ciphertext),
            nonce: general_purpose::STANDARD.encode(&nonce),
        };

        serde_json::to_vec_pretty(&sealed)
            .map_err(|e| StoreError::Crypto(format!("Envelope serialization failed: {}", e)))
    }

    /// 解密钱包信封
    pub fn open(&self, payload: &[u8]) -> Result<Vec<u8>, StoreError> {
        let sealed: SealedWallet = serde_json::from_slice(payload)
            .map_err(|e| StoreError::Crypto(format!("Envelope deserialization failed: {}", e)))?;

        let ciphertext = general_purpose::STANDARD
            .decode(&sealed.data)
            .map_err(|e| StoreError::Crypto(format!("Ciphertext decode failed: {}", e)))?;

        let nonce_bytes = general_purpose::STANDARD
            .decode(&sealed.nonce)
            .map_err(|e| StoreError::Crypto(format!("Nonce decode failed: {}", e)))?;

        let nonce = Nonce::from_slice(&nonce_bytes);

        self.cipher
            .decrypt(nonce, ciphertext.as_ref())
            .map_err(|e| StoreError::Crypto(format!("Wallet decryption failed: {}", e)))
    }

    /// 判断文件内容是否为加密信封（区别于明文钱包 JSON）
    pub fn is_sealed(payload: &[u8]) -> bool {
        serde_json::from_slice::<SealedWallet>(payload).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_key_path(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("capminer_key_{}_{}.key", tag, uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let key_path = temp_key_path("roundtrip");
        let cipher = WalletCipher::load_or_generate(&key_path).unwrap();

        let plaintext = br#"{"wallet_id": "alice", "capsule_value_mb": 100.0}"#;
        let sealed = cipher.seal(plaintext).unwrap();
        assert!(WalletCipher::is_sealed(&sealed));

        let opened = cipher.open(&sealed).unwrap();
        assert_eq!(opened, plaintext);

        let _ = std::fs::remove_file(&key_path);
    }

    #[test]
    fn test_key_persists_across_instances() {
        let key_path = temp_key_path("persist");
        let first = WalletCipher::load_or_generate(&key_path).unwrap();
        let sealed = first.seal(b"payload").unwrap();

        // 重新加载同一密钥文件仍能解开
        let second = WalletCipher::load_or_generate(&key_path).unwrap();
        assert_eq!(second.open(&sealed).unwrap(), b"payload");

        let _ = std::fs::remove_file(&key_path);
    }

    #[test]
    fn test_plain_json_is_not_sealed() {
        assert!(!WalletCipher::is_sealed(b"{\"wallet_id\": \"alice\"}"));
        assert!(!WalletCipher::is_sealed(b"not json at all"));
    }
}
