use base64::{engine::general_purpose, Engine as _};
use rand::Rng;
use ring::aead::{self, Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use crate::error::{Result, StorageError};

/// 生成一个 24 字节的随机口令（用于首次启动时未配置管理员密码的情况）
pub fn generate_password() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 24] = rng.gen();
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// 使用 bcrypt 对密码进行哈希
pub fn hash_password(password: &str) -> Result<String> {
    Ok(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
}

/// 验证密码是否匹配哈希值
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    Ok(bcrypt::verify(password, hash)?)
}

/// AES-256-GCM cipher for secrets stored in the database (provider API keys).
pub struct SecretCipher {
    key_bytes: Vec<u8>,
}

impl SecretCipher {
    /// 从密钥文件加载或自动生成
    pub fn load_or_create(data_dir: &Path) -> Result<Self> {
        let key_path = data_dir.join("secret.key");
        let key_bytes = if key_path.exists() {
            std::fs::read(&key_path)?
        } else {
            let rng = SystemRandom::new();
            let mut key = vec![0u8; 32];
            rng.fill(&mut key)
                .map_err(|_| StorageError::Crypto("failed to generate encryption key".into()))?;
            std::fs::write(&key_path, &key)?;
            #[cfg(unix)]
            {
                let perms = std::fs::Permissions::from_mode(0o600);
                std::fs::set_permissions(&key_path, perms)?;
            }
            tracing::info!(path = %key_path.display(), "Generated new secret encryption key");
            key
        };

        if key_bytes.len() != 32 {
            return Err(StorageError::Crypto(format!(
                "invalid encryption key length: expected 32 bytes, got {}",
                key_bytes.len()
            )));
        }

        Ok(Self { key_bytes })
    }

    fn key(&self) -> Result<LessSafeKey> {
        let unbound = UnboundKey::new(&AES_256_GCM, &self.key_bytes)
            .map_err(|_| StorageError::Crypto("invalid encryption key".into()))?;
        Ok(LessSafeKey::new(unbound))
    }

    /// 加密，返回 base64 编码的 nonce + ciphertext
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let key = self.key()?;

        let rng = SystemRandom::new();
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rng.fill(&mut nonce_bytes)
            .map_err(|_| StorageError::Crypto("failed to generate nonce".into()))?;
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let mut in_out = plaintext.as_bytes().to_vec();
        key.seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| StorageError::Crypto("encryption failed".into()))?;

        // nonce (12 bytes) + ciphertext + tag
        let mut out = nonce_bytes.to_vec();
        out.extend_from_slice(&in_out);
        Ok(general_purpose::STANDARD.encode(&out))
    }

    pub fn decrypt(&self, encrypted: &str) -> Result<String> {
        let data = general_purpose::STANDARD
            .decode(encrypted)
            .map_err(|e| StorageError::Crypto(format!("invalid base64: {e}")))?;
        if data.len() < NONCE_LEN + aead::AES_256_GCM.tag_len() {
            return Err(StorageError::Crypto("encrypted data too short".into()));
        }

        let key = self.key()?;
        let (nonce_bytes, ciphertext) = data.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| StorageError::Crypto("invalid nonce".into()))?;

        let mut in_out = ciphertext.to_vec();
        let plaintext = key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| StorageError::Crypto("decryption failed".into()))?;

        String::from_utf8(plaintext.to_vec())
            .map_err(|e| StorageError::Crypto(format!("decrypted secret is not UTF-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn generated_passwords_differ() {
        let a = generate_password();
        let b = generate_password();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn hash_and_verify_password() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("battery staple", &hash).unwrap());
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let dir = TempDir::new().unwrap();
        let cipher = SecretCipher::load_or_create(dir.path()).unwrap();

        let encrypted = cipher.encrypt("sk-live-123").unwrap();
        assert_ne!(encrypted, "sk-live-123");
        assert_eq!(cipher.decrypt(&encrypted).unwrap(), "sk-live-123");
    }

    #[test]
    fn key_file_is_reused() {
        let dir = TempDir::new().unwrap();
        let encrypted = SecretCipher::load_or_create(dir.path())
            .unwrap()
            .encrypt("persisted")
            .unwrap();

        // 重新加载应使用同一密钥
        let reloaded = SecretCipher::load_or_create(dir.path()).unwrap();
        assert_eq!(reloaded.decrypt(&encrypted).unwrap(), "persisted");
    }

    #[test]
    fn wrong_key_fails() {
        let dir1 = TempDir::new().unwrap();
        let dir2 = TempDir::new().unwrap();

        let enc1 = SecretCipher::load_or_create(dir1.path()).unwrap();
        let enc2 = SecretCipher::load_or_create(dir2.path()).unwrap();

        let encrypted = enc1.encrypt("secret").unwrap();
        assert!(enc2.decrypt(&encrypted).is_err());
    }
}
