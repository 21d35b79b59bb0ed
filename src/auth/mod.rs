//! Encrypted storage for the studio session token
//!
//! Secrets are kept in `~/.config/keiro/credentials.enc`, AES-256-GCM
//! encrypted with a key derived from machine identifiers. The file holds the
//! 12-byte nonce followed by the ciphertext of a JSON map.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use anyhow::{Context, Result, anyhow};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

const NONCE_SIZE: usize = 12;
const SESSION_KEY: &str = "studio:session";

/// Machine identifier for key derivation
fn machine_id() -> String {
    #[cfg(target_os = "linux")]
    {
        for candidate in ["/etc/machine-id", "/var/lib/dbus/machine-id"] {
            if let Ok(id) = fs::read_to_string(candidate) {
                return id.trim().to_string();
            }
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Ok(output) = std::process::Command::new("ioreg")
            .args(["-rd1", "-c", "IOPlatformExpertDevice"])
            .output()
        {
            let stdout = String::from_utf8_lossy(&output.stdout);
            if let Some(uuid) = stdout
                .lines()
                .find(|line| line.contains("IOPlatformUUID"))
                .and_then(|line| line.split('"').nth(3))
            {
                return uuid.to_string();
            }
        }
    }

    dirs::home_dir().map_or_else(|| "keiro-fallback-key".to_string(), |p| p.to_string_lossy().to_string())
}

fn derive_key() -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(machine_id().as_bytes());
    if let Some(home) = dirs::home_dir() {
        hasher.update(home.to_string_lossy().as_bytes());
    }
    hasher.update(b"keiro-studio-session-v1");
    hasher.finalize().into()
}

/// Encrypted key/value file for secrets
#[derive(Debug, Clone)]
pub struct Vault {
    path: PathBuf,
    key: [u8; 32],
}

impl Vault {
    /// Vault at the default location
    pub fn open() -> Result<Self> {
        Ok(Self::at(paths::credentials_path()?))
    }

    /// Vault at a specific path, keyed to this machine
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            key: derive_key(),
        }
    }

    /// Vault with an explicit key
    pub fn with_key(path: impl Into<PathBuf>, key: [u8; 32]) -> Self {
        Self {
            path: path.into(),
            key,
        }
    }

    /// File backing this vault
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn cipher(&self) -> Result<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&self.key).map_err(|_| anyhow!("Invalid vault key length"))
    }

    fn load(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let encrypted = fs::read(&self.path).context("Failed to read credentials file")?;
        if encrypted.len() < NONCE_SIZE {
            return Ok(HashMap::new());
        }

        let (nonce, ciphertext) = encrypted.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher()?
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| anyhow!("Failed to decrypt credentials"))?;
        serde_json::from_slice(&plaintext).context("Corrupt credentials file")
    }

    fn save(&self, secrets: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create credentials directory")?;
        }
        let json = serde_json::to_vec(secrets)?;

        let mut nonce = [0u8; NONCE_SIZE];
        rand::rng().fill(&mut nonce);
        let ciphertext = self
            .cipher()?
            .encrypt(Nonce::from_slice(&nonce), json.as_slice())
            .map_err(|_| anyhow!("Failed to encrypt credentials"))?;

        let mut output = nonce.to_vec();
        output.extend(ciphertext);
        fs::write(&self.path, output).context("Failed to write credentials file")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    /// Read a secret
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load()?.get(key).cloned())
    }

    /// Store a secret
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut secrets = self.load().unwrap_or_default();
        secrets.insert(key.to_string(), value.to_string());
        self.save(&secrets)
    }

    /// Remove a secret
    pub fn remove(&self, key: &str) -> Result<()> {
        let mut secrets = self.load().unwrap_or_default();
        if secrets.remove(key).is_some() {
            self.save(&secrets)?;
        }
        Ok(())
    }

    /// Bearer token for the studio backend
    pub fn session_token(&self) -> Result<Option<String>> {
        self.get(SESSION_KEY)
    }

    /// Store the bearer token after sign-in
    pub fn store_session_token(&self, token: &str) -> Result<()> {
        self.set(SESSION_KEY, token.trim())
    }

    /// Forget the bearer token
    pub fn clear_session_token(&self) -> Result<()> {
        self.remove(SESSION_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_session_token_lifecycle() {
        let dir = tempdir().unwrap();
        let vault = Vault::with_key(dir.path().join("credentials.enc"), [7; 32]);

        assert_eq!(vault.session_token().unwrap(), None);
        vault.store_session_token(" tok_123 \n").unwrap();
        assert_eq!(vault.session_token().unwrap().as_deref(), Some("tok_123"));

        vault.clear_session_token().unwrap();
        assert_eq!(vault.session_token().unwrap(), None);
    }

    #[test]
    fn test_file_is_not_plaintext() {
        let dir = tempdir().unwrap();
        let vault = Vault::with_key(dir.path().join("credentials.enc"), [1; 32]);
        vault.store_session_token("super-secret-token").unwrap();

        let raw = fs::read(vault.path()).unwrap();
        assert!(!String::from_utf8_lossy(&raw).contains("super-secret-token"));
    }

    #[test]
    fn test_wrong_key_fails_to_decrypt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("credentials.enc");
        Vault::with_key(&path, [1; 32]).store_session_token("tok").unwrap();

        assert!(Vault::with_key(&path, [2; 32]).session_token().is_err());
    }
}
