use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::CoreError;

use super::encryption::{self, KdfParams};

/// Magic bytes identifying a serialized credential vault.
pub const MAGIC: &[u8; 4] = b"STKV";

/// Current vault format version.
pub const CURRENT_VERSION: u16 = 1;

/// magic(4) + version(2)
const PREFIX_LEN: usize = 6;

/// Password-protected store of named secrets (API keys, sheet ids).
///
/// Every entry is sealed on its own with a fresh salt and nonce, so entries
/// can be added or replaced without re-encrypting the rest. The vault itself
/// holds only ciphertext; nothing decrypted is ever kept here.
#[derive(Debug, Clone, Default)]
pub struct CredentialVault {
    entries: BTreeMap<String, Vec<u8>>,
    kdf_params: KdfParams,
}

#[derive(Serialize, Deserialize)]
struct VaultContents {
    entries: BTreeMap<String, Vec<u8>>,
}

impl CredentialVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use non-default Argon2id parameters for entries stored from now on.
    pub fn with_kdf_params(mut self, params: KdfParams) -> Self {
        self.kdf_params = params;
        self
    }

    /// Encrypt `value` under `password` and store it as `name`,
    /// replacing any previous entry.
    pub fn store(&mut self, name: &str, value: &str, password: &str) -> Result<(), CoreError> {
        let sealed = encryption::seal(value.as_bytes(), password, &self.kdf_params)?;
        self.entries.insert(name.to_string(), sealed);
        Ok(())
    }

    /// Decrypt the entry `name`. `Ok(None)` when there is no such entry.
    pub fn retrieve(&self, name: &str, password: &str) -> Result<Option<String>, CoreError> {
        let Some(sealed) = self.entries.get(name) else {
            return Ok(None);
        };
        let plaintext = encryption::open(sealed, password)?;
        let value = String::from_utf8(plaintext)
            .map_err(|e| CoreError::Deserialization(format!("Entry {name} is not UTF-8: {e}")))?;
        Ok(Some(value))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Remove an entry. Returns whether it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize the (already encrypted) entries to portable bytes.
    ///
    /// Layout: `[STKV: 4B] [version: 2B LE] [bincode(entries)]`
    pub fn save_to_bytes(&self) -> Result<Vec<u8>, CoreError> {
        let contents = VaultContents {
            entries: self.entries.clone(),
        };
        let body = bincode::serialize(&contents)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize vault: {e}")))?;

        let mut bytes = Vec::with_capacity(PREFIX_LEN + body.len());
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&CURRENT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    /// Parse bytes written by [`save_to_bytes`](Self::save_to_bytes).
    /// No password is needed: entries stay sealed until retrieved.
    pub fn load_from_bytes(data: &[u8]) -> Result<Self, CoreError> {
        if data.len() < PREFIX_LEN {
            return Err(CoreError::InvalidFormat(
                "Data too small to be a credential vault".into(),
            ));
        }
        if &data[0..4] != MAGIC {
            return Err(CoreError::InvalidFormat(
                "Invalid magic bytes — not a credential vault".into(),
            ));
        }
        let version = u16::from_le_bytes([data[4], data[5]]);
        if version == 0 || version > CURRENT_VERSION {
            return Err(CoreError::UnsupportedVersion(version));
        }

        let contents: VaultContents = bincode::deserialize(&data[PREFIX_LEN..])
            .map_err(|e| CoreError::Deserialization(format!("Failed to deserialize vault: {e}")))?;

        Ok(Self {
            entries: contents.entries,
            kdf_params: KdfParams::default(),
        })
    }

    /// Save the vault to disk (native only).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<(), CoreError> {
        let bytes = self.save_to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Load a vault from disk (native only).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Self, CoreError> {
        let bytes = std::fs::read(path)?;
        Self::load_from_bytes(&bytes)
    }
}
