use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::errors::CoreError;

pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;

/// Sealed header: memory_cost(4) + time_cost(4) + parallelism(4) + salt(16) + nonce(12).
pub const SEALED_HEADER_LEN: usize = 12 + SALT_LEN + NONCE_LEN;

/// AES-GCM authentication tag length.
const TAG_LEN: usize = 16;

/// Argon2id parameters for key derivation.
/// Written into every sealed value so they can be raised later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB (default: 65536 = 64 MB)
    pub memory_cost: u32,
    /// Number of iterations (default: 3)
    pub time_cost: u32,
    /// Degree of parallelism (default: 4)
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_cost: 65_536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    /// Reject parameters outside the ranges we are willing to run,
    /// so a crafted vault cannot make unlocking exhaust memory.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(8..=1_048_576).contains(&self.memory_cost) {
            return Err(CoreError::InvalidFormat(format!(
                "KDF memory_cost out of safe range: {} KiB (expected 8..1048576)",
                self.memory_cost
            )));
        }
        if !(1..=20).contains(&self.time_cost) {
            return Err(CoreError::InvalidFormat(format!(
                "KDF time_cost out of safe range: {} (expected 1..20)",
                self.time_cost
            )));
        }
        if !(1..=16).contains(&self.parallelism) {
            return Err(CoreError::InvalidFormat(format!(
                "KDF parallelism out of safe range: {} (expected 1..16)",
                self.parallelism
            )));
        }
        Ok(())
    }
}

/// Derive a 256-bit key from a password using Argon2id.
pub fn derive_key(
    password: &str,
    salt: &[u8; SALT_LEN],
    params: &KdfParams,
) -> Result<[u8; 32], CoreError> {
    let argon2_params = Params::new(
        params.memory_cost,
        params.time_cost,
        params.parallelism,
        Some(32),
    )
    .map_err(|e| CoreError::Encryption(format!("Invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = [0u8; 32];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|e| CoreError::Encryption(format!("Argon2 key derivation failed: {e}")))?;

    Ok(key)
}

/// Encrypt a value under `password` with a fresh salt and nonce.
///
/// Layout:
/// ```text
/// [memory_cost: 4B LE] [time_cost: 4B LE] [parallelism: 4B LE]
/// [salt: 16B] [nonce: 12B] [ciphertext + tag: variable]
/// ```
pub fn seal(plaintext: &[u8], password: &str, params: &KdfParams) -> Result<Vec<u8>, CoreError> {
    params.validate()?;
    let salt = random_bytes::<SALT_LEN>()?;
    let nonce = random_bytes::<NONCE_LEN>()?;
    let key = derive_key(password, &salt, params)?;

    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| CoreError::Encryption(format!("Failed to create cipher: {e}")))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| CoreError::Encryption(format!("Encryption failed: {e}")))?;

    let mut sealed = Vec::with_capacity(SEALED_HEADER_LEN + ciphertext.len());
    sealed.extend_from_slice(&params.memory_cost.to_le_bytes());
    sealed.extend_from_slice(&params.time_cost.to_le_bytes());
    sealed.extend_from_slice(&params.parallelism.to_le_bytes());
    sealed.extend_from_slice(&salt);
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Decrypt a value produced by [`seal`].
///
/// Returns `CoreError::Decryption` if the password is wrong or the data has
/// been tampered with, and `CoreError::InvalidFormat` for a malformed header.
pub fn open(sealed: &[u8], password: &str) -> Result<Vec<u8>, CoreError> {
    if sealed.len() < SEALED_HEADER_LEN + TAG_LEN {
        return Err(CoreError::InvalidFormat(format!(
            "Sealed value too short: {} bytes",
            sealed.len()
        )));
    }

    let params = KdfParams {
        memory_cost: read_u32(sealed, 0)?,
        time_cost: read_u32(sealed, 4)?,
        parallelism: read_u32(sealed, 8)?,
    };
    params.validate()?;

    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&sealed[12..12 + SALT_LEN]);
    let nonce = &sealed[12 + SALT_LEN..SEALED_HEADER_LEN];
    let ciphertext = &sealed[SEALED_HEADER_LEN..];

    let key = derive_key(password, &salt, &params)?;
    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| CoreError::Encryption(format!("Failed to create cipher: {e}")))?;

    Ok(cipher.decrypt(Nonce::from_slice(nonce), ciphertext)?)
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32, CoreError> {
    let bytes: [u8; 4] = data[offset..offset + 4]
        .try_into()
        .map_err(|_| CoreError::InvalidFormat(format!("Failed to read header at {offset}")))?;
    Ok(u32::from_le_bytes(bytes))
}

/// Cryptographically secure random bytes (salts, nonces).
pub fn random_bytes<const N: usize>() -> Result<[u8; N], CoreError> {
    let mut bytes = [0u8; N];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| CoreError::Encryption(format!("Failed to generate random bytes: {e}")))?;
    Ok(bytes)
}
