use log::info;

use crate::errors::CoreError;
use crate::storage::vault::CredentialVault;

/// Vault entry names for the three stored credentials.
pub const TWELVE_DATA_KEY: &str = "twelve_data_api_key";
pub const GOOGLE_SHEETS_KEY: &str = "google_sheets_api_key";
pub const GOOGLE_SHEET_ID_KEY: &str = "google_sheet_id";

const ALL_KEYS: [&str; 3] = [GOOGLE_SHEETS_KEY, TWELVE_DATA_KEY, GOOGLE_SHEET_ID_KEY];

/// Decrypted API credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKeys {
    pub google_sheets_api_key: String,
    pub twelve_data_api_key: String,
    pub google_sheet_id: String,
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeys")
            .field("google_sheets_api_key", &"<redacted>")
            .field("twelve_data_api_key", &"<redacted>")
            .field("google_sheet_id", &"<redacted>")
            .finish()
    }
}

/// Encrypt all three credentials into the vault under `password`.
pub fn save_api_keys(
    vault: &mut CredentialVault,
    keys: &ApiKeys,
    password: &str,
) -> Result<(), CoreError> {
    vault.store(GOOGLE_SHEETS_KEY, &keys.google_sheets_api_key, password)?;
    vault.store(TWELVE_DATA_KEY, &keys.twelve_data_api_key, password)?;
    vault.store(GOOGLE_SHEET_ID_KEY, &keys.google_sheet_id, password)?;
    Ok(())
}

/// Whether the vault holds every credential a session needs.
pub fn has_stored_api_keys(vault: &CredentialVault) -> bool {
    ALL_KEYS.iter().all(|name| vault.contains(name))
}

/// The unlocked-or-locked state of one user session.
///
/// Passed explicitly to whatever needs credentials (see
/// [`QuoteService::from_session`](crate::services::quote_service::QuoteService::from_session)).
/// Keys are acquired by [`unlock`](Self::unlock) and dropped by
/// [`lock`](Self::lock).
#[derive(Debug, Default)]
pub struct Session {
    api_keys: Option<ApiKeys>,
}

impl Session {
    /// A new, locked session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decrypt the credentials from `vault`. On any failure the session
    /// stays as it was.
    pub fn unlock(&mut self, vault: &CredentialVault, password: &str) -> Result<(), CoreError> {
        let google_sheets_api_key = Self::required(vault, GOOGLE_SHEETS_KEY, password)?;
        let twelve_data_api_key = Self::required(vault, TWELVE_DATA_KEY, password)?;
        let google_sheet_id = Self::required(vault, GOOGLE_SHEET_ID_KEY, password)?;

        self.api_keys = Some(ApiKeys {
            google_sheets_api_key,
            twelve_data_api_key,
            google_sheet_id,
        });
        info!("Session unlocked");
        Ok(())
    }

    fn required(vault: &CredentialVault, name: &str, password: &str) -> Result<String, CoreError> {
        vault
            .retrieve(name, password)?
            .filter(|v| !v.is_empty())
            .ok_or_else(|| CoreError::MissingCredential(name.to_string()))
    }

    /// Forget the decrypted credentials.
    pub fn lock(&mut self) {
        if self.api_keys.take().is_some() {
            info!("Session locked");
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.api_keys.is_some()
    }

    pub fn api_keys(&self) -> Result<&ApiKeys, CoreError> {
        self.api_keys.as_ref().ok_or(CoreError::SessionLocked)
    }
}
