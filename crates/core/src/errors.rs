use thiserror::Error;

/// Unified error type for the entire stock-tracker-core library.
/// Every fallible public function returns `Result<T, CoreError>`.
///
/// The holdings/summary/watchlist calculations never produce one of these:
/// they degrade to zero values and report ledger anomalies as warnings.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Credential vault ────────────────────────────────────────────
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported vault version: {0}")]
    UnsupportedVersion(u16),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Could not open credential: wrong password or corrupted entry")]
    Decryption,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ── File I/O (native only) ──────────────────────────────────────
    #[error("File I/O error: {0}")]
    FileIO(String),

    // ── Session ─────────────────────────────────────────────────────
    #[error("Session is locked; unlock the credential vault first")]
    SessionLocked,

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    // ── API / Network ───────────────────────────────────────────────
    #[error("API error ({provider}): {message}")]
    Api {
        provider: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Quote not available for {symbol}")]
    QuoteNotAvailable { symbol: String },

    // ── Business Logic ──────────────────────────────────────────────
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

// ── Conversions ─────────────────────────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<bincode::Error> for CoreError {
    fn from(e: bincode::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

/// Both HTTP clients authenticate with a query parameter (`apikey=` for
/// Twelve Data, `key=` for Google Sheets), and reqwest puts the full URL in
/// its messages. Only scheme, host and path are kept.
impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        let endpoint = e
            .url()
            .map(|url| format!("{}{}", url.origin().ascii_serialization(), url.path()));
        let e = e.without_url();
        match endpoint {
            Some(endpoint) => CoreError::Network(format!("{e} ({endpoint})")),
            None => CoreError::Network(e.to_string()),
        }
    }
}

impl From<aes_gcm::Error> for CoreError {
    fn from(_: aes_gcm::Error) -> Self {
        CoreError::Decryption
    }
}
