use thiserror::Error;

#[derive(Error, Debug)]
pub enum KtError {
    #[error("No password or decrypted key provided")]
    MissingCredentials,

    #[error("Disk {disk} has no encrypted key to decrypt")]
    IncompleteKeyData { disk: String },

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Invalid armored key: {0}")]
    KeyParse(String),

    #[error("Passphrase does not unlock the private key")]
    UnlockFailed,

    #[error("Public key cannot encrypt")]
    KeyNotEncryptionCapable,

    #[error("File id is required")]
    MissingFileId,

    #[error("File {0} not found or you have no access to it")]
    FileNotFound(String),

    #[error("File {0} is encrypted but no crypto info provided")]
    EncryptedNoCryptoInfo(String),

    #[error("Download url for file {0} is empty")]
    EmptyDownloadUrl(String),

    #[error("Bad response status code: {status} {reason}")]
    BadUpstreamStatus { status: u16, reason: String },

    #[error("Upload aborted by user")]
    UploadAborted,

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("Disk not found: {0}")]
    DiskNotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not logged in. Run `kt-cli login` or pass --token")]
    NotLoggedIn,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<reqwest::Error> for KtError {
    fn from(err: reqwest::Error) -> Self {
        KtError::Network(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, KtError>;
