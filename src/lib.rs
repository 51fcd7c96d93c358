//! # kt-cli
//!
//! Client core for ktCloud file storage with end-to-end OpenPGP encryption.
//!
//! ## Features
//!
//! - **Encrypted uploads**: Files are encrypted on the client before they leave the machine
//! - **Encrypted downloads**: Ciphertext is fetched, authenticated and decrypted locally
//! - **Server-held keys**: Each disk carries its private key encrypted with the user's password
//! - **Streaming**: Uploads are encrypted on the fly, without buffering the whole file
//! - **Pluggable transport**: Pipelines talk to an [`ApiGateway`], so any transport (or a fake)
//!   can be used
//! - **Simple CLI**: The `kt-cli` binary wraps the library for everyday use
//!
//! ## Quick Start
//!
//! ```bash
//! # Store a token
//! kt-cli login --token "$TOKEN"
//!
//! # Upload encrypted to the default disk
//! KT_CLI_PASSWD=secret kt-cli upload report.pdf
//!
//! # Upload without encryption (asks for confirmation)
//! kt-cli upload --plain notes.txt
//!
//! # Download into the current directory
//! KT_CLI_PASSWD=secret kt-cli download 64f1c2...
//! ```
//!
//! ## How It Works
//!
//! Every disk owns an OpenPGP key pair. The server stores the public key in the clear and the
//! private key symmetrically encrypted with the user's password (`crypto_key`). Before the first
//! encrypted transfer the client:
//!
//! 1. fetches the disk record (`disks.get`)
//! 2. decrypts `crypto_key` with the password into the armored private key
//! 3. unlocks that key with the same password
//!
//! ### Data Flow
//!
//! **Upload:**
//! ```text
//! source → OpenPGP encrypt (worker thread) → bounded pipe → multipart POST /upload
//! ```
//!
//! **Download:**
//! ```text
//! files.getById → files.download → GET url → buffer → OpenPGP decrypt → sink
//! ```
//!
//! ## Module Overview
//!
//! - [`key`] - Key material and resolution against the remote API
//! - [`gpg`] - OpenPGP key ring: encrypt and decrypt capabilities
//! - [`upload`] - Upload pipeline
//! - [`download`] - Download pipeline
//! - [`api`] - Remote API boundary, wire types and typed method helpers
//! - [`http`] - `reqwest` implementation of the API boundary
//! - [`packet`] - Streaming OpenPGP packet framing for uploads
//! - [`pipe`] - Bounded pipe between the encryption worker and the HTTP body
//! - [`observer`] - Progress events and user confirmation
//! - [`config`] - Persistent client settings
//! - [`error`] - Error types and unified error handling
//!
//! ## Usage as a Library
//!
//! ```no_run
//! use std::fs::File;
//!
//! use kt_cli::{Config, HttpGateway, KeyMaterial, TracingObserver, UploadRequest};
//!
//! # fn main() -> kt_cli::Result<()> {
//! let gateway = HttpGateway::new(Config::default())?;
//! let file_id = kt_cli::upload(
//!     &gateway,
//!     &TracingObserver,
//!     UploadRequest {
//!         token: "token",
//!         name: "report.pdf",
//!         key_material: Some(KeyMaterial::with_password("secret")),
//!         ..Default::default()
//!     },
//!     File::open("report.pdf")?,
//! )?;
//! println!("{file_id}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Security Considerations
//!
//! - Passwords and decrypted keys live in zeroizing buffers and are wiped on drop
//! - The decrypt capability only exists for the duration of one transfer
//! - Decrypted plaintext never reaches the sink before the integrity check succeeded
//! - Key material is never persisted; only the access token is stored in the config file (0600)
//!
//! ## Cryptography Details
//!
//! - **Format**: OpenPGP (RFC 4880) binary messages
//! - **Session cipher**: AES-256 in a SEIPD v1 packet (MDC protected)
//! - **Payload**: ZLIB compressed literal data in binary mode, carrying the file name and the
//!   time of encryption
//! - **Recipient**: the first encryption-capable subkey, else an encryption-capable primary key
//! - **Server-held key**: password-encrypted (SKESK) OpenPGP message containing the armored
//!   private key
//!
//! ## Testing
//!
//! ```bash
//! # Unit tests
//! cargo test --lib
//!
//! # Pipelines against an in-memory gateway
//! cargo test --test upload_test --test download_test --test key_resolution_test
//!
//! # Binary
//! cargo test --test cli_test
//! ```
//!
//! The OpenPGP fixtures in `tests/fixtures/` were produced with GnuPG, so interoperability with
//! other implementations is covered as well.

pub mod api;
pub mod config;
pub mod download;
pub mod error;
pub mod gpg;
pub mod http;
pub mod key;
pub mod observer;
pub mod packet;
pub mod pipe;
pub mod upload;

// Re-export commonly used types
pub use api::ApiGateway;
pub use config::Config;
pub use download::{download, DownloadRequest, Downloaded};
pub use error::{KtError, Result};
pub use gpg::KeyRing;
pub use http::HttpGateway;
pub use key::{KeyMaterial, KeyResolver};
pub use observer::{Observer, TracingObserver, TransferEvent};
pub use upload::{upload, UploadRequest};
