//! Progress reporting and user confirmation for transfers.
//!
//! Pipelines never print. They hand every observable step to an [`Observer`] supplied by the
//! caller; the CLI renders them on the console, library users get [`TracingObserver`].

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent<'a> {
    UploadStarted { name: &'a str },
    Encrypting,
    UploadingPlain,
    Sending,
    Uploaded { file_id: &'a str },
    DownloadStarted { name: &'a str, mime: &'a str },
    FetchingCiphertext,
    Decrypting,
    Saving,
    PlainDownload,
    Downloaded { bytes: u64 },
}

impl fmt::Display for TransferEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferEvent::UploadStarted { name } => write!(f, "Uploading file {name}"),
            TransferEvent::Encrypting => f.write_str("Encrypting"),
            TransferEvent::UploadingPlain => f.write_str("Uploading without encryption"),
            TransferEvent::Sending => f.write_str("Uploading file to server"),
            TransferEvent::Uploaded { file_id } => {
                write!(f, "File uploaded successfully. File ID: {file_id}")
            }
            TransferEvent::DownloadStarted { name, mime } => {
                write!(f, "Downloading file {name} ({mime})")
            }
            TransferEvent::FetchingCiphertext => f.write_str("File is encrypted, downloading first"),
            TransferEvent::Decrypting => f.write_str("File downloaded. Decrypting now"),
            TransferEvent::Saving => f.write_str("File decrypted. Saving now"),
            TransferEvent::PlainDownload => f.write_str("File is not encrypted, downloading as-is"),
            TransferEvent::Downloaded { bytes } => write!(f, "Download is done ({bytes} bytes)"),
        }
    }
}

pub trait Observer {
    fn on_event(&self, event: &TransferEvent<'_>);

    /// Ask a yes/no question. Non-interactive observers answer `true`.
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// Logs every event through `tracing` and never asks the user anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_event(&self, event: &TransferEvent<'_>) {
        tracing::info!("{event}");
    }
}
