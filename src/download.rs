//! # Download Pipeline
//!
//! ```text
//! files.getById -> (resolve keys) -> files.download -> GET url -> (decrypt) -> sink
//! ```
//!
//! Each step needs the previous one to succeed; any failure aborts the download. The sink may
//! already hold some bytes when a plaintext transfer fails midway, and the caller is
//! responsible for discarding it.
//!
//! Encrypted files are buffered completely before decryption. The plaintext is only written to
//! the sink after the message integrity check passed, so a failed decryption leaves the sink
//! untouched.

use std::io::{self, Read, Write};

use crate::api::{self, ApiGateway};
use crate::error::{KtError, Result};
use crate::key::{KeyMaterial, KeyResolver};
use crate::observer::{Observer, TransferEvent};

#[derive(Debug, Default)]
pub struct DownloadRequest<'a> {
    pub token: &'a str,
    pub file_id: &'a str,
    /// Required for encrypted files; ignored otherwise.
    pub key_material: Option<KeyMaterial>,
}

/// Outcome of a successful download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    /// Original file name from the server metadata.
    pub name: String,
    pub bytes: u64,
}

pub fn download<W>(
    gateway: &dyn ApiGateway,
    observer: &dyn Observer,
    request: DownloadRequest<'_>,
    sink: &mut W,
) -> Result<Downloaded>
where
    W: Write + ?Sized,
{
    let file_id = request.file_id.trim();
    if file_id.is_empty() {
        return Err(KtError::MissingFileId);
    }

    let record = api::file_by_id(gateway, request.token, file_id)?;

    let material = if record.encrypted {
        let material = request
            .key_material
            .ok_or_else(|| KtError::EncryptedNoCryptoInfo(file_id.to_string()))?;
        Some(KeyResolver::new(gateway, request.token).resolve(material, &record.disk)?)
    } else {
        None
    };

    observer.on_event(&TransferEvent::DownloadStarted {
        name: &record.name,
        mime: &record.mime,
    });

    let link = api::download_link(gateway, request.token, file_id)?;
    if link.url.trim().is_empty() {
        return Err(KtError::EmptyDownloadUrl(file_id.to_string()));
    }

    let mut fetched = gateway.fetch(&link.url)?;
    if fetched.status != 200 {
        return Err(KtError::BadUpstreamStatus {
            status: fetched.status,
            reason: fetched.reason,
        });
    }

    let bytes = match material {
        Some(material) => {
            observer.on_event(&TransferEvent::FetchingCiphertext);
            let mut ciphertext = Vec::new();
            fetched.body.read_to_end(&mut ciphertext)?;

            observer.on_event(&TransferEvent::Decrypting);
            decrypt_into(&material, &record.disk, &ciphertext, sink, observer)?
        }
        None => {
            observer.on_event(&TransferEvent::PlainDownload);
            io::copy(&mut fetched.body, sink)?
        }
    };

    observer.on_event(&TransferEvent::Downloaded { bytes });
    Ok(Downloaded {
        name: record.name,
        bytes,
    })
}

/// The decrypt capability lives only for the duration of this call.
fn decrypt_into<W>(
    material: &KeyMaterial,
    disk: &str,
    ciphertext: &[u8],
    sink: &mut W,
    observer: &dyn Observer,
) -> Result<u64>
where
    W: Write + ?Sized,
{
    let (_, decryptor) = material.key_ring(disk)?;
    let plaintext = decryptor.decrypt(ciphertext)?;
    drop(decryptor);

    observer.on_event(&TransferEvent::Saving);
    sink.write_all(&plaintext)?;
    Ok(plaintext.len() as u64)
}
