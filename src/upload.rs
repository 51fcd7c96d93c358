//! # Upload Pipeline
//!
//! Sends one file to the upload endpoint as a multipart form:
//!
//! ```text
//! token, disk, folder, crypto ("0" | "1"), file
//! ```
//!
//! ## Paths
//!
//! - **Plaintext** (no key material): the observer must confirm the unencrypted upload, then the
//!   content is streamed into the file part unmodified.
//! - **Encrypted**: the key material is resolved, the key ring is built and the content is
//!   encrypted on a worker thread into a bounded pipe that feeds the file part. The OpenPGP
//!   trailer is written before the pipe closes, so the multipart boundary always follows a
//!   complete message.
//!
//! Nothing is retried; a failed upload can be repeated by the caller as a whole.

use std::io::Read;
use std::thread;

use crate::api::{ApiGateway, ApiResponse, FilePart, MultipartForm, PostedResponse, UploadReceipt};
use crate::error::{KtError, Result};
use crate::key::{KeyMaterial, KeyResolver};
use crate::observer::{Observer, TransferEvent};
use crate::pipe::{self, PipeReader};

const PLAINTEXT_PROMPT: &str = "You are uploading a file without encryption. Continue? (y/n): ";

/// Everything about an upload except its content.
#[derive(Debug, Default)]
pub struct UploadRequest<'a> {
    pub token: &'a str,
    pub name: &'a str,
    /// Overrides the MIME type guessed from `name`.
    pub mime: Option<&'a str>,
    pub disk: &'a str,
    pub folder: &'a str,
    /// `None` selects the plaintext path.
    pub key_material: Option<KeyMaterial>,
}

type EncryptWorker = thread::JoinHandle<Result<()>>;

/// Upload `content` and return the server-assigned file id.
pub fn upload<R>(
    gateway: &dyn ApiGateway,
    observer: &dyn Observer,
    request: UploadRequest<'_>,
    content: R,
) -> Result<String>
where
    R: Read + Send + 'static,
{
    observer.on_event(&TransferEvent::UploadStarted { name: request.name });

    let (crypto_flag, body, worker): (&str, Box<dyn Read + Send>, Option<EncryptWorker>) =
        match request.key_material {
            None => {
                if !observer.confirm(PLAINTEXT_PROMPT) {
                    return Err(KtError::UploadAborted);
                }
                observer.on_event(&TransferEvent::UploadingPlain);
                ("0", Box::new(content) as Box<dyn Read + Send>, None)
            }
            Some(material) => {
                observer.on_event(&TransferEvent::Encrypting);
                let (reader, worker) = start_encryption(
                    gateway,
                    request.token,
                    request.disk,
                    request.name,
                    material,
                    content,
                )?;
                ("1", Box::new(reader) as Box<dyn Read + Send>, Some(worker))
            }
        };

    let form = MultipartForm {
        fields: vec![
            ("token".into(), request.token.to_string()),
            ("disk".into(), request.disk.trim().to_string()),
            ("folder".into(), request.folder.trim().to_string()),
            ("crypto".into(), crypto_flag.to_string()),
        ],
        file: FilePart {
            field: "file".into(),
            file_name: request.name.to_string(),
            body,
        },
        content_type: content_type(request.name, request.mime),
    };

    observer.on_event(&TransferEvent::Sending);
    let posted = gateway.post_multipart(&gateway.upload_url(), form);

    let encrypted = match worker {
        Some(worker) => worker
            .join()
            .map_err(|_| KtError::Io(std::io::Error::other("encryption worker panicked")))?,
        None => Ok(()),
    };
    // Encryption errors take precedence over the post result.
    encrypted?;

    let file_id = parse_upload_response(&posted?)?;
    observer.on_event(&TransferEvent::Uploaded { file_id: &file_id });
    Ok(file_id)
}

/// Resolve keys, check the public key and start encrypting `content` into a pipe.
fn start_encryption<R>(
    gateway: &dyn ApiGateway,
    token: &str,
    disk: &str,
    name: &str,
    material: KeyMaterial,
    content: R,
) -> Result<(PipeReader, EncryptWorker)>
where
    R: Read + Send + 'static,
{
    let material = KeyResolver::new(gateway, token).resolve(material, disk)?;
    let (encryptor, decryptor) = material.key_ring(disk)?;
    drop(decryptor);
    drop(material);

    if !encryptor.can_encrypt() {
        return Err(KtError::KeyNotEncryptionCapable);
    }

    let (mut writer, reader) = pipe::pipe(pipe::DEFAULT_CAPACITY);
    let file_name = name.to_string();
    let worker = thread::Builder::new()
        .name("kt-encrypt".into())
        .spawn(move || {
            let result = encryptor.encrypt_stream(&file_name, content, &mut writer);
            if writer.is_closed() {
                // The consumer stopped reading; the post reports why.
                return Ok(());
            }
            match &result {
                Ok(()) => writer.finish(),
                Err(err) => writer.abort(err.to_string()),
            }
            result
        })?;

    Ok((reader, worker))
}

/// Request content type: explicit override, else a guess from the file extension. `None` leaves
/// the multipart boundary type.
pub fn content_type(name: &str, mime_override: Option<&str>) -> Option<String> {
    match mime_override.map(str::trim).filter(|m| !m.is_empty()) {
        Some(mime) => Some(mime.to_string()),
        None => mime_guess::from_path(name).first().map(|m| m.to_string()),
    }
}

fn parse_upload_response(response: &PostedResponse) -> Result<String> {
    let parsed: Option<ApiResponse> = serde_json::from_slice(&response.body).ok();

    if let Some(err) = parsed.as_ref().and_then(ApiResponse::api_error) {
        return Err(KtError::UploadFailed(format!(
            "{}: {} (code {})",
            response.status_line(),
            err.message,
            err.code
        )));
    }
    if !response.is_success() {
        return Err(KtError::UploadFailed(response.status_line()));
    }

    let parsed = parsed.ok_or_else(|| {
        KtError::InvalidResponse("upload response is not a JSON-RPC object".into())
    })?;
    let receipt: UploadReceipt = serde_json::from_value(parsed.result)
        .map_err(|e| KtError::InvalidResponse(e.to_string()))?;

    if !receipt.ok || receipt.file_id.is_empty() {
        return Err(KtError::UploadFailed("unknown reason".into()));
    }
    Ok(receipt.file_id)
}
