use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use kt_cli::{DownloadRequest, KtError, Result};
use tracing::debug;

use super::Context;

/// Download a file into `output`, which may be a directory or a file path
pub fn download(ctx: &Context, file_id: &str, output: &Path) -> Result<()> {
    if output.as_os_str().is_empty() {
        return Err(KtError::InvalidArgument("save path is required".into()));
    }
    let token = ctx.token()?;

    let request = DownloadRequest {
        token,
        file_id,
        key_material: Some(ctx.key_material()),
    };

    // The remote name is only known after the metadata call.
    let staging = staging_path(output, file_id);
    let result = (|| {
        let mut sink = BufWriter::new(File::create(&staging)?);
        let downloaded = kt_cli::download(&ctx.gateway, &ctx.observer(), request, &mut sink)?;
        sink.flush()?;
        Ok::<_, KtError>(downloaded)
    })();

    let downloaded = match result {
        Ok(downloaded) => downloaded,
        Err(err) => {
            let _ = fs::remove_file(&staging);
            return Err(err);
        }
    };

    let target = target_path(output, &downloaded.name)?;
    debug!(from = %staging.display(), to = %target.display(), "moving download into place");
    if let Err(err) = fs::rename(&staging, &target) {
        let _ = fs::remove_file(&staging);
        return Err(err.into());
    }

    println!("Saved {} ({} bytes)", target.display(), downloaded.bytes);
    Ok(())
}

fn staging_path(output: &Path, file_id: &str) -> PathBuf {
    let dir = if output.is_dir() {
        output
    } else {
        output.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."))
    };
    let id: String = file_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    dir.join(format!(".kt-download-{id}.part"))
}

/// `output` itself, or `output/<remote name>` when it is a directory.
fn target_path(output: &Path, remote_name: &str) -> Result<PathBuf> {
    if !output.is_dir() {
        return Ok(output.to_path_buf());
    }

    let name = Path::new(remote_name)
        .file_name()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| {
            KtError::InvalidResponse(format!("unusable remote file name {remote_name:?}"))
        })?;
    Ok(output.join(name))
}
