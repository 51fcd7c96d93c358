use std::fs;
use std::path::Path;

use kt_cli::{api, gpg, KtError, Result};

use super::Context;

/// Save the public key and the password-decrypted private key of a disk
pub fn export_keys(ctx: &Context, disk: &str, public: &Path, private: &Path) -> Result<()> {
    let token = ctx.token()?;
    let material = ctx.key_material();
    let password = material.password_str().ok_or(KtError::MissingCredentials)?;

    let record = api::user_disk(&ctx.gateway, token, disk)?;
    if record.public_key.trim().is_empty() || record.crypto_key.trim().is_empty() {
        return Err(KtError::IncompleteKeyData { disk: record.id });
    }

    let private_key = gpg::decrypt_with_password(&record.crypto_key, password)?;

    write_secret(public, record.public_key.as_bytes())?;
    println!("Public key saved to {}", public.display());
    write_secret(private, &private_key)?;
    println!("Private key saved to {}", private.display());

    println!("\nWARNING: Keep the private key file secure!");
    Ok(())
}

fn write_secret(path: &Path, data: &[u8]) -> Result<()> {
    fs::write(path, data)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(path, perms)?;
    }

    Ok(())
}
