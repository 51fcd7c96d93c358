mod call;
mod console;
mod download;
mod export_keys;
mod files;
mod login;
mod ping;
mod upload;

pub use call::call;
pub use download::download;
pub use export_keys::export_keys;
pub use files::files;
pub use login::login;
pub use ping::ping;
pub use upload::{upload, UploadArgs};

use kt_cli::{Config, HttpGateway, KeyMaterial, KtError, Result};

use console::ConsoleObserver;

/// State shared by all commands of one invocation.
pub struct Context {
    pub config: Config,
    pub gateway: HttpGateway,
    pub token: Option<String>,
    pub password: Option<String>,
    pub interactive: bool,
}

impl Context {
    pub fn token(&self) -> Result<&str> {
        self.token.as_deref().ok_or(KtError::NotLoggedIn)
    }

    /// Key material from `--passwd` / `KT_CLI_PASSWD`. Never prompts, so plain downloads
    /// work without a password.
    pub fn key_material(&self) -> KeyMaterial {
        match &self.password {
            Some(password) => KeyMaterial::with_password(password.as_str()),
            None => KeyMaterial::new(),
        }
    }

    pub fn observer(&self) -> ConsoleObserver {
        ConsoleObserver::new(self.interactive)
    }
}
