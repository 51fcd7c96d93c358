use kt_cli::{api, Result};
use rpassword::prompt_password;

use super::Context;

/// Validate a token through `auth.getMe` and keep it in the config
pub fn login(ctx: &mut Context) -> Result<()> {
    let token = match ctx.token.clone() {
        Some(token) => token,
        None if ctx.interactive => {
            println!("Enter your access token. The characters will not be displayed.");
            prompt_password("Access token: ")?.trim().to_string()
        }
        None => return Err(kt_cli::KtError::NotLoggedIn),
    };
    if token.is_empty() {
        return Err(kt_cli::KtError::NotLoggedIn);
    }

    let user_id = api::whoami(&ctx.gateway, &token)?;
    println!("Logged in as user id {user_id}");

    ctx.config.token = token.clone();
    ctx.config.user_id = user_id;
    ctx.token = Some(token);
    Ok(())
}
