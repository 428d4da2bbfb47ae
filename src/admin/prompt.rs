use anyhow::{Context, Result};
use tracing::{info, warn};

use super::{get_admin_key_from_env, get_supplied_secret_from_env, unlock, AdminError, AdminToken};

/// Prompts for the admin secret without echoing it
pub fn prompt_for_secret() -> Result<String> {
    let secret = rpassword::prompt_password("Admin secret: ")
        .context("Failed to read admin secret from terminal")?;

    let secret = secret.trim();

    if secret.is_empty() {
        anyhow::bail!(AdminError::EmptySecret);
    }

    Ok(secret.to_string())
}

/// Obtain an admin token for a mutating command.
///
/// The secret comes from JUDGE_TALLY_ADMIN when set, otherwise from an
/// interactive prompt. Fails straight away when admin access is not
/// configured, before prompting.
pub fn authorize() -> Result<AdminToken> {
    let expected = get_admin_key_from_env().ok_or(AdminError::NotConfigured)?;

    let supplied = match get_supplied_secret_from_env() {
        Some(secret) => secret,
        None => prompt_for_secret()?,
    };

    match unlock(&supplied, &expected) {
        Ok(token) => {
            info!("Admin access granted");
            Ok(token)
        }
        Err(e) => {
            warn!("Admin access denied: {}", e);
            Err(e.into())
        }
    }
}
