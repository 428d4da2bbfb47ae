pub mod prompt;

use std::fmt;

/// Environment variable holding the admin secret, provisioned out of band
pub const ENV_ADMIN_KEY_VAR: &str = "JUDGE_TALLY_ADMIN_KEY";

/// Environment variable a caller can use to supply the secret without a prompt
pub const ENV_ADMIN_VAR: &str = "JUDGE_TALLY_ADMIN";

pub use prompt::{authorize, prompt_for_secret};

/// Capability to mutate teams and evaluations.
///
/// Only `unlock` can produce one, so holding a token is proof that the
/// credential check passed. Read-only judging and viewing never need it.
#[derive(Debug)]
pub struct AdminToken {
    _private: (),
}

#[derive(Debug, PartialEq, Eq)]
pub enum AdminError {
    NotConfigured,
    EmptySecret,
    Rejected,
}

impl fmt::Display for AdminError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminError::NotConfigured => write!(
                f,
                "Admin access is not configured: set {} to enable it",
                ENV_ADMIN_KEY_VAR
            ),
            AdminError::EmptySecret => write!(f, "Admin secret cannot be empty"),
            AdminError::Rejected => write!(f, "Admin secret rejected"),
        }
    }
}

impl std::error::Error for AdminError {}

/// Read a trimmed, non-empty value from an environment variable.
fn get_from_env(var: &str) -> Option<String> {
    match std::env::var(var) {
        Ok(val) => {
            let trimmed = val.trim().to_string();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        }
        Err(_) => None,
    }
}

/// The provisioned admin secret, if admin access is enabled.
pub fn get_admin_key_from_env() -> Option<String> {
    get_from_env(ENV_ADMIN_KEY_VAR)
}

/// A secret supplied through JUDGE_TALLY_ADMIN, if set.
pub fn get_supplied_secret_from_env() -> Option<String> {
    get_from_env(ENV_ADMIN_VAR)
}

/// Check a supplied secret against the provisioned one and issue a token.
pub fn unlock(supplied: &str, expected: &str) -> Result<AdminToken, AdminError> {
    let expected = expected.trim();
    if expected.is_empty() {
        return Err(AdminError::NotConfigured);
    }
    let supplied = supplied.trim();
    if supplied.is_empty() {
        return Err(AdminError::EmptySecret);
    }
    if supplied != expected {
        return Err(AdminError::Rejected);
    }
    Ok(AdminToken { _private: () })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlock_matching_secret() {
        assert!(unlock("open sesame", "open sesame").is_ok());
        assert!(unlock("  open sesame\n", "open sesame").is_ok());
    }

    #[test]
    fn test_unlock_wrong_secret() {
        assert_eq!(unlock("guess", "open sesame").unwrap_err(), AdminError::Rejected);
    }

    #[test]
    fn test_unlock_empty_secret() {
        assert_eq!(unlock("   ", "open sesame").unwrap_err(), AdminError::EmptySecret);
    }

    #[test]
    fn test_unlock_not_configured() {
        assert_eq!(unlock("anything", "").unwrap_err(), AdminError::NotConfigured);
    }
}
