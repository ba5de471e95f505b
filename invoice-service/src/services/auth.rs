use secrecy::{ExposeSecret, Secret};
use subtle::ConstantTimeEq;

use crate::config::AdminConfig;

/// Decides whether a username/password pair may open an admin session.
pub trait AuthProvider: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> bool;
}

/// The single admin credential pair from configuration.
pub struct StaticAdminAuth {
    username: Option<String>,
    password: Option<Secret<String>>,
}

impl StaticAdminAuth {
    pub fn new(username: Option<String>, password: Option<Secret<String>>) -> Self {
        if username.is_none() || password.is_none() {
            tracing::warn!("Admin credentials are not configured; every login will be rejected");
        }
        Self { username, password }
    }

    pub fn from_config(config: &AdminConfig) -> Self {
        Self::new(config.username.clone(), config.password.clone())
    }
}

impl AuthProvider for StaticAdminAuth {
    fn verify(&self, username: &str, password: &str) -> bool {
        let (Some(expected_user), Some(expected_password)) = (&self.username, &self.password)
        else {
            return false;
        };

        let user_ok = expected_user.as_bytes().ct_eq(username.as_bytes());
        let password_ok = expected_password
            .expose_secret()
            .as_bytes()
            .ct_eq(password.as_bytes());

        (user_ok & password_ok).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> StaticAdminAuth {
        StaticAdminAuth::new(
            Some("admin".to_string()),
            Some(Secret::new("s3cret".to_string())),
        )
    }

    #[test]
    fn test_exact_pair_is_accepted() {
        assert!(admin().verify("admin", "s3cret"));
    }

    #[test]
    fn test_any_mismatch_is_rejected() {
        let auth = admin();
        assert!(!auth.verify("admin", "wrong"));
        assert!(!auth.verify("Admin", "s3cret"));
        assert!(!auth.verify("admin", "s3cret "));
        assert!(!auth.verify("", ""));
    }

    #[test]
    fn test_unconfigured_pair_rejects_everything() {
        let no_password = StaticAdminAuth::new(Some("admin".to_string()), None);
        let nothing = StaticAdminAuth::new(None, None);

        assert!(!no_password.verify("admin", ""));
        assert!(!nothing.verify("", ""));
    }
}
