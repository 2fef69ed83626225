use crate::error::Result;

/// How a delegated secret should be protected at rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SealPolicy {
    #[default]
    Protected,
    /// Requested for local, non-production targets.
    Plaintext,
}

impl SealPolicy {
    pub fn from_flag(disable_encryption: bool) -> Self {
        if disable_encryption {
            Self::Plaintext
        } else {
            Self::Protected
        }
    }
}

/// Protects delegated secrets before they reach the site store.
pub trait SecretSealer: Send + Sync {
    fn seal(&self, secret: &str, policy: SealPolicy) -> Result<String>;

    fn open(&self, sealed: &str) -> Result<String>;
}

/// Stores secrets as given. Used until a key-management backed sealer is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughSealer;

impl SecretSealer for PassthroughSealer {
    fn seal(&self, secret: &str, policy: SealPolicy) -> Result<String> {
        if policy == SealPolicy::Plaintext {
            tracing::debug!("Storing delegated secret without encryption as requested");
        }
        Ok(secret.to_string())
    }

    fn open(&self, sealed: &str) -> Result<String> {
        Ok(sealed.to_string())
    }
}
