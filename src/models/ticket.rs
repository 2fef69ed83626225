use chrono::{DateTime, Utc};

/// Links a pending authorization redirect to the site awaiting credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeTicket {
    pub site_id: String,
    pub owner_id: String,
    pub normalized_url: String,
    pub issued_at: DateTime<Utc>,
    pub disable_encryption: bool,
}

impl HandshakeTicket {
    pub fn issue(
        site_id: impl Into<String>,
        owner_id: impl Into<String>,
        normalized_url: impl Into<String>,
        disable_encryption: bool,
    ) -> Self {
        Self {
            site_id: site_id.into(),
            owner_id: owner_id.into(),
            normalized_url: normalized_url.into(),
            issued_at: Utc::now(),
            disable_encryption,
        }
    }
}
