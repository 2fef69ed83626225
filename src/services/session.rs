use axum::http::{HeaderMap, HeaderName};

/// Authenticated caller. Every site query is scoped to `user_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
}

impl Identity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// Resolves the current caller, or `None` when the request is anonymous.
pub trait SessionProvider: Send + Sync {
    fn identify(&self, headers: &HeaderMap) -> Option<Identity>;
}

/// Trusts a user id header injected by the authenticating gateway in front of the bridge.
pub struct HeaderSessionProvider {
    header: HeaderName,
}

impl HeaderSessionProvider {
    pub fn new(header: HeaderName) -> Self {
        Self { header }
    }
}

impl SessionProvider for HeaderSessionProvider {
    fn identify(&self, headers: &HeaderMap) -> Option<Identity> {
        let user_id = headers.get(&self.header)?.to_str().ok()?.trim();
        if user_id.is_empty() {
            return None;
        }
        Some(Identity::new(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn provider() -> HeaderSessionProvider {
        HeaderSessionProvider::new(HeaderName::from_static("x-user-id"))
    }

    #[test]
    fn reads_identity_from_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static(" u1 "));
        assert_eq!(provider().identify(&headers), Some(Identity::new("u1")));
    }

    #[test]
    fn missing_or_blank_header_is_anonymous() {
        assert_eq!(provider().identify(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static("   "));
        assert_eq!(provider().identify(&headers), None);
    }
}
