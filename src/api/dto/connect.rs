use crate::api::dto::site::SiteResponse;
use crate::services::{CallbackOutcome, ConnectRedirect};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct ConnectRequest {
    #[serde(default)]
    pub disable_encryption: bool,
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub site_id: String,
    pub redirect_url: String,
}

impl From<ConnectRedirect> for ConnectResponse {
    fn from(redirect: ConnectRedirect) -> Self {
        Self {
            site_id: redirect.site_id,
            redirect_url: redirect.redirect_url,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    pub site: SiteResponse,
    pub applied: bool,
}

impl From<CallbackOutcome> for CallbackResponse {
    fn from(outcome: CallbackOutcome) -> Self {
        Self {
            site: SiteResponse::from(outcome.site),
            applied: outcome.applied,
        }
    }
}
