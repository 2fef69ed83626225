//! Redirect-out / callback-in flow that obtains delegated WordPress credentials.
//!
//! `begin_connect` leaves a ticket for the site and hands back the
//! `authorize-application.php` URL. WordPress later sends the browser to the
//! callback with the approved username and application password. The callback
//! is matched to a site, the credentials are written through the site store,
//! and only then is the ticket consumed. Callbacks are serialized so a
//! duplicate delivery observes the first one's result and becomes a no-op.

use crate::error::{AppError, Result};
use crate::models::{HandshakeTicket, Site, SiteRecord, SiteUpdate, normalize_site_url};
use crate::repository::{SiteStore, TicketRepository};
use crate::services::{Identity, SealPolicy, SecretSealer};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use url::Url;

const AUTHORIZE_PATH: &str = "/wp-admin/authorize-application.php";
pub const CALLBACK_PATH: &str = "/api/connect/callback";

/// Credentials delivered to the callback by WordPress.
#[derive(Debug, Clone)]
pub struct CallbackParams {
    pub site_url: String,
    pub user_login: String,
    pub secret: String,
    pub disable_encryption: bool,
}

impl CallbackParams {
    pub fn from_query(query: &HashMap<String, String>) -> Result<Self> {
        let value = |key: &str| {
            query
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        if query.get("success").map(String::as_str) == Some("false") {
            return Err(AppError::HandshakeRejected(
                value("site_url").unwrap_or_else(|| "remote site".to_string()),
            ));
        }

        let site_url = value("site_url");
        let user_login = value("user_login");
        let secret = value("password").or_else(|| value("api_key"));

        let mut missing = Vec::new();
        if site_url.is_none() {
            missing.push("site_url");
        }
        if user_login.is_none() {
            missing.push("user_login");
        }
        if secret.is_none() {
            missing.push("password");
        }

        match (site_url, user_login, secret) {
            (Some(site_url), Some(user_login), Some(secret)) => Ok(Self {
                site_url,
                user_login,
                secret,
                disable_encryption: query
                    .get("disable_encryption")
                    .is_some_and(|flag| is_truthy(flag)),
            }),
            _ => Err(AppError::MissingParameters(missing)),
        }
    }
}

fn is_truthy(flag: &str) -> bool {
    matches!(
        flag.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[derive(Debug, Clone)]
pub struct ConnectRedirect {
    pub site_id: String,
    pub redirect_url: String,
}

#[derive(Debug, Clone)]
pub struct CallbackOutcome {
    pub site: Site,
    /// `false` when an identical callback had already been processed.
    pub applied: bool,
}

#[derive(Clone)]
pub struct HandshakeService {
    store: Arc<dyn SiteStore>,
    tickets: TicketRepository,
    sealer: Arc<dyn SecretSealer>,
    public_origin: String,
    app_name: String,
    callback_lock: Arc<Mutex<()>>,
}

impl HandshakeService {
    pub fn new(
        store: Arc<dyn SiteStore>,
        tickets: TicketRepository,
        sealer: Arc<dyn SecretSealer>,
        public_origin: impl Into<String>,
        app_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            tickets,
            sealer,
            public_origin: public_origin.into().trim_end_matches('/').to_string(),
            app_name: app_name.into(),
            callback_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn begin_connect(
        &self,
        identity: &Identity,
        site_id: &str,
        disable_encryption: bool,
    ) -> Result<ConnectRedirect> {
        let record = self
            .store
            .get(&identity.user_id, site_id)
            .await?
            .ok_or_else(|| AppError::SiteNotFound(site_id.to_string()))?;
        let site = Site::from_record(record.clone(), false);
        let redirect_url = self.authorize_url(&site)?;

        let _guard = self.callback_lock.lock().await;
        let ticket = HandshakeTicket::issue(
            &record.id,
            &identity.user_id,
            &record.normalized_url,
            disable_encryption,
        );
        if self.tickets.issue(ticket).await.is_some() {
            tracing::info!(site_id = %site_id, "Superseded earlier pending handshake");
        }
        tracing::info!(site_id = %site_id, owner_id = %identity.user_id, "Handshake started");

        Ok(ConnectRedirect {
            site_id: site_id.to_string(),
            redirect_url,
        })
    }

    pub async fn handle_callback(
        &self,
        identity: &Identity,
        params: &CallbackParams,
    ) -> Result<CallbackOutcome> {
        let _guard = self.callback_lock.lock().await;
        let normalized = normalize_site_url(&params.site_url);

        let (record, ticket) = self.match_site(identity, &normalized).await?.ok_or_else(|| {
            tracing::warn!(owner_id = %identity.user_id, site_url = %params.site_url, "Callback matched no site");
            AppError::NoMatchingSite(params.site_url.clone())
        })?;

        if ticket.is_none() && self.already_applied(&record, params)? {
            tracing::info!(site_id = %record.id, "Callback already processed; ignoring duplicate");
            return Ok(CallbackOutcome {
                site: Site::from_record(record, false),
                applied: false,
            });
        }

        let disable_encryption = params.disable_encryption
            || ticket.as_ref().is_some_and(|ticket| ticket.disable_encryption);
        let sealed = self
            .sealer
            .seal(&params.secret, SealPolicy::from_flag(disable_encryption))?;
        if sealed.is_empty() {
            return Err(AppError::Sealing("sealer produced an empty secret".to_string()));
        }

        // Ticket is only consumed once the credentials are durably stored.
        let updated = self
            .store
            .update_fields(
                &identity.user_id,
                &record.id,
                &SiteUpdate::credentials(&params.user_login, sealed),
            )
            .await?;
        match &ticket {
            Some(ticket) => {
                self.tickets.consume(ticket).await;
            }
            None => {
                self.tickets.discard(&record.id).await;
            }
        }

        tracing::info!(
            site_id = %updated.id,
            owner_id = %identity.user_id,
            matched_by_ticket = ticket.is_some(),
            "Site connected"
        );
        Ok(CallbackOutcome {
            site: Site::from_record(updated, false),
            applied: true,
        })
    }

    pub async fn disconnect(&self, identity: &Identity, site_id: &str) -> Result<Site> {
        let _guard = self.callback_lock.lock().await;
        let record = self
            .store
            .update_fields(&identity.user_id, site_id, &SiteUpdate::clear_credentials())
            .await?;
        self.tickets.discard(site_id).await;
        tracing::info!(site_id = %site_id, owner_id = %identity.user_id, "Site disconnected");
        Ok(Site::from_record(record, false))
    }

    pub fn callback_url(&self) -> String {
        format!("{}{}", self.public_origin, CALLBACK_PATH)
    }

    fn authorize_url(&self, site: &Site) -> Result<String> {
        let mut url = Url::parse(&format!("{}{}", site.base_url(), AUTHORIZE_PATH))
            .map_err(|e| AppError::InvalidRequest(format!("Invalid site url '{}': {}", site.url, e)))?;
        let callback_url = self.callback_url();
        url.query_pairs_mut()
            .append_pair("app_name", &self.app_name)
            .append_pair("success_url", &callback_url)
            .append_pair("reject_url", &callback_url);
        Ok(url.into())
    }

    /// Picks the site a callback belongs to.
    ///
    /// A pending ticket for the same url wins. Otherwise the newest pending
    /// ticket is used, unless the url clearly names a different owned site, in
    /// which case that site is matched directly.
    async fn match_site(
        &self,
        identity: &Identity,
        normalized_url: &str,
    ) -> Result<Option<(SiteRecord, Option<HandshakeTicket>)>> {
        let records = self.store.list_by_owner(&identity.user_id).await?;
        let url_match = records
            .iter()
            .find(|record| record.normalized_url == normalized_url);

        let pending = self.tickets.pending_for_owner(&identity.user_id).await;
        let ticket = pending
            .iter()
            .find(|ticket| ticket.normalized_url == normalized_url)
            .or_else(|| url_match.is_none().then(|| pending.first()).flatten());

        if let Some(ticket) = ticket {
            match records.iter().find(|record| record.id == ticket.site_id) {
                Some(record) => return Ok(Some((record.clone(), Some(ticket.clone())))),
                None => {
                    // Site was deleted after the redirect.
                    self.tickets.discard(&ticket.site_id).await;
                }
            }
        }

        Ok(url_match.map(|record| (record.clone(), None)))
    }

    fn already_applied(&self, record: &SiteRecord, params: &CallbackParams) -> Result<bool> {
        if record.secret.is_empty() || record.username != params.user_login {
            return Ok(false);
        }
        Ok(self.sealer.open(&record.secret)? == params.secret)
    }
}
