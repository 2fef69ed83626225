pub mod execution;
pub mod plugin;
pub mod site;
pub mod theme;
pub mod ticket;

pub use execution::{
    BackendStatus, ExecutionOutcome, ExecutionRequest, FailureReason, ProxyPayload, StatusReport,
    SubmitReceipt,
};
pub use plugin::{PluginStatus, RemotePlugin};
pub use site::{ConnectionStatus, Site, SiteRecord, SiteUpdate, normalize_site_url};
pub use theme::{RemoteTheme, ThemeAction, ThemeStatus};
pub use ticket::HandshakeTicket;
