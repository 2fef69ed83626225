pub mod command_proxy;
pub mod handshake_service;
pub mod plugin_service;
pub mod resource_cache;
pub mod secret;
pub mod session;
pub mod site_service;
pub mod theme_service;
pub mod toggle_reconciler;

pub use command_proxy::CommandProxy;
pub use handshake_service::{CallbackOutcome, CallbackParams, ConnectRedirect, HandshakeService};
pub use plugin_service::PluginService;
pub use resource_cache::ResourceCache;
pub use secret::{PassthroughSealer, SealPolicy, SecretSealer};
pub use session::{HeaderSessionProvider, Identity, SessionProvider};
pub use site_service::SiteService;
pub use theme_service::ThemeService;
pub use toggle_reconciler::ToggleReconciler;
