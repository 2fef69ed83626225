use anyhow::{Context, Result};
use axum::http::HeaderName;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use url::Url;

const DEFAULT_PORT: u16 = 6701;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Origin WordPress redirects back to once the user approves the application password.
    pub public_origin: String,
    pub app_name: String,
    pub execution_backend_url: String,
    pub execution_api_key: Option<String>,
    pub session_header: String,
    pub cors_origins: Vec<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &self.database_url)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("public_origin", &self.public_origin)
            .field("app_name", &self.app_name)
            .field("execution_backend_url", &self.execution_backend_url)
            .field(
                "execution_api_key",
                &self.execution_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("session_header", &self.session_header)
            .field("cors_origins", &self.cors_origins)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let database_url = crate::paths::data_dir()
            .map(|dir| format!("sqlite:{}", dir.join("site_bridge.db").display()))
            .unwrap_or_else(|_| "sqlite:site_bridge.db".to_string());
        Self {
            database_url,
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            public_origin: format!("http://127.0.0.1:{}", DEFAULT_PORT),
            app_name: "Site Bridge".to_string(),
            execution_backend_url: "http://127.0.0.1:8080".to_string(),
            execution_api_key: None,
            session_header: "x-user-id".to_string(),
            cors_origins: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        let conf_path = crate::paths::conf_dir()?.join("config.json");
        if let Some(file_config) = Self::from_conf_file(&conf_path)? {
            config.apply_file(file_config);
        }

        if let Ok(db_url) = std::env::var("DATABASE_URL") {
            config.database_url = db_url;
        }

        if let Ok(host) = std::env::var("HOST") {
            config.host = host;
        }

        if let Ok(port) = std::env::var("PORT") {
            config.port = port.parse().unwrap_or(DEFAULT_PORT);
        }

        if let Ok(origin) = std::env::var("PUBLIC_ORIGIN") {
            config.public_origin = origin;
        }

        if let Ok(app_name) = std::env::var("APP_NAME") {
            config.app_name = app_name;
        }

        if let Ok(backend_url) = std::env::var("EXECUTION_BACKEND_URL") {
            config.execution_backend_url = backend_url;
        }

        if let Ok(api_key) = std::env::var("EXECUTION_API_KEY") {
            config.execution_api_key = Some(api_key);
        }

        if let Ok(header) = std::env::var("SESSION_HEADER") {
            config.session_header = header;
        }

        config.normalize_database_url()?;
        config.validate()?;
        Ok(config)
    }

    fn from_conf_file(path: &Path) -> Result<Option<FileConfig>> {
        if !path.is_file() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let file_config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(Some(file_config))
    }

    fn apply_file(&mut self, file_config: FileConfig) {
        if let Some(database_url) = file_config.database_url {
            self.database_url = database_url;
        }
        if let Some(host) = file_config.host {
            self.host = host;
        }
        if let Some(port) = file_config.port {
            self.port = port;
        }
        if let Some(origin) = file_config.public_origin {
            self.public_origin = origin;
        }
        if let Some(app_name) = file_config.app_name {
            self.app_name = app_name;
        }
        if let Some(backend_url) = file_config.execution_backend_url {
            self.execution_backend_url = backend_url;
        }
        if let Some(api_key) = file_config.execution_api_key {
            self.execution_api_key = Some(api_key);
        }
        if let Some(header) = file_config.session_header {
            self.session_header = header;
        }
        if let Some(origins) = file_config.cors_origins {
            self.cors_origins = origins;
        }
    }

    fn normalize_database_url(&mut self) -> Result<()> {
        let Some(path_str) = self.database_url.strip_prefix("sqlite:") else {
            return Ok(());
        };
        if path_str.starts_with(":memory:") {
            return Ok(());
        }

        let path = Path::new(path_str);
        let root = crate::paths::install_root()?;

        if path.is_absolute() {
            if !path.starts_with(&root) {
                anyhow::bail!(
                    "SQLite database path must be under install root: {}",
                    root.display()
                );
            }
            return Ok(());
        }

        if path
            .components()
            .any(|component| matches!(component, std::path::Component::ParentDir))
        {
            anyhow::bail!("SQLite database path cannot contain '..'");
        }

        let absolute = root.join(path);
        self.database_url = format!("sqlite:{}", absolute.display());
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        self.public_origin = Self::parse_origin("public_origin", &self.public_origin)?;
        self.execution_backend_url =
            Self::parse_origin("execution_backend_url", &self.execution_backend_url)?;
        self.cors_origins = self
            .cors_origins
            .iter()
            .map(|origin| Self::parse_origin("cors_origins", origin))
            .collect::<Result<_>>()?;

        if self.app_name.trim().is_empty() {
            anyhow::bail!("app_name cannot be empty");
        }
        if self.session_header.trim().is_empty() {
            anyhow::bail!("session_header cannot be empty");
        }
        self.session_header = self.session_header.trim().to_ascii_lowercase();
        self.session_header_name()?;

        if self.execution_api_key.as_deref().is_some_and(|key| key.trim().is_empty()) {
            self.execution_api_key = None;
        }
        Ok(())
    }

    fn parse_origin(field: &str, raw: &str) -> Result<String> {
        let url = Url::parse(raw.trim()).with_context(|| format!("Invalid {} '{}'", field, raw))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("{} must use http or https, got '{}'", field, url.scheme());
        }
        if url.host_str().is_none() {
            anyhow::bail!("{} must include a host", field);
        }
        Ok(url.as_str().trim_end_matches('/').to_string())
    }

    pub fn session_header_name(&self) -> Result<HeaderName> {
        HeaderName::from_bytes(self.session_header.as_bytes())
            .with_context(|| format!("Invalid session_header '{}'", self.session_header))
    }

    /// Origins allowed by CORS; falls back to the public origin.
    pub fn allowed_origins(&self) -> Vec<String> {
        if self.cors_origins.is_empty() {
            vec![self.public_origin.clone()]
        } else {
            self.cors_origins.clone()
        }
    }
}

#[derive(Debug, Deserialize)]
struct FileConfig {
    database_url: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    public_origin: Option<String>,
    app_name: Option<String>,
    execution_backend_url: Option<String>,
    execution_api_key: Option<String>,
    session_header: Option<String>,
    cors_origins: Option<Vec<String>>,
}
