use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Plugin as reported by the remote `/plugins` REST endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemotePlugin {
    /// Identifier in `directory/file` form, e.g. `akismet/akismet.php`.
    pub plugin: String,
    pub status: PluginStatus,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PluginStatus {
    Active,
    Inactive,
    NetworkActive,
}

impl PluginStatus {
    pub fn toggled(self) -> Self {
        match self {
            Self::Active | Self::NetworkActive => Self::Inactive,
            Self::Inactive => Self::Active,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::NetworkActive => "network-active",
        }
    }
}
