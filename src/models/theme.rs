use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Theme as reported by the remote `/themes` REST endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteTheme {
    pub stylesheet: String,
    pub status: ThemeStatus,
    #[serde(default)]
    pub name: DisplayText,
    #[serde(default)]
    pub version: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ThemeStatus {
    Active,
    Inactive,
}

/// WordPress renders some fields either as a plain string or as `{raw, rendered}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum DisplayText {
    Plain(String),
    Rendered {
        #[serde(default)]
        raw: Option<String>,
        rendered: String,
    },
}

impl Default for DisplayText {
    fn default() -> Self {
        Self::Plain(String::new())
    }
}

impl DisplayText {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Plain(text) => text,
            Self::Rendered { raw: Some(raw), .. } => raw,
            Self::Rendered { rendered, .. } => rendered,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ThemeAction {
    Activate,
    Delete,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_rendered_and_plain_names() {
        let rendered: RemoteTheme = serde_json::from_value(json!({
            "stylesheet": "twentytwentyfour",
            "status": "active",
            "name": {"raw": "Twenty Twenty-Four", "rendered": "Twenty Twenty-Four"},
            "version": "1.0"
        }))
        .unwrap();
        assert_eq!(rendered.name.as_str(), "Twenty Twenty-Four");

        let plain: RemoteTheme = serde_json::from_value(json!({
            "stylesheet": "astra",
            "status": "inactive",
            "name": "Astra"
        }))
        .unwrap();
        assert_eq!(plain.name.as_str(), "Astra");
        assert_eq!(plain.status, ThemeStatus::Inactive);
    }
}
