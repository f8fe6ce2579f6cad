//! Configuration schema for Spaces
//!
//! Configuration is stored at `~/.config/spaces/config.toml`

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Gameplan server connection
    pub server: ServerConfig,

    /// Whitelisted method names backing each query
    pub endpoints: EndpointsConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

/// Server connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the Gameplan site, e.g. https://gameplan.example.com
    pub url: Option<String>,

    /// API key for token authentication
    pub api_key: Option<String>,

    /// API secret for token authentication
    pub api_secret: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            api_secret: None,
            timeout_secs: 30,
        }
    }
}

/// Method names for each registered query
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// Workspace list with members
    pub workspaces: String,

    /// Ids of the workspaces the current user joined
    pub joined_workspaces: String,

    /// Unread discussion counts per workspace
    pub unread_counts: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            workspaces: "gameplan.api.get_gp_projects_with_members".to_string(),
            joined_workspaces: "gameplan.gameplan.doctype.gp_project.gp_project.get_joined_projects"
                .to_string(),
            unread_counts: "gameplan.gameplan.doctype.gp_project.gp_project.get_unread_count"
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[server]"));
        assert!(toml.contains("[endpoints]"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.server.url.is_none());
        assert_eq!(config.server.timeout_secs, 30);
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [server]
            url = "https://gameplan.example.com"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.server.url.as_deref(),
            Some("https://gameplan.example.com")
        );
        assert_eq!(
            config.endpoints.workspaces,
            "gameplan.api.get_gp_projects_with_members"
        ); // default preserved
    }
}
