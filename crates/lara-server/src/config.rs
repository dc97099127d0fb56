use lara_core::config::LaraConfig;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// HS256 secret for conversation API bearer tokens.
    pub jwt_secret: Option<String>,
    /// Seconds a conversation session may sit unused before it is dropped.
    /// Zero keeps sessions until they are closed explicitly.
    pub session_idle_secs: u64,
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    server: ServerSection,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    jwt_secret: Option<String>,
    #[serde(default = "default_session_idle_secs")]
    session_idle_secs: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            jwt_secret: None,
            session_idle_secs: default_session_idle_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_session_idle_secs() -> u64 {
    30 * 60
}

impl ServerConfig {
    /// Read the `[server]` section of the Lara config file, then apply
    /// the `LARA_SERVER_*`, `LARA_JWT_SECRET` and `LARA_SESSION_IDLE_SECS` overrides.
    pub fn load() -> anyhow::Result<Self> {
        let file_config = match LaraConfig::default_path() {
            Some(path) if path.exists() => load_from_file(&path)?,
            _ => FileConfig::default(),
        };

        let mut config = Self {
            host: file_config.server.host,
            port: file_config.server.port,
            jwt_secret: file_config.server.jwt_secret,
            session_idle_secs: file_config.server.session_idle_secs,
        };
        config.apply_env_from(|name| env::var(name).ok());
        Ok(config)
    }

    fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("LARA_SERVER_HOST").filter(|v| !v.trim().is_empty()) {
            self.host = host;
        }
        if let Some(port) = lookup("LARA_SERVER_PORT").and_then(|v| v.trim().parse::<u16>().ok()) {
            self.port = port;
        }
        if let Some(secret) = lookup("LARA_JWT_SECRET").filter(|v| !v.trim().is_empty()) {
            self.jwt_secret = Some(secret);
        }
        if let Some(secs) =
            lookup("LARA_SESSION_IDLE_SECS").and_then(|v| v.trim().parse::<u64>().ok())
        {
            self.session_idle_secs = secs;
        }
    }

    /// Idle timeout for conversation sessions, if eviction is enabled.
    pub fn session_idle(&self) -> Option<Duration> {
        (self.session_idle_secs > 0).then(|| Duration::from_secs(self.session_idle_secs))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn load_from_file(path: &Path) -> anyhow::Result<FileConfig> {
    let content = fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_section_defaults() {
        let config: FileConfig = toml::from_str("[completion]\nmodel = \"gpt-4o\"\n").unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert!(config.server.jwt_secret.is_none());
        assert_eq!(config.server.session_idle_secs, 1800);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ServerConfig {
            host: default_host(),
            port: default_port(),
            jwt_secret: None,
            session_idle_secs: default_session_idle_secs(),
        };
        config.apply_env_from(|name| match name {
            "LARA_SERVER_PORT" => Some("8080".to_string()),
            "LARA_JWT_SECRET" => Some("secret".to_string()),
            "LARA_SESSION_IDLE_SECS" => Some("0".to_string()),
            _ => None,
        });

        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.jwt_secret.as_deref(), Some("secret"));
        assert!(config.session_idle().is_none());
    }
}
