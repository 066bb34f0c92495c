use crate::errors::ConfigError;
use serde::Deserialize;
use std::{env, net::SocketAddr, path::PathBuf};

const DEFAULT_DATA_PATH: &str = "data/store.json";
const DEFAULT_NAMESPACE: &str = "default-app-id";
const DEFAULT_PORT: u16 = 8080;

/// Store connection descriptor, read from `STORE_CONFIG` as JSON.
/// Without a `dataPath` the store lives in memory only.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    #[serde(default)]
    pub data_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionPaths {
    pub daily: String,
    pub weekly: String,
}

impl CollectionPaths {
    pub fn for_namespace(namespace: &str) -> Self {
        Self {
            daily: format!("artifacts/{namespace}/public/data/womackEntries"),
            weekly: format!("artifacts/{namespace}/public/data/bodymakerEntries"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub namespace: String,
    pub bootstrap_token: Option<String>,
    pub session_path: PathBuf,
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let store = match lookup("STORE_CONFIG") {
            Some(raw) => serde_json::from_str::<StoreConfig>(&raw)?,
            None => StoreConfig {
                data_path: Some(
                    lookup("APP_DATA_PATH")
                        .map(PathBuf::from)
                        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH)),
                ),
            },
        };

        let namespace = lookup("APP_NAMESPACE").unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        if namespace.trim().is_empty() {
            return Err(ConfigError::Blank("APP_NAMESPACE"));
        }

        let bootstrap_token = lookup("INITIAL_AUTH_TOKEN").filter(|token| !token.trim().is_empty());

        let session_path = match lookup("SESSION_PATH") {
            Some(path) => PathBuf::from(path),
            None => store
                .data_path
                .as_ref()
                .and_then(|path| path.parent())
                .map(|dir| dir.join("session.json"))
                .unwrap_or_else(|| PathBuf::from("session.json")),
        };

        let port = lookup("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        Ok(Self {
            store,
            namespace: namespace.trim().to_string(),
            bootstrap_token,
            session_path,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], port)),
        })
    }

    pub fn collections(&self) -> CollectionPaths {
        CollectionPaths::for_namespace(&self.namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.store.data_path, Some(PathBuf::from("data/store.json")));
        assert_eq!(config.namespace, "default-app-id");
        assert_eq!(config.bootstrap_token, None);
        assert_eq!(config.session_path, PathBuf::from("data/session.json"));
        assert_eq!(config.bind_addr.port(), 8080);
    }

    #[test]
    fn store_descriptor_is_parsed() {
        let config = config_from(&[
            ("STORE_CONFIG", r#"{"dataPath":"/tmp/plant/store.json"}"#),
            ("APP_NAMESPACE", "plant-7"),
            ("INITIAL_AUTH_TOKEN", "operator-1"),
            ("PORT", "9000"),
        ])
        .unwrap();
        assert_eq!(config.store.data_path, Some(PathBuf::from("/tmp/plant/store.json")));
        assert_eq!(config.bootstrap_token.as_deref(), Some("operator-1"));
        assert_eq!(config.session_path, PathBuf::from("/tmp/plant/session.json"));
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(
            config.collections().daily,
            "artifacts/plant-7/public/data/womackEntries"
        );
        assert_eq!(
            config.collections().weekly,
            "artifacts/plant-7/public/data/bodymakerEntries"
        );
    }

    #[test]
    fn empty_descriptor_means_memory_store() {
        let config = config_from(&[("STORE_CONFIG", "{}")]).unwrap();
        assert_eq!(config.store.data_path, None);
        assert_eq!(config.session_path, PathBuf::from("session.json"));
    }

    #[test]
    fn malformed_descriptor_is_rejected() {
        let err = config_from(&[("STORE_CONFIG", "not json")]).unwrap_err();
        assert!(matches!(err, ConfigError::StoreDescriptor(_)));
    }

    #[test]
    fn blank_namespace_is_rejected() {
        let err = config_from(&[("APP_NAMESPACE", "  ")]).unwrap_err();
        assert!(matches!(err, ConfigError::Blank("APP_NAMESPACE")));
    }

    #[test]
    fn blank_token_is_ignored() {
        let config = config_from(&[("INITIAL_AUTH_TOKEN", " ")]).unwrap();
        assert_eq!(config.bootstrap_token, None);
    }
}
