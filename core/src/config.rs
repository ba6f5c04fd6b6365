use serde::{Deserialize, Serialize};

/// Where the engine bundle lives and how to load it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub bundle_url: String,
    pub archive_format: String,
    pub module_name: String,
    pub factory_name: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bundle_url: "assets/game.tar.gz".into(),
            archive_format: "tar.gz".into(),
            module_name: "game".into(),
            factory_name: "Game".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: BridgeConfig =
            serde_json::from_str(r#"{"bundle_url": "static/engine.tar.gz"}"#).unwrap();
        assert_eq!(config.bundle_url, "static/engine.tar.gz");
        assert_eq!(config.module_name, "game");
        assert_eq!(config.archive_format, "tar.gz");
    }
}
