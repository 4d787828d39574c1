use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{FlowdocError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source scanning configuration
    pub scan: ScanConfig,

    /// Call-chain tracing settings
    pub trace: TraceConfig,

    /// Entry point search settings
    pub ranking: RankingConfig,

    /// Annotation names that drive classification and dependency detection
    pub markers: MarkerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Conventional source root inside each module
    pub source_root: String,

    /// Path substrings that exclude a file from the scan
    pub exclude_patterns: Vec<String>,

    /// Maximum file size to parse (in bytes)
    pub max_file_size: usize,

    /// Parse files on the rayon pool
    pub parallel: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Maximum traversal depth below the entry method
    pub max_depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Matches scoring below this are dropped
    pub threshold: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub controller: Vec<String>,
    pub provider: Vec<String>,
    pub scheduled: Vec<String>,
    pub mq_listener: Vec<String>,
    pub rpc_reference: Vec<String>,
    pub http_client: Vec<String>,
}

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            source_root: "src/main/java".to_string(),
            exclude_patterns: names(&["/test/", "\\test\\", "/target/", "\\target\\"]),
            max_file_size: 1024 * 1024, // 1MB
            parallel: true,
        }
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self { max_depth: 5 }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self { threshold: 15 }
    }
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            controller: names(&["RestController", "Controller"]),
            provider: names(&["DubboService", "Service"]),
            scheduled: names(&["Scheduled"]),
            mq_listener: names(&[
                "RabbitListener",
                "KafkaListener",
                "RocketMQMessageListener",
                "JmsListener",
            ]),
            rpc_reference: names(&["Reference", "DubboReference"]),
            http_client: names(&["FeignClient"]),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            trace: TraceConfig::default(),
            ranking: RankingConfig::default(),
            markers: MarkerConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| FlowdocError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FlowdocError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration with fallback to default
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => {
                if p.as_ref().exists() {
                    Self::load(p)
                } else {
                    Ok(Self::default())
                }
            }
            None => {
                let candidates = [
                    "Flowdoc.toml",
                    "flowdoc.toml",
                    ".flowdoc.toml",
                ];

                for candidate in &candidates {
                    if Path::new(candidate).exists() {
                        return Self::load(candidate);
                    }
                }

                Ok(Self::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Flowdoc.toml");

        let mut config = Config::default();
        config.trace.max_depth = 3;
        config.markers.provider = vec!["DubboService".to_string()];
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.trace.max_depth, 3);
        assert_eq!(loaded.markers.provider, vec!["DubboService".to_string()]);
        assert_eq!(loaded.ranking.threshold, 15);
    }

    #[test]
    fn test_missing_file_falls_back_to_default() {
        let config = Config::load_or_default(Some("/definitely/not/here.toml")).unwrap();
        assert_eq!(config.trace.max_depth, 5);
        assert_eq!(config.scan.source_root, "src/main/java");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Flowdoc.toml");
        std::fs::write(&path, "[trace]\nmax_depth = 3\n\n[markers]\nprovider = [\"DubboService\"]\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.trace.max_depth, 3);
        assert_eq!(config.markers.provider, vec!["DubboService".to_string()]);
        assert_eq!(config.markers.controller, vec!["RestController".to_string(), "Controller".to_string()]);
        assert_eq!(config.scan.source_root, "src/main/java");
        assert!(config.scan.parallel);
        assert_eq!(config.ranking.threshold, 15);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "scan = [").unwrap();

        match Config::load(&path) {
            Err(FlowdocError::Config(_)) => {}
            other => panic!("expected config error, got {:?}", other.map(|_| ())),
        }
    }
}
