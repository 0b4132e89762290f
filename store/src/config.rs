use crate::error::StoreError;
use std::path::PathBuf;

/// Configuration for the trade history store
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// JSON file holding saved trades; in-memory only when unset
    pub trades_file: Option<PathBuf>,
}

impl StoreConfig {
    /// Create a new store configuration from environment variables
    pub fn from_env() -> Result<Self, StoreError> {
        let trades_file = match std::env::var("TRADES_FILE") {
            Ok(path) if path.trim().is_empty() => {
                return Err(StoreError::ConfigError(
                    "TRADES_FILE environment variable is empty".to_string(),
                ))
            }
            Ok(path) => Some(PathBuf::from(path)),
            Err(_) => None,
        };

        Ok(Self { trades_file })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The only test touching TRADES_FILE, so no other test observes it
    #[test]
    fn test_from_env() {
        std::env::set_var("TRADES_FILE", "  ");
        assert!(matches!(
            StoreConfig::from_env(),
            Err(StoreError::ConfigError(_))
        ));

        std::env::set_var("TRADES_FILE", "/tmp/trades.json");
        let config = StoreConfig::from_env().unwrap();
        assert_eq!(config.trades_file, Some(PathBuf::from("/tmp/trades.json")));

        std::env::remove_var("TRADES_FILE");
        assert!(StoreConfig::from_env().unwrap().trades_file.is_none());
    }
}
