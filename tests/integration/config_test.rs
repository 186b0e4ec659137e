//! Integration tests for configuration management
//!
//! These tests verify that the configuration system works correctly
//! across module boundaries.

use r_voiceline::config::{ConfigError, Settings};
use r_voiceline::scheduler::BackpressurePolicy;
use std::error::Error;
use std::time::Duration;
use tempfile::tempdir;

#[cfg(test)]
mod config_integration_tests {
    use super::*;

    /// Test complete configuration workflow
    #[test]
    fn test_config_lifecycle() -> Result<(), Box<dyn Error>> {
        // Create a temporary directory for test
        let dir = tempdir()?;
        let config_path = dir.path().join("nested").join("config.json");

        let mut settings = Settings::default();
        settings.character_id = "narrator".to_string();
        settings.tick_period_ms = 50;
        settings.poll_period_ms = 200;
        settings.queue_capacity = Some(16);
        settings.backpressure = BackpressurePolicy::Block;
        settings.alsa_device = "hw:1,0".to_string();

        settings.validate()?;
        settings.save(&config_path)?;

        let loaded = Settings::load(&config_path)?;
        assert_eq!(loaded, settings);
        assert_eq!(loaded.tick_period(), Duration::from_millis(50));
        assert_eq!(loaded.poll_period(), Duration::from_millis(200));

        // Overrides persist across a second save
        let mut updated = loaded;
        updated.queue_capacity = None;
        updated.save(&config_path)?;
        assert_eq!(Settings::load(&config_path)?.queue_capacity, None);

        Ok(())
    }

    /// Backpressure policies are stored in snake_case
    #[test]
    fn test_backpressure_wire_format() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, r#"{ "queue_capacity": 4, "backpressure": "drop_oldest" }"#)?;

        let settings = Settings::load(&config_path)?;
        assert_eq!(settings.queue_capacity, Some(4));
        assert_eq!(settings.backpressure, BackpressurePolicy::DropOldest);
        assert_eq!(settings.character_id, "agent");
        Ok(())
    }

    /// Test invalid configuration handling
    #[test]
    fn test_invalid_config_validation() {
        let invalid_settings = Settings {
            character_id: "  ".to_string(),
            ..Settings::default()
        };

        let result = invalid_settings.validate();
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
        if let Err(e) = result {
            assert!(e.to_string().contains("Character ID cannot be empty"));
        }

        let zero_tick = Settings {
            tick_period_ms: 0,
            ..Settings::default()
        };
        assert!(zero_tick.validate().is_err());
    }
}
