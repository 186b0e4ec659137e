//! Tests for configuration management module

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::scheduler::BackpressurePolicy;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.character_id, "agent");
        assert_eq!(settings.tick_period(), Duration::from_millis(100));
        assert_eq!(settings.poll_period(), Duration::from_millis(100));
        assert_eq!(settings.alsa_device, "default");
        assert!(settings.queue_capacity.is_none());
        assert_eq!(settings.backpressure, BackpressurePolicy::DropOldest);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_save_and_load() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let config_path = dir.path().join("nested").join("config.json");

        let settings = Settings {
            character_id: "innkeeper".to_string(),
            tick_period_ms: 50,
            queue_capacity: Some(16),
            backpressure: BackpressurePolicy::Block,
            ..Settings::default()
        };
        settings.save(&config_path)?;
        assert!(config_path.exists());

        let loaded = Settings::load(&config_path)?;
        assert_eq!(loaded, settings);
        Ok(())
    }

    #[test]
    fn test_load_missing_file_gives_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let loaded = Settings::load(&dir.path().join("absent.json"))?;
        assert_eq!(loaded, Settings::default());
        Ok(())
    }

    #[test]
    fn test_partial_file_fills_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, r#"{"character_id": "bard", "backpressure": "block"}"#)?;

        let loaded = Settings::load(&config_path)?;
        assert_eq!(loaded.character_id, "bard");
        assert_eq!(loaded.backpressure, BackpressurePolicy::Block);
        assert_eq!(loaded.poll_period_ms, 100);
        assert_eq!(loaded.event_capacity, 64);
        Ok(())
    }

    #[test]
    fn test_malformed_file_is_parse_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, "{ not json")?;

        assert!(matches!(Settings::load(&config_path), Err(ConfigError::ParseError(_))));
        Ok(())
    }

    #[test]
    fn test_settings_validation() {
        let invalid = [
            Settings { character_id: "  ".to_string(), ..Settings::default() },
            Settings { tick_period_ms: 0, ..Settings::default() },
            Settings { poll_period_ms: 0, ..Settings::default() },
            Settings { queue_capacity: Some(0), ..Settings::default() },
            Settings { command_buffer_size: 0, ..Settings::default() },
            Settings { alsa_device: String::new(), ..Settings::default() },
        ];
        for settings in invalid {
            assert!(
                matches!(settings.validate(), Err(ConfigError::ValidationError(_))),
                "expected validation failure for {:?}",
                settings
            );
        }
    }

    #[test]
    fn test_default_path() {
        let path = Settings::default_path();
        assert!(path.to_str().unwrap().contains(".config/r-voiceline/config.json"));
    }
}
