//! Property-based tests for configuration module
//!
//! These tests use proptest to generate random configurations and verify
//! validation bounds and TOML round-trips.

use super::*;
use proptest::prelude::*;

prop_compose! {
    fn valid_window_config()(
        width in 1u32..=MAX_DIMENSION,
        height in 1u32..=MAX_DIMENSION,
    ) -> WindowConfig {
        WindowConfig { width, height }
    }
}

prop_compose! {
    fn valid_config()(
        window in valid_window_config(),
        debug in any::<bool>(),
    ) -> PepegaConfig {
        PepegaConfig {
            window,
            general: GeneralConfig { debug },
        }
    }
}

proptest! {
    #[test]
    fn test_valid_configs_validate(config in valid_config()) {
        prop_assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_roundtrip(config in valid_config()) {
        let text = toml::to_string(&config).unwrap();
        let back: PepegaConfig = toml::from_str(&text).unwrap();
        prop_assert_eq!(config, back);
    }

    #[test]
    fn test_width_bounds(width in 0u32..(MAX_DIMENSION * 2)) {
        let mut config = PepegaConfig::default();
        config.window.width = width;

        let result = config.validate();
        if width >= 1 && width <= MAX_DIMENSION {
            prop_assert!(result.is_ok());
        } else {
            prop_assert!(result.is_err());
        }
    }
}
