use proptest::prelude::*;
use sdk::errors::{EngineError, ErrorExt};
use sdk::health::format_uptime;

proptest! {
    #[test]
    fn test_error_user_hint_completeness(error_str in "\\PC*") {
        // Every variant yields a non-empty hint regardless of its payload
        let errs = vec![
            EngineError::Config(error_str.clone()),
            EngineError::MissingSecret(error_str.clone()),
            EngineError::Network(error_str.clone()),
            EngineError::Platform(error_str.clone()),
            EngineError::Panicked(error_str.clone()),
        ];

        for err in errs {
            prop_assert!(!err.user_hint().is_empty());
        }
    }

    // The rendered parts add back up to the whole seconds given
    #[test]
    fn test_format_uptime_components(seconds in 0u64..10_000_000) {
        let rendered = format_uptime(seconds as f64);
        let parts: Vec<u64> = rendered
            .split(' ')
            .map(|p| p.trim_end_matches(['h', 'm', 's']).parse().unwrap())
            .collect();

        prop_assert_eq!(parts.len(), 3);
        prop_assert!(parts[1] < 60);
        prop_assert!(parts[2] < 60);
        prop_assert_eq!(parts[0] * 3600 + parts[1] * 60 + parts[2], seconds);
    }
}
