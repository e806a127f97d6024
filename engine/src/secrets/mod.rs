//! Credentials
//!
//! The bot token and completion service credentials are read from the
//! process environment at startup and kept in [`SecretString`] wrappers.
//! [`scrub`] removes credential-shaped substrings from text before it is
//! logged.

pub mod string;

pub use string::SecretString;

use regex::Regex;
use sdk::errors::EngineError;
use std::sync::OnceLock;

pub const TELEGRAM_TOKEN_VAR: &str = "TELEGRAM_TOKEN";
pub const YANDEX_API_KEY_VAR: &str = "YANDEX_API_KEY";
pub const YANDEX_FOLDER_ID_VAR: &str = "YANDEX_FOLDER_ID";

/// Credentials needed to serve users
#[derive(Debug, Clone)]
pub struct Secrets {
    pub telegram_token: SecretString,
    pub completion: CompletionCredentials,
}

/// Credentials for the completion service
#[derive(Debug, Clone)]
pub struct CompletionCredentials {
    pub api_key: SecretString,
    pub folder_id: String,
}

impl Secrets {
    /// Read all credentials from the environment
    ///
    /// # Errors
    /// Returns `EngineError::MissingSecret` naming the first variable that is
    /// unset or blank.
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read all credentials through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            telegram_token: SecretString::new(require(&lookup, TELEGRAM_TOKEN_VAR)?),
            completion: CompletionCredentials::from_lookup(&lookup)?,
        })
    }
}

impl CompletionCredentials {
    /// Read completion credentials from the environment
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            api_key: SecretString::new(require(&lookup, YANDEX_API_KEY_VAR)?),
            folder_id: require(&lookup, YANDEX_FOLDER_ID_VAR)?,
        })
    }
}

fn require<F>(lookup: &F, key: &str) -> Result<String, EngineError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| EngineError::MissingSecret(key.to_string()))
}

/// Regex patterns for detecting credential formats.
static SECRET_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

/// Patterns match:
/// - Yandex Cloud API keys: AQVN[0-9A-Za-z-_]{20,}
/// - Yandex IAM tokens: t1.[0-9A-Za-z-_.]{20,}
/// - Telegram bot tokens: [0-9]{8,10}:[a-zA-Z0-9-_]{35}
/// - Authorization header values: Api-Key / Bearer followed by a token
fn get_secret_patterns() -> &'static Vec<Regex> {
    SECRET_PATTERNS.get_or_init(|| {
        [
            r"AQVN[0-9A-Za-z\-_]{20,}",
            r"\bt1\.[0-9A-Za-z\-_.]{20,}",
            r"\b[0-9]{8,10}:[a-zA-Z0-9\-_]{35}\b",
            r"(?i)(Api-Key|Bearer)\s+[^\s]{8,}",
        ]
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
    })
}

/// Replace credential-shaped substrings with `[REDACTED]`
pub fn scrub(text: &str) -> String {
    let mut result = text.to_string();

    for pattern in get_secret_patterns() {
        result = pattern.replace_all(&result, "[REDACTED]").to_string();
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_all_secrets_present() {
        let secrets = Secrets::from_lookup(lookup_from(&[
            (TELEGRAM_TOKEN_VAR, "123:abc"),
            (YANDEX_API_KEY_VAR, "key"),
            (YANDEX_FOLDER_ID_VAR, " b1g-folder \n"),
        ]))
        .unwrap();

        assert_eq!(secrets.telegram_token.unsecure(), "123:abc");
        assert_eq!(secrets.completion.api_key.unsecure(), "key");
        assert_eq!(secrets.completion.folder_id, "b1g-folder");
    }

    #[test]
    fn test_missing_secret_names_variable() {
        let err = Secrets::from_lookup(lookup_from(&[
            (TELEGRAM_TOKEN_VAR, "123:abc"),
            (YANDEX_API_KEY_VAR, "key"),
        ]))
        .unwrap_err();

        assert!(matches!(err, EngineError::MissingSecret(name) if name == YANDEX_FOLDER_ID_VAR));
    }

    #[test]
    fn test_blank_secret_is_missing() {
        let err = CompletionCredentials::from_lookup(lookup_from(&[
            (YANDEX_API_KEY_VAR, "   "),
            (YANDEX_FOLDER_ID_VAR, "folder"),
        ]))
        .unwrap_err();

        assert!(matches!(err, EngineError::MissingSecret(name) if name == YANDEX_API_KEY_VAR));
    }

    #[test]
    fn test_scrub_api_key() {
        let text = "upstream said: bad key AQVNabcdefghijklmnopqrstuvwxyz0123";
        let scrubbed = scrub(text);
        assert!(!scrubbed.contains("AQVN"));
        assert!(scrubbed.contains("[REDACTED]"));
    }

    #[test]
    fn test_scrub_telegram_token() {
        let text = "token 1234567890:ABCdefGHIjklMNOpqrSTUvwxYZ012345678 leaked";
        let scrubbed = scrub(text);
        assert!(!scrubbed.contains("ABCdef"));
        assert!(scrubbed.ends_with("leaked"));
    }

    #[test]
    fn test_scrub_authorization_header() {
        let scrubbed = scrub("Authorization: Api-Key supersecretvalue");
        assert_eq!(scrubbed, "Authorization: [REDACTED]");
    }

    #[test]
    fn test_scrub_leaves_plain_text() {
        let text = "Привет, как дела?";
        assert_eq!(scrub(text), text);
    }
}
