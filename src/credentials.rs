//! Secure storage for the transcription API key using the system keyring.
//!
//! The API key is stored in the OS's native secret storage:
//! - Linux: libsecret (GNOME Keyring/KDE Wallet)
//! - macOS: Keychain
//! - Windows: Credential Manager
//!
//! Security notes:
//! - Never log the key value
//! - Always use masked display in UI
//! - Key is encrypted at rest by OS

use keyring::Entry;

const SERVICE_NAME: &str = "voicewire";
const API_KEY_NAME: &str = "transcription-api-key";

/// Environment fallback for development setups without a keyring.
const API_KEY_ENV: &str = "VOICEWIRE_API_KEY";

/// Expected key shape: fixed-length hexadecimal.
const API_KEY_LEN: usize = 40;

/// Source of the transcription API key.
///
/// The connection client validates the key shape with [`is_valid_api_key`]
/// before any network call; a malformed key aborts the connect.
pub trait CredentialStore: Send + Sync {
    /// The current API key, if one is configured.
    fn api_key(&self) -> Option<String>;
}

/// Keyring-backed store with an environment-variable fallback.
#[derive(Debug, Default, Clone)]
pub struct KeyringCredentialStore;

impl CredentialStore for KeyringCredentialStore {
    fn api_key(&self) -> Option<String> {
        if let Some(key) = get_api_key() {
            return Some(key);
        }
        std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty())
    }
}

/// Fixed in-memory key, for tests and embedding hosts that manage their own
/// secret storage.
#[derive(Debug, Clone)]
pub struct StaticCredentials(pub String);

impl CredentialStore for StaticCredentials {
    fn api_key(&self) -> Option<String> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.clone())
        }
    }
}

/// Validate the key shape client-side: 40 hexadecimal characters.
pub fn is_valid_api_key(key: &str) -> bool {
    key.len() == API_KEY_LEN && key.chars().all(|c| c.is_ascii_hexdigit())
}

/// Retrieve the stored API key, if any.
/// Returns None if not configured or on error (errors are logged).
pub fn get_api_key() -> Option<String> {
    let entry = match Entry::new(SERVICE_NAME, API_KEY_NAME) {
        Ok(e) => e,
        Err(e) => {
            log::warn!("Credentials: failed to create keyring entry: {}", e);
            return None;
        }
    };

    match entry.get_password() {
        Ok(key) => {
            if key.is_empty() {
                None
            } else {
                Some(key)
            }
        }
        Err(keyring::Error::NoEntry) => None,
        Err(e) => {
            log::warn!("Credentials: failed to retrieve key: {}", e);
            None
        }
    }
}

/// Store the API key in the system keyring.
/// Pass None to delete the key.
pub fn set_api_key(key: Option<&str>) -> Result<(), String> {
    let entry = Entry::new(SERVICE_NAME, API_KEY_NAME)
        .map_err(|e| format!("Failed to create keyring entry: {}", e))?;

    match key {
        Some(k) if !k.is_empty() => {
            entry
                .set_password(k)
                .map_err(|e| format!("Failed to store API key: {}", e))?;
            // Log action without the key value
            log::info!("Credentials: stored new API key");
        }
        _ => {
            match entry.delete_credential() {
                Ok(()) => log::info!("Credentials: deleted API key"),
                Err(keyring::Error::NoEntry) => {
                    // Already deleted, that's fine
                }
                Err(e) => return Err(format!("Failed to delete API key: {}", e)),
            }
        }
    }

    Ok(())
}

/// Returns a masked version of the key for display (e.g., "a3f...9c21e0")
pub fn masked_key(key: &str) -> String {
    if key.len() <= 8 {
        "*".repeat(key.len())
    } else {
        format!("{}...{}", &key[..3], &key[key.len() - 6..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_key_is_40_hex_chars() {
        let key = "0123456789abcdef0123456789abcdef01234567";
        assert_eq!(key.len(), 40);
        assert!(is_valid_api_key(key));
    }

    #[test]
    fn uppercase_hex_is_accepted() {
        assert!(is_valid_api_key("0123456789ABCDEF0123456789ABCDEF01234567"));
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert!(!is_valid_api_key(""));
        assert!(!is_valid_api_key("abc123"));
        assert!(!is_valid_api_key(&"a".repeat(39)));
        assert!(!is_valid_api_key(&"a".repeat(41)));
    }

    #[test]
    fn non_hex_characters_are_rejected() {
        assert!(!is_valid_api_key(&"g".repeat(40)));
        assert!(!is_valid_api_key(&"0123456789abcdef0123456789abcdef0123456-".to_string()));
    }

    #[test]
    fn masked_key_hides_middle() {
        let masked = masked_key("0123456789abcdef0123456789abcdef01234567");
        assert_eq!(masked, "012...234567");
        assert!(!masked.contains("89abcdef"));
    }

    #[test]
    fn short_key_is_fully_masked() {
        assert_eq!(masked_key("abc123"), "******");
    }

    #[test]
    fn static_credentials_return_key() {
        let store = StaticCredentials("0123456789abcdef0123456789abcdef01234567".into());
        assert!(store.api_key().is_some());
        assert!(StaticCredentials(String::new()).api_key().is_none());
    }
}
