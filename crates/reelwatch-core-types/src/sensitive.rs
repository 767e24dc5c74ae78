//! Sensitive data marker for automatic redaction
//!
//! The `Sensitive<T>` wrapper keeps bearer tokens and bot tokens out of
//! logs, error messages and `Debug` dumps of configuration.

use serde::{Deserialize, Deserializer};
use std::fmt;

/// Wrapper for sensitive data that redacts itself in Debug and Display
///
/// # Example
///
/// ```
/// use reelwatch_core_types::Sensitive;
///
/// let token = Sensitive::new("bot-token");
/// assert_eq!(format!("{:?}", token), "***REDACTED***");
/// assert_eq!(token.expose(), &"bot-token");
/// ```
pub struct Sensitive<T>(T);

impl<T> Sensitive<T> {
    /// Wrap a sensitive value
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Expose the underlying sensitive value
    ///
    /// Only call this where the secret must leave the process
    /// (e.g. building an `Authorization` header).
    pub fn expose(&self) -> &T {
        &self.0
    }

    /// Consume the wrapper and return the inner value
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***REDACTED***")
    }
}

impl<T> fmt::Display for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "***REDACTED***")
    }
}

impl<T: Clone> Clone for Sensitive<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Sensitive<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Sensitive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensitive_debug_redaction() {
        let secret = Sensitive::new("SkAkzoScIbhb3uNc");
        let debug_str = format!("{:?}", secret);
        assert_eq!(debug_str, "***REDACTED***");
        assert!(!debug_str.contains("SkAkzo"));
    }

    #[test]
    fn test_sensitive_display_redaction() {
        let secret = Sensitive::new("123456:bot-token");
        let display_str = format!("{}", secret);
        assert_eq!(display_str, "***REDACTED***");
        assert!(!display_str.contains("bot-token"));
    }

    #[test]
    fn test_sensitive_expose_and_into_inner() {
        let secret = Sensitive::new(String::from("token"));
        assert_eq!(secret.expose(), "token");
        assert_eq!(secret.into_inner(), "token");
    }

    #[test]
    fn test_sensitive_deserializes_transparently() {
        #[derive(Deserialize, Debug)]
        struct Credentials {
            user: String,
            token: Sensitive<String>,
        }

        let creds: Credentials =
            serde_json::from_str(r#"{"user":"scraper","token":"abc123"}"#).unwrap();
        assert_eq!(creds.token.expose(), "abc123");

        let debug_str = format!("{:?}", creds);
        assert!(debug_str.contains("scraper"));
        assert!(debug_str.contains("***REDACTED***"));
        assert!(!debug_str.contains("abc123"));
    }
}
