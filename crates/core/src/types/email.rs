//! Email address type used by the register and profile forms.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Reasons an email address is rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {max} characters")]
    TooLong { max: usize },
    #[error("email cannot contain whitespace")]
    Whitespace,
    #[error("email must contain exactly one @ symbol")]
    AtSymbol,
    #[error("email must have a name before the @")]
    EmptyLocalPart,
    #[error("email domain must look like example.com")]
    InvalidDomain,
}

/// A syntactically plausible email address.
///
/// Surrounding whitespace is trimmed. Deliverability is left to the remote
/// API; this type only catches the typos a form should reject before a
/// round trip.
///
/// ```
/// use aether_core::Email;
///
/// assert!(Email::parse(" buyer@shop.vn ").is_ok());
/// assert!(Email::parse("buyer@localhost").is_err());
/// assert!(Email::parse("two@@ats.vn").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Maximum length of an email address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse an `Email` from user input.
    ///
    /// # Errors
    ///
    /// Returns an [`EmailError`] describing the first problem found.
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(EmailError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if s.chars().any(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }

        let (local, domain) = match s.split_once('@') {
            Some((local, domain)) if !domain.contains('@') => (local, domain),
            _ => return Err(EmailError::AtSymbol),
        };
        if local.is_empty() {
            return Err(EmailError::EmptyLocalPart);
        }
        let labels_ok = domain.split('.').all(|label| !label.is_empty());
        if !domain.contains('.') || !labels_ok {
            return Err(EmailError::InvalidDomain);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the email address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Email` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_input() {
        let email = Email::parse("  buyer@shop.vn\n").unwrap();
        assert_eq!(email.as_str(), "buyer@shop.vn");
    }

    #[test]
    fn test_parse_rejections() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
        assert_eq!(Email::parse("no-at.vn"), Err(EmailError::AtSymbol));
        assert_eq!(Email::parse("a@b@c.vn"), Err(EmailError::AtSymbol));
        assert_eq!(Email::parse("@shop.vn"), Err(EmailError::EmptyLocalPart));
        assert_eq!(Email::parse("buyer@shop"), Err(EmailError::InvalidDomain));
        assert_eq!(Email::parse("buyer@shop..vn"), Err(EmailError::InvalidDomain));
        assert_eq!(Email::parse("bu yer@shop.vn"), Err(EmailError::Whitespace));
    }

    #[test]
    fn test_parse_too_long() {
        let long = format!("{}@shop.vn", "a".repeat(250));
        assert!(matches!(Email::parse(&long), Err(EmailError::TooLong { .. })));
    }
}
