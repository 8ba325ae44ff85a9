use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use super::DomainError;

/// RFC 5321 caps a forward-path at 254 characters.
pub const MAX_EMAIL_LENGTH: usize = 254;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}$").expect("Invalid email regex")
    })
}

/// A syntactically valid, lowercase email address.
///
/// Construction trims surrounding whitespace and lowercases the address, so
/// two addresses differing only in case compare equal.
///
/// ```rust
/// use authkeep::domain::Email;
///
/// let email = Email::parse("User@Example.COM").unwrap();
/// assert_eq!(email.as_str(), "user@example.com");
/// assert_eq!(email.local_part(), "user");
/// assert_eq!(email.domain(), "example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::empty_field("email"));
        }

        if trimmed.len() > MAX_EMAIL_LENGTH {
            return Err(DomainError::invalid_format(
                "email",
                format!("must be at most {MAX_EMAIL_LENGTH} characters"),
            ));
        }

        let normalized = trimmed.to_lowercase();
        if !email_regex().is_match(&normalized) {
            return Err(DomainError::invalid_format(
                "email",
                "expected local@domain.tld",
            ));
        }

        Ok(Self(normalized))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn local_part(&self) -> &str {
        self.split().0
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        self.split().1
    }

    fn split(&self) -> (&str, &str) {
        // The regex admits exactly one '@'.
        self.0.split_once('@').unwrap_or((self.0.as_str(), ""))
    }

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

impl FromStr for Email {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Email {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainErrorKind;

    #[test]
    fn normalizes_case_and_whitespace() {
        let email = Email::parse("  User@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "user@example.com");
        assert_eq!(email, Email::parse("user@example.com").unwrap());
    }

    #[test]
    fn splits_exactly_at_the_at_sign() {
        let email = Email::parse("first.last+tag@mail.example.co.uk").unwrap();
        assert_eq!(email.local_part(), "first.last+tag");
        assert_eq!(email.domain(), "mail.example.co.uk");
    }

    #[test]
    fn rejects_empty() {
        let err = Email::parse("").unwrap_err();
        assert_eq!(err.kind(), &DomainErrorKind::EmptyField { field: "email" });

        let err = Email::parse("   ").unwrap_err();
        assert_eq!(err.code(), "EMPTY_FIELD");
    }

    #[test]
    fn rejects_over_254_characters() {
        let local = "a".repeat(64);
        let domain = format!("{}.com", "b".repeat(MAX_EMAIL_LENGTH));
        let err = Email::parse(&format!("{local}@{domain}")).unwrap_err();
        assert_eq!(err.code(), "INVALID_FORMAT");
    }

    #[test]
    fn accepts_exactly_254_characters() {
        let domain = "example.com";
        let local = "a".repeat(MAX_EMAIL_LENGTH - domain.len() - 1);
        let raw = format!("{local}@{domain}");
        assert_eq!(raw.len(), MAX_EMAIL_LENGTH);
        assert!(Email::parse(&raw).is_ok());
    }

    #[test]
    fn rejects_malformed_addresses() {
        for raw in [
            "plainaddress",
            "missing-domain@",
            "@missing-local.com",
            "no-tld@example",
            "two@@example.com",
            "spaces in@example.com",
            "user@example.c",
        ] {
            let err = Email::parse(raw).unwrap_err();
            assert_eq!(err.code(), "INVALID_FORMAT", "{raw} should be rejected");
        }
    }

    #[test]
    fn deserialization_validates() {
        let ok: Email = serde_json::from_str("\"Alice@Example.com\"").unwrap();
        assert_eq!(ok.as_str(), "alice@example.com");
        assert!(serde_json::from_str::<Email>("\"nope\"").is_err());
    }
}
