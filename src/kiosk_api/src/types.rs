use std::{fmt, str::FromStr};

use lettre::Address;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValueError {
    #[error("invalid login: must be a non-empty string")]
    Login,
    #[error("invalid password: must be a non-empty string")]
    Password,
    #[error("invalid email address: {0}")]
    EmailAddress(String),
    #[error("invalid recipient list: expected at least one comma separated email address")]
    NoRecipients,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Login(String);
impl Login {
    pub fn new(s: &str) -> Result<Self, ValueError> {
        let t = s.trim();
        if t.is_empty() {
            Err(ValueError::Login)
        } else {
            Ok(Self(t.into()))
        }
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl FromStr for Login {
    type Err = ValueError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
impl AsRef<str> for Login {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A kiosk password. Kept verbatim, surrounding whitespace included.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);
impl Password {
    pub fn new(s: &str) -> Result<Self, ValueError> {
        if s.is_empty() {
            Err(ValueError::Password)
        } else {
            Ok(Self(s.into()))
        }
    }
}
impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(****)")
    }
}
impl FromStr for Password {
    type Err = ValueError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
impl AsRef<str> for Password {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Comma separated list of mail recipients, e.g. `"a@example.org, b@example.org"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipients(Vec<Address>);
impl Recipients {
    pub fn new(s: &str) -> Result<Self, ValueError> {
        let addresses = s
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                entry
                    .parse::<Address>()
                    .map_err(|_| ValueError::EmailAddress(entry.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if addresses.is_empty() {
            Err(ValueError::NoRecipients)
        } else {
            Ok(Self(addresses))
        }
    }
    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.0.iter()
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
impl FromStr for Recipients {
    type Err = ValueError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
impl fmt::Display for Recipients {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(Address::to_string)
            .collect::<Vec<_>>()
            .join(",");
        f.write_str(&joined)
    }
}
