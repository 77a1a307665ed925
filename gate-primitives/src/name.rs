//! Tool names accepted by the broker.

use std::borrow::Borrow;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Lowercase snake-case tool name matching `^[a-z][a-z0-9_]*$`.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ToolName(String);

impl ToolName {
    /// Creates a tool name after validating its format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidToolName`] if the name is empty, does not start
    /// with a lowercase letter, or contains characters other than lowercase
    /// letters, digits, and underscores.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self(name))
    }

    /// Returns `true` when `name` would be accepted by [`ToolName::new`].
    #[must_use]
    pub fn is_valid(name: &str) -> bool {
        validate_name(name).is_ok()
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ToolName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ToolName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ToolName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<ToolName> for String {
    fn from(value: ToolName) -> Self {
        value.0
    }
}

impl TryFrom<String> for ToolName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl FromStr for ToolName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

fn validate_name(name: &str) -> Result<()> {
    let Some(first) = name.chars().next() else {
        return Err(Error::InvalidToolName {
            name: String::new(),
            reason: "name cannot be empty".into(),
        });
    };

    if !first.is_ascii_lowercase() {
        return Err(Error::InvalidToolName {
            name: name.into(),
            reason: "name must start with a lowercase letter".into(),
        });
    }

    if !name
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_'))
    {
        return Err(Error::InvalidToolName {
            name: name.into(),
            reason: "name must contain only lowercase letters, digits, or underscores".into(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_snake_case() {
        for name in ["data_hash", "a", "read_file_v2", "x_1_"] {
            assert!(ToolName::new(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn rejects_malformed_names() {
        for name in ["", "Data", "1tool", "_tool", "read-file", "read file", "tool.x"] {
            let err = ToolName::new(name).expect_err("should be rejected");
            assert!(matches!(err, Error::InvalidToolName { .. }), "{name}");
        }
    }

    #[test]
    fn long_names_are_not_capped() {
        let name = format!("a{}", "b".repeat(200));
        assert!(ToolName::is_valid(&name));
        assert_eq!(ToolName::new(name.clone()).unwrap().as_str(), name);
    }

    #[test]
    fn deserialization_validates() {
        let ok: ToolName = serde_json::from_str("\"shell_exec\"").expect("valid");
        assert_eq!(ok.as_str(), "shell_exec");
        assert!(serde_json::from_str::<ToolName>("\"Shell\"").is_err());
    }
}
