//! Validated free-text labels: participant names and contribution items.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a label.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LabelError {
    /// The input is empty or whitespace only.
    #[error("must not be empty")]
    Empty,
    /// The input is too long.
    #[error("must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length in characters.
        max: usize,
    },
    /// The input contains a character outside the allowed set.
    #[error("contains invalid character '{0}'")]
    InvalidCharacter(char),
}

/// Characters allowed besides ASCII letters, digits, whitespace and `-`.
const GERMAN_LETTERS: &str = "äöüÄÖÜß";

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || c.is_whitespace() || c == '-'
}

/// Trim and validate a label against the shared character set.
fn validate(input: &str, max: usize) -> Result<String, LabelError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(LabelError::Empty);
    }

    if trimmed.chars().count() > max {
        return Err(LabelError::TooLong { max });
    }

    if let Some(bad) = trimmed
        .chars()
        .find(|&c| !is_allowed(c) && !GERMAN_LETTERS.contains(c))
    {
        return Err(LabelError::InvalidCharacter(bad));
    }

    Ok(trimmed.to_owned())
}

/// Name of a participant.
///
/// ## Constraints
///
/// - Leading and trailing whitespace is trimmed
/// - Length: 1-64 characters after trimming
/// - Letters `A-Z`, `a-z`, German umlauts and `ß`, digits, whitespace, `-`
///
/// ## Examples
///
/// ```
/// use brunch_core::ParticipantName;
///
/// assert!(ParticipantName::parse("Jürgen Meier").is_ok());
/// assert!(ParticipantName::parse("DO1FFE").is_ok());
///
/// assert!(ParticipantName::parse("   ").is_err());
/// assert!(ParticipantName::parse("<script>").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ParticipantName(String);

impl ParticipantName {
    /// Maximum length of a participant name in characters.
    pub const MAX_LENGTH: usize = 64;

    /// Parse a `ParticipantName` from user input.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, longer than
    /// [`Self::MAX_LENGTH`], or contains a disallowed character.
    pub fn parse(s: &str) -> Result<Self, LabelError> {
        validate(s, Self::MAX_LENGTH).map(Self)
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the name and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// A contribution item somebody brings to the brunch ("Mitbringsel").
///
/// Same character set as [`ParticipantName`], up to 80 characters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ItemName(String);

impl ItemName {
    /// Maximum length of an item name in characters.
    pub const MAX_LENGTH: usize = 80;

    /// Parse an `ItemName` from user input.
    ///
    /// # Errors
    ///
    /// Same rules as [`ParticipantName::parse`] with a longer limit.
    pub fn parse(s: &str) -> Result<Self, LabelError> {
        validate(s, Self::MAX_LENGTH).map(Self)
    }

    /// Parse optional form input, treating blank input as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if non-blank input fails validation.
    pub fn parse_optional(s: Option<&str>) -> Result<Option<Self>, LabelError> {
        match s.map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => Self::parse(value).map(Some),
        }
    }

    /// Returns the item as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the item and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

macro_rules! impl_label_traits {
    ($name:ident) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = LabelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        // SQLx support (with sqlite feature)
        #[cfg(feature = "sqlite")]
        impl sqlx::Type<sqlx::Sqlite> for $name {
            fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
                <String as sqlx::Type<sqlx::Sqlite>>::type_info()
            }

            fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
            }
        }

        #[cfg(feature = "sqlite")]
        impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for $name {
            fn decode(
                value: sqlx::sqlite::SqliteValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <String as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
                // Database values were validated on insert
                Ok(Self(s))
            }
        }

        #[cfg(feature = "sqlite")]
        impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut <sqlx::Sqlite as sqlx::Database>::ArgumentBuffer<'q>,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <String as sqlx::Encode<sqlx::Sqlite>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

impl_label_traits!(ParticipantName);
impl_label_traits!(ItemName);
