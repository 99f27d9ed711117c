//! Participant signups for the current brunch cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::SignupId;
use super::label::{ItemName, ParticipantName};

/// How somebody takes part in the brunch.
///
/// A coffee-only guest never brings a contribution, so the two are modelled
/// as separate variants rather than a flag next to an optional item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Participation {
    /// Full brunch, optionally bringing an item.
    Brunch {
        /// What the participant brings, if anything.
        contribution: Option<ItemName>,
    },
    /// Only joining for coffee.
    CoffeeOnly,
}

impl Participation {
    /// Build from the signup form fields.
    ///
    /// The coffee-only checkbox wins: any contribution is dropped.
    #[must_use]
    pub fn from_form(coffee_only: bool, contribution: Option<ItemName>) -> Self {
        if coffee_only {
            Self::CoffeeOnly
        } else {
            Self::Brunch { contribution }
        }
    }

    /// Whether this is a coffee-only signup.
    #[must_use]
    pub const fn is_coffee_only(&self) -> bool {
        matches!(self, Self::CoffeeOnly)
    }

    /// The contribution item, if any.
    #[must_use]
    pub const fn contribution(&self) -> Option<&ItemName> {
        match self {
            Self::Brunch { contribution } => contribution.as_ref(),
            Self::CoffeeOnly => None,
        }
    }
}

/// A stored signup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signup {
    /// Row ID; increases with insertion order.
    pub id: SignupId,
    /// Participant name, unique within the cycle.
    pub name: ParticipantName,
    /// Brunch with optional contribution, or coffee only.
    pub participation: Participation,
    /// When the signup was made.
    pub registered_at: DateTime<Utc>,
}

/// Number of participants coming for the full brunch.
///
/// Used to order bread rolls; coffee-only guests do not count.
#[must_use]
pub fn required_roll_count(signups: &[Signup]) -> usize {
    signups
        .iter()
        .filter(|signup| !signup.participation.is_coffee_only())
        .count()
}
