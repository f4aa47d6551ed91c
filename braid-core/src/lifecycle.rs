//! Forward-only status state machines
//!
//! Issues and pull requests both move through a fixed set of statuses. Each
//! status enum lists its allowed edges; `advance` enforces them and logs the
//! transition.

use std::fmt::{Debug, Display};

use crate::error::{Error, Result};

/// A status enum with an explicit transition table
pub trait Lifecycle: Copy + PartialEq + Debug + Display {
    /// Name used in errors and logs
    const ENTITY: &'static str;

    /// Whether `self -> next` is an allowed edge
    fn can_transition_to(&self, next: Self) -> bool;

    /// Whether no further transition is possible
    fn is_terminal(&self) -> bool;

    /// Attempt to move to `next`
    ///
    /// Leaves `self` untouched and returns `InvalidTransition` when the edge
    /// is not allowed.
    fn advance(&mut self, next: Self) -> Result<()> {
        if !self.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                entity: Self::ENTITY,
                from: self.to_string(),
                to: next.to_string(),
            });
        }

        tracing::info!(
            entity = Self::ENTITY,
            from = %self,
            to = %next,
            "Status transition"
        );

        *self = next;
        Ok(())
    }
}
