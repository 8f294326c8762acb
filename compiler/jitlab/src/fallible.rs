//! "Expected"-style fallible construction.
//!
//! [`create`] either yields a usable [`Tracked`] value or a [`CreateError`];
//! a caller cannot reach the value without first matching on the result.
//! `Tracked` logs its construction and destruction so the lifetime of a
//! successfully created value is visible with `RUST_LOG=jitlab=debug`.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Why [`create`] refused to build a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CreateError {
    /// The input signals failure.
    #[error("Something happened.")]
    Rejected { input: i32 },
}

/// A value that reports its own lifetime.
#[derive(Debug, PartialEq, Eq)]
pub struct Tracked {
    id: u64,
}

impl Tracked {
    fn new() -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        debug!(id, "init Tracked");
        Self { id }
    }

    /// Process-unique identity of this value.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn describe(&self) -> String {
        format!("Tracked #{}", self.id)
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        debug!(id = self.id, "drop Tracked");
    }
}

/// Build a [`Tracked`]; an input of `0` fails.
pub fn create(input: i32) -> Result<Tracked, CreateError> {
    if input == 0 {
        return Err(CreateError::Rejected { input });
    }
    Ok(Tracked::new())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn failing_input_is_an_error() {
        let result = create(0);
        assert_eq!(result, Err(CreateError::Rejected { input: 0 }));
        let Err(err) = result else { unreachable!() };
        assert_eq!(err.to_string(), "Something happened.");
    }

    #[test]
    fn valid_input_yields_a_value() {
        let first = create(1).unwrap();
        let second = create(-7).unwrap();
        assert_ne!(first.id(), second.id());
        assert_eq!(first.describe(), format!("Tracked #{}", first.id()));
    }
}
