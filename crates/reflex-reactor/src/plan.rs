//! Collaborator interfaces for deliberative reactors.
//!
//! The executive never implements symbolic planning itself. A reactor
//! that deliberates owns a plan database and drives it through these
//! traits; the concrete solver is an external crate wired in by the
//! application. Only the interfaces are fixed here.

use reflex_types::{ErrorCode, Tick};
use std::path::Path;
use thiserror::Error;

/// Errors from the deliberation engine.
#[derive(Debug, Clone, Error)]
pub enum PlanError {
    /// A transaction could not be applied.
    #[error("transaction failed: {0}")]
    Transaction(String),

    /// The database is in an inconsistent state.
    #[error("plan database inconsistent: {0}")]
    Inconsistent(String),

    /// Snapshot or script I/O failed.
    #[error("plan i/o failed: {0}")]
    Io(String),
}

impl ErrorCode for PlanError {
    fn code(&self) -> &'static str {
        match self {
            Self::Transaction(_) => "PLAN_TRANSACTION_FAILED",
            Self::Inconsistent(_) => "PLAN_INCONSISTENT",
            Self::Io(_) => "PLAN_IO_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Inconsistent(_) | Self::Io(_))
    }
}

/// Opaque constraint-based plan database.
///
/// The agent core holds these behind a reactor and only ever calls the
/// three operations below; everything else about the database is the
/// solver's business.
pub trait PlanDatabase: Send {
    /// Applies one transaction batch to the database.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Transaction`] when the batch cannot be
    /// applied.
    fn apply_transaction(&mut self, transaction: &str) -> Result<(), PlanError>;

    /// Whether the database currently admits a consistent plan.
    fn is_consistent(&self) -> bool;

    /// Dumps the database state for the given tick and deliberation
    /// attempt, for offline inspection.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Io`] when the dump cannot be written.
    fn write_snapshot(&self, tick: Tick, attempt: u32) -> Result<(), PlanError>;
}

/// Interpreter for transaction scripts.
pub trait ScriptInterpreter: Send {
    /// Evaluates the transaction script at `source` against the engine
    /// this interpreter is bound to.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] when the script fails to load or apply.
    fn evaluate(&mut self, source: &Path) -> Result<(), PlanError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use reflex_types::assert_error_codes;

    #[test]
    fn plan_error_codes() {
        assert_error_codes(
            &[
                PlanError::Transaction("x".into()),
                PlanError::Inconsistent("x".into()),
                PlanError::Io("x".into()),
            ],
            "PLAN_",
        );
    }

    #[derive(Default)]
    struct RecordingDb {
        applied: Vec<String>,
        consistent: bool,
    }

    impl PlanDatabase for RecordingDb {
        fn apply_transaction(&mut self, transaction: &str) -> Result<(), PlanError> {
            self.applied.push(transaction.to_string());
            self.consistent = true;
            Ok(())
        }

        fn is_consistent(&self) -> bool {
            self.consistent
        }

        fn write_snapshot(&self, _tick: Tick, _attempt: u32) -> Result<(), PlanError> {
            Ok(())
        }
    }

    #[test]
    fn trait_is_object_safe() {
        let mut db: Box<dyn PlanDatabase> = Box::<RecordingDb>::default();
        assert!(!db.is_consistent());
        db.apply_transaction("assert(x)").expect("apply");
        assert!(db.is_consistent());
        db.write_snapshot(4, 1).expect("snapshot");
    }
}
