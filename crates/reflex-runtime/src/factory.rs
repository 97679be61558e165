//! Name-keyed reactor construction.
//!
//! Reactor kinds register construction closures under string names; the
//! agent builds each configured reactor by kind. The registry is an
//! explicit service threaded into agent construction, populated before
//! the agent exists and read-only afterwards.

use crate::config::ReactorSpec;
use reflex_reactor::Reactor;
use reflex_types::ErrorCode;
use std::collections::HashMap;
use thiserror::Error;

/// Factory errors.
///
/// | Error | Code | Recoverable |
/// |-------|------|-------------|
/// | [`DuplicateKind`](FactoryError::DuplicateKind) | `FACTORY_DUPLICATE_KIND` | No |
/// | [`UnknownKind`](FactoryError::UnknownKind) | `FACTORY_UNKNOWN_KIND` | No |
/// | [`Construction`](FactoryError::Construction) | `FACTORY_CONSTRUCTION_FAILED` | No |
#[derive(Debug, Clone, Error)]
pub enum FactoryError {
    /// A kind name was registered twice. Programming error.
    #[error("reactor kind '{0}' already registered")]
    DuplicateKind(String),

    /// No builder registered under the requested kind.
    #[error("unknown reactor kind '{0}'")]
    UnknownKind(String),

    /// The builder rejected the spec.
    #[error("cannot construct '{kind}' reactor: {message}")]
    Construction {
        /// Kind whose builder failed.
        kind: String,
        /// Builder's complaint.
        message: String,
    },
}

impl ErrorCode for FactoryError {
    fn code(&self) -> &'static str {
        match self {
            Self::DuplicateKind(_) => "FACTORY_DUPLICATE_KIND",
            Self::UnknownKind(_) => "FACTORY_UNKNOWN_KIND",
            Self::Construction { .. } => "FACTORY_CONSTRUCTION_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

type BuilderFn = Box<dyn Fn(&ReactorSpec) -> Result<Box<dyn Reactor>, FactoryError> + Send + Sync>;

/// Registry of reactor builders.
#[derive(Default)]
pub struct ReactorFactory {
    builders: HashMap<String, BuilderFn>,
}

impl ReactorFactory {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a builder under `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::DuplicateKind`] when the name is taken.
    pub fn register<F>(&mut self, kind: impl Into<String>, builder: F) -> Result<(), FactoryError>
    where
        F: Fn(&ReactorSpec) -> Result<Box<dyn Reactor>, FactoryError> + Send + Sync + 'static,
    {
        let kind = kind.into();
        if self.builders.contains_key(&kind) {
            return Err(FactoryError::DuplicateKind(kind));
        }
        self.builders.insert(kind, Box::new(builder));
        Ok(())
    }

    /// Builds a reactor of the given kind.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::UnknownKind`] for unregistered kinds or
    /// whatever the builder itself returns.
    pub fn build(&self, kind: &str, spec: &ReactorSpec) -> Result<Box<dyn Reactor>, FactoryError> {
        let builder = self
            .builders
            .get(kind)
            .ok_or_else(|| FactoryError::UnknownKind(kind.to_string()))?;
        builder(spec)
    }

    /// Registered kind names, sorted.
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.builders.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}
