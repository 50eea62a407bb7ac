//! Error types for the scene-di container.
//!
//! This module defines the error model used across the crate to describe
//! failures during registration, resolution, construction, member injection
//! and installation.
//!
//! # Design
//!
//! - `ErrorKind` captures the error category.
//! - `Error` stores the category, a human-readable message, the capability
//!   involved (when there is one) and an optional inner cause.
//!
//! The helpers on `Error` keep call sites concise and messages consistent.
//!
//! # Feature Flags
//!
//! - `tracing`: traces errors at `debug` level when they are created. Whoever
//!   finally reports a failure (the injector, the lifecycle) logs it at
//!   `warn` or `error`.
//!
//! # Examples
//!
//! ```
//! use scene_di::error::{Error, ErrorKind};
//!
//! let err = Error::unregistered_capability("MyService");
//! assert_eq!(err.kind, ErrorKind::UnregisteredCapability);
//! assert!(err.message.contains("MyService"));
//! ```

use std::error::Error as StdError;
use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::debug;

/// Inner cause of a construction or injection failure.
///
/// Always an `Arc` so that `Error` stays `Clone + Send + Sync` in both runtime modes.
pub type Cause = Arc<dyn StdError + Send + Sync + 'static>;

/// Error categories for the container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A capability was registered twice.
    DuplicateRegistration,
    /// Resolution requested for a capability nobody registered.
    UnregisteredCapability,
    /// A capability transitively depends on itself.
    CyclicDependency,
    /// A producer failed to build its instance.
    ConstructionFailure,
    /// A declared member of a target could not be satisfied.
    InjectionFailure,
    /// A stored value does not have the type its capability promises.
    TypeMismatch,
    /// An installer ran twice on the same lifecycle.
    AlreadyInstalled,
}

/// Container error structure.
///
/// `kind` enables programmatic handling, while `message` is human-readable.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    /// Type name of the capability involved, when the error concerns one.
    pub capability: Option<&'static str>,
    #[source]
    source: Option<Cause>,
}

impl Error {
    /// Creates a new error with the given kind and message.
    ///
    /// If the `tracing` feature is enabled, the error is traced on creation.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let error = Self {
            kind,
            message: message.into(),
            capability: None,
            source: None,
        };

        #[cfg(feature = "tracing")]
        debug!(kind = ?error.kind, "{}", error.message);

        error
    }

    fn about(mut self, capability: &'static str) -> Self {
        self.capability = Some(capability);
        self
    }

    pub fn duplicate_registration(capability: &'static str, existing: &str) -> Self {
        Self::new(
            ErrorKind::DuplicateRegistration,
            format!(
                "Capability {} is already registered (bound to {})",
                capability, existing
            ),
        )
        .about(capability)
    }

    pub fn unregistered_capability(capability: &'static str) -> Self {
        Self::new(
            ErrorKind::UnregisteredCapability,
            format!("No registration found for capability: {}", capability),
        )
        .about(capability)
    }

    /// `chain` is the resolution stack including the re-entered capability.
    pub fn cyclic_dependency(chain: &[&'static str]) -> Self {
        let error = Self::new(
            ErrorKind::CyclicDependency,
            format!("Cyclic dependency detected: {}", chain.join(" -> ")),
        );

        match chain.last().copied() {
            Some(capability) => error.about(capability),
            None => error,
        }
    }

    /// A producer for `capability` failed with `cause`.
    ///
    /// Construct implementations use this to surface their own errors.
    pub fn construction_failure<E>(capability: &'static str, cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let mut error = Self::new(
            ErrorKind::ConstructionFailure,
            format!("Failed to construct {}: {}", capability, cause),
        )
        .about(capability);
        error.source = Some(Arc::new(cause));
        error
    }

    /// Wraps a resolution error raised while filling `member` of `target`.
    pub fn injection_failure(target: &str, member: &str, cause: Error) -> Self {
        let mut error = Self::new(
            ErrorKind::InjectionFailure,
            format!("Failed to inject {}::{}: {}", target, member, cause.message),
        );
        error.capability = cause.capability;
        error.source = Some(Arc::new(cause));
        error
    }

    pub fn type_mismatch(capability: &'static str) -> Self {
        Self::new(
            ErrorKind::TypeMismatch,
            format!("Type mismatch when resolving: {}", capability),
        )
        .about(capability)
    }

    pub fn already_installed(installer: &str) -> Self {
        Self::new(
            ErrorKind::AlreadyInstalled,
            format!("Installer {} has already run", installer),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("connection refused")]
    struct Refused;

    #[test]
    fn unregistered_capability_error() {
        let err = Error::unregistered_capability("MyType");
        assert_eq!(err.kind, ErrorKind::UnregisteredCapability);
        assert_eq!(err.capability, Some("MyType"));
        assert!(err.message.contains("MyType"));
    }

    #[test]
    fn duplicate_registration_error() {
        let err = Error::duplicate_registration("Foo", "FooImpl");
        assert_eq!(err.kind, ErrorKind::DuplicateRegistration);
        assert!(err.message.contains("Foo"));
        assert!(err.message.contains("FooImpl"));
    }

    #[test]
    fn cyclic_dependency_error() {
        let err = Error::cyclic_dependency(&["A", "B", "A"]);
        assert_eq!(err.kind, ErrorKind::CyclicDependency);
        assert!(err.message.contains("A -> B -> A"));
        assert_eq!(err.capability, Some("A"));
    }

    #[test]
    fn construction_failure_keeps_cause() {
        let err = Error::construction_failure("Database", Refused);
        assert_eq!(err.kind, ErrorKind::ConstructionFailure);
        assert!(err.message.contains("connection refused"));

        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("connection refused"));
    }

    #[test]
    fn injection_failure_wraps_resolution_error() {
        let cause = Error::unregistered_capability("Clock");
        let err = Error::injection_failure("Player", "clock", cause);
        assert_eq!(err.kind, ErrorKind::InjectionFailure);
        assert_eq!(err.capability, Some("Clock"));
        assert!(err.message.contains("Player::clock"));
        assert!(err.source().is_some());
    }

    #[test]
    fn display_trait() {
        let err = Error::type_mismatch("X");
        assert_eq!(format!("{}", err), err.message);
    }

    #[test]
    fn error_kind_equality() {
        let err1 = Error::type_mismatch("A");
        let err2 = Error::type_mismatch("B");
        assert_eq!(err1.kind, err2.kind);
        assert_ne!(err1.message, err2.message);
    }
}
