use crate::db::store::StoreError;
use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Every fallible engine operation reports through this type.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
        }
    }

    /// Construct an operand/value type mismatch.
    pub(crate) fn type_mismatch(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::TypeMismatch, origin, message)
    }

    /// Construct a violated caller precondition (for example a null under
    /// a comparator that declares nulls impossible).
    pub(crate) fn precondition(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Precondition, origin, message)
    }

    /// Construct a planner-origin invariant violation.
    pub(crate) fn planner_invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvariantViolation, ErrorOrigin::Planner, message)
    }

    /// Construct an executor-origin invariant violation.
    pub(crate) fn executor_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Executor,
            message,
        )
    }

    /// Construct a store fault surfaced to the caller.
    pub(crate) fn store_fault(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::StoreFault, ErrorOrigin::Store, message)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }

    #[must_use]
    pub const fn is_store_fault(&self) -> bool {
        matches!(self.class, ErrorClass::StoreFault)
    }
}

impl From<ConfigError> for InternalError {
    fn from(err: ConfigError) -> Self {
        Self::new(ErrorClass::Config, ErrorOrigin::Config, err.to_string())
    }
}

impl From<StoreError> for InternalError {
    // Reaching this conversion means the error arrived after rows were already
    // flowing, so even a rejection can no longer be retried.
    fn from(err: StoreError) -> Self {
        Self::store_fault(err.to_string())
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorClass {
    Config,
    TypeMismatch,
    Precondition,
    StoreFault,
    InvariantViolation,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Config => "config",
            Self::TypeMismatch => "type_mismatch",
            Self::Precondition => "precondition",
            Self::StoreFault => "store_fault",
            Self::InvariantViolation => "invariant_violation",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorOrigin {
    Model,
    Predicate,
    Comparator,
    Planner,
    Executor,
    Store,
    Config,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Model => "model",
            Self::Predicate => "predicate",
            Self::Comparator => "comparator",
            Self::Planner => "planner",
            Self::Executor => "executor",
            Self::Store => "store",
            Self::Config => "config",
        };
        write!(f, "{label}")
    }
}

///
/// ConfigError
///
/// Model-build, capability-resolution and configuration-document failures.
/// These are detected before any pipeline runs.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ConfigError {
    #[error("entity '{entity}' declares column '{field}' without an accessor")]
    MissingAccessor { entity: String, field: String },

    #[error("entity '{entity}' has an accessor for undeclared column '{field}'")]
    UnknownAccessor { entity: String, field: String },

    #[error("entity '{entity}' declares column '{field}' more than once")]
    DuplicateField { entity: String, field: String },

    #[error("entity '{entity}' has no column '{field}' to use as primary key")]
    UnknownPrimaryKey { entity: String, field: String },

    #[error("primary key '{entity}.{field}' must not be nullable")]
    NullablePrimaryKey { entity: String, field: String },

    #[error("capabilities for '{entity}' reference unknown field '{field}'")]
    UnknownCapabilityField { entity: String, field: String },

    #[error("capabilities for '{entity}' are malformed: {reason}")]
    MalformedCapabilities { entity: String, reason: String },

    #[error("no capabilities configured for entity '{entity}'")]
    UnknownEntity { entity: String },

    #[error("invalid configuration document: {message}")]
    Parse { message: String },

    #[error("cannot read configuration '{path}': {message}")]
    Read { path: String, message: String },
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_class_prefixes_origin_and_class() {
        let err = InternalError::store_fault("connection reset");

        assert_eq!(err.display_with_class(), "store:store_fault: connection reset");
        assert!(err.is_store_fault());
    }

    #[test]
    fn config_error_converts_into_config_class() {
        let err: InternalError = ConfigError::UnknownEntity {
            entity: "user".to_string(),
        }
        .into();

        assert_eq!(err.class, ErrorClass::Config);
        assert_eq!(err.origin, ErrorOrigin::Config);
        assert_eq!(err.message, "no capabilities configured for entity 'user'");
    }

    #[test]
    fn late_store_rejection_becomes_fault() {
        let err: InternalError = StoreError::Rejected {
            reason: "cursor expired".to_string(),
        }
        .into();

        assert!(err.is_store_fault());
    }
}
