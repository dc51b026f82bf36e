use crate::db::{
    compile::CompileError, executor::ExecuteError, hierarchy::TreeError, ir::ConfigError,
    registry::RegistryError, slice::SliceError,
};
use derive_more::Display;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured error with a stable classification.
/// Every subsystem error converts into this shape at the crate boundary.
///

#[derive(Debug, ThisError)]
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

    /// Construct a configuration-class error raised while declaring an operation.
    pub(crate) fn config(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Configuration, origin, message)
    }

    /// Construct a compile-origin invariant violation.
    pub(crate) fn compile_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Compile,
            message,
        )
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::NotFound, ErrorOrigin::Executor, message)
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.class, ErrorClass::NotFound)
    }

    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self.class, ErrorClass::Configuration)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

impl From<ConfigError> for InternalError {
    fn from(err: ConfigError) -> Self {
        Self::config(ErrorOrigin::Builder, err.to_string())
    }
}

impl From<TreeError> for InternalError {
    fn from(err: TreeError) -> Self {
        match err {
            // raised while binding a live record, not while declaring the tree
            TreeError::MissingParentValue { .. } => Self::new(
                ErrorClass::InvariantViolation,
                ErrorOrigin::Hierarchy,
                err.to_string(),
            ),
            _ => Self::config(ErrorOrigin::Hierarchy, err.to_string()),
        }
    }
}

impl From<CompileError> for InternalError {
    fn from(err: CompileError) -> Self {
        match err {
            CompileError::UnsetParameter { .. } | CompileError::NotNormalized { .. } => {
                Self::compile_invariant(err.to_string())
            }
            _ => Self::new(ErrorClass::Unsupported, ErrorOrigin::Compile, err.to_string()),
        }
    }
}

impl From<ExecuteError> for InternalError {
    fn from(err: ExecuteError) -> Self {
        Self::new(err.class(), err.origin(), err.to_string())
    }
}

impl From<SliceError> for InternalError {
    fn from(err: SliceError) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Slice, err.to_string())
    }
}

impl From<RegistryError> for InternalError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Config(err) => err.into(),
            _ => Self::config(ErrorOrigin::Registry, err.to_string()),
        }
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum ErrorClass {
    #[display("backend")]
    Backend,
    #[display("configuration")]
    Configuration,
    #[display("invariant_violation")]
    InvariantViolation,
    #[display("not_found")]
    NotFound,
    #[display("unsupported")]
    Unsupported,
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum ErrorOrigin {
    #[display("builder")]
    Builder,
    #[display("compile")]
    Compile,
    #[display("config")]
    Config,
    #[display("executor")]
    Executor,
    #[display("hierarchy")]
    Hierarchy,
    #[display("registry")]
    Registry,
    #[display("slice")]
    Slice,
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_classify_as_configuration() {
        let err: InternalError = ConfigError::Frozen {
            document: "test::Order".to_string(),
        }
        .into();

        assert!(err.is_configuration());
        assert_eq!(err.origin, ErrorOrigin::Builder);
        assert!(err.display_with_class().starts_with("builder:configuration:"));
    }

    #[test]
    fn unset_parameter_is_an_invariant_violation() {
        let err: InternalError = CompileError::UnsetParameter {
            name: "id".to_string(),
        }
        .into();

        assert_eq!(err.class, ErrorClass::InvariantViolation);
        assert_eq!(err.origin, ErrorOrigin::Compile);
    }

    #[test]
    fn not_found_execute_error_maps_to_not_found_class() {
        let err: InternalError = ExecuteError::NotFound {
            document: "test::Order".to_string(),
        }
        .into();

        assert!(err.is_not_found());
        assert_eq!(err.origin, ErrorOrigin::Executor);
    }

    #[test]
    fn backend_failures_keep_their_message() {
        let err: InternalError = ExecuteError::backend("connection reset").into();

        assert_eq!(err.class, ErrorClass::Backend);
        assert_eq!(err.message, "backend failure: connection reset");
    }

    #[test]
    fn registry_config_errors_keep_the_builder_origin() {
        let err: InternalError = RegistryError::Config(ConfigError::Frozen {
            document: "test::Order".to_string(),
        })
        .into();

        assert_eq!(err.origin, ErrorOrigin::Builder);

        let err: InternalError = RegistryError::DuplicateTree {
            document: "test::Store".to_string(),
        }
        .into();
        assert_eq!(err.origin, ErrorOrigin::Registry);
        assert!(err.is_configuration());
    }

    #[test]
    fn missing_parent_value_is_not_a_configuration_error() {
        let err: InternalError = TreeError::MissingParentValue {
            node: "Positions".to_string(),
            field: "Id".to_string(),
        }
        .into();

        assert_eq!(err.class, ErrorClass::InvariantViolation);
        assert_eq!(err.origin, ErrorOrigin::Hierarchy);
    }
}
