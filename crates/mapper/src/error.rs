//! Errors

use thiserror::Error;

use crate::convert::ConversionError;
use crate::value::TypeMismatch;

/// Result type used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while building a mapping tree or materializing a row.
#[derive(Error, Debug)]
pub enum Error {
    // --- Configuration errors ---
    /// The metadata provider has no descriptor for the type.
    #[error("type `{0}` is not registered")]
    UnknownType(String),

    /// No constructor of the required arity exists.
    #[error("`{type_name}` has no constructor taking {arity} argument(s)")]
    NoConstructor { type_name: String, arity: usize },

    /// More than one constructor of the required arity exists.
    #[error("`{type_name}` has {count} constructors taking {arity} argument(s)")]
    AmbiguousConstructor { type_name: String, arity: usize, count: usize },

    /// Two columns or groups address the same constructor parameter.
    #[error("constructor parameter {index} of `{type_name}` is bound more than once")]
    DuplicateParameter { type_name: String, index: usize },

    /// A constructor parameter position has no column or group.
    #[error("constructor parameter {index} of `{type_name}` has no binding")]
    MissingParameter { type_name: String, index: usize },

    /// A scalar column addresses an object parameter, or a group addresses a scalar one.
    #[error("constructor parameter {index} of `{type_name}` cannot be bound to a {found}")]
    ParameterShape { type_name: String, index: usize, found: &'static str },

    /// Name-based constructor binding did not cover every parameter.
    #[error("`{type_name}` constructor takes {expected} argument(s) but {bound} matched by name")]
    ImplicitBinding { type_name: String, expected: usize, bound: usize },

    /// A numeric column targets a mapping that has no constructors.
    #[error("column `{column}` addresses a constructor parameter but {target} has no constructors")]
    ConstructorMappingDisabled { target: String, column: String },

    /// An include path ends in a name that is not a collection member.
    #[error("`{type_name}` has no collection member `{member}`")]
    UnknownCollection { type_name: String, member: String },

    // --- Row errors ---
    /// The row does not have the shape the cached tree was built for.
    #[error("row shape changed at column {ordinal}: expected `{expected}`, found `{found}`")]
    ShapeChanged { ordinal: usize, expected: String, found: String },

    /// A value does not have the type a member or argument expects.
    #[error(transparent)]
    Mismatch(#[from] TypeMismatch),

    /// The conversion fallback could not convert a value.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// Assigning a member failed, after any conversion fallback.
    #[error("cannot set `{declaring_type}.{member}` to {value}: {source}")]
    Set {
        declaring_type: String,
        member: String,
        value: String,
        source: Box<Self>,
    },

    /// A constructor rejected its arguments.
    #[error("cannot construct `{type_name}`: {source}")]
    Construct { type_name: String, source: Box<Self> },

    /// A constructor asked for more arguments than were bound.
    #[error("constructor of `{type_name}` read argument {index}, only {count} bound")]
    MissingArgument { type_name: String, index: usize, count: usize },

    /// A member handle was applied to an instance of another type.
    #[error("instance is not a `{0}`")]
    WrongInstance(String),

    /// A node without a settable member was asked to set its value.
    #[error("node `{0}` is not bound to a settable member")]
    Unbound(String),

    /// A deferred collection loader failed.
    #[error("loading collection `{path}` failed: {source}")]
    Loader {
        path: String,
        #[source]
        source: anyhow::Error,
    },
}

impl Error {
    /// Returns `true` for errors caused by the shape of the result set or the metadata rather
    /// than by the values of a particular row. These recur for every row of the same shape.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownType(_)
                | Self::NoConstructor { .. }
                | Self::AmbiguousConstructor { .. }
                | Self::DuplicateParameter { .. }
                | Self::MissingParameter { .. }
                | Self::ParameterShape { .. }
                | Self::ImplicitBinding { .. }
                | Self::ConstructorMappingDisabled { .. }
                | Self::UnknownCollection { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Error;
    use crate::value::TypeMismatch;

    #[test]
    fn set_failure_display() {
        let err = Error::Set {
            declaring_type: "Product".to_string(),
            member: "ProductID".to_string(),
            value: "\"abc\" (string)".to_string(),
            source: Box::new(Error::Mismatch(TypeMismatch {
                expected: "int32",
                found: "string",
            })),
        };

        assert_eq!(
            err.to_string(),
            "cannot set `Product.ProductID` to \"abc\" (string): expected int32 value, found string"
        );
        assert!(!err.is_configuration());
    }

    #[test]
    fn configuration_errors() {
        let err = Error::AmbiguousConstructor {
            type_name: "Point".to_string(),
            arity: 2,
            count: 3,
        };
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "`Point` has 3 constructors taking 2 argument(s)");
    }
}
