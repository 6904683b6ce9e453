use super::Error;

/// Error when a condition cannot be compiled to SQL.
///
/// This occurs when:
/// - An operator receives the wrong number of operands
/// - An operand has a shape the operator does not accept (e.g. `EXISTS`
///   without a sub-query)
///
/// These errors are raised while building SQL, before any I/O happens.
#[derive(Debug)]
pub(super) struct InvalidCondition {
    message: Box<str>,
}

impl std::error::Error for InvalidCondition {}

impl core::fmt::Display for InvalidCondition {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "invalid condition: {}", self.message)
    }
}

impl Error {
    /// Creates an invalid condition error.
    pub fn invalid_condition(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::InvalidCondition(InvalidCondition {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is an invalid condition error.
    pub fn is_invalid_condition(&self) -> bool {
        self.any_kind(|kind| matches!(kind, super::ErrorKind::InvalidCondition(_)))
    }
}
