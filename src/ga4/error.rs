use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ga4ErrorCode {
    InvalidArgument,
    MalformedInput,
    Internal,
}

impl Ga4ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ga4ErrorCode::InvalidArgument => "ga4/invalid-argument",
            Ga4ErrorCode::MalformedInput => "ga4/malformed-input",
            Ga4ErrorCode::Internal => "ga4/internal",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Ga4Error {
    pub code: Ga4ErrorCode,
    message: String,
}

impl Ga4Error {
    pub fn new(code: Ga4ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Ga4Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl std::error::Error for Ga4Error {}

pub type Ga4Result<T> = Result<T, Ga4Error>;

pub fn invalid_argument(message: impl Into<String>) -> Ga4Error {
    Ga4Error::new(Ga4ErrorCode::InvalidArgument, message)
}

pub fn malformed_input(message: impl Into<String>) -> Ga4Error {
    Ga4Error::new(Ga4ErrorCode::MalformedInput, message)
}

pub fn internal_error(message: impl Into<String>) -> Ga4Error {
    Ga4Error::new(Ga4ErrorCode::Internal, message)
}

/// Logs a recoverable error. Malformed input never escapes the public entry points.
pub(crate) fn warn_recovered(err: &Ga4Error) {
    log::warn!("{}", err.message());
}
