/// Broad failure category, used to pick an exit code and to let callers tell
/// instrument trouble apart from a bad fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid argument or configuration, rejected before any work is done.
    Precondition,
    /// A current source, power meter or thermometer read/write failed.
    Instrument,
    /// The model fit could not produce finite, well-conditioned coefficients.
    Fit,
    /// File or serialization failure in the outer layer.
    Io,
}

#[derive(Clone)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Precondition, message)
    }

    pub fn instrument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Instrument, message)
    }

    pub fn fit(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fit, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn exit_code(&self) -> u8 {
        match self.kind {
            ErrorKind::Precondition | ErrorKind::Io => 2,
            ErrorKind::Instrument => 3,
            ErrorKind::Fit => 4,
        }
    }

    /// Prefix the message with extra context, keeping the kind.
    pub fn context(self, context: impl std::fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{context}: {}", self.message),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_kind() {
        assert_eq!(AppError::precondition("x").exit_code(), 2);
        assert_eq!(AppError::io("x").exit_code(), 2);
        assert_eq!(AppError::instrument("x").exit_code(), 3);
        assert_eq!(AppError::fit("x").exit_code(), 4);
    }

    #[test]
    fn context_keeps_kind() {
        let err = AppError::instrument("timeout").context("after 3 samples");
        assert_eq!(err.kind(), ErrorKind::Instrument);
        assert_eq!(err.to_string(), "after 3 samples: timeout");
    }
}
