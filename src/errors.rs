use thiserror::Error;

pub type Result<T> = std::result::Result<T, IoError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IoError {
    /// No further bytes will become available. Not a failure.
    #[error("end of stream")]
    Eof,
    /// The attempted absolute position, which was not applied.
    #[error("invalid seek offset: {0}")]
    InvalidSeekOffset(i64),
    #[error("read failure: {message} (os error {code})")]
    ReadFailure { message: String, code: i32 },
    #[error("stream is already closed")]
    AlreadyClosed,
    #[error("unknown error: {message} (os error {code})")]
    Unknown { message: String, code: i32 },
    /// A write that stopped early. `reason` is the failure that stopped
    /// it, when the destination reported one.
    #[error("short write: {written} of {expected} bytes written")]
    ShortWrite {
        written: usize,
        expected: usize,
        #[source]
        reason: Option<Box<IoError>>,
    },
    #[error("{0}")]
    Custom(String),
}

impl IoError {
    pub fn is_eof(&self) -> bool {
        matches!(self, IoError::Eof)
    }

    /// Bytes that reached the destination before this error was raised.
    pub fn written(&self) -> usize {
        match self {
            IoError::ShortWrite { written, .. } => *written,
            _ => 0,
        }
    }

    pub fn short_write(
        written: usize,
        expected: usize,
        reason: Option<IoError>,
    ) -> Self {
        IoError::ShortWrite {
            written,
            expected,
            reason: reason.map(Box::new),
        }
    }

    /// Failure of a native transfer (open, read, write).
    pub fn read_failure(err: std::io::Error) -> Self {
        IoError::ReadFailure {
            message: err.to_string(),
            code: err.raw_os_error().unwrap_or(-1),
        }
    }

    /// Any other native failure.
    pub fn os(err: std::io::Error) -> Self {
        IoError::Unknown {
            message: err.to_string(),
            code: err.raw_os_error().unwrap_or(-1),
        }
    }

    pub fn custom(message: impl Into<String>) -> Self {
        IoError::Custom(message.into())
    }
}

impl From<std::io::Error> for IoError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof => IoError::Eof,
            _ => IoError::os(err),
        }
    }
}

impl From<IoError> for std::io::Error {
    fn from(err: IoError) -> Self {
        use std::io::ErrorKind;

        match err {
            IoError::Eof => ErrorKind::UnexpectedEof.into(),
            IoError::InvalidSeekOffset(_) => {
                std::io::Error::new(ErrorKind::InvalidInput, err)
            }
            IoError::ReadFailure { code, .. } | IoError::Unknown { code, .. }
                if code > 0 =>
            {
                std::io::Error::from_raw_os_error(code)
            }
            IoError::ShortWrite { .. } => {
                std::io::Error::new(ErrorKind::WriteZero, err)
            }
            other => std::io::Error::new(ErrorKind::Other, other),
        }
    }
}
