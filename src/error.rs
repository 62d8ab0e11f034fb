use std::panic::Location;

/// Error kinds that can occur in twistmap
#[derive(Debug)]
pub enum ErrorKind {
    BadRpcResponse(String),
    General(String),
    Io(std::io::Error),
    JoinError(tokio::task::JoinError),
    ReqwestHttpError(reqwest::Error),
    Rpc { code: i64, message: String },
    SchemaTooNew(u32),
    SerdeJson(serde_json::Error),
    Sql(rusqlite::Error),
    UrlParse(url::ParseError),
    Usage(String, String), // error, usage
}

/// Errors that can occur in twistmap, including the file and line number
/// where they were generated
#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    location: &'static Location<'static>,
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.kind, self.location)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ErrorKind::*;
        match self {
            BadRpcResponse(s) => write!(f, "Bad RPC response: {s}"),
            General(s) => write!(f, "{s}"),
            Io(e) => write!(f, "I/O Error: {e}"),
            JoinError(e) => write!(f, "Task join error: {e}"),
            ReqwestHttpError(e) => write!(f, "HTTP (reqwest) error: {e}"),
            Rpc { code, message } => write!(f, "RPC error {code}: {message}"),
            SchemaTooNew(v) => write!(
                f,
                "Database schema version {v} is newer than this program understands"
            ),
            SerdeJson(e) => write!(f, "SerdeJson Error: {e}"),
            Sql(e) => write!(f, "SQL: {e}"),
            UrlParse(e) => write!(f, "URL parse: {e}"),
            Usage(e, u) => write!(f, "{e}\n\nUsage: {u}"),
        }
    }
}

// Note: we impl Into because our typical pattern is ErrorKind::Variant.into()
//       when we tried implementing From, the location was deep in rust code's
//       blanket into implementation, which wasn't the line number we wanted.
#[allow(clippy::from_over_into)]
impl Into<Error> for ErrorKind {
    #[track_caller]
    fn into(self) -> Error {
        Error {
            kind: self,
            location: Location::caller(),
        }
    }
}

impl From<String> for Error {
    #[track_caller]
    fn from(s: String) -> Error {
        Error {
            kind: ErrorKind::General(s),
            location: Location::caller(),
        }
    }
}

impl From<&str> for Error {
    #[track_caller]
    fn from(s: &str) -> Error {
        Error {
            kind: ErrorKind::General(s.to_string()),
            location: Location::caller(),
        }
    }
}

impl From<std::io::Error> for Error {
    #[track_caller]
    fn from(e: std::io::Error) -> Error {
        Error {
            kind: ErrorKind::Io(e),
            location: Location::caller(),
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    #[track_caller]
    fn from(e: tokio::task::JoinError) -> Error {
        Error {
            kind: ErrorKind::JoinError(e),
            location: Location::caller(),
        }
    }
}

impl From<reqwest::Error> for Error {
    #[track_caller]
    fn from(e: reqwest::Error) -> Error {
        Error {
            kind: ErrorKind::ReqwestHttpError(e),
            location: Location::caller(),
        }
    }
}

impl From<serde_json::Error> for Error {
    #[track_caller]
    fn from(e: serde_json::Error) -> Error {
        Error {
            kind: ErrorKind::SerdeJson(e),
            location: Location::caller(),
        }
    }
}

impl From<rusqlite::Error> for Error {
    #[track_caller]
    fn from(e: rusqlite::Error) -> Error {
        Error {
            kind: ErrorKind::Sql(e),
            location: Location::caller(),
        }
    }
}

impl From<url::ParseError> for Error {
    #[track_caller]
    fn from(e: url::ParseError) -> Error {
        Error {
            kind: ErrorKind::UrlParse(e),
            location: Location::caller(),
        }
    }
}
