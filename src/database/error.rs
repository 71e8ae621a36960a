use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use serde::Serialize;
use warp::http::StatusCode;

/// Field name -> list of messages explaining why the field was rejected.
pub type ValidationErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request: bad query parameter, unparsable body.
    InvalidRequest,
    /// One or more fields failed validation, see [`Error::fields`].
    Validation,
    /// The (user, target) pair of a toggle relation already exists.
    AlreadyExists,
    /// A user tried to subscribe to themself.
    SelfFollow,
    /// The (user, target) pair of a toggle relation does not exist.
    RelationNotFound,
    /// The referenced entity does not exist.
    NotFound,
    /// Authenticated, but not allowed to touch the target.
    PermissionDenied,
    /// Missing or invalid credentials.
    Unauthorized,
    InternalServerError,
}

impl ErrorKind {
    pub fn new(self, info: &str) -> Error {
        Error {
            kind: self,
            info: Some(info.to_string()),
            fields: None,
        }
    }

    pub fn default(self) -> Error {
        Error {
            kind: self,
            info: Some(self.default_message().to_string()),
            fields: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::InvalidRequest
            | ErrorKind::Validation
            | ErrorKind::AlreadyExists
            | ErrorKind::SelfFollow
            | ErrorKind::RelationNotFound => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn default_message(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "Invalid request",
            ErrorKind::Validation => "Invalid fields",
            ErrorKind::AlreadyExists => "Already exists",
            ErrorKind::SelfFollow => "You can't subscribe to yourself",
            ErrorKind::RelationNotFound => "Nothing to remove",
            ErrorKind::NotFound => "Not found",
            ErrorKind::PermissionDenied => "You don't have permission to perform this action",
            ErrorKind::Unauthorized => "Authentication credentials were not provided",
            ErrorKind::InternalServerError => "Internal server error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Error {
    pub kind: ErrorKind,
    pub info: Option<String>,
    pub fields: Option<ValidationErrors>,
}

impl Error {
    pub fn validation(fields: ValidationErrors) -> Self {
        Self {
            kind: ErrorKind::Validation,
            info: None,
            fields: Some(fields),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    /// Body sent back to the client.
    pub fn body(&self) -> ErrorBody {
        match &self.fields {
            Some(fields) => ErrorBody::Fields(fields.clone()),
            None => ErrorBody::Message {
                errors: self
                    .info
                    .clone()
                    .unwrap_or_else(|| self.kind.default_message().to_string()),
            },
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(untagged)]
pub enum ErrorBody {
    Message { errors: String },
    Fields(ValidationErrors),
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.info, &self.fields) {
            (Some(info), _) => write!(f, "{:?}: {info}", self.kind),
            (None, Some(fields)) => write!(f, "{:?}: {fields:?}", self.kind),
            (None, None) => write!(f, "{:?}", self.kind),
        }
    }
}

impl std::error::Error for Error {}
impl warp::reject::Reject for Error {}

pub struct QueryError {
    info: String,
    unique_violation: bool,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self {
            info,
            unique_violation: false,
        }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) => Self {
                unique_violation: e.is_unique_violation(),
                info: format!("{e}"),
            },
            sqlx::Error::RowNotFound => Self::new(String::from("RowNotFound")),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::new(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                Self::new(format!("Column index out of bounds {index} ({len})"))
            }
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::PoolTimedOut => Self::new(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(String::from("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(String::from("Worker crashed")),
            e => Self::new(format!("{e}")),
        }
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        if value.unique_violation {
            return ErrorKind::AlreadyExists.new(&value.info);
        }
        log::error!("Query failed: {}", value.info);
        ErrorKind::InternalServerError.new(&value.info)
    }
}

impl From<sqlx::Error> for Error {
    fn from(value: sqlx::Error) -> Self {
        QueryError::from(value).into()
    }
}

impl From<printpdf::Error> for Error {
    fn from(value: printpdf::Error) -> Self {
        log::error!("Failed to render PDF: {value}");
        ErrorKind::InternalServerError.new("Failed to render PDF")
    }
}

pub struct CacheError {
    info: String,
}

impl From<redis::RedisError> for CacheError {
    fn from(value: redis::RedisError) -> Self {
        Self {
            info: format!("{:?} - {:?}", value.code(), value.detail()),
        }
    }
}

impl CacheError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl From<CacheError> for Error {
    fn from(value: CacheError) -> Self {
        ErrorKind::InternalServerError.new(&value.info)
    }
}

#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl From<TypeError> for Error {
    fn from(value: TypeError) -> Self {
        ErrorKind::InvalidRequest.new(&value.info)
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}
