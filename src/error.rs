use thiserror::Error;

/// Errors raised by the flat-file annotation store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem read or write failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A collection file exists but does not hold the expected JSON
    #[error("Malformed JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// File name is not a plain `.json` basename
    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    /// Request payload is missing required fields or has the wrong shape
    #[error("{0}")]
    InvalidRequest(String),

    /// Stored data violates an invariant (e.g. element without dimensions)
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// Requested file or record does not exist
    #[error("{0}")]
    NotFound(String),
}

/// Errors from the document database adapter
#[derive(Debug, Clone, Error)]
pub enum DbError {
    /// Could not establish or verify a connection
    #[error("Database connection error: {0}")]
    Connection(String),

    /// A query failed after the connection was established
    #[error("Database query error: {0}")]
    Query(String),

    /// Unique key already present
    #[error("Duplicate key: {0}")]
    Duplicate(String),

    /// Connection string or schema name is unusable
    #[error("Invalid database configuration: {0}")]
    Configuration(String),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DbError::Duplicate(db_err.message().to_string())
            }
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => DbError::Connection(err.to_string()),
            _ => DbError::Query(err.to_string()),
        }
    }
}

/// Errors from registration and login
#[derive(Debug, Error)]
pub enum AuthError {
    /// Contact number or password missing from the request
    #[error("Contact number and password are required")]
    MissingCredentials,

    /// Registration for a contact number that already exists
    #[error("User with this contact number already exists")]
    AlreadyRegistered,

    /// Unknown user or wrong password (deliberately indistinguishable)
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Password hashing backend failure
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    /// Underlying database failure
    #[error(transparent)]
    Database(#[from] DbError),
}

/// Errors from the upstream proxy layer
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Required request field missing or invalid
    #[error("{0}")]
    InvalidRequest(String),

    /// The upstream request could not be sent or its body not read
    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    /// The configured upstream base URL cannot carry path segments
    #[error("Invalid upstream URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
