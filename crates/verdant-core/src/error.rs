//! Core error types for verdant-core.
//!
//! One thiserror hierarchy for the whole library: [`CoreError`] at the
//! top, with per-subsystem enums underneath so callers can match on the
//! failures they care about.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for verdant-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Device provider errors
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// OAuth-related errors
    #[error("OAuth error: {0}")]
    OAuth(#[from] OAuthError),

    /// Account/session errors
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// A statement or query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Another connection holds the write lock
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The TOML file could not be read or parsed
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// The TOML file could not be written
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// A value did not fit the field it targets
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// A key that does not exist in the configuration
    #[error("Missing required configuration key: {0}")]
    MissingKey(String),
}

/// Device provider errors.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Device not known to the provider
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    /// Provider rejected the request
    #[error("{provider} HTTP {status}: {message}")]
    Http {
        provider: &'static str,
        status: u16,
        message: String,
    },

    /// The provider does not implement this capability
    #[error("{provider} does not support {capability}")]
    Unsupported {
        provider: &'static str,
        capability: &'static str,
    },

    /// Transport-level failure
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Runtime setup failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// OAuth-specific errors.
#[derive(Error, Debug)]
pub enum OAuthError {
    /// Authorization failed before a code was obtained
    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    /// Token exchange failed
    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    /// Token refresh failed
    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    /// Invalid callback
    #[error("Invalid OAuth callback: {0}")]
    InvalidCallback(String),

    /// Access token expired
    #[error("Access token expired and no refresh token available")]
    TokenExpired,

    /// Not authenticated
    #[error("Not authenticated with {service}")]
    NotAuthenticated { service: String },

    /// Credentials not configured
    #[error("OAuth credentials not configured for {service}")]
    CredentialsNotConfigured { service: String },
}

/// Account and session errors.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Signup or login without both fields
    #[error("Username and password required")]
    MissingCredentials,

    /// Username/password did not match
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Signup with a username that already exists
    #[error("Username '{0}' already taken")]
    UsernameTaken(String),

    /// Session token unknown or expired
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Operation on a user id the store has never seen
    #[error("Unknown user {0}")]
    UnknownUser(i64),

    /// Password hashing/verification failed
    #[error("Password hash error: {0}")]
    Hash(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
