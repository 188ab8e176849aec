//! Error types for Photobook

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file not found. Run 'photobook init' first.")]
    ConfigNotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("models: constraint violated: {0}")]
    Constraint(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("models: token generation failed: {0}")]
    TokenGeneration(String),

    #[error("models: resource not found")]
    NotFound,

    #[error("models: ID provided was invalid")]
    InvalidId,

    #[error("models: incorrect password provided")]
    PasswordIncorrect,

    #[error("models: token provided is not valid")]
    TokenInvalid,

    #[error("models: email address is required")]
    EmailRequired,

    #[error("models: email address is not valid")]
    EmailInvalid,

    #[error("models: email address is already taken")]
    EmailTaken,

    #[error("models: password is required")]
    PasswordRequired,

    #[error("models: password must be at least 8 characters long")]
    PasswordTooShort,

    #[error("models: password is too long")]
    PasswordTooLong,

    #[error("models: password hash is required")]
    PasswordHashRequired,

    #[error("models: remember token is required")]
    RememberRequired,

    #[error("models: remember token must be at least 32 bytes")]
    RememberTooShort,

    #[error("models: user ID is required")]
    UserIdRequired,

    #[error("models: title is required")]
    TitleRequired,

    #[error("models: service is required")]
    ServiceRequired,

    #[error("models: you do not have permission to modify this resource")]
    Forbidden,

    #[error("models: invalid image filename '{0}'")]
    InvalidFilename(String),

    #[error("{0}")]
    Other(String),
}

/// Coarse classification used by callers to decide how to report an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-supplied data violates an invariant
    Validation,
    /// Wrong password or unknown credential
    Authentication,
    /// Lookup matched no record
    NotFound,
    /// Constraint violation or backend failure
    Storage,
    /// Everything else (configuration, IO, hashing)
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidId
            | Error::EmailRequired
            | Error::EmailInvalid
            | Error::EmailTaken
            | Error::PasswordRequired
            | Error::PasswordTooShort
            | Error::PasswordTooLong
            | Error::PasswordHashRequired
            | Error::RememberRequired
            | Error::RememberTooShort
            | Error::UserIdRequired
            | Error::TitleRequired
            | Error::ServiceRequired
            | Error::InvalidFilename(_)
            | Error::TokenGeneration(_) => ErrorKind::Validation,
            Error::PasswordIncorrect | Error::TokenInvalid | Error::Forbidden => {
                ErrorKind::Authentication
            }
            Error::NotFound => ErrorKind::NotFound,
            Error::Database(_) | Error::Constraint(_) => ErrorKind::Storage,
            _ => ErrorKind::Internal,
        }
    }

    /// User-facing text: model errors lose their `models: ` prefix and get a
    /// capitalised first word, anything internal collapses to a generic line.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Storage | ErrorKind::Internal => {
                "Something went wrong. Please try again.".to_string()
            }
            _ => {
                let message = self.to_string();
                let message = message.strip_prefix("models: ").unwrap_or(&message);
                let mut chars = message.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
