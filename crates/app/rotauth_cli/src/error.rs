use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{}", .0)]
    Custom(String),

    #[error("IO::{:?}: {}", .0, .0)]
    Io(#[from] std::io::Error),

    #[error("FlexiLogger::{:?}: {}", .0, .0)]
    FlexiLogger(#[from] flexi_logger::FlexiLoggerError),

    #[error("Config: {}", .0)]
    Config(#[from] rotauth_core::config::ConfigError),

    #[error("{}", .0)]
    Token(#[from] rotauth_core::auth::TokenError),

    #[error("{}", .0)]
    Auth(#[from] rotauth_core::auth::AuthError),

    #[error("Database: {}", .0)]
    Db(#[from] sqlx::Error),

    #[error("{}", .0)]
    Store(#[from] rotauth_core::store::StoreError),

    #[error("Json: {}", .0)]
    Json(#[from] serde_json::Error),
}
