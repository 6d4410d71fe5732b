use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Telegram API error on {method} (status {status}): {body}")]
    Api {
        method: String,
        status: u16,
        body: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, DispatchError>;
