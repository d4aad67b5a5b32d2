use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("registry error: {0}")]
    Registry(String),
}

pub type Result<T> = std::result::Result<T, Error>;
