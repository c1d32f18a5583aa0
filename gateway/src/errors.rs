use std::io;

#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] crate::config::ValidationError),
    #[error("could not create organization store: {0}")]
    Store(#[from] tenancy::StoreError),
}
