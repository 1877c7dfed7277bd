use thiserror::Error;

/// Errors raised while constructing the shared types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("address must not be empty")]
    EmptyAddress,

    #[error("address {0:?} contains whitespace")]
    MalformedAddress(String),
}
