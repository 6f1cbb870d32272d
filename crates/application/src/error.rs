use domain::{DomainError, RepositoryError};
use thiserror::Error;

use crate::identity::IdentityError;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),
    #[error("authorization failed")]
    Authorization,
}
