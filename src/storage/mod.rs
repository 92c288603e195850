pub mod mongo;

use thiserror::Error;

use crate::models::ModelError;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database engine fault: {0}")]
    Engine(#[from] mongodb::error::Error),
    #[error(transparent)]
    Decode(#[from] ModelError),
}

pub type StorageResult<T> = Result<T, StorageError>;

pub use mongo::VisitStore;
