use api_shared::status::cancellation_status;
use api_shared::FileNameError;
use tonic::Status;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid filename: {0}")]
    InvalidFileName(#[from] FileNameError),
    #[error("failed to create mount directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("mount path is not a directory: {0}")]
    NotADirectory(std::path::PathBuf),
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("failed to open file for writing: {0}")]
    FileCreate(std::io::Error),
    #[error("failed to write file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to commit file: {0}")]
    Commit(std::io::Error),
    #[error("failed to delete file: {0}")]
    Remove(std::io::Error),
    #[error("failed to open directory: {0}")]
    DirectoryOpen(std::io::Error),
    #[error("failed to read directory: {0}")]
    DirectoryRead(std::io::Error),
    #[error("operation cancelled by the client")]
    Cancelled,
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

impl From<StorageError> for Status {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidFileName(e) => Status::invalid_argument(e.to_string()),
            StorageError::NotFound(_) => Status::not_found("File not found"),
            StorageError::Cancelled => cancellation_status("Client cancelled the request."),
            StorageError::FileCreate(_)
            | StorageError::DirectoryOpen(_)
            | StorageError::StorageDirCreation(_)
            | StorageError::NotADirectory(_) => Status::internal(err.to_string()),
            StorageError::FileWrite(_)
            | StorageError::FileRead(_)
            | StorageError::Commit(_)
            | StorageError::Remove(_)
            | StorageError::DirectoryRead(_) => Status::unknown(err.to_string()),
        }
    }
}
