use api_shared::status::Operation;
use api_shared::{FileNameError, TransferCode};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid filename: {0}")]
    InvalidFileName(#[from] FileNameError),
    #[error("filename cannot be sent as call metadata: {0}")]
    InvalidMetadata(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("local file not found: {}", .path.display())]
    LocalNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to open local file for writing: {}", .path.display())]
    LocalCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("local file I/O failed: {0}")]
    LocalIo(std::io::Error),
    #[error("failed to connect: {0}")]
    Connect(#[from] tonic::transport::Error),
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("{} failed ({code}): {}", .op.as_str(), .status.message())]
    Remote {
        op: Operation,
        code: TransferCode,
        status: tonic::Status,
    },
}

impl ClientError {
    /// The client-visible code for this failure.
    pub fn code(&self) -> TransferCode {
        match self {
            ClientError::LocalNotFound { .. } => TransferCode::NotFound,
            ClientError::LocalCreate { .. } => TransferCode::Internal,
            ClientError::DeadlineExceeded => TransferCode::DeadlineExceeded,
            ClientError::Remote { code, .. } => *code,
            ClientError::InvalidFileName(_)
            | ClientError::InvalidMetadata(_)
            | ClientError::InvalidConfig(_)
            | ClientError::LocalIo(_)
            | ClientError::Connect(_) => TransferCode::Cancelled,
        }
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Collapses any operation result into its [`TransferCode`].
pub fn outcome<T>(result: &ClientResult<T>) -> TransferCode {
    match result {
        Ok(_) => TransferCode::Ok,
        Err(e) => e.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_failures_map_to_their_codes() {
        let io = || std::io::Error::from(std::io::ErrorKind::NotFound);
        let not_found = ClientError::LocalNotFound {
            path: "a".into(),
            source: io(),
        };
        let create = ClientError::LocalCreate {
            path: "a".into(),
            source: io(),
        };

        assert_eq!(not_found.code(), TransferCode::NotFound);
        assert_eq!(create.code(), TransferCode::Internal);
        assert_eq!(ClientError::LocalIo(io()).code(), TransferCode::Cancelled);
        assert_eq!(
            ClientError::InvalidFileName(FileNameError::Empty).code(),
            TransferCode::Cancelled
        );
    }

    #[test]
    fn test_outcome() {
        let ok: ClientResult<()> = Ok(());
        let late: ClientResult<()> = Err(ClientError::DeadlineExceeded);

        assert_eq!(outcome(&ok), TransferCode::Ok);
        assert_eq!(outcome(&late), TransferCode::DeadlineExceeded);
    }

    #[test]
    fn test_remote_error_message_names_operation() {
        let err = ClientError::Remote {
            op: Operation::Fetch,
            code: TransferCode::NotFound,
            status: tonic::Status::not_found("File not found"),
        };

        assert_eq!(err.to_string(), "fetch failed (NOT_FOUND): File not found");
    }
}
