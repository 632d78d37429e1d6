//! # API gRPC
//!
//! gRPC server implementation for the DFS file service.
//!
//! Handles:
//! - The `dfs.v1.DfsService` implementation ([`DfsServer`]) using `dfs-core` for disk operations
//! - Per-call deadline tracking and cooperative cancellation ([`CallContext`])
//! - Deadline replies for calls the handler did not finish in time ([`DeadlineLayer`])
//! - Running the tonic server on a bound listener ([`serve`])
//!
//! Uses `api-shared` for wire types and status translation.

#![warn(rust_2018_idioms)]

pub use context::CallContext;
pub use deadline::DeadlineLayer;
pub use service::{pb, DfsServer};

pub mod context;
pub mod deadline;
pub mod service;

use api_shared::pb::dfs_service_server::{DfsService, DfsServiceServer};
use std::future::Future;
use tokio::net::TcpListener;
use tonic::transport::Server;

/// Serves `service` on an already bound `listener` until `shutdown` resolves.
///
/// Binding is left to the caller so that tests can listen on an ephemeral port and learn the
/// address before the server starts.
pub async fn serve<S, F>(
    listener: TcpListener,
    service: S,
    shutdown: F,
) -> Result<(), tonic::transport::Error>
where
    S: DfsService,
    F: Future<Output = ()>,
{
    let incoming = futures_util::stream::unfold(listener, |listener| async move {
        let conn = listener.accept().await.map(|(stream, _)| stream);
        Some((conn, listener))
    });

    Server::builder()
        .layer(DeadlineLayer)
        .add_service(DfsServiceServer::new(service))
        .serve_with_incoming_shutdown(Box::pin(incoming), shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_shared::constants::{FILENAME_METADATA_KEY, STAGING_PREFIX, STORE_SUCCESS_MESSAGE};
    use api_shared::pb::dfs_service_client::DfsServiceClient;
    use api_shared::pb::FileChunk;
    use dfs_core::{CoreConfig, Storage};
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;
    use tonic::transport::Channel;
    use tonic::{Code, Request};

    async fn start(root: &Path) -> DfsServiceClient<Channel> {
        let storage = Storage::new(CoreConfig::new(root).unwrap());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, DfsServer::new(storage), std::future::pending()));
        DfsServiceClient::connect(format!("http://{addr}"))
            .await
            .unwrap()
    }

    fn chunk(content: &[u8], chunk_num: i32) -> FileChunk {
        FileChunk {
            content: content.to_vec(),
            chunk_num,
        }
    }

    fn store_request<S>(chunks: S, filename: Option<&str>) -> Request<S> {
        let mut request = Request::new(chunks);
        if let Some(name) = filename {
            request
                .metadata_mut()
                .insert(FILENAME_METADATA_KEY, name.parse().unwrap());
        }
        request
    }

    fn staging_files(root: &Path) -> usize {
        std::fs::read_dir(root)
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().starts_with(STAGING_PREFIX))
            .count()
    }

    #[tokio::test]
    async fn test_store_commits_streamed_chunks() {
        let temp = TempDir::new().unwrap();
        let mut client = start(temp.path()).await;
        let chunks = futures_util::stream::iter(vec![chunk(b"hello ", 0), chunk(b"world", 1)]);

        let res = client
            .store_file(store_request(chunks, Some("a.txt")))
            .await
            .unwrap();

        assert_eq!(res.get_ref().description, STORE_SUCCESS_MESSAGE);
        assert_eq!(
            std::fs::read(temp.path().join("a.txt")).unwrap(),
            b"hello world"
        );
        assert_eq!(staging_files(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_store_without_filename_metadata_is_cancelled() {
        let temp = TempDir::new().unwrap();
        let mut client = start(temp.path()).await;
        let chunks = futures_util::stream::iter(vec![chunk(b"data", 0)]);

        let status = client
            .store_file(store_request(chunks, None))
            .await
            .unwrap_err();

        assert_eq!(status.code(), Code::Cancelled);
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_store_into_unwritable_mount_is_internal() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("mnt");
        let mut client = start(&root).await;
        std::fs::remove_dir_all(&root).unwrap();
        let chunks = futures_util::stream::iter(vec![chunk(b"data", 0)]);

        let status = client
            .store_file(store_request(chunks, Some("a.txt")))
            .await
            .unwrap_err();

        assert_eq!(status.code(), Code::Internal);
    }

    #[tokio::test]
    async fn test_store_stalled_past_deadline_replies_deadline_exceeded() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.txt"), b"old").unwrap();
        let mut client = start(temp.path()).await;
        // One chunk, then the sender stalls well past the deadline.
        let chunks = futures_util::stream::unfold(0, |sent| async move {
            if sent == 0 {
                Some((chunk(b"new", 0), 1))
            } else {
                tokio::time::sleep(Duration::from_millis(400)).await;
                None
            }
        });
        let mut request = store_request(chunks, Some("a.txt"));
        request.set_timeout(Duration::from_millis(200));

        let status = client.store_file(request).await.unwrap_err();

        assert_eq!(status.code(), Code::DeadlineExceeded);
        assert_eq!(std::fs::read(temp.path().join("a.txt")).unwrap(), b"old");
        assert_eq!(staging_files(temp.path()), 0);
    }
}
