// Re-export the proto module from the shared `api-shared` crate so callers
// can reference `api_grpc::service::pb`.
pub use api_shared::pb;

use crate::context::CallContext;
use api_shared::constants::{
    DELETE_SUCCESS_MESSAGE, FILENAME_METADATA_KEY, STORE_SUCCESS_MESSAGE, STREAM_BUFFER,
};
use api_shared::pb::dfs_service_server::DfsService;
use api_shared::pb::{
    FileChunk, FilePath, FileStatus, ListFilesRequest, LsResponse, ResponseStatus,
};
use api_shared::status::cancellation_status;
use api_shared::{ChunkReader, ChunkTally, FileName};
use dfs_core::{Storage, StorageError};
use futures_util::Stream;
use std::pin::Pin;
use std::sync::Arc;
use tokio::fs::File;
use tokio::sync::mpsc;
use tonic::{Request, Response, Status, Streaming};

const CANCELLED_MESSAGE: &str = "Client cancelled the request.";

type ChunkSender = mpsc::Sender<Result<FileChunk, Status>>;

/// The file service, serving one mount root.
#[derive(Debug, Clone)]
pub struct DfsServer {
    storage: Arc<Storage>,
}

impl DfsServer {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage: Arc::new(storage),
        }
    }
}

fn file_name(raw: &str) -> Result<FileName, Status> {
    FileName::new(raw).map_err(|e| {
        tracing::warn!("rejected filename {:?}: {}", raw, e);
        Status::from(StorageError::from(e))
    })
}

#[tonic::async_trait]
impl DfsService for DfsServer {
    type FetchFileStream = Pin<Box<dyn Stream<Item = Result<FileChunk, Status>> + Send + 'static>>;

    async fn store_file(
        &self,
        req: Request<Streaming<FileChunk>>,
    ) -> Result<Response<ResponseStatus>, Status> {
        let ctx = CallContext::from_metadata(req.metadata());
        let raw_name = req
            .metadata()
            .get(FILENAME_METADATA_KEY)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .ok_or_else(|| {
                tracing::error!("filename not found in metadata");
                Status::cancelled("Filename not found in metadata")
            })?;
        let name = file_name(&raw_name)?;

        let mut staged = self.storage.begin_store(&name).await.inspect_err(|e| {
            tracing::error!("store {}: {}", name, e);
        })?;

        let mut stream = req.into_inner();
        let mut tally = ChunkTally::new();
        loop {
            let chunk = match stream.message().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(status) => {
                    tracing::info!("store {} interrupted by the client: {}", name, status);
                    return Err(cancellation_status(CANCELLED_MESSAGE));
                }
            };

            staged.write_chunk(&chunk.content).await?;
            tally.record(&chunk);
            tracing::debug!(
                "writing chunk {} of {}: {} bytes",
                chunk.chunk_num,
                name,
                chunk.content.len()
            );

            if ctx.is_cancelled() {
                tracing::info!("store {}: client cancelled the request", name);
                return Err(StorageError::Cancelled.into());
            }
        }

        let bytes = staged.commit().await?;
        tracing::info!("stored {} ({} bytes in {} chunks)", name, bytes, tally.chunks);

        Ok(Response::new(ResponseStatus {
            description: STORE_SUCCESS_MESSAGE.into(),
        }))
    }

    async fn fetch_file(
        &self,
        req: Request<FilePath>,
    ) -> Result<Response<Self::FetchFileStream>, Status> {
        let ctx = CallContext::from_metadata(req.metadata());
        let name = file_name(&req.get_ref().path)?;
        let reader = self.storage.open(&name).await?;

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        tokio::spawn(stream_file(name, reader, ctx, tx));

        let stream = futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        Ok(Response::new(Box::pin(stream)))
    }

    async fn delete_file(
        &self,
        req: Request<FilePath>,
    ) -> Result<Response<ResponseStatus>, Status> {
        let ctx = CallContext::from_metadata(req.metadata());
        if ctx.is_cancelled() {
            tracing::info!("delete: client cancelled the request");
            return Err(StorageError::Cancelled.into());
        }

        let name = file_name(&req.get_ref().path)?;
        self.storage.remove(&name).await.inspect_err(|e| {
            tracing::error!("delete {}: {}", name, e);
        })?;
        tracing::info!("deleted {}", name);

        Ok(Response::new(ResponseStatus {
            description: DELETE_SUCCESS_MESSAGE.into(),
        }))
    }

    async fn list_files(
        &self,
        req: Request<ListFilesRequest>,
    ) -> Result<Response<LsResponse>, Status> {
        let ctx = CallContext::from_metadata(req.metadata());
        let listing = self
            .storage
            .list(|| ctx.is_cancelled())
            .await
            .inspect_err(|e| tracing::error!("list: {}", e))?;

        if listing.skipped > 0 {
            tracing::warn!(
                "listed {} files, skipped {} unreadable entries",
                listing.files.len(),
                listing.skipped
            );
        } else {
            tracing::info!("listed {} files", listing.files.len());
        }

        Ok(Response::new(LsResponse {
            files: listing.files,
        }))
    }

    async fn status_file(&self, req: Request<FilePath>) -> Result<Response<FileStatus>, Status> {
        let ctx = CallContext::from_metadata(req.metadata());
        if ctx.is_cancelled() {
            tracing::info!("stat: client cancelled the request");
            return Err(StorageError::Cancelled.into());
        }

        let name = file_name(&req.get_ref().path)?;
        let status = self.storage.stat(&name).await.inspect_err(|e| {
            tracing::error!("stat {}: {}", name, e);
        })?;
        tracing::debug!(
            "{} size: {} mtime: {} ctime: {}",
            name,
            status.size,
            status.modified_time,
            status.creation_time
        );

        Ok(Response::new(status))
    }
}

/// Feeds `reader` into the response channel of a fetch.
///
/// Cancellation is checked before every send. Once the receiving side has gone away nobody can
/// observe a terminal status any more, so a rejected send only ends the task.
async fn stream_file(
    name: FileName,
    mut reader: ChunkReader<File>,
    ctx: CallContext,
    tx: ChunkSender,
) {
    loop {
        let chunk = match reader.next_chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("fetch {}: {}", name, e);
                let _ = tx.send(Err(StorageError::FileRead(e).into())).await;
                return;
            }
        };

        if ctx.is_cancelled() || tx.is_closed() {
            tracing::info!("fetch {}: client cancelled the request", name);
            let _ = tx.send(Err(StorageError::Cancelled.into())).await;
            return;
        }

        let (chunk_num, len) = (chunk.chunk_num, chunk.content.len());
        if tx.send(Ok(chunk)).await.is_err() {
            tracing::error!("fetch {}: failed to write chunk {} to the client", name, chunk_num);
            return;
        }
        tracing::debug!("sent chunk {} of {}: {} bytes", chunk_num, name, len);
    }

    tracing::info!("sent {} ({} chunks)", name, reader.chunks_read());
}
