//! The client transfer engine.
//!
//! Each operation issues exactly one call, bounded by a deadline of call start plus the
//! configured timeout. The deadline travels to the server as `grpc-timeout` and is also enforced
//! locally, so an expired call reports [`TransferCode::DeadlineExceeded`] whichever side notices
//! first. Nothing is retried.
//!
//! Local file handles are owned by the future driving the call, so they are closed on every exit
//! path, including expiry. A fetch that fails part way may leave a truncated local file behind.

use crate::{ClientConfig, ClientError, ClientResult};
use api_shared::constants::{FILENAME_METADATA_KEY, STREAM_BUFFER};
use api_shared::pb::dfs_service_client::DfsServiceClient;
use api_shared::pb::{FileChunk, FilePath, FileStatus, ListFilesRequest};
use api_shared::status::{classify, Operation};
use api_shared::{ChunkReader, ChunkTally, FileName, TransferCode};
use std::collections::BTreeMap;
use std::future::Future;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tonic::metadata::AsciiMetadataValue;
use tonic::transport::{Channel, Endpoint};
use tonic::{Request, Status};

/// Client for one DFS server.
///
/// Cloning is cheap and clones share the underlying connection.
#[derive(Debug, Clone)]
pub struct DfsClient {
    inner: DfsServiceClient<Channel>,
    config: ClientConfig,
}

impl DfsClient {
    /// Connects to the configured server before returning.
    pub async fn connect(config: ClientConfig) -> ClientResult<Self> {
        let channel = Endpoint::from_shared(config.server_uri().to_string())?
            .connect()
            .await?;
        Ok(Self::new(channel, config))
    }

    /// Returns a client that connects on first use.
    pub fn connect_lazy(config: ClientConfig) -> ClientResult<Self> {
        let channel = Endpoint::from_shared(config.server_uri().to_string())?.connect_lazy();
        Ok(Self::new(channel, config))
    }

    pub fn new(channel: Channel, config: ClientConfig) -> Self {
        Self {
            inner: DfsServiceClient::new(channel),
            config,
        }
    }

    /// Uploads the local file `filename` from the client mount root.
    ///
    /// # Errors
    ///
    /// `LocalNotFound` if the local file cannot be opened, before the server is contacted.
    /// Otherwise the call's terminal status, classified for [`Operation::Store`].
    pub async fn store(&self, filename: &str) -> ClientResult<()> {
        let op = Operation::Store;
        let name = FileName::new(filename)?;
        let path = self.config.local_path(&name);

        let file = File::open(&path).await.map_err(|source| {
            tracing::error!("File not found: {}", path.display());
            ClientError::LocalNotFound {
                path: path.clone(),
                source,
            }
        })?;
        let filename_value: AsciiMetadataValue = name
            .as_str()
            .parse()
            .map_err(|_| ClientError::InvalidMetadata(name.to_string()))?;

        let deadline = self.deadline();
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let outgoing = futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|chunk| (chunk, rx))
        });
        let mut request = self.request(outgoing);
        request
            .metadata_mut()
            .insert(FILENAME_METADATA_KEY, filename_value);

        let mut client = self.inner.clone();
        within_deadline(op, deadline, async move {
            let call = async {
                client
                    .store_file(request)
                    .await
                    .map_err(|status| remote(op, status, deadline))
            };
            let feed = feed_chunks(ChunkReader::new(file), tx);

            // A local read failure drops the in-flight call, which resets the stream.
            let (response, tally) = tokio::try_join!(call, feed)?;
            tracing::info!(
                "stored {} ({} bytes in {} chunks): {}",
                name,
                tally.bytes,
                tally.chunks,
                response.get_ref().description
            );
            Ok(())
        })
        .await
    }

    /// Downloads `filename` into the client mount root, returning the number of bytes written.
    ///
    /// The local file is created (or truncated) only once the first chunk arrives, so a failed
    /// fetch of a missing remote file never touches the local copy.
    pub async fn fetch(&self, filename: &str) -> ClientResult<u64> {
        let op = Operation::Fetch;
        let name = FileName::new(filename)?;
        let path = self.config.local_path(&name);
        let deadline = self.deadline();
        let request = self.request(FilePath {
            path: name.to_string(),
        });

        let mut client = self.inner.clone();
        within_deadline(op, deadline, async move {
            let mut stream = client
                .fetch_file(request)
                .await
                .map_err(|status| remote(op, status, deadline))?
                .into_inner();

            let mut sink: Option<File> = None;
            let mut tally = ChunkTally::new();
            while let Some(chunk) = stream
                .message()
                .await
                .map_err(|status| remote(op, status, deadline))?
            {
                if sink.is_none() {
                    let file = File::create(&path).await.map_err(|source| {
                        tracing::error!("Failed to open file for writing: {}", path.display());
                        ClientError::LocalCreate {
                            path: path.clone(),
                            source,
                        }
                    })?;
                    sink = Some(file);
                }
                if let Some(file) = sink.as_mut() {
                    file.write_all(&chunk.content)
                        .await
                        .map_err(ClientError::LocalIo)?;
                }
                tally.record(&chunk);
                tracing::debug!(
                    "received chunk {} of {}: {} bytes",
                    chunk.chunk_num,
                    name,
                    chunk.content.len()
                );
            }

            if let Some(mut file) = sink {
                file.flush().await.map_err(ClientError::LocalIo)?;
            }
            tracing::info!("fetched {} ({} bytes)", name, tally.bytes);
            Ok(tally.bytes)
        })
        .await
    }

    /// Deletes `filename` on the server.
    pub async fn delete(&self, filename: &str) -> ClientResult<()> {
        let op = Operation::Delete;
        let name = FileName::new(filename)?;
        let deadline = self.deadline();
        let request = self.request(FilePath {
            path: name.to_string(),
        });

        let mut client = self.inner.clone();
        within_deadline(op, deadline, async move {
            client
                .delete_file(request)
                .await
                .map_err(|status| remote(op, status, deadline))?;
            tracing::info!("deleted {}", name);
            Ok(())
        })
        .await
    }

    /// Lists the server mount root as filename to modification time (seconds since the epoch).
    ///
    /// An empty directory is a successful, empty listing.
    pub async fn list(&self) -> ClientResult<BTreeMap<String, i64>> {
        let op = Operation::List;
        let deadline = self.deadline();
        let request = self.request(ListFilesRequest {});

        let mut client = self.inner.clone();
        within_deadline(op, deadline, async move {
            let response = client
                .list_files(request)
                .await
                .map_err(|status| remote(op, status, deadline))?
                .into_inner();

            let mut files = BTreeMap::new();
            for info in response.files {
                tracing::debug!("File: {} - {}", info.filename, info.modified_time);
                files.insert(info.filename, info.modified_time);
            }
            Ok(files)
        })
        .await
    }

    /// Size and timestamps of `filename` on the server.
    pub async fn stat(&self, filename: &str) -> ClientResult<FileStatus> {
        let op = Operation::Stat;
        let name = FileName::new(filename)?;
        let deadline = self.deadline();
        let request = self.request(FilePath {
            path: name.to_string(),
        });

        let mut client = self.inner.clone();
        within_deadline(op, deadline, async move {
            let status = client
                .status_file(request)
                .await
                .map_err(|status| remote(op, status, deadline))?
                .into_inner();
            tracing::debug!(
                "File {} size: {} mtime: {} ctime: {}",
                name,
                status.size,
                status.modified_time,
                status.creation_time
            );
            Ok(status)
        })
        .await
    }

    fn deadline(&self) -> Instant {
        Instant::now() + self.config.deadline_timeout()
    }

    fn request<T>(&self, message: T) -> Request<T> {
        let mut request = Request::new(message);
        request.set_timeout(self.config.deadline_timeout());
        request
    }
}

async fn within_deadline<T>(
    op: Operation,
    deadline: Instant,
    call: impl Future<Output = ClientResult<T>>,
) -> ClientResult<T> {
    match tokio::time::timeout_at(deadline, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!("{}: deadline exceeded", op.as_str());
            Err(ClientError::DeadlineExceeded)
        }
    }
}

/// Classifies a failed call. Any failure that surfaces after the deadline counts as expiry,
/// whatever status the transport attached to it.
fn remote(op: Operation, status: Status, deadline: Instant) -> ClientError {
    let code = if Instant::now() >= deadline {
        TransferCode::DeadlineExceeded
    } else {
        classify(op, &status)
    };
    tracing::error!("{} failed ({}): {}", op.as_str(), code, status.message());
    ClientError::Remote { op, code, status }
}

/// Streams `reader` into the outgoing half of a store.
///
/// If the transport stops accepting chunks the loop ends early and the call's terminal status
/// decides the outcome. Dropping `tx` on return signals end of stream.
async fn feed_chunks(
    mut reader: ChunkReader<File>,
    tx: mpsc::Sender<FileChunk>,
) -> ClientResult<ChunkTally> {
    let mut tally = ChunkTally::new();
    while let Some(chunk) = reader.next_chunk().await.map_err(ClientError::LocalIo)? {
        tally.record(&chunk);
        let (chunk_num, len) = (chunk.chunk_num, chunk.content.len());
        if tx.send(chunk).await.is_err() {
            tracing::error!("Failed to write chunk {} to server", chunk_num);
            break;
        }
        tracing::debug!("Sending chunk No. {} size: {}", chunk_num, len);
    }
    Ok(tally)
}
