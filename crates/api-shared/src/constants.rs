//! Constants shared by the DFS client and server.
//!
//! Both sides of a transfer must agree on these values, so they live here rather than in either
//! binary's configuration.

use std::time::Duration;

/// Size in bytes of one read buffer, and therefore the maximum content length of one chunk.
pub const CHUNK_SIZE: usize = 4096;

/// Call metadata key carrying the logical filename of a store.
pub const FILENAME_METADATA_KEY: &str = "filename";

/// Timeout applied to every client call when no other value is configured.
pub const DEFAULT_DEADLINE_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Default listening address for the server.
pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:50051";

/// Default server URI used by the client.
pub const DEFAULT_SERVER_URI: &str = "http://127.0.0.1:50051";

/// Default server mount directory, relative to the working directory.
pub const DEFAULT_SERVER_MOUNT_DIR: &str = "mnt/server";

/// Default client mount directory, relative to the working directory.
pub const DEFAULT_CLIENT_MOUNT_DIR: &str = "mnt/client";

/// Name prefix of in-progress stores inside the server mount directory.
pub const STAGING_PREFIX: &str = ".dfs-staging-";

/// Description returned with a successful store.
pub const STORE_SUCCESS_MESSAGE: &str = "File stored successfully";

/// Description returned with a successful delete.
pub const DELETE_SUCCESS_MESSAGE: &str = "File deleted successfully";

/// Number of chunks buffered between a file reader and the transport.
pub const STREAM_BUFFER: usize = 8;
