//! # API Shared
//!
//! Shared utilities and definitions for the DFS client and server.
//!
//! Contains:
//! - Wire messages and generated tonic stubs (`pb` module)
//! - Process-wide constants such as the chunk size and the filename metadata key
//! - The client-visible status taxonomy ([`TransferCode`]) and status translation helpers
//! - [`FileName`], the validated logical filename used on both sides of the wire
//! - [`ChunkReader`] and [`ChunkTally`] for producing and observing chunk streams
//!
//! Used by `api-grpc`, `dfs-core` and `dfs-client` for common functionality.

pub mod chunks;
pub mod code;
pub mod constants;
pub mod file_name;
pub mod pb;
pub mod status;

pub use chunks::{ChunkReader, ChunkTally};
pub use code::TransferCode;
pub use file_name::{FileName, FileNameError};
pub use pb::*;
