//! # DFS Core
//!
//! Server-side storage for the DFS file service.
//!
//! This crate contains pure disk operations under a single mount directory:
//! - Staged, atomically committed stores
//! - Chunked reads for fetches
//! - Delete, directory listing and per-file status
//!
//! **No API concerns**: the gRPC service, call deadlines and cancellation detection belong in
//! `api-grpc`. Errors convert into `tonic::Status` so the handler can return them directly.

pub mod config;
mod error;
pub mod storage;

pub use config::CoreConfig;
pub use error::{StorageError, StorageResult};
pub use storage::{Listing, StagedFile, Storage};
