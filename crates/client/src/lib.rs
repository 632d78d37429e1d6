//! # DFS Client
//!
//! Client transfer engine for the DFS file service.
//!
//! [`DfsClient`] drives the five operations (store, fetch, delete, list, stat) against a server,
//! reads and writes files under a local mount root, and reports every outcome in the
//! [`TransferCode`](api_shared::TransferCode) taxonomy via [`ClientError::code`] or [`outcome`].
//!
//! ```no_run
//! use dfs_client::{ClientConfig, DfsClient};
//!
//! # async fn run() -> Result<(), dfs_client::ClientError> {
//! let client = DfsClient::connect(ClientConfig::from_env()?).await?;
//! client.store("report.pdf").await?;
//! let status = client.stat("report.pdf").await?;
//! println!("{} bytes", status.size);
//! # Ok(())
//! # }
//! ```

mod client;
pub mod config;
mod error;

pub use client::DfsClient;
pub use config::ClientConfig;
pub use error::{outcome, ClientError, ClientResult};
