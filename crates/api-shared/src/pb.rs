//! Wire messages for `dfs.v1.DfsService`.
//!
//! The messages are declared directly as `prost` derives and the service stubs are generated by
//! the build script. Field tags are part of the wire contract and must not be renumbered.

/// One ordered fragment of a file in transit.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FileChunk {
    #[prost(bytes = "vec", tag = "1")]
    pub content: ::prost::alloc::vec::Vec<u8>,
    /// Zero-based sequence number, strictly increasing within one transfer.
    #[prost(int32, tag = "2")]
    pub chunk_num: i32,
}

/// Identifies a file by its logical name relative to the mount root.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FilePath {
    #[prost(string, tag = "1")]
    pub path: ::prost::alloc::string::String,
}

/// Acknowledgement for store and delete.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResponseStatus {
    #[prost(string, tag = "1")]
    pub description: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListFilesRequest {}

/// One directory listing entry.
#[derive(Clone, PartialEq, ::prost::Message, serde::Serialize)]
pub struct FileInfo {
    #[prost(string, tag = "1")]
    pub filename: ::prost::alloc::string::String,
    /// Seconds since the Unix epoch.
    #[prost(int64, tag = "2")]
    pub modified_time: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LsResponse {
    #[prost(message, repeated, tag = "1")]
    pub files: ::prost::alloc::vec::Vec<FileInfo>,
}

/// Extended metadata for a single file. Times are seconds since the Unix epoch.
#[derive(Clone, PartialEq, ::prost::Message, serde::Serialize)]
pub struct FileStatus {
    #[prost(uint64, tag = "1")]
    pub size: u64,
    #[prost(int64, tag = "2")]
    pub modified_time: i64,
    #[prost(int64, tag = "3")]
    pub creation_time: i64,
}

include!(concat!(env!("OUT_DIR"), "/dfs.v1.DfsService.rs"));
