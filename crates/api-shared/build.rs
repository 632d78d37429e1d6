//! Build script for the `api-shared` crate.
//!
//! ## Purpose
//! Generates the tonic client and server stubs for `dfs.v1.DfsService`.
//!
//! ## Intended use
//! The message types are hand-written `prost::Message` derives in `src/pb.rs`, so the service is
//! described here with the manual builder and no `protoc` toolchain is needed at build time. The
//! generated file is included by `pb.rs` and shared by the client engine and the server handler.

use tonic_build::manual::{Builder, Method, MethodBuilder, Service};

const CODEC: &str = "tonic::codec::ProstCodec";

fn method(name: &str, route: &str, input: &str, output: &str) -> MethodBuilder {
    Method::builder()
        .name(name)
        .route_name(route)
        .input_type(format!("crate::pb::{input}"))
        .output_type(format!("crate::pb::{output}"))
        .codec_path(CODEC)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=build.rs");

    let service = Service::builder()
        .name("DfsService")
        .package("dfs.v1")
        .method(
            method("store_file", "StoreFile", "FileChunk", "ResponseStatus")
                .client_streaming()
                .build(),
        )
        .method(
            method("fetch_file", "FetchFile", "FilePath", "FileChunk")
                .server_streaming()
                .build(),
        )
        .method(method("delete_file", "DeleteFile", "FilePath", "ResponseStatus").build())
        .method(method("list_files", "ListFiles", "ListFilesRequest", "LsResponse").build())
        .method(method("status_file", "StatusFile", "FilePath", "FileStatus").build())
        .build();

    Builder::new().compile(&[service]);

    Ok(())
}
