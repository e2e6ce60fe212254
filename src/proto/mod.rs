//! Protocol Buffer definitions and generated code for the gateway services.
//!
//! This module contains auto-generated Rust types from Protobuf definitions,
//! created at build time by [`tonic-build`] from `proto/volgate.proto`.

pub mod v1 {
    tonic::include_proto!("volgate.v1");
}
