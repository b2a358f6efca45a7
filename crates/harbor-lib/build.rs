//! Build script for generating protobuf code
//!
//! The checked-in types in `src/proto/mod.rs` are used by default. With the
//! `proto-gen` feature enabled this regenerates them from the proto file.

use std::path::PathBuf;
use std::process::Command;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=../../proto/harbor/v1/agent.proto");

    if std::env::var("CARGO_FEATURE_PROTO_GEN").is_err() {
        return Ok(());
    }

    let protoc_available =
        std::env::var("PROTOC").is_ok() || Command::new("protoc").arg("--version").output().is_ok();

    if !protoc_available {
        println!("cargo:warning=protoc not found, skipping proto generation");
        println!("cargo:warning=Install protoc or set PROTOC env var to generate proto code");
        return Ok(());
    }

    let out_dir = PathBuf::from(std::env::var("OUT_DIR")?);

    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .out_dir(&out_dir)
        .compile(&["../../proto/harbor/v1/agent.proto"], &["../../proto"])?;

    Ok(())
}
