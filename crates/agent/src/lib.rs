//! Harbor agent: exposes one Docker host over the agent protocol

pub mod api;
pub mod config;
pub mod docker;
