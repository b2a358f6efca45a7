//! Remote agent protocol: the server an agent exposes and the client a
//! hub uses to reach it

pub mod client;
pub mod convert;
pub mod server;

#[cfg(test)]
mod tests;

pub use client::{AgentClient, AgentClientBuilder, AgentClientConfig, ClientTlsFiles};
pub use server::{load_server_tls, AgentServer, ServerTlsFiles};
