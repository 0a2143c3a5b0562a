//! Integration test common infrastructure.
//!
//! Provides a scripted chat server, a connector that hands out in-memory
//! streams, and a sink that forwards deliveries to the test.

pub mod harness;
pub mod server;

#[allow(unused_imports)]
pub use harness::{ChannelSink, DuplexConnector, test_config};
#[allow(unused_imports)]
pub use server::MockServer;
