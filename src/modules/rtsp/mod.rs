pub mod client;
pub mod packet;
pub mod transport;

pub use client::{RetryPolicy, RtspClient, Status, DEFAULT_PORT};
pub use transport::Connector;
