//! Statuspage incident feed source for the incident relay.

pub mod feed;
pub mod statuspage_client;

pub use feed::parse_incidents_payload;
pub use statuspage_client::StatuspageClient;
