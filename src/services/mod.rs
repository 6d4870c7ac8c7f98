//! Service layer
//!
//! Sits between the outer surfaces (HTTP server, CLI) and the collector,
//! composer and completion client.

pub mod assistant;

pub use assistant::Assistant;
