//! Snapshot model layer
//!
//! Plain data types shared by the collector, the prompt composer and the
//! JSON snapshot dump.

pub mod resource_kind;
pub mod snapshot;

pub use resource_kind::ResourceKind;
pub use snapshot::*;
