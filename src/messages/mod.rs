//! Message types shared by every vendor family.
//!
//! Conversations, turns and payload builders all speak in terms of these
//! records; nothing here knows about a specific wire format.

mod types;

pub use types::*;
