//! Wire protocol for the realtime channel

pub mod messages;

pub use messages::*;
