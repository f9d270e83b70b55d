//! Network layer: wire codec and the participant-side client
//!
//! The server-side accept loop lives in [`crate::server`]; sessions speak
//! the same [`wire`] codec from both ends.

pub mod client;
pub mod wire;
