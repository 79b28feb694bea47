//! Infrastructure: filesystem source, hashing, transport boundary, telemetry.

pub mod error;
pub mod hasher;
pub mod source;
pub mod telemetry;
pub mod transport;
