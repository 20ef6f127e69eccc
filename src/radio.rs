//! Transmission Logic
//!
//! Buffers handed between the main context and the tick handlers, the
//! RTTY and APRS engines that turn them into tone sequences, and the
//! coordinator that owns the timers and routes each tick to the one
//! active engine.

pub mod aprs;
pub mod buffer;
pub mod coordinator;
pub mod ook;
pub mod rtty;
