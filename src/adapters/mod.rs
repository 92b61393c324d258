//! Adapter implementations for port traits.
//!
//! - `live/`: real HTTP implementations

pub mod live;
