//! Blueprint3D - turn engineering blueprints into 3D visualizations.
//!
//! The crate has two halves: a client pipeline (intake, settings, session,
//! dispatcher, presenter) and a same-origin relay that forwards generation
//! requests to the backend.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod error;
pub mod intake;
pub mod ports;
pub mod presenter;
pub mod preview;
pub mod relay;
pub mod session;
pub mod settings;
