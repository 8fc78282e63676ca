//! Core types and service wiring for the patentes public-transport plate checker.

/// Domain models shared by all lookup strategies.
pub mod model;
/// Plate normalization against the accepted plate shapes.
pub mod normalize;
/// Traits describing the lookup strategy interface.
pub mod ports;
/// High-level service facade used by the transport adapter.
pub mod service;

pub use model::*;
pub use normalize::*;
pub use ports::*;
pub use service::*;
