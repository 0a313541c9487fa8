//! Types shared between the client core and its collaborators.

pub mod window_state;

pub use window_state::Geometry;
