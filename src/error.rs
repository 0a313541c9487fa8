//! Client core error taxonomy
//!
//! None of these are fatal. Callers recover at the point of detection and
//! log; only protocol-connection failures (carried as `anyhow::Error` by the
//! X11 driver) end the process.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// A second registration for a window that already has a Client.
    #[error("window 0x{0:x} is already managed")]
    AlreadyManaged(u32),

    /// The eligibility probe rejected the window; it is left alone.
    #[error("window 0x{window:x} is not manageable: {reason}")]
    Unmanageable { window: u32, reason: &'static str },

    /// A requested rectangle had a non-positive dimension and was clamped to 1x1.
    #[error("geometry {width}x{height} for window 0x{window:x} is degenerate")]
    GeometryRejected { window: u32, width: u32, height: u32 },

    /// The target window is no longer in the registry.
    #[error("window 0x{0:x} is not managed")]
    StaleReference(u32),
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
