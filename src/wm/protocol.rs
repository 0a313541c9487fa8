//! Protocol sink
//!
//! Requests the client core sends to the windowing protocol. The X11
//! implementation lives in `wm::x11`; `RecordingSink` keeps requests in
//! memory for tests and dry runs.

use anyhow::Result;
use tracing::warn;

use crate::shared::Geometry;
use crate::wm::client_flags::ClientFlags;

/// How input focus is handed over (ICCCM input models)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusMode {
    /// SetInputFocus only
    Passive,
    /// SetInputFocus plus WM_TAKE_FOCUS
    LocallyActive,
    /// WM_TAKE_FOCUS only; the client takes focus itself
    GloballyActive,
}

pub trait ProtocolSink {
    /// Apply a geometry rectangle.
    fn configure(&mut self, window: u32, geometry: Geometry) -> Result<()>;

    /// Restack to the given bottom-to-top order.
    fn restack(&mut self, order: &[u32]) -> Result<()>;

    /// Move input focus; `None` returns it to the root.
    fn set_input_focus(&mut self, window: Option<u32>, mode: FocusMode) -> Result<()>;

    /// Ask the client to close itself (WM_DELETE_WINDOW).
    fn close(&mut self, window: u32) -> Result<()>;

    /// Terminate the client's connection.
    fn kill(&mut self, window: u32) -> Result<()>;

    /// Show or hide a window without unmanaging it.
    fn set_visible(&mut self, window: u32, visible: bool) -> Result<()>;

    /// Publish state flags (_NET_WM_STATE).
    fn update_state(&mut self, window: u32, flags: ClientFlags) -> Result<()>;

    /// Select or deselect pointer crossing events on `windows`. Crossings
    /// caused by requests sent while deselected are never reported.
    fn set_crossing_events(&mut self, windows: &[u32], enabled: bool) -> Result<()>;
}

/// Log a failed request and carry on; the model is already updated.
pub(crate) fn log_failed(result: Result<()>, operation: &str) {
    if let Err(e) = result {
        warn!("Protocol request {} failed: {:#}", operation, e);
    }
}

/// Request recorded by `RecordingSink`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Configure { window: u32, geometry: Geometry },
    Restack(Vec<u32>),
    Focus { window: Option<u32>, mode: FocusMode },
    Close(u32),
    Kill(u32),
    Visible { window: u32, visible: bool },
    State { window: u32, flags: ClientFlags },
    CrossingEvents { windows: Vec<u32>, enabled: bool },
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub requests: Vec<Request>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent restack order, if any.
    pub fn last_restack(&self) -> Option<&[u32]> {
        self.requests.iter().rev().find_map(|r| match r {
            Request::Restack(order) => Some(order.as_slice()),
            _ => None,
        })
    }

    /// Most recent geometry sent for `window`.
    pub fn last_configure(&self, window: u32) -> Option<Geometry> {
        self.requests.iter().rev().find_map(|r| match *r {
            Request::Configure { window: w, geometry } if w == window => Some(geometry),
            _ => None,
        })
    }

    pub fn take(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.requests)
    }
}

impl ProtocolSink for RecordingSink {
    fn configure(&mut self, window: u32, geometry: Geometry) -> Result<()> {
        self.requests.push(Request::Configure { window, geometry });
        Ok(())
    }

    fn restack(&mut self, order: &[u32]) -> Result<()> {
        self.requests.push(Request::Restack(order.to_vec()));
        Ok(())
    }

    fn set_input_focus(&mut self, window: Option<u32>, mode: FocusMode) -> Result<()> {
        self.requests.push(Request::Focus { window, mode });
        Ok(())
    }

    fn close(&mut self, window: u32) -> Result<()> {
        self.requests.push(Request::Close(window));
        Ok(())
    }

    fn kill(&mut self, window: u32) -> Result<()> {
        self.requests.push(Request::Kill(window));
        Ok(())
    }

    fn set_visible(&mut self, window: u32, visible: bool) -> Result<()> {
        self.requests.push(Request::Visible { window, visible });
        Ok(())
    }

    fn update_state(&mut self, window: u32, flags: ClientFlags) -> Result<()> {
        self.requests.push(Request::State { window, flags });
        Ok(())
    }

    fn set_crossing_events(&mut self, windows: &[u32], enabled: bool) -> Result<()> {
        self.requests.push(Request::CrossingEvents { windows: windows.to_vec(), enabled });
        Ok(())
    }
}
