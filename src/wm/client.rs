use crate::shared::Geometry;
use crate::wm::client_flags::{ClientFlags, WindowLayer, WindowType, WmProtocols};
use crate::wm::hints::{SizeHints, WmHints};
use crate::wm::icons::IconData;

/// Geometry remembered on the rising edge of fullscreen/maximize and
/// consumed on the falling edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SavedGeometry {
    pub fullscreen: Option<Geometry>,
    /// (x, width) before horizontal maximize
    pub horizontal: Option<(i32, u32)>,
    /// (y, height) before vertical maximize
    pub vertical: Option<(i32, u32)>,
}

/// Window Manager client state
/// Represents a top-level window being managed by the WM
#[derive(Debug, Clone)]
pub struct Client {
    /// X11 window ID
    pub window: u32,

    /// _NET_WM_PID, when the client bothers to set it
    pub pid: Option<u32>,

    pub name: Option<String>,
    pub alt_name: Option<String>,
    pub icon_name: Option<String>,
    pub alt_icon_name: Option<String>,
    /// WM_CLASS res_class
    pub class: Option<String>,
    /// WM_CLASS res_name
    pub instance: Option<String>,
    pub role: Option<String>,
    pub machine: Option<String>,

    /// Last applied geometry
    pub geometry: Geometry,
    pub size_hints: SizeHints,
    pub size_hints_honor: bool,
    pub wm_hints: Option<WmHints>,

    /// Owner window. Looked up through the registry, never followed blindly.
    pub transient_for: Option<u32>,
    pub group_window: Option<u32>,
    pub leader_window: Option<u32>,

    pub flags: ClientFlags,
    pub window_type: WindowType,
    pub protocols: WmProtocols,
    pub icon: Option<IconData>,

    /// Popup managed without redirect; we never select events on it.
    pub override_redirect: bool,

    pub saved: SavedGeometry,
}

impl Client {
    pub fn new(window: u32, geometry: Geometry) -> Self {
        Self {
            window,
            pid: None,
            name: None,
            alt_name: None,
            icon_name: None,
            alt_icon_name: None,
            class: None,
            instance: None,
            role: None,
            machine: None,
            geometry,
            size_hints: SizeHints::default(),
            size_hints_honor: true,
            wm_hints: None,
            transient_for: None,
            group_window: None,
            leader_window: None,
            flags: ClientFlags::empty(),
            window_type: WindowType::Normal,
            protocols: WmProtocols::empty(),
            icon: None,
            override_redirect: false,
            saved: SavedGeometry::default(),
        }
    }

    /// Not hidden and not minimized. Fullscreen/maximize play no part.
    pub fn maybe_visible(&self) -> bool {
        !self.flags.intersects(ClientFlags::HIDDEN | ClientFlags::MINIMIZED)
    }

    pub fn is_fixed(&self) -> bool {
        self.size_hints.is_fixed()
    }

    pub fn has_protocol(&self, protocol: WmProtocols) -> bool {
        self.protocols.contains(protocol)
    }

    pub fn accepts_input(&self) -> bool {
        self.wm_hints.as_ref().is_none_or(WmHints::accepts_input)
    }

    /// Primary name, falling back to the alternate one.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().or(self.alt_name.as_deref()).unwrap_or("")
    }

    /// Run a requested rectangle through this client's size hints.
    pub fn geometry_hints(&self, requested: Geometry) -> Geometry {
        self.size_hints.apply(self.size_hints_honor, requested)
    }

    /// Layer picked by this client's own flags and type, if any.
    pub fn own_layer(&self) -> Option<WindowLayer> {
        WindowLayer::from_state(self.flags, self.window_type)
    }

    /// Toggle a state flag. Returns false when nothing changed.
    pub fn set_flag(&mut self, flag: ClientFlags, value: bool) -> bool {
        if self.flags.contains(flag) == value {
            return false;
        }
        self.flags.set(flag, value);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maybe_visible() {
        let mut client = Client::new(1, Geometry::new(0, 0, 10, 10));
        assert!(client.maybe_visible());
        client.set_flag(ClientFlags::FULLSCREEN | ClientFlags::MAXIMIZED_HORIZ, true);
        assert!(client.maybe_visible());
        client.set_flag(ClientFlags::MINIMIZED, true);
        assert!(!client.maybe_visible());
        client.set_flag(ClientFlags::MINIMIZED, false);
        client.set_flag(ClientFlags::HIDDEN, true);
        assert!(!client.maybe_visible());
    }

    #[test]
    fn test_set_flag_reports_change() {
        let mut client = Client::new(1, Geometry::default());
        assert!(client.set_flag(ClientFlags::URGENT, true));
        assert!(!client.set_flag(ClientFlags::URGENT, true));
        assert!(client.set_flag(ClientFlags::URGENT, false));
    }

    #[test]
    fn test_display_name_fallback() {
        let mut client = Client::new(1, Geometry::default());
        assert_eq!(client.display_name(), "");
        client.alt_name = Some("xterm".into());
        assert_eq!(client.display_name(), "xterm");
        client.name = Some("vim".into());
        assert_eq!(client.display_name(), "vim");
    }
}
