//! X11 protocol sink
//!
//! Carries the client core's requests to the X server and reads the
//! properties a new or changed client advertises.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, trace};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;
use x11rb::{CURRENT_TIME, NONE};

use crate::shared::Geometry;
use crate::wm::client_flags::ClientFlags;
use crate::wm::ewmh::Atoms;
use crate::wm::hints::{SizeHints, WmHints};
use crate::wm::icons::IconData;
use crate::wm::protocol::{FocusMode, ProtocolSink};
use crate::wm::registry::WindowProbe;

/// ICCCM WM_STATE values
const WITHDRAWN_STATE: u32 = 0;
const NORMAL_STATE: u32 = 1;
const ICONIC_STATE: u32 = 3;

/// Events selected on every managed client. Crossing events are dropped
/// while enter/leave suppression is active.
fn client_event_mask(crossings: bool) -> EventMask {
    let mask = EventMask::PROPERTY_CHANGE | EventMask::FOCUS_CHANGE | EventMask::STRUCTURE_NOTIFY;
    if crossings {
        mask | EventMask::ENTER_WINDOW | EventMask::LEAVE_WINDOW
    } else {
        mask
    }
}

/// Text property payload, with trailing NULs removed. Empty means unset.
pub fn text(value: &[u8]) -> Option<String> {
    let trimmed = value.strip_suffix(&[0]).unwrap_or(value);
    if trimmed.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(trimmed).into_owned())
    }
}

/// WM_CLASS holds "instance\0class\0". Returns (class, instance).
pub fn parse_class(value: &[u8]) -> (Option<String>, Option<String>) {
    let mut parts = value.split(|&b| b == 0);
    let instance = parts.next().and_then(text);
    let class = parts.next().and_then(text);
    (class, instance)
}

pub struct X11Sink {
    conn: Arc<RustConnection>,
    atoms: Atoms,
    root: Window,
    /// Whether managed clients currently select enter/leave events
    crossings: bool,
}

impl X11Sink {
    pub fn new(conn: Arc<RustConnection>, atoms: Atoms, root: Window) -> Self {
        Self {
            conn,
            atoms,
            root,
            crossings: true,
        }
    }

    pub fn conn(&self) -> &RustConnection {
        self.conn.as_ref()
    }

    pub fn atoms(&self) -> &Atoms {
        &self.atoms
    }

    pub fn root(&self) -> Window {
        self.root
    }

    /// Raw 32-bit property values. Missing properties read as empty.
    pub fn read_u32s(&self, window: Window, property: Atom) -> Result<Vec<u32>> {
        let reply = self
            .conn()
            .get_property(false, window, property, AtomEnum::ANY, 0, u32::MAX / 4)?
            .reply()?;
        Ok(reply.value32().map(|values| values.collect()).unwrap_or_default())
    }

    pub fn read_u32(&self, window: Window, property: Atom) -> Result<Option<u32>> {
        Ok(self.read_u32s(window, property)?.first().copied())
    }

    /// A window-valued property; zero reads as unset.
    pub fn read_window(&self, window: Window, property: Atom) -> Result<Option<Window>> {
        Ok(self.read_u32(window, property)?.filter(|&w| w != NONE))
    }

    pub fn read_bytes(&self, window: Window, property: Atom) -> Result<Vec<u8>> {
        let reply = self
            .conn()
            .get_property(false, window, property, AtomEnum::ANY, 0, u32::MAX / 4)?
            .reply()?;
        Ok(reply.value)
    }

    pub fn read_text(&self, window: Window, property: Atom) -> Result<Option<String>> {
        Ok(text(&self.read_bytes(window, property)?))
    }

    pub fn read_class(&self, window: Window) -> Result<(Option<String>, Option<String>)> {
        Ok(parse_class(&self.read_bytes(window, AtomEnum::WM_CLASS.into())?))
    }

    pub fn read_size_hints(&self, window: Window) -> Result<Option<SizeHints>> {
        Ok(SizeHints::from_raw(&self.read_u32s(window, AtomEnum::WM_NORMAL_HINTS.into())?))
    }

    pub fn read_wm_hints(&self, window: Window) -> Result<Option<WmHints>> {
        Ok(WmHints::from_raw(&self.read_u32s(window, AtomEnum::WM_HINTS.into())?))
    }

    pub fn read_icon(&self, window: Window) -> Result<Option<IconData>> {
        Ok(IconData::from_net_wm_icon(&self.read_u32s(window, self.atoms.net_wm_icon)?))
    }

    /// Everything the registry needs to build a client. `None` when the
    /// window is already gone.
    pub fn probe_window(&self, window: Window) -> Result<Option<(Geometry, WindowProbe)>> {
        let Ok(attrs) = self.conn().get_window_attributes(window)?.reply() else {
            debug!("Window 0x{:x} vanished before it could be probed", window);
            return Ok(None);
        };
        let Ok(geom) = self.conn().get_geometry(window)?.reply() else {
            return Ok(None);
        };
        let geometry = Geometry::new(geom.x as i32, geom.y as i32, geom.width as u32, geom.height as u32);

        let atoms = &self.atoms;
        let (class, instance) = self.read_class(window)?;
        let probe = WindowProbe {
            override_redirect: attrs.override_redirect,
            window_type: atoms.window_type(&self.read_u32s(window, atoms.net_wm_window_type)?),
            transient_for: self.read_window(window, AtomEnum::WM_TRANSIENT_FOR.into())?,
            name: self.read_text(window, atoms.net_wm_name)?,
            alt_name: self.read_text(window, AtomEnum::WM_NAME.into())?,
            icon_name: self.read_text(window, atoms.net_wm_icon_name)?,
            alt_icon_name: self.read_text(window, AtomEnum::WM_ICON_NAME.into())?,
            class,
            instance,
            role: self.read_text(window, atoms.wm_window_role)?,
            machine: self.read_text(window, AtomEnum::WM_CLIENT_MACHINE.into())?,
            pid: self.read_u32(window, atoms.net_wm_pid)?,
            size_hints: self.read_size_hints(window)?,
            wm_hints: self.read_wm_hints(window)?,
            protocols: atoms.protocols(&self.read_u32s(window, atoms.wm_protocols)?),
            leader_window: self.read_window(window, atoms.wm_client_leader)?,
            icon: self.read_icon(window)?,
            state: atoms.flags_from_state(&self.read_u32s(window, atoms.net_wm_state)?),
        };
        trace!("Probed window 0x{:x}: {:?}", window, probe);
        Ok(Some((geometry, probe)))
    }

    /// Select client events and map a freshly managed window.
    pub fn attach(&self, window: Window) -> Result<()> {
        let aux = ChangeWindowAttributesAux::new().event_mask(client_event_mask(self.crossings));
        self.conn().change_window_attributes(window, &aux)?;
        self.set_wm_state(window, NORMAL_STATE)?;
        self.conn().map_window(window)?;
        Ok(())
    }

    /// Mark a client withdrawn after it has been unmanaged.
    pub fn detach(&self, window: Window) -> Result<()> {
        self.set_wm_state(window, WITHDRAWN_STATE)
    }

    fn set_wm_state(&self, window: Window, state: u32) -> Result<()> {
        self.conn().change_property32(
            PropMode::REPLACE,
            window,
            self.atoms.wm_state,
            self.atoms.wm_state,
            &[state, NONE],
        )?;
        Ok(())
    }

    /// Tell a client its geometry did not change (ICCCM 4.1.5).
    pub fn confirm_geometry(&self, window: Window, geometry: Geometry) -> Result<()> {
        let event = ConfigureNotifyEvent {
            response_type: CONFIGURE_NOTIFY_EVENT,
            sequence: 0,
            event: window,
            window,
            above_sibling: NONE,
            x: geometry.x as i16,
            y: geometry.y as i16,
            width: geometry.width as u16,
            height: geometry.height as u16,
            border_width: 0,
            override_redirect: false,
        };
        self.conn().send_event(false, window, EventMask::STRUCTURE_NOTIFY, event)?;
        Ok(())
    }

    /// Apply a ConfigureRequest from a window we do not manage as asked.
    pub fn passthrough_configure(&self, request: &ConfigureRequestEvent) -> Result<()> {
        let aux = ConfigureWindowAux::from_configure_request(request);
        self.conn().configure_window(request.window, &aux)?;
        Ok(())
    }

    pub fn update_client_list(&self, windows: &[u32]) -> Result<()> {
        self.atoms.update_client_list(self.conn(), self.root, windows)
    }
}

impl ProtocolSink for X11Sink {
    fn configure(&mut self, window: u32, geometry: Geometry) -> Result<()> {
        let aux = ConfigureWindowAux::new()
            .x(geometry.x)
            .y(geometry.y)
            .width(geometry.width)
            .height(geometry.height);
        self.conn()
            .configure_window(window, &aux)
            .with_context(|| format!("configure 0x{:x}", window))?;
        Ok(())
    }

    fn restack(&mut self, order: &[u32]) -> Result<()> {
        let mut below = None;
        for &window in order {
            let aux = match below {
                Some(sibling) => ConfigureWindowAux::new().sibling(sibling).stack_mode(StackMode::ABOVE),
                None => ConfigureWindowAux::new().stack_mode(StackMode::BELOW),
            };
            self.conn().configure_window(window, &aux)?;
            below = Some(window);
        }
        self.atoms.update_client_list_stacking(self.conn(), self.root, order)
    }

    fn set_input_focus(&mut self, window: Option<u32>, mode: FocusMode) -> Result<()> {
        let Some(window) = window else {
            self.conn().set_input_focus(InputFocus::POINTER_ROOT, self.root, CURRENT_TIME)?;
            return self.atoms.update_active_window(self.conn(), self.root, None);
        };

        if mode != FocusMode::GloballyActive {
            self.conn().set_input_focus(InputFocus::PARENT, window, CURRENT_TIME)?;
        }
        if mode != FocusMode::Passive {
            self.atoms.send_protocol(self.conn(), window, self.atoms.wm_take_focus)?;
        }
        self.atoms.update_active_window(self.conn(), self.root, Some(window))
    }

    fn close(&mut self, window: u32) -> Result<()> {
        self.atoms.send_protocol(self.conn(), window, self.atoms.wm_delete_window)
    }

    fn kill(&mut self, window: u32) -> Result<()> {
        self.conn().kill_client(window)?;
        Ok(())
    }

    fn set_visible(&mut self, window: u32, visible: bool) -> Result<()> {
        if visible {
            self.set_wm_state(window, NORMAL_STATE)?;
            self.conn().map_window(window)?;
        } else {
            self.set_wm_state(window, ICONIC_STATE)?;
            self.conn().unmap_window(window)?;
        }
        Ok(())
    }

    fn update_state(&mut self, window: u32, flags: ClientFlags) -> Result<()> {
        self.atoms.set_window_state(self.conn(), window, flags)
    }

    fn set_crossing_events(&mut self, windows: &[u32], enabled: bool) -> Result<()> {
        self.crossings = enabled;
        let aux = ChangeWindowAttributesAux::new().event_mask(client_event_mask(enabled));
        for &window in windows {
            self.conn()
                .change_window_attributes(window, &aux)
                .with_context(|| format!("event mask on 0x{:x}", window))?;
        }
        trace!("Crossing events {} on {} windows", if enabled { "on" } else { "off" }, windows.len());
        Ok(())
    }
}
