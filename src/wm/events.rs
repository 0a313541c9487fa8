//! Events Module
//!
//! Translates X11 events into client core operations.

use anyhow::Result;
use tracing::{debug, info, warn};
use x11rb::protocol::Event;
use x11rb::protocol::xproto::*;

use crate::shared::Geometry;
use crate::wm::WindowManager;
use crate::wm::client::Client;
use crate::wm::client_flags::ClientFlags;
use crate::wm::ewmh::StateAction;
use crate::wm::protocol::{ProtocolSink, log_failed};
use crate::wm::registry::WindowProbe;
use crate::wm::x11::{X11Sink, parse_class};

/// Result of event handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    /// Event was handled successfully
    Handled,
    /// Event should be ignored
    Ignore,
}

/// Initial state flags applied through their setters after manage, so the
/// geometry snapshots and visibility requests happen as for a live change.
fn deferred_state() -> ClientFlags {
    ClientFlags::FULLSCREEN | ClientFlags::maximized() | ClientFlags::MINIMIZED | ClientFlags::HIDDEN
}

/// Event router - dispatches events to the client core
#[derive(Debug, Default)]
pub struct EventRouter;

impl EventRouter {
    pub fn new() -> Self {
        Self
    }

    /// Route an event to the appropriate handler
    pub fn route_event(&mut self, wm: &mut WindowManager<X11Sink>, event: &Event) -> Result<EventResult> {
        match event {
            Event::MapRequest(e) => {
                debug!("MapRequest: window 0x{:x}", e.window);
                if wm.client(e.window).is_some() {
                    wm.set_minimized(e.window, false);
                    wm.set_hidden(e.window, false);
                    return Ok(EventResult::Handled);
                }
                self.manage_window(wm, e.window)
            }
            Event::MapNotify(e) if e.override_redirect && wm.client(e.window).is_none() => {
                // Popups never ask to be mapped
                self.manage_window(wm, e.window)
            }
            Event::UnmapNotify(e) => {
                debug!("UnmapNotify: window 0x{:x}", e.window);
                if !wm.client(e.window).is_some_and(|c| is_withdrawal(e, c)) {
                    return Ok(EventResult::Ignore);
                }
                wm.unmanage(e.window);
                log_failed(wm.sink().detach(e.window), "detach");
                self.publish_client_list(wm);
                Ok(EventResult::Handled)
            }
            Event::DestroyNotify(e) => {
                debug!("DestroyNotify: window 0x{:x}", e.window);
                if wm.client(e.window).is_none() {
                    return Ok(EventResult::Ignore);
                }
                wm.unmanage(e.window);
                self.publish_client_list(wm);
                Ok(EventResult::Handled)
            }
            Event::ConfigureRequest(e) => {
                self.handle_configure_request(wm, e)?;
                Ok(EventResult::Handled)
            }
            Event::FocusIn(e) => {
                if e.mode == NotifyMode::NORMAL && wm.client(e.event).is_some() && wm.focused() != Some(e.event) {
                    debug!("FocusIn: client 0x{:x} took focus", e.event);
                    wm.focus(e.event);
                }
                Ok(EventResult::Handled)
            }
            Event::FocusOut(e) => {
                // Focus fell back to nothing: the focused client lost it for good
                let dropped = matches!(e.detail, NotifyDetail::NONE | NotifyDetail::POINTER_ROOT);
                if e.mode == NotifyMode::NORMAL && dropped {
                    wm.unfocus_update(e.event);
                }
                Ok(EventResult::Handled)
            }
            Event::EnterNotify(e) => {
                if e.mode != NotifyMode::NORMAL || e.detail == NotifyDetail::INFERIOR {
                    return Ok(EventResult::Ignore);
                }
                wm.handle_enter(e.event);
                Ok(EventResult::Handled)
            }
            Event::LeaveNotify(e) => {
                debug!("LeaveNotify: window 0x{:x}", e.event);
                Ok(EventResult::Ignore)
            }
            Event::PropertyNotify(e) => {
                if wm.client(e.window).is_none() {
                    return Ok(EventResult::Ignore);
                }
                self.handle_property(wm, e)?;
                Ok(EventResult::Handled)
            }
            Event::ClientMessage(e) => {
                debug!("ClientMessage: window 0x{:x}, type {}", e.window, e.type_);
                self.handle_client_message(wm, e);
                Ok(EventResult::Handled)
            }
            Event::Error(e) => {
                warn!(
                    "X11 Error: error_code={}, request_code={}, minor_code={}",
                    e.error_code, e.major_opcode, e.minor_opcode
                );
                Ok(EventResult::Handled)
            }
            _ => Ok(EventResult::Ignore),
        }
    }

    /// Probe and manage a window, then attach our event mask and map it.
    pub fn manage_window(&mut self, wm: &mut WindowManager<X11Sink>, window: Window) -> Result<EventResult> {
        let Some((geometry, probe)) = wm.sink().probe_window(window)? else {
            return Ok(EventResult::Ignore);
        };
        if !adopt(wm, window, geometry, probe, |wm| log_failed(wm.sink().attach(window), "attach")) {
            return Ok(EventResult::Ignore);
        }
        self.publish_client_list(wm);
        info!("Managing window 0x{:x}", window);
        Ok(EventResult::Handled)
    }

    fn publish_client_list(&self, wm: &WindowManager<X11Sink>) {
        log_failed(
            wm.sink().update_client_list(wm.stack().get_stacking_order()),
            "update_client_list",
        );
    }

    fn handle_configure_request(&mut self, wm: &mut WindowManager<X11Sink>, e: &ConfigureRequestEvent) -> Result<()> {
        match configure_client(wm, e) {
            ConfigureReply::Passthrough => wm.sink().passthrough_configure(e),
            ConfigureReply::Applied => Ok(()),
            ConfigureReply::Confirm(geometry) => wm.sink().confirm_geometry(e.window, geometry),
        }
    }

    fn handle_property(&mut self, wm: &mut WindowManager<X11Sink>, e: &PropertyNotifyEvent) -> Result<()> {
        let window = e.window;
        let deleted = e.state == Property::DELETE;
        let sink = wm.sink();
        let atoms = sink.atoms();
        let atom = e.atom;

        if atom == u32::from(AtomEnum::WM_NAME) {
            let value = if deleted { None } else { sink.read_text(window, atom)? };
            wm.set_alt_name(window, value);
        } else if atom == atoms.net_wm_name {
            let value = if deleted { None } else { sink.read_text(window, atom)? };
            wm.set_name(window, value);
        } else if atom == u32::from(AtomEnum::WM_ICON_NAME) {
            let value = if deleted { None } else { sink.read_text(window, atom)? };
            wm.set_alt_icon_name(window, value);
        } else if atom == atoms.net_wm_icon_name {
            let value = if deleted { None } else { sink.read_text(window, atom)? };
            wm.set_icon_name(window, value);
        } else if atom == u32::from(AtomEnum::WM_CLASS) {
            let (class, instance) = if deleted { (None, None) } else { parse_class(&sink.read_bytes(window, atom)?) };
            wm.set_class_instance(window, class, instance);
        } else if atom == atoms.wm_window_role {
            let value = if deleted { None } else { sink.read_text(window, atom)? };
            wm.set_role(window, value);
        } else if atom == u32::from(AtomEnum::WM_CLIENT_MACHINE) {
            let value = if deleted { None } else { sink.read_text(window, atom)? };
            wm.set_machine(window, value);
        } else if atom == atoms.net_wm_pid {
            let value = if deleted { None } else { sink.read_u32(window, atom)? };
            wm.set_pid(window, value);
        } else if atom == u32::from(AtomEnum::WM_NORMAL_HINTS) {
            let value = if deleted { None } else { sink.read_size_hints(window)? };
            wm.set_size_hints(window, value.unwrap_or_default());
        } else if atom == u32::from(AtomEnum::WM_HINTS) {
            let value = if deleted { None } else { sink.read_wm_hints(window)? };
            wm.set_wm_hints(window, value);
        } else if atom == u32::from(AtomEnum::WM_TRANSIENT_FOR) {
            let value = if deleted { None } else { sink.read_window(window, atom)? };
            wm.set_transient_for(window, value);
            wm.restack();
        } else if atom == atoms.wm_protocols {
            let value = if deleted { Vec::new() } else { sink.read_u32s(window, atom)? };
            let protocols = atoms.protocols(&value);
            wm.set_protocols(window, protocols);
        } else if atom == atoms.wm_client_leader {
            let value = if deleted { None } else { sink.read_window(window, atom)? };
            wm.set_leader_window(window, value);
        } else if atom == atoms.net_wm_icon {
            let value = if deleted { None } else { sink.read_icon(window)? };
            wm.set_icon(window, value);
        } else if atom == atoms.net_wm_window_type {
            let value = if deleted { Vec::new() } else { sink.read_u32s(window, atom)? };
            let window_type = atoms.window_type(&value);
            wm.set_type(window, window_type);
            wm.restack();
        }
        Ok(())
    }

    fn handle_client_message(&mut self, wm: &mut WindowManager<X11Sink>, e: &ClientMessageEvent) {
        let window = e.window;
        let data = e.data.as_data32();
        let atoms = wm.sink().atoms();

        if e.type_ == atoms.net_wm_state {
            let Some(action) = StateAction::from_raw(data[0]) else {
                warn!("Unknown _NET_WM_STATE action {} for 0x{:x}", data[0], window);
                return;
            };
            let flags: Vec<ClientFlags> = data[1..3].iter().filter_map(|&a| atoms.state_flag(a)).collect();
            for flag in flags {
                let current = wm.client(window).is_some_and(|c| c.flags.contains(flag));
                wm.set_state_flag(window, flag, action.apply(current));
            }
        } else if e.type_ == atoms.net_active_window {
            wm.set_minimized(window, false);
            wm.focus(window);
        } else if e.type_ == atoms.net_close_window {
            wm.kill(window);
        } else if e.type_ == atoms.wm_change_state && data[0] == 3 {
            wm.set_minimized(window, true);
        }
    }
}

/// Register a probed window. Initial geometry and visibility state is applied
/// through the setters once `attach` has run, so it behaves as a live change.
/// `attach` is skipped for override-redirect popups.
pub fn adopt<S: ProtocolSink>(
    wm: &mut WindowManager<S>,
    window: u32,
    geometry: Geometry,
    mut probe: WindowProbe,
    attach: impl FnOnce(&mut WindowManager<S>),
) -> bool {
    let deferred = probe.state & deferred_state();
    probe.state -= deferred;

    if wm.manage(window, geometry, &probe).is_err() {
        return false;
    }
    if !probe.override_redirect {
        attach(wm);
    }
    for flag in deferred.iter() {
        wm.set_state_flag(window, flag, true);
    }
    true
}

/// ICCCM 4.1.4: a client withdraws by unmapping its window, or, when it is
/// already unmapped, by sending a synthetic UnmapNotify to the root. Unmaps
/// we cause by hiding a client find it invisible and are not withdrawals.
fn is_withdrawal(e: &UnmapNotifyEvent, client: &Client) -> bool {
    if e.from_configure {
        return false;
    }
    let synthetic = e.response_type & 0x80 != 0;
    synthetic || client.maybe_visible()
}

/// What a ConfigureRequest turned into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigureReply {
    /// Not ours; apply it as asked
    Passthrough,
    /// Geometry changed and a real ConfigureNotify follows
    Applied,
    /// Nothing moved; tell the client where it is (ICCCM 4.1.5)
    Confirm(Geometry),
}

fn configure_client<S: ProtocolSink>(wm: &mut WindowManager<S>, e: &ConfigureRequestEvent) -> ConfigureReply {
    let Some(client) = wm.client(e.window) else {
        return ConfigureReply::Passthrough;
    };
    let current = client.geometry;
    if client.flags.contains(ClientFlags::FULLSCREEN) {
        return ConfigureReply::Confirm(current);
    }

    let mut requested = current;
    if e.value_mask.contains(ConfigWindow::X) {
        requested.x = e.x as i32;
    }
    if e.value_mask.contains(ConfigWindow::Y) {
        requested.y = e.y as i32;
    }
    if e.value_mask.contains(ConfigWindow::WIDTH) {
        requested.width = e.width as u32;
    }
    if e.value_mask.contains(ConfigWindow::HEIGHT) {
        requested.height = e.height as u32;
    }

    if wm.resize(e.window, requested, true) {
        ConfigureReply::Applied
    } else {
        ConfigureReply::Confirm(wm.client(e.window).map_or(current, |c| c.geometry))
    }
}

/// Get event window
pub fn get_event_window(event: &Event) -> Option<u32> {
    match event {
        Event::MapRequest(e) => Some(e.window),
        Event::MapNotify(e) => Some(e.window),
        Event::UnmapNotify(e) => Some(e.window),
        Event::DestroyNotify(e) => Some(e.window),
        Event::ConfigureRequest(e) => Some(e.window),
        Event::FocusIn(e) => Some(e.event),
        Event::FocusOut(e) => Some(e.event),
        Event::EnterNotify(e) => Some(e.event),
        Event::LeaveNotify(e) => Some(e.event),
        Event::PropertyNotify(e) => Some(e.window),
        Event::ClientMessage(e) => Some(e.window),
        _ => None,
    }
}
