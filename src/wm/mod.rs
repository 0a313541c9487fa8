//! Window Manager Module
//!
//! Client management core: registry, stacking, focus and per-client state,
//! wired to a `ProtocolSink` that carries requests out to the server.

pub mod client;
pub mod client_flags;
pub mod events;
pub mod ewmh;
pub mod focus;
pub mod hints;
pub mod icons;
pub mod protocol;
pub mod registry;
pub mod signals;
pub mod stacking;
pub mod state;
pub mod x11;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ClientError, ClientResult};
use crate::shared::Geometry;
use crate::wm::client::Client;
use crate::wm::client_flags::WmProtocols;
use crate::wm::focus::{FilterStatus, FocusManager};
use crate::wm::protocol::{FocusMode, ProtocolSink, log_failed};
use crate::wm::registry::{ClientRegistry, WindowProbe};
use crate::wm::signals::{ClientProperty, ClientSignal, SignalBus};
use crate::wm::stacking::StackingManager;

pub struct WindowManager<S: ProtocolSink> {
    clients: ClientRegistry,
    stack: StackingManager,
    focus: FocusManager,
    signals: SignalBus,
    sink: S,
    /// Rectangle used for fullscreen and maximize
    screen: Geometry,
    raise_on_focus: bool,
}

impl<S: ProtocolSink> WindowManager<S> {
    pub fn new(sink: S, screen: Geometry, config: &Config) -> Self {
        info!("Client core starting on {}x{} screen", screen.width, screen.height);
        Self {
            clients: ClientRegistry::new(config.manage.popup_types(), config.hints.honor_size_hints),
            stack: StackingManager::new(),
            focus: FocusManager::new(config.focus.policy, config.focus.successor, config.focus.history_size),
            signals: SignalBus::new(),
            sink,
            screen,
            raise_on_focus: config.focus.raise_on_focus,
        }
    }

    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    pub fn client(&self, window: u32) -> Option<&Client> {
        self.clients.lookup(window)
    }

    pub fn stack(&self) -> &StackingManager {
        &self.stack
    }

    pub fn focus_manager(&self) -> &FocusManager {
        &self.focus
    }

    pub fn focused(&self) -> Option<u32> {
        self.focus.get_focused_window()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn screen(&self) -> Geometry {
        self.screen
    }

    pub fn set_screen(&mut self, screen: Geometry) {
        self.screen = screen;
    }

    /// Receive every signal emitted from now on.
    pub fn subscribe(&mut self) -> UnboundedReceiver<ClientSignal> {
        self.signals.subscribe()
    }

    /// Log and swallow an operation on a window we do not manage.
    fn stale(&self, window: u32, operation: &str) {
        debug!("{}: {}", operation, ClientError::StaleReference(window));
    }

    /// Materialize the layered order and send it out.
    pub fn restack(&mut self) {
        let order = self.stack.materialize(&self.clients);
        self.without_crossings(|wm| log_failed(wm.sink.restack(&order), "restack"));
    }

    /// Run `f` with enter/leave events suppressed around it.
    pub(crate) fn without_crossings(&mut self, f: impl FnOnce(&mut Self)) {
        self.ignore_enterleave_events();
        f(self);
        self.restore_enterleave_events();
    }

    /// Managed windows we select crossing events on.
    fn crossing_windows(&self) -> Vec<u32> {
        self.stack
            .get_stacking_order()
            .iter()
            .copied()
            .filter(|&w| self.clients.lookup(w).is_some_and(|c| !c.override_redirect))
            .collect()
    }

    /// Start managing a window reported by the server.
    pub fn manage(&mut self, window: u32, geometry: Geometry, probe: &WindowProbe) -> ClientResult<()> {
        let client = match self.clients.register(window, geometry, probe) {
            Ok(client) => client,
            Err(e) => {
                match &e {
                    ClientError::AlreadyManaged(_) => warn!("manage: {}", e),
                    _ => debug!("manage: {}", e),
                }
                return Err(e);
            }
        };
        let hinted = client.geometry_hints(geometry);
        let flags = client.flags;

        self.stack.add_window(window);
        self.signals.emit(ClientSignal::Manage(window));

        if hinted != geometry {
            self.resize(window, hinted, false);
        }
        if !flags.is_empty() {
            log_failed(self.sink.update_state(window, flags), "update_state");
        }
        self.restack();
        Ok(())
    }

    /// Stop managing a window. Unknown windows are ignored.
    pub fn unmanage(&mut self, window: u32) {
        let Some((client, orphans)) = self.clients.unregister(window) else {
            self.stale(window, "unmanage");
            return;
        };
        self.stack.remove_window(window);
        let was_focused = self.focus.forget(window);

        for orphan in orphans {
            self.signals.property(orphan, ClientProperty::TransientFor);
        }
        if was_focused {
            self.signals.emit(ClientSignal::Unfocus(window));
        }
        self.signals.emit(ClientSignal::Unmanage(window));
        info!("Unmanaged window 0x{:x} ({:?})", window, client.display_name());

        self.restack();
        if was_focused {
            self.focus_successor(window);
        }
    }

    /// Raise a client and its transient owners to the top.
    pub fn raise(&mut self, window: u32) {
        if !self.clients.contains(window) {
            self.stale(window, "raise");
            return;
        }
        self.stack.raise(window, &self.clients);
        self.signals.emit(ClientSignal::Raised(window));
        self.restack();
    }

    /// Lower a client to the bottom of its layer.
    pub fn lower(&mut self, window: u32) {
        if !self.clients.contains(window) {
            self.stale(window, "lower");
            return;
        }
        self.stack.lower(window);
        self.signals.emit(ClientSignal::Lowered(window));
        self.restack();
    }

    /// Move/resize a client. With `hints` the rectangle goes through the
    /// client's size hints first. Returns true if the geometry changed.
    pub fn resize(&mut self, window: u32, geometry: Geometry, hints: bool) -> bool {
        let Some(client) = self.clients.lookup_mut(window) else {
            self.stale(window, "resize");
            return false;
        };

        let mut target = if hints { client.geometry_hints(geometry) } else { geometry };
        if target.is_degenerate() {
            warn!(
                "{}",
                ClientError::GeometryRejected { window, width: target.width, height: target.height }
            );
            target = target.with_size(target.width.max(1), target.height.max(1));
        }
        if client.geometry == target {
            return false;
        }

        debug!("Resizing window 0x{:x} to {:?}", window, target);
        client.geometry = target;
        log_failed(self.sink.configure(window, target), "configure");
        self.signals.property(window, ClientProperty::Geometry);
        true
    }

    /// Give input focus to a client.
    pub fn focus(&mut self, window: u32) {
        let Some(client) = self.clients.lookup(window) else {
            self.stale(window, "focus");
            return;
        };
        if !client.maybe_visible() {
            debug!("Not focusing invisible window 0x{:x}", window);
            return;
        }

        let mode = match (client.accepts_input(), client.has_protocol(WmProtocols::TAKE_FOCUS)) {
            (true, false) => FocusMode::Passive,
            (true, true) => FocusMode::LocallyActive,
            (false, true) => FocusMode::GloballyActive,
            (false, false) => {
                debug!("Window 0x{:x} takes no input, not focusing", window);
                return;
            }
        };
        if self.focus.get_focused_window() == Some(window) {
            return;
        }

        if let Some(previous) = self.focus.set_focused(window) {
            self.signals.emit(ClientSignal::Unfocus(previous));
        }
        log_failed(self.sink.set_input_focus(Some(window), mode), "set_input_focus");
        self.signals.emit(ClientSignal::Focus(window));

        self.set_urgent(window, false);
        if self.raise_on_focus {
            self.raise(window);
        }
    }

    /// The server reports that `window` lost focus.
    ///
    /// The focus record is cleared before a successor is chosen.
    pub fn unfocus_update(&mut self, window: u32) {
        if !self.focus.clear(window) {
            debug!("unfocus_update: 0x{:x} was not focused", window);
            return;
        }
        self.signals.emit(ClientSignal::Unfocus(window));
        self.focus_successor(window);
    }

    fn focus_successor(&mut self, lost: u32) {
        let clients = &self.clients;
        let successor = self
            .focus
            .successor(|w| w != lost && clients.lookup(w).is_some_and(Client::maybe_visible));

        match successor {
            Some(next) => self.focus(next),
            None => log_failed(self.sink.set_input_focus(None, FocusMode::Passive), "set_input_focus"),
        }
    }

    /// Pointer entered a window.
    pub fn handle_enter(&mut self, window: u32) {
        if self.focus.filter_crossing() == FilterStatus::Remove {
            debug!("Ignoring enter on 0x{:x} while suppressed", window);
            return;
        }
        if self.focus.focus_policy.follows_mouse() && self.clients.contains(window) {
            self.focus(window);
        }
    }

    /// Stop reacting to pointer crossings. Nests; the outermost call also
    /// deselects crossing events on the server.
    pub fn ignore_enterleave_events(&mut self) {
        if self.focus.ignore_enterleave_events() {
            let windows = self.crossing_windows();
            log_failed(self.sink.set_crossing_events(&windows, false), "ignore_enterleave_events");
        }
    }

    pub fn restore_enterleave_events(&mut self) {
        if self.focus.restore_enterleave_events() {
            let windows = self.crossing_windows();
            log_failed(self.sink.set_crossing_events(&windows, true), "restore_enterleave_events");
        }
    }

    /// Close a client: politely if it speaks WM_DELETE_WINDOW, forcibly otherwise.
    pub fn kill(&mut self, window: u32) {
        let Some(client) = self.clients.lookup(window) else {
            self.stale(window, "kill");
            return;
        };
        if client.has_protocol(WmProtocols::DELETE) {
            info!("Closing window 0x{:x}", window);
            log_failed(self.sink.close(window), "close");
        } else {
            info!("Killing window 0x{:x}", window);
            log_failed(self.sink.kill(window), "kill");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::client_flags::ClientFlags;
    use crate::wm::focus::{FocusPolicy, SuccessorPolicy};
    use crate::wm::hints::{SizeHintFlags, SizeHints};
    use crate::wm::protocol::{RecordingSink, Request};

    fn wm() -> WindowManager<RecordingSink> {
        WindowManager::new(RecordingSink::new(), Geometry::new(0, 0, 1920, 1080), &Config::default())
    }

    fn manage(wm: &mut WindowManager<RecordingSink>, window: u32) {
        wm.manage(window, Geometry::new(0, 0, 100, 100), &WindowProbe::default()).unwrap();
    }

    #[test]
    fn test_manage_appends_to_top() {
        let mut wm = wm();
        manage(&mut wm, 1);
        manage(&mut wm, 2);
        assert_eq!(wm.stack().get_stacking_order(), &[1, 2]);
        assert_eq!(wm.sink().last_restack(), Some(&[1, 2][..]));
    }

    #[test]
    fn test_duplicate_manage_keeps_existing_client() {
        let mut wm = wm();
        manage(&mut wm, 1);
        wm.resize(1, Geometry::new(5, 5, 50, 50), false);
        let again = wm.manage(1, Geometry::new(0, 0, 10, 10), &WindowProbe::default());
        assert_eq!(again, Err(ClientError::AlreadyManaged(1)));
        assert_eq!(wm.client(1).unwrap().geometry, Geometry::new(5, 5, 50, 50));
        assert_eq!(wm.stack().len(), 1);
    }

    #[test]
    fn test_manage_applies_hints() {
        let mut wm = wm();
        let probe = WindowProbe {
            size_hints: Some(SizeHints {
                flags: SizeHintFlags::P_MIN_SIZE,
                min_width: 300,
                min_height: 200,
                ..Default::default()
            }),
            ..Default::default()
        };
        wm.manage(1, Geometry::new(0, 0, 100, 100), &probe).unwrap();
        assert_eq!(wm.client(1).unwrap().geometry, Geometry::new(0, 0, 300, 200));
        assert_eq!(wm.sink().last_configure(1), Some(Geometry::new(0, 0, 300, 200)));
    }

    #[test]
    fn test_unmanage_removes_everywhere() {
        let mut wm = wm();
        manage(&mut wm, 1);
        manage(&mut wm, 2);
        wm.focus(2);
        wm.unmanage(2);
        wm.unmanage(2);
        assert!(wm.client(2).is_none());
        assert_eq!(wm.stack().get_stacking_order(), &[1]);
        assert_ne!(wm.focused(), Some(2));
    }

    #[test]
    fn test_unmanaged_focus_falls_back_to_history() {
        let mut wm = wm();
        manage(&mut wm, 1);
        manage(&mut wm, 2);
        wm.focus(1);
        wm.focus(2);
        wm.unmanage(2);
        assert_eq!(wm.focused(), Some(1));
    }

    #[test]
    fn test_stale_operations_are_noops() {
        let mut wm = wm();
        wm.raise(9);
        wm.lower(9);
        wm.focus(9);
        wm.kill(9);
        assert!(!wm.resize(9, Geometry::new(0, 0, 1, 1), true));
        assert!(wm.sink().requests.is_empty());
    }

    #[test]
    fn test_resize_clamps_degenerate() {
        let mut wm = wm();
        manage(&mut wm, 1);
        assert!(wm.resize(1, Geometry::new(0, 0, 0, 40), false));
        assert_eq!(wm.client(1).unwrap().geometry, Geometry::new(0, 0, 1, 40));
    }

    #[test]
    fn test_resize_unchanged_sends_nothing() {
        let mut wm = wm();
        manage(&mut wm, 1);
        wm.sink_mut().take();
        assert!(!wm.resize(1, Geometry::new(0, 0, 100, 100), true));
        assert!(wm.sink().requests.is_empty());
    }

    #[test]
    fn test_focus_clears_urgent_and_raises() {
        let mut wm = wm();
        manage(&mut wm, 1);
        manage(&mut wm, 2);
        wm.set_urgent(1, true);
        wm.focus(1);
        assert_eq!(wm.focused(), Some(1));
        assert!(!wm.client(1).unwrap().flags.contains(ClientFlags::URGENT));
        assert_eq!(wm.stack().get_stacking_order(), &[2, 1]);
    }

    #[test]
    fn test_focus_modes() {
        let mut wm = wm();
        let probe = WindowProbe {
            protocols: WmProtocols::TAKE_FOCUS,
            ..Default::default()
        };
        wm.manage(1, Geometry::new(0, 0, 10, 10), &probe).unwrap();
        wm.focus(1);
        assert!(wm.sink().requests.contains(&Request::Focus {
            window: Some(1),
            mode: FocusMode::LocallyActive
        }));
    }

    #[test]
    fn test_hidden_client_is_not_focused() {
        let mut wm = wm();
        manage(&mut wm, 1);
        wm.set_minimized(1, true);
        wm.focus(1);
        assert_eq!(wm.focused(), None);
    }

    #[test]
    fn test_unfocus_update_clears_then_picks_successor() {
        let mut wm = wm();
        manage(&mut wm, 1);
        manage(&mut wm, 2);
        wm.focus(1);
        wm.focus(2);
        let mut rx = wm.subscribe();
        wm.unfocus_update(2);
        assert_eq!(rx.try_recv().unwrap(), ClientSignal::Unfocus(2));
        assert_eq!(wm.focused(), Some(1));
    }

    #[test]
    fn test_unfocus_update_without_successor_policy() {
        let mut config = Config::default();
        config.focus.successor = SuccessorPolicy::None;
        let mut wm = WindowManager::new(RecordingSink::new(), Geometry::new(0, 0, 800, 600), &config);
        manage(&mut wm, 1);
        manage(&mut wm, 2);
        wm.focus(1);
        wm.focus(2);
        wm.unfocus_update(2);
        assert_eq!(wm.focused(), None);
        assert_eq!(
            wm.sink().requests.last(),
            Some(&Request::Focus { window: None, mode: FocusMode::Passive })
        );
    }

    #[test]
    fn test_enter_respects_suppression() {
        let mut config = Config::default();
        config.focus.policy = FocusPolicy::FocusFollowsMouse;
        let mut wm = WindowManager::new(RecordingSink::new(), Geometry::new(0, 0, 800, 600), &config);
        manage(&mut wm, 1);
        manage(&mut wm, 2);

        wm.ignore_enterleave_events();
        wm.handle_enter(1);
        assert_eq!(wm.focused(), None);
        wm.restore_enterleave_events();

        wm.handle_enter(1);
        assert_eq!(wm.focused(), Some(1));
        assert!(!wm.focus_manager().enterleave_suppressed());
    }

    #[test]
    fn test_raise_deselects_crossings_around_restack() {
        let mut config = Config::default();
        config.focus.policy = FocusPolicy::FocusFollowsMouse;
        let mut wm = WindowManager::new(RecordingSink::new(), Geometry::new(0, 0, 800, 600), &config);
        manage(&mut wm, 1);
        manage(&mut wm, 2);
        wm.focus(1);
        wm.sink_mut().take();

        wm.raise(2);
        assert_eq!(
            wm.sink().requests,
            vec![
                Request::CrossingEvents { windows: vec![1, 2], enabled: false },
                Request::Restack(vec![1, 2]),
                Request::CrossingEvents { windows: vec![1, 2], enabled: true },
            ]
        );
        assert_eq!(wm.focused(), Some(1));
    }

    #[test]
    fn test_nested_suppression_keeps_crossings_off_until_outermost_restore() {
        let mut wm = wm();
        manage(&mut wm, 1);
        manage(&mut wm, 2);
        wm.sink_mut().take();

        wm.ignore_enterleave_events();
        wm.raise(1);
        let crossings = |wm: &WindowManager<RecordingSink>| {
            wm.sink()
                .requests
                .iter()
                .filter(|r| matches!(r, Request::CrossingEvents { .. }))
                .cloned()
                .collect::<Vec<_>>()
        };
        assert_eq!(crossings(&wm), vec![Request::CrossingEvents { windows: vec![1, 2], enabled: false }]);

        wm.restore_enterleave_events();
        assert_eq!(
            crossings(&wm).last(),
            Some(&Request::CrossingEvents { windows: vec![2, 1], enabled: true })
        );
        assert!(!wm.focus_manager().enterleave_suppressed());
    }

    #[test]
    fn test_popups_keep_their_event_mask() {
        let mut wm = wm();
        manage(&mut wm, 1);
        let popup = WindowProbe {
            override_redirect: true,
            window_type: crate::wm::client_flags::WindowType::PopupMenu,
            ..Default::default()
        };
        wm.manage(2, Geometry::new(0, 0, 10, 10), &popup).unwrap();
        wm.sink_mut().take();
        wm.raise(1);
        assert!(wm.sink().requests.iter().all(|r| match r {
            Request::CrossingEvents { windows, .. } => windows == &vec![1],
            _ => true,
        }));
    }

    #[test]
    fn test_kill_uses_delete_protocol_when_advertised() {
        let mut wm = wm();
        let polite = WindowProbe {
            protocols: WmProtocols::DELETE,
            ..Default::default()
        };
        wm.manage(1, Geometry::new(0, 0, 10, 10), &polite).unwrap();
        manage(&mut wm, 2);
        wm.kill(1);
        wm.kill(2);
        let requests = wm.sink().requests.clone();
        assert!(requests.contains(&Request::Close(1)));
        assert!(requests.contains(&Request::Kill(2)));
        assert!(!requests.contains(&Request::Kill(1)));
    }

    #[test]
    fn test_signals_for_lifecycle() {
        let mut wm = wm();
        let mut rx = wm.subscribe();
        manage(&mut wm, 1);
        wm.unmanage(1);
        let names: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).map(|s| s.name()).collect();
        assert_eq!(names, vec!["manage", "unmanage"]);
    }
}
