//! Client state machine
//!
//! Per-client setters. Each one returns early when the value is unchanged,
//! mutates the client, applies whatever is coupled to the change (geometry
//! snapshots, restacking, visibility) and emits `property::<name>`.

use tracing::{debug, warn};

use crate::shared::Geometry;
use crate::wm::WindowManager;
use crate::wm::client::{Client, SavedGeometry};
use crate::wm::client_flags::{ClientFlags, WindowType, WmProtocols};
use crate::wm::hints::{SizeHints, WmHints};
use crate::wm::icons::IconData;
use crate::wm::protocol::{ProtocolSink, log_failed};
use crate::wm::signals::ClientProperty;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MaximizeAxis {
    Horizontal,
    Vertical,
}

impl MaximizeAxis {
    fn flag(self) -> ClientFlags {
        match self {
            Self::Horizontal => ClientFlags::MAXIMIZED_HORIZ,
            Self::Vertical => ClientFlags::MAXIMIZED_VERT,
        }
    }

    fn property(self) -> ClientProperty {
        match self {
            Self::Horizontal => ClientProperty::MaximizedHorizontal,
            Self::Vertical => ClientProperty::MaximizedVertical,
        }
    }

    /// (position, size) along this axis
    fn span(self, geometry: &Geometry) -> (i32, u32) {
        match self {
            Self::Horizontal => (geometry.x, geometry.width),
            Self::Vertical => (geometry.y, geometry.height),
        }
    }

    fn with_span(self, geometry: Geometry, (pos, size): (i32, u32)) -> Geometry {
        match self {
            Self::Horizontal => Geometry { x: pos, width: size, ..geometry },
            Self::Vertical => Geometry { y: pos, height: size, ..geometry },
        }
    }

    fn saved(self, saved: &mut SavedGeometry) -> &mut Option<(i32, u32)> {
        match self {
            Self::Horizontal => &mut saved.horizontal,
            Self::Vertical => &mut saved.vertical,
        }
    }

    /// Toggle this axis on `geometry`, snapshotting or restoring the span.
    fn toggle(self, saved: &mut SavedGeometry, geometry: Geometry, screen: &Geometry, on: bool) -> Geometry {
        if on {
            *self.saved(saved) = Some(self.span(&geometry));
            self.with_span(geometry, self.span(screen))
        } else {
            match self.saved(saved).take() {
                Some(span) => self.with_span(geometry, span),
                None => geometry,
            }
        }
    }
}

impl<S: ProtocolSink> WindowManager<S> {
    /// Replace one field, emitting the property signal on change.
    fn update_field<T: PartialEq>(
        &mut self,
        window: u32,
        property: ClientProperty,
        value: T,
        field: impl FnOnce(&mut Client) -> &mut T,
    ) -> bool {
        let Some(client) = self.clients.lookup_mut(window) else {
            self.stale(window, property.signal_name());
            return false;
        };
        let slot = field(client);
        if *slot == value {
            return false;
        }
        *slot = value;
        self.signals.property(window, property);
        true
    }

    /// Toggle a plain state flag and publish the new state.
    fn update_flag(&mut self, window: u32, flag: ClientFlags, property: ClientProperty, value: bool) -> bool {
        let Some(client) = self.clients.lookup_mut(window) else {
            self.stale(window, property.signal_name());
            return false;
        };
        if !client.set_flag(flag, value) {
            return false;
        }
        let flags = client.flags;
        log_failed(self.sink.update_state(window, flags), "update_state");
        self.signals.property(window, property);
        true
    }

    fn is_set(&self, window: u32, flag: ClientFlags) -> bool {
        self.clients.lookup(window).is_some_and(|c| c.flags.contains(flag))
    }

    pub fn set_urgent(&mut self, window: u32, urgent: bool) {
        self.update_flag(window, ClientFlags::URGENT, ClientProperty::Urgent, urgent);
    }

    pub fn set_modal(&mut self, window: u32, modal: bool) {
        self.update_flag(window, ClientFlags::MODAL, ClientProperty::Modal, modal);
    }

    pub fn set_skip_taskbar(&mut self, window: u32, skip: bool) {
        self.update_flag(window, ClientFlags::SKIP_TASKBAR, ClientProperty::SkipTaskbar, skip);
    }

    pub fn set_hidden(&mut self, window: u32, hidden: bool) {
        if self.update_flag(window, ClientFlags::HIDDEN, ClientProperty::Hidden, hidden) {
            self.visibility_changed(window);
        }
    }

    pub fn set_minimized(&mut self, window: u32, minimized: bool) {
        if self.update_flag(window, ClientFlags::MINIMIZED, ClientProperty::Minimized, minimized) {
            self.visibility_changed(window);
        }
    }

    fn visibility_changed(&mut self, window: u32) {
        let Some(visible) = self.clients.lookup(window).map(Client::maybe_visible) else {
            return;
        };
        self.without_crossings(|wm| log_failed(wm.sink.set_visible(window, visible), "set_visible"));
        if !visible && self.focus.get_focused_window() == Some(window) {
            self.unfocus_update(window);
        }
    }

    /// `above` and `below` exclude each other.
    pub fn set_above(&mut self, window: u32, above: bool) {
        let above_flag = (ClientFlags::ABOVE, ClientProperty::Above);
        let below_flag = (ClientFlags::BELOW, ClientProperty::Below);
        self.set_exclusive_layer(window, above_flag, below_flag, above);
    }

    pub fn set_below(&mut self, window: u32, below: bool) {
        let below_flag = (ClientFlags::BELOW, ClientProperty::Below);
        let above_flag = (ClientFlags::ABOVE, ClientProperty::Above);
        self.set_exclusive_layer(window, below_flag, above_flag, below);
    }

    /// Setting `flag` clears `opposite`; one restack covers both.
    fn set_exclusive_layer(
        &mut self,
        window: u32,
        (flag, property): (ClientFlags, ClientProperty),
        (opposite, opposite_property): (ClientFlags, ClientProperty),
        value: bool,
    ) {
        let cleared = value && self.update_flag(window, opposite, opposite_property, false);
        let changed = self.update_flag(window, flag, property, value);
        if cleared || changed {
            self.restack();
        }
    }

    pub fn set_ontop(&mut self, window: u32, ontop: bool) {
        if self.update_flag(window, ClientFlags::ONTOP, ClientProperty::Ontop, ontop) {
            self.restack();
        }
    }

    /// Fullscreen covers the screen and remembers the geometry it replaced.
    /// Maximize flags are left alone.
    pub fn set_fullscreen(&mut self, window: u32, fullscreen: bool) {
        let screen = self.screen;
        let Some(client) = self.clients.lookup_mut(window) else {
            self.stale(window, "set_fullscreen");
            return;
        };
        if client.flags.contains(ClientFlags::FULLSCREEN) == fullscreen {
            return;
        }

        let target = if fullscreen {
            client.saved.fullscreen = Some(client.geometry);
            screen
        } else {
            client.saved.fullscreen.take().unwrap_or(client.geometry)
        };
        client.set_flag(ClientFlags::FULLSCREEN, fullscreen);
        let flags = client.flags;
        debug!("Window 0x{:x} fullscreen={}", window, fullscreen);

        self.resize(window, target, false);
        log_failed(self.sink.update_state(window, flags), "update_state");
        self.signals.property(window, ClientProperty::Fullscreen);
        self.restack();
    }

    pub fn set_maximized_horizontal(&mut self, window: u32, maximized: bool) {
        self.set_maximized(window, MaximizeAxis::Horizontal, maximized);
    }

    pub fn set_maximized_vertical(&mut self, window: u32, maximized: bool) {
        self.set_maximized(window, MaximizeAxis::Vertical, maximized);
    }

    /// While fullscreen, the snapshot and the maximized span are applied to
    /// the stored pre-fullscreen rectangle instead of the live geometry.
    /// Unlike fullscreen, the maximized rectangle honors size hints.
    fn set_maximized(&mut self, window: u32, axis: MaximizeAxis, maximized: bool) {
        let screen = self.screen;
        let Some(client) = self.clients.lookup_mut(window) else {
            self.stale(window, axis.property().signal_name());
            return;
        };
        if !client.set_flag(axis.flag(), maximized) {
            return;
        }
        let flags = client.flags;

        let target = match client.saved.fullscreen {
            Some(restore) => {
                let restore = axis.toggle(&mut client.saved, restore, &screen, maximized);
                client.saved.fullscreen = Some(restore);
                None
            }
            None => Some(axis.toggle(&mut client.saved, client.geometry, &screen, maximized)),
        };

        if let Some(target) = target {
            self.resize(window, target, true);
        }
        log_failed(self.sink.update_state(window, flags), "update_state");
        self.signals.property(window, axis.property());
    }

    /// Route a single state flag to its setter.
    pub fn set_state_flag(&mut self, window: u32, flag: ClientFlags, value: bool) {
        let setters: [(ClientFlags, fn(&mut Self, u32, bool)); 11] = [
            (ClientFlags::URGENT, Self::set_urgent),
            (ClientFlags::HIDDEN, Self::set_hidden),
            (ClientFlags::MINIMIZED, Self::set_minimized),
            (ClientFlags::FULLSCREEN, Self::set_fullscreen),
            (ClientFlags::MAXIMIZED_HORIZ, Self::set_maximized_horizontal),
            (ClientFlags::MAXIMIZED_VERT, Self::set_maximized_vertical),
            (ClientFlags::ABOVE, Self::set_above),
            (ClientFlags::BELOW, Self::set_below),
            (ClientFlags::MODAL, Self::set_modal),
            (ClientFlags::ONTOP, Self::set_ontop),
            (ClientFlags::SKIP_TASKBAR, Self::set_skip_taskbar),
        ];
        match setters.iter().find(|(f, _)| *f == flag) {
            Some((_, setter)) => setter(self, window, value),
            None => warn!("set_state_flag: {:?} is not a single state flag", flag),
        }
    }

    /// Reclassify. Stacking picks the new type up on the next restack.
    pub fn set_type(&mut self, window: u32, window_type: WindowType) {
        self.update_field(window, ClientProperty::Type, window_type, |c| &mut c.window_type);
    }

    /// Point a client at its owner. Self references and links that would
    /// close a cycle are refused.
    pub fn set_transient_for(&mut self, window: u32, owner: Option<u32>) {
        if let Some(owner) = owner {
            if self.clients.would_cycle(window, owner) {
                warn!("Refusing transient link 0x{:x} -> 0x{:x}: cycle", window, owner);
                return;
            }
        }
        self.update_field(window, ClientProperty::TransientFor, owner, |c| &mut c.transient_for);
    }

    pub fn set_name(&mut self, window: u32, name: Option<String>) {
        self.update_field(window, ClientProperty::Name, name, |c| &mut c.name);
    }

    pub fn set_alt_name(&mut self, window: u32, name: Option<String>) {
        self.update_field(window, ClientProperty::AltName, name, |c| &mut c.alt_name);
    }

    pub fn set_icon_name(&mut self, window: u32, name: Option<String>) {
        self.update_field(window, ClientProperty::IconName, name, |c| &mut c.icon_name);
    }

    pub fn set_alt_icon_name(&mut self, window: u32, name: Option<String>) {
        self.update_field(window, ClientProperty::AltIconName, name, |c| &mut c.alt_icon_name);
    }

    pub fn set_class_instance(&mut self, window: u32, class: Option<String>, instance: Option<String>) {
        self.update_field(window, ClientProperty::Class, class, |c| &mut c.class);
        self.update_field(window, ClientProperty::Instance, instance, |c| &mut c.instance);
    }

    pub fn set_role(&mut self, window: u32, role: Option<String>) {
        self.update_field(window, ClientProperty::Role, role, |c| &mut c.role);
    }

    pub fn set_machine(&mut self, window: u32, machine: Option<String>) {
        self.update_field(window, ClientProperty::Machine, machine, |c| &mut c.machine);
    }

    pub fn set_pid(&mut self, window: u32, pid: Option<u32>) {
        self.update_field(window, ClientProperty::Pid, pid, |c| &mut c.pid);
    }

    pub fn set_group_window(&mut self, window: u32, group: Option<u32>) {
        self.update_field(window, ClientProperty::GroupWindow, group, |c| &mut c.group_window);
    }

    pub fn set_leader_window(&mut self, window: u32, leader: Option<u32>) {
        self.update_field(window, ClientProperty::LeaderWindow, leader, |c| &mut c.leader_window);
    }

    pub fn set_icon(&mut self, window: u32, icon: Option<IconData>) {
        self.update_field(window, ClientProperty::Icon, icon, |c| &mut c.icon);
    }

    pub fn set_protocols(&mut self, window: u32, protocols: WmProtocols) {
        self.update_field(window, ClientProperty::Protocols, protocols, |c| &mut c.protocols);
    }

    /// New size hints are applied to the current geometry right away.
    pub fn set_size_hints(&mut self, window: u32, hints: SizeHints) {
        if self.update_field(window, ClientProperty::SizeHints, hints, |c| &mut c.size_hints) {
            self.revalidate_geometry(window);
        }
    }

    pub fn set_size_hints_honor(&mut self, window: u32, honor: bool) {
        if self.update_field(window, ClientProperty::SizeHintsHonor, honor, |c| &mut c.size_hints_honor) {
            self.revalidate_geometry(window);
        }
    }

    fn revalidate_geometry(&mut self, window: u32) {
        let Some(client) = self.clients.lookup(window) else {
            return;
        };
        // Fullscreen and maximized geometry come from the screen, not the client.
        if client.flags.intersects(ClientFlags::FULLSCREEN | ClientFlags::maximized()) {
            return;
        }
        let geometry = client.geometry;
        self.resize(window, geometry, true);
    }

    /// WM_HINTS carries urgency and the group leader.
    pub fn set_wm_hints(&mut self, window: u32, hints: Option<WmHints>) {
        let urgent = hints.as_ref().is_some_and(WmHints::is_urgent);
        let group = hints.as_ref().and_then(|h| h.window_group);
        let Some(client) = self.clients.lookup_mut(window) else {
            self.stale(window, "set_wm_hints");
            return;
        };
        client.wm_hints = hints;
        self.set_urgent(window, urgent);
        self.set_group_window(window, group);
    }
}
