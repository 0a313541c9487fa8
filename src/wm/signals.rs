//! Signals Module
//!
//! Named notifications for the scripting collaborator. Every client state
//! change is announced as `property::<name>`; lifecycle and focus changes
//! get signals of their own.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace};

/// Client property that changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientProperty {
    Name,
    AltName,
    IconName,
    AltIconName,
    Class,
    Instance,
    Role,
    Machine,
    Pid,
    Geometry,
    SizeHints,
    SizeHintsHonor,
    Urgent,
    Hidden,
    Minimized,
    Fullscreen,
    MaximizedHorizontal,
    MaximizedVertical,
    Above,
    Below,
    Modal,
    Ontop,
    SkipTaskbar,
    Type,
    TransientFor,
    GroupWindow,
    LeaderWindow,
    Icon,
    Protocols,
}

impl ClientProperty {
    pub fn signal_name(self) -> &'static str {
        match self {
            Self::Name => "property::name",
            Self::AltName => "property::alt_name",
            Self::IconName => "property::icon_name",
            Self::AltIconName => "property::alt_icon_name",
            Self::Class => "property::class",
            Self::Instance => "property::instance",
            Self::Role => "property::role",
            Self::Machine => "property::machine",
            Self::Pid => "property::pid",
            Self::Geometry => "property::geometry",
            Self::SizeHints => "property::size_hints",
            Self::SizeHintsHonor => "property::size_hints_honor",
            Self::Urgent => "property::urgent",
            Self::Hidden => "property::hidden",
            Self::Minimized => "property::minimized",
            Self::Fullscreen => "property::fullscreen",
            Self::MaximizedHorizontal => "property::maximized_horizontal",
            Self::MaximizedVertical => "property::maximized_vertical",
            Self::Above => "property::above",
            Self::Below => "property::below",
            Self::Modal => "property::modal",
            Self::Ontop => "property::ontop",
            Self::SkipTaskbar => "property::skip_taskbar",
            Self::Type => "property::type",
            Self::TransientFor => "property::transient_for",
            Self::GroupWindow => "property::group_window",
            Self::LeaderWindow => "property::leader_window",
            Self::Icon => "property::icon",
            Self::Protocols => "property::protocols",
        }
    }
}

/// Notification emitted by the client core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientSignal {
    Manage(u32),
    Unmanage(u32),
    Focus(u32),
    Unfocus(u32),
    Raised(u32),
    Lowered(u32),
    PropertyChanged { window: u32, property: ClientProperty },
}

impl ClientSignal {
    pub fn window(&self) -> u32 {
        match *self {
            Self::Manage(w)
            | Self::Unmanage(w)
            | Self::Focus(w)
            | Self::Unfocus(w)
            | Self::Raised(w)
            | Self::Lowered(w) => w,
            Self::PropertyChanged { window, .. } => window,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Manage(_) => "manage",
            Self::Unmanage(_) => "unmanage",
            Self::Focus(_) => "focus",
            Self::Unfocus(_) => "unfocus",
            Self::Raised(_) => "raised",
            Self::Lowered(_) => "lowered",
            Self::PropertyChanged { property, .. } => property.signal_name(),
        }
    }
}

/// Fan-out point for client signals. Emitting with nobody subscribed is a
/// no-op.
#[derive(Debug, Default)]
pub struct SignalBus {
    tx: Option<UnboundedSender<ClientSignal>>,
}

impl SignalBus {
    pub fn new() -> Self {
        Self { tx: None }
    }

    /// Start delivering signals to a new receiver, replacing any earlier one.
    pub fn subscribe(&mut self) -> UnboundedReceiver<ClientSignal> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.tx = Some(tx);
        rx
    }

    pub fn emit(&mut self, signal: ClientSignal) {
        trace!("signal {} on 0x{:x}", signal.name(), signal.window());
        if let Some(tx) = &self.tx {
            if tx.send(signal).is_err() {
                debug!("Signal receiver dropped, no longer emitting");
                self.tx = None;
            }
        }
    }

    pub fn property(&mut self, window: u32, property: ClientProperty) {
        self.emit(ClientSignal::PropertyChanged { window, property });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscriber() {
        let mut bus = SignalBus::new();
        bus.emit(ClientSignal::Manage(1));
    }

    #[test]
    fn test_subscriber_receives_in_order() {
        let mut bus = SignalBus::new();
        let mut rx = bus.subscribe();
        bus.emit(ClientSignal::Manage(1));
        bus.property(1, ClientProperty::Fullscreen);
        assert_eq!(rx.try_recv().unwrap(), ClientSignal::Manage(1));
        let signal = rx.try_recv().unwrap();
        assert_eq!(signal.name(), "property::fullscreen");
        assert_eq!(signal.window(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_receiver_detaches() {
        let mut bus = SignalBus::new();
        drop(bus.subscribe());
        bus.emit(ClientSignal::Focus(3));
        assert!(bus.tx.is_none());
    }
}
