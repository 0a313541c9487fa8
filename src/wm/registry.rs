//! Client Registry
//!
//! Sole owner of every managed `Client`, keyed by window. Everything else
//! (stacking, focus, transient links) refers to clients by window handle and
//! must go through `lookup` again after any registry mutation.

use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::{ClientError, ClientResult};
use crate::shared::Geometry;
use crate::wm::client::Client;
use crate::wm::client_flags::{ClientFlags, WindowType, WmProtocols};
use crate::wm::hints::{SizeHints, WmHints};
use crate::wm::icons::IconData;

/// Attributes read from the server before a Client is constructed.
#[derive(Debug, Clone, Default)]
pub struct WindowProbe {
    pub override_redirect: bool,
    pub window_type: WindowType,
    pub transient_for: Option<u32>,
    pub name: Option<String>,
    pub alt_name: Option<String>,
    pub icon_name: Option<String>,
    pub alt_icon_name: Option<String>,
    pub class: Option<String>,
    pub instance: Option<String>,
    pub role: Option<String>,
    pub machine: Option<String>,
    pub pid: Option<u32>,
    pub size_hints: Option<SizeHints>,
    pub wm_hints: Option<WmHints>,
    pub protocols: WmProtocols,
    pub leader_window: Option<u32>,
    pub icon: Option<IconData>,
    /// Initial _NET_WM_STATE
    pub state: ClientFlags,
}

/// Client registry
pub struct ClientRegistry {
    clients: HashMap<u32, Client>,
    /// Override-redirect windows of these types are still managed.
    popup_types: Vec<WindowType>,
    honor_size_hints: bool,
}

impl ClientRegistry {
    pub fn new(popup_types: Vec<WindowType>, honor_size_hints: bool) -> Self {
        Self {
            clients: HashMap::new(),
            popup_types,
            honor_size_hints,
        }
    }

    /// Eligibility probe.
    pub fn is_manageable(&self, probe: &WindowProbe) -> bool {
        !probe.override_redirect || self.popup_types.contains(&probe.window_type)
    }

    /// Build and store a Client for `window`.
    pub fn register(
        &mut self,
        window: u32,
        geometry: Geometry,
        probe: &WindowProbe,
    ) -> ClientResult<&mut Client> {
        if self.clients.contains_key(&window) {
            return Err(ClientError::AlreadyManaged(window));
        }
        if !self.is_manageable(probe) {
            return Err(ClientError::Unmanageable {
                window,
                reason: "override-redirect window is not a recognized popup",
            });
        }

        let mut client = Client::new(window, geometry);
        client.window_type = probe.window_type;
        client.transient_for = probe.transient_for.filter(|&owner| owner != window);
        client.name = probe.name.clone();
        client.alt_name = probe.alt_name.clone();
        client.icon_name = probe.icon_name.clone();
        client.alt_icon_name = probe.alt_icon_name.clone();
        client.class = probe.class.clone();
        client.instance = probe.instance.clone();
        client.role = probe.role.clone();
        client.machine = probe.machine.clone();
        client.pid = probe.pid;
        client.size_hints = probe.size_hints.clone().unwrap_or_default();
        client.size_hints_honor = self.honor_size_hints;
        client.protocols = probe.protocols;
        client.leader_window = probe.leader_window;
        client.icon = probe.icon.clone();
        client.override_redirect = probe.override_redirect;
        client.flags = probe.state;
        if let Some(hints) = &probe.wm_hints {
            client.group_window = hints.window_group;
            client.flags.set(ClientFlags::URGENT, hints.is_urgent());
        }
        client.wm_hints = probe.wm_hints.clone();

        info!(
            "Registered window 0x{:x} ({:?}, type {})",
            window,
            client.display_name(),
            client.window_type.as_str()
        );
        Ok(self.clients.entry(window).or_insert(client))
    }

    pub fn lookup(&self, window: u32) -> Option<&Client> {
        self.clients.get(&window)
    }

    pub fn lookup_mut(&mut self, window: u32) -> Option<&mut Client> {
        self.clients.get_mut(&window)
    }

    pub fn contains(&self, window: u32) -> bool {
        self.clients.contains_key(&window)
    }

    /// Remove a client. Idempotent.
    ///
    /// Clients that were transient for the removed one become top-level;
    /// their windows are returned alongside the removed client.
    pub fn unregister(&mut self, window: u32) -> Option<(Client, Vec<u32>)> {
        let client = self.clients.remove(&window)?;

        let mut orphans = Vec::new();
        for other in self.clients.values_mut() {
            if other.transient_for == Some(window) {
                other.transient_for = None;
                orphans.push(other.window);
            }
        }
        orphans.sort_unstable();

        debug!("Unregistered window 0x{:x} ({} orphaned transients)", window, orphans.len());
        Some((client, orphans))
    }

    /// Would pointing `window` at `owner` close a transient cycle?
    pub fn would_cycle(&self, window: u32, owner: u32) -> bool {
        let mut current = Some(owner);
        for _ in 0..=self.clients.len() {
            match current {
                Some(w) if w == window => return true,
                Some(w) => current = self.lookup(w).and_then(|c| c.transient_for),
                None => return false,
            }
        }
        // Already cyclic further up; refuse to extend it.
        true
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Client> {
        self.clients.values()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new(Vec::new(), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geom() -> Geometry {
        Geometry::new(0, 0, 100, 100)
    }

    #[test]
    fn test_register_is_unique() {
        let mut registry = ClientRegistry::default();
        registry.register(1, geom(), &WindowProbe::default()).unwrap();
        let err = registry.register(1, geom(), &WindowProbe::default()).unwrap_err();
        assert_eq!(err, ClientError::AlreadyManaged(1));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let mut registry = ClientRegistry::default();
        registry.register(1, geom(), &WindowProbe::default()).unwrap();
        assert!(registry.unregister(1).is_some());
        assert!(registry.unregister(1).is_none());
        assert!(registry.lookup(1).is_none());
        registry.register(1, geom(), &WindowProbe::default()).unwrap();
        assert!(registry.contains(1));
    }

    #[test]
    fn test_override_redirect_needs_popup_type() {
        let mut registry = ClientRegistry::new(vec![WindowType::PopupMenu], true);
        let probe = WindowProbe {
            override_redirect: true,
            ..Default::default()
        };
        assert!(matches!(
            registry.register(1, geom(), &probe),
            Err(ClientError::Unmanageable { window: 1, .. })
        ));
        let popup = WindowProbe {
            window_type: WindowType::PopupMenu,
            ..probe
        };
        assert!(registry.register(1, geom(), &popup).is_ok());
    }

    #[test]
    fn test_unregister_orphans_transients() {
        let mut registry = ClientRegistry::default();
        registry.register(1, geom(), &WindowProbe::default()).unwrap();
        let dialog = WindowProbe {
            transient_for: Some(1),
            ..Default::default()
        };
        registry.register(2, geom(), &dialog).unwrap();
        registry.register(3, geom(), &dialog).unwrap();

        let (_, orphans) = registry.unregister(1).unwrap();
        assert_eq!(orphans, vec![2, 3]);
        assert_eq!(registry.lookup(2).unwrap().transient_for, None);
    }

    #[test]
    fn test_probe_seeds_client() {
        let mut registry = ClientRegistry::new(Vec::new(), false);
        let probe = WindowProbe {
            transient_for: Some(7),
            name: Some("editor".into()),
            wm_hints: WmHints::from_raw(&[(1 << 8) | (1 << 6), 1, 1, 0, 0, 0, 0, 0, 42]),
            ..Default::default()
        };
        let client = registry.register(7, geom(), &probe).unwrap();
        assert_eq!(client.transient_for, None);
        assert_eq!(client.display_name(), "editor");
        assert_eq!(client.group_window, Some(42));
        assert!(client.flags.contains(ClientFlags::URGENT));
        assert!(!client.size_hints_honor);
    }

    #[test]
    fn test_would_cycle() {
        let mut registry = ClientRegistry::default();
        registry.register(1, geom(), &WindowProbe::default()).unwrap();
        let child = WindowProbe {
            transient_for: Some(1),
            ..Default::default()
        };
        registry.register(2, geom(), &child).unwrap();
        assert!(registry.would_cycle(1, 2));
        assert!(registry.would_cycle(1, 1));
        assert!(!registry.would_cycle(2, 1));
    }
}
