//! EWMH (Extended Window Manager Hints) implementation
//!
//! Atom table plus the translations between atoms and the client model:
//! window types, _NET_WM_STATE entries and WM_PROTOCOLS.

use anyhow::Result;
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ClientMessageEvent, *};
use x11rb::wrapper::ConnectionExt as _;

use crate::wm::client_flags::{ClientFlags, WindowType, WmProtocols};

/// Holds all interned atoms
#[derive(Debug)]
pub struct Atoms {
    pub net_supported: Atom,
    pub net_supporting_wm_check: Atom,
    pub net_client_list: Atom,
    pub net_client_list_stacking: Atom,
    pub net_active_window: Atom,
    pub net_close_window: Atom,
    pub net_wm_name: Atom,
    pub net_wm_icon_name: Atom,
    pub net_wm_pid: Atom,
    pub net_wm_icon: Atom,
    pub net_wm_window_type: Atom,
    pub net_wm_window_type_desktop: Atom,
    pub net_wm_window_type_dock: Atom,
    pub net_wm_window_type_normal: Atom,
    pub net_wm_window_type_dialog: Atom,
    pub net_wm_window_type_utility: Atom,
    pub net_wm_window_type_toolbar: Atom,
    pub net_wm_window_type_splash: Atom,
    pub net_wm_window_type_menu: Atom,
    pub net_wm_window_type_dropdown_menu: Atom,
    pub net_wm_window_type_popup_menu: Atom,
    pub net_wm_window_type_tooltip: Atom,
    pub net_wm_window_type_notification: Atom,
    pub net_wm_window_type_combo: Atom,
    pub net_wm_window_type_dnd: Atom,
    pub net_wm_state: Atom,
    pub net_wm_state_fullscreen: Atom,
    pub net_wm_state_maximized_vert: Atom,
    pub net_wm_state_maximized_horz: Atom,
    pub net_wm_state_hidden: Atom,
    pub net_wm_state_modal: Atom,
    pub net_wm_state_skip_taskbar: Atom,
    pub net_wm_state_above: Atom,
    pub net_wm_state_below: Atom,
    pub net_wm_state_demands_attention: Atom,
    // Standard X11 atoms
    pub wm_protocols: Atom,
    pub wm_delete_window: Atom,
    pub wm_take_focus: Atom,
    pub net_wm_ping: Atom,
    pub wm_state: Atom,
    pub wm_change_state: Atom,
    pub wm_client_leader: Atom,
    pub wm_window_role: Atom,
    pub utf8_string: Atom,
}

impl Atoms {
    /// Intern all required atoms
    pub fn new<C: Connection>(conn: &C) -> Result<Self> {
        // Helper to intern a single atom
        let intern = |name: &str| -> Result<Atom> {
            Ok(conn.intern_atom(false, name.as_bytes())?.reply()?.atom)
        };

        Ok(Self {
            net_supported: intern("_NET_SUPPORTED")?,
            net_supporting_wm_check: intern("_NET_SUPPORTING_WM_CHECK")?,
            net_client_list: intern("_NET_CLIENT_LIST")?,
            net_client_list_stacking: intern("_NET_CLIENT_LIST_STACKING")?,
            net_active_window: intern("_NET_ACTIVE_WINDOW")?,
            net_close_window: intern("_NET_CLOSE_WINDOW")?,
            net_wm_name: intern("_NET_WM_NAME")?,
            net_wm_icon_name: intern("_NET_WM_ICON_NAME")?,
            net_wm_pid: intern("_NET_WM_PID")?,
            net_wm_icon: intern("_NET_WM_ICON")?,
            net_wm_window_type: intern("_NET_WM_WINDOW_TYPE")?,
            net_wm_window_type_desktop: intern("_NET_WM_WINDOW_TYPE_DESKTOP")?,
            net_wm_window_type_dock: intern("_NET_WM_WINDOW_TYPE_DOCK")?,
            net_wm_window_type_normal: intern("_NET_WM_WINDOW_TYPE_NORMAL")?,
            net_wm_window_type_dialog: intern("_NET_WM_WINDOW_TYPE_DIALOG")?,
            net_wm_window_type_utility: intern("_NET_WM_WINDOW_TYPE_UTILITY")?,
            net_wm_window_type_toolbar: intern("_NET_WM_WINDOW_TYPE_TOOLBAR")?,
            net_wm_window_type_splash: intern("_NET_WM_WINDOW_TYPE_SPLASH")?,
            net_wm_window_type_menu: intern("_NET_WM_WINDOW_TYPE_MENU")?,
            net_wm_window_type_dropdown_menu: intern("_NET_WM_WINDOW_TYPE_DROPDOWN_MENU")?,
            net_wm_window_type_popup_menu: intern("_NET_WM_WINDOW_TYPE_POPUP_MENU")?,
            net_wm_window_type_tooltip: intern("_NET_WM_WINDOW_TYPE_TOOLTIP")?,
            net_wm_window_type_notification: intern("_NET_WM_WINDOW_TYPE_NOTIFICATION")?,
            net_wm_window_type_combo: intern("_NET_WM_WINDOW_TYPE_COMBO")?,
            net_wm_window_type_dnd: intern("_NET_WM_WINDOW_TYPE_DND")?,
            net_wm_state: intern("_NET_WM_STATE")?,
            net_wm_state_fullscreen: intern("_NET_WM_STATE_FULLSCREEN")?,
            net_wm_state_maximized_vert: intern("_NET_WM_STATE_MAXIMIZED_VERT")?,
            net_wm_state_maximized_horz: intern("_NET_WM_STATE_MAXIMIZED_HORZ")?,
            net_wm_state_hidden: intern("_NET_WM_STATE_HIDDEN")?,
            net_wm_state_modal: intern("_NET_WM_STATE_MODAL")?,
            net_wm_state_skip_taskbar: intern("_NET_WM_STATE_SKIP_TASKBAR")?,
            net_wm_state_above: intern("_NET_WM_STATE_ABOVE")?,
            net_wm_state_below: intern("_NET_WM_STATE_BELOW")?,
            net_wm_state_demands_attention: intern("_NET_WM_STATE_DEMANDS_ATTENTION")?,
            wm_protocols: intern("WM_PROTOCOLS")?,
            wm_delete_window: intern("WM_DELETE_WINDOW")?,
            wm_take_focus: intern("WM_TAKE_FOCUS")?,
            net_wm_ping: intern("_NET_WM_PING")?,
            wm_state: intern("WM_STATE")?,
            wm_change_state: intern("WM_CHANGE_STATE")?,
            wm_client_leader: intern("WM_CLIENT_LEADER")?,
            wm_window_role: intern("WM_WINDOW_ROLE")?,
            utf8_string: intern("UTF8_STRING")?,
        })
    }

    fn window_types(&self) -> [(Atom, WindowType); 14] {
        [
            (self.net_wm_window_type_normal, WindowType::Normal),
            (self.net_wm_window_type_desktop, WindowType::Desktop),
            (self.net_wm_window_type_dock, WindowType::Dock),
            (self.net_wm_window_type_splash, WindowType::Splash),
            (self.net_wm_window_type_dialog, WindowType::Dialog),
            (self.net_wm_window_type_menu, WindowType::Menu),
            (self.net_wm_window_type_toolbar, WindowType::Toolbar),
            (self.net_wm_window_type_utility, WindowType::Utility),
            (self.net_wm_window_type_dropdown_menu, WindowType::DropdownMenu),
            (self.net_wm_window_type_popup_menu, WindowType::PopupMenu),
            (self.net_wm_window_type_tooltip, WindowType::Tooltip),
            (self.net_wm_window_type_notification, WindowType::Notification),
            (self.net_wm_window_type_combo, WindowType::Combo),
            (self.net_wm_window_type_dnd, WindowType::Dnd),
        ]
    }

    fn state_flags(&self) -> [(Atom, ClientFlags); 9] {
        [
            (self.net_wm_state_fullscreen, ClientFlags::FULLSCREEN),
            (self.net_wm_state_maximized_horz, ClientFlags::MAXIMIZED_HORIZ),
            (self.net_wm_state_maximized_vert, ClientFlags::MAXIMIZED_VERT),
            (self.net_wm_state_hidden, ClientFlags::MINIMIZED),
            (self.net_wm_state_modal, ClientFlags::MODAL),
            (self.net_wm_state_skip_taskbar, ClientFlags::SKIP_TASKBAR),
            (self.net_wm_state_above, ClientFlags::ABOVE),
            (self.net_wm_state_below, ClientFlags::BELOW),
            (self.net_wm_state_demands_attention, ClientFlags::URGENT),
        ]
    }

    /// First recognized entry of a _NET_WM_WINDOW_TYPE list.
    pub fn window_type(&self, atoms: &[Atom]) -> WindowType {
        let table = self.window_types();
        atoms
            .iter()
            .find_map(|atom| table.iter().find(|(a, _)| a == atom).map(|&(_, t)| t))
            .unwrap_or_default()
    }

    pub fn state_flag(&self, atom: Atom) -> Option<ClientFlags> {
        self.state_flags().into_iter().find(|&(a, _)| a == atom).map(|(_, f)| f)
    }

    pub fn flags_from_state(&self, atoms: &[Atom]) -> ClientFlags {
        atoms.iter().filter_map(|&a| self.state_flag(a)).collect()
    }

    /// _NET_WM_STATE contents for a set of flags.
    pub fn state_atoms(&self, flags: ClientFlags) -> Vec<Atom> {
        self.state_flags()
            .into_iter()
            .filter(|&(_, f)| flags.contains(f))
            .map(|(a, _)| a)
            .collect()
    }

    pub fn protocols(&self, atoms: &[Atom]) -> WmProtocols {
        let mut protocols = WmProtocols::empty();
        for &atom in atoms {
            if atom == self.wm_delete_window {
                protocols |= WmProtocols::DELETE;
            } else if atom == self.wm_take_focus {
                protocols |= WmProtocols::TAKE_FOCUS;
            } else if atom == self.net_wm_ping {
                protocols |= WmProtocols::PING;
            }
        }
        protocols
    }

    /// Set up _NET_SUPPORTED and the _NET_SUPPORTING_WM_CHECK window.
    /// Returns the check window, which lives as long as the connection.
    pub fn setup_supported<C: Connection>(&self, conn: &C, root: Window, wm_name: &str) -> Result<Window> {
        let mut supported = vec![
            self.net_supported,
            self.net_supporting_wm_check,
            self.net_client_list,
            self.net_client_list_stacking,
            self.net_active_window,
            self.net_close_window,
            self.net_wm_name,
            self.net_wm_icon_name,
            self.net_wm_pid,
            self.net_wm_icon,
            self.net_wm_window_type,
            self.net_wm_state,
        ];
        supported.extend(self.window_types().iter().map(|&(a, _)| a));
        supported.extend(self.state_flags().iter().map(|&(a, _)| a));

        conn.change_property32(PropMode::REPLACE, root, self.net_supported, AtomEnum::ATOM, &supported)?;

        let check = conn.generate_id()?;
        conn.create_window(
            0,
            check,
            root,
            -1,
            -1,
            1,
            1,
            0,
            WindowClass::INPUT_ONLY,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new().override_redirect(1),
        )?;
        for window in [root, check] {
            conn.change_property32(PropMode::REPLACE, window, self.net_supporting_wm_check, AtomEnum::WINDOW, &[check])?;
        }
        conn.change_property8(PropMode::REPLACE, check, self.net_wm_name, self.utf8_string, wm_name.as_bytes())?;
        debug!("_NET_SUPPORTING_WM_CHECK window 0x{:x}", check);
        Ok(check)
    }

    /// Update _NET_ACTIVE_WINDOW
    pub fn update_active_window<C: Connection>(&self, conn: &C, root: Window, window: Option<u32>) -> Result<()> {
        let win = window.unwrap_or(0);
        conn.change_property32(PropMode::REPLACE, root, self.net_active_window, AtomEnum::WINDOW, &[win])?;
        Ok(())
    }

    /// Update _NET_CLIENT_LIST_STACKING, bottom to top.
    pub fn update_client_list_stacking<C: Connection>(&self, conn: &C, root: Window, windows: &[u32]) -> Result<()> {
        conn.change_property32(
            PropMode::REPLACE,
            root,
            self.net_client_list_stacking,
            AtomEnum::WINDOW,
            windows,
        )?;
        Ok(())
    }

    /// Update _NET_CLIENT_LIST with managed windows in mapping order.
    pub fn update_client_list<C: Connection>(&self, conn: &C, root: Window, windows: &[u32]) -> Result<()> {
        conn.change_property32(PropMode::REPLACE, root, self.net_client_list, AtomEnum::WINDOW, windows)?;
        Ok(())
    }

    /// Replace _NET_WM_STATE on a client.
    pub fn set_window_state<C: Connection>(&self, conn: &C, window: Window, flags: ClientFlags) -> Result<()> {
        conn.change_property32(
            PropMode::REPLACE,
            window,
            self.net_wm_state,
            AtomEnum::ATOM,
            &self.state_atoms(flags),
        )?;
        Ok(())
    }

    /// Send a WM_PROTOCOLS client message (WM_DELETE_WINDOW, WM_TAKE_FOCUS).
    pub fn send_protocol<C: Connection>(&self, conn: &C, window: Window, protocol: Atom) -> Result<()> {
        if window == 0 {
            return Err(anyhow::anyhow!("Invalid window ID: 0"));
        }

        let event = ClientMessageEvent::new(
            32,
            window,
            self.wm_protocols,
            [protocol, x11rb::CURRENT_TIME, 0, 0, 0],
        );

        if let Err(e) = conn.send_event(false, window, EventMask::NO_EVENT, event) {
            // Window may already be gone
            debug!("Failed to send protocol message to window 0x{:x}: {}", window, e);
        }
        Ok(())
    }
}

/// _NET_WM_STATE client message action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateAction {
    Remove,
    Add,
    Toggle,
}

impl StateAction {
    pub fn from_raw(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Remove),
            1 => Some(Self::Add),
            2 => Some(Self::Toggle),
            _ => None,
        }
    }

    /// New value of a flag currently set to `current`.
    pub fn apply(self, current: bool) -> bool {
        match self {
            Self::Remove => false,
            Self::Add => true,
            Self::Toggle => !current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_action() {
        assert_eq!(StateAction::from_raw(3), None);
        assert!(StateAction::Toggle.apply(false));
        assert!(!StateAction::Toggle.apply(true));
        assert!(StateAction::Add.apply(true));
        assert!(!StateAction::from_raw(0).unwrap().apply(true));
    }
}
