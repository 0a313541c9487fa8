//! Client Flags
//!
//! Bitfield flags for client state, advertised protocols, and the window
//! type classification used for layer assignment.

use bitflags::bitflags;

bitflags! {
    /// CLIENT flags - Window state flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ClientFlags: u32 {
        const URGENT               = 1 << 0;
        const HIDDEN               = 1 << 1;
        const MINIMIZED            = 1 << 2;
        const FULLSCREEN           = 1 << 3;
        const MAXIMIZED_HORIZ      = 1 << 4;
        const MAXIMIZED_VERT       = 1 << 5;
        const ABOVE                = 1 << 6;
        const BELOW                = 1 << 7;
        const MODAL                = 1 << 8;
        const ONTOP                = 1 << 9;
        const SKIP_TASKBAR         = 1 << 10;
    }
}

impl ClientFlags {
    pub fn maximized() -> Self {
        Self::MAXIMIZED_VERT | Self::MAXIMIZED_HORIZ
    }
}

bitflags! {
    /// WM_PROTOCOLS advertised by the client
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WmProtocols: u32 {
        const DELETE       = 1 << 0;
        const TAKE_FOCUS   = 1 << 1;
        const PING         = 1 << 2;
    }
}

/// Window type (EWMH _NET_WM_WINDOW_TYPE)
///
/// Declaration order is significant: the menu-like types come after
/// `Dialog` so anything comparing types keeps menus above dialogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum WindowType {
    #[default]
    Normal,
    Desktop,
    Dock,
    Splash,
    Dialog,
    Menu,
    Toolbar,
    Utility,
    DropdownMenu,
    PopupMenu,
    Tooltip,
    Notification,
    Combo,
    Dnd,
}

impl WindowType {
    /// Types usually carried by override-redirect windows.
    pub fn is_popup(self) -> bool {
        self >= Self::DropdownMenu
    }

    /// Types that float above normal windows without an explicit flag.
    pub fn is_always_on_top(self) -> bool {
        matches!(self, Self::Dock | Self::Splash) || self.is_popup()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Desktop => "desktop",
            Self::Dock => "dock",
            Self::Splash => "splash",
            Self::Dialog => "dialog",
            Self::Menu => "menu",
            Self::Toolbar => "toolbar",
            Self::Utility => "utility",
            Self::DropdownMenu => "dropdown_menu",
            Self::PopupMenu => "popup_menu",
            Self::Tooltip => "tooltip",
            Self::Notification => "notification",
            Self::Combo => "combo",
            Self::Dnd => "dnd",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "normal" => Self::Normal,
            "desktop" => Self::Desktop,
            "dock" => Self::Dock,
            "splash" => Self::Splash,
            "dialog" => Self::Dialog,
            "menu" => Self::Menu,
            "toolbar" => Self::Toolbar,
            "utility" => Self::Utility,
            "dropdown_menu" => Self::DropdownMenu,
            "popup_menu" => Self::PopupMenu,
            "tooltip" => Self::Tooltip,
            "notification" => Self::Notification,
            "combo" => Self::Combo,
            "dnd" => Self::Dnd,
            _ => return None,
        })
    }
}

/// Window layer (for stacking)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WindowLayer {
    Desktop = 0,
    Below = 1,
    Normal = 2,
    Above = 3,
    OnTop = 4,
    Fullscreen = 5,
}

impl WindowLayer {
    /// Layer chosen by a client's own flags and type. `None` means the
    /// client has nothing of its own and may inherit from its owner.
    pub fn from_state(flags: ClientFlags, window_type: WindowType) -> Option<Self> {
        if flags.contains(ClientFlags::FULLSCREEN) {
            Some(Self::Fullscreen)
        } else if flags.contains(ClientFlags::ONTOP) {
            Some(Self::OnTop)
        } else if flags.contains(ClientFlags::ABOVE) {
            Some(Self::Above)
        } else if flags.contains(ClientFlags::BELOW) {
            Some(Self::Below)
        } else if window_type == WindowType::Desktop {
            Some(Self::Desktop)
        } else if window_type.is_always_on_top() {
            Some(Self::Above)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menus_order_above_dialogs() {
        assert!(WindowType::Dialog < WindowType::Menu);
        assert!(WindowType::Dialog < WindowType::PopupMenu);
        assert!(WindowType::Normal < WindowType::Dialog);
    }

    #[test]
    fn test_layer_priority() {
        let all = ClientFlags::FULLSCREEN | ClientFlags::ABOVE | ClientFlags::BELOW;
        assert_eq!(WindowLayer::from_state(all, WindowType::Normal), Some(WindowLayer::Fullscreen));
        assert_eq!(
            WindowLayer::from_state(ClientFlags::BELOW, WindowType::Dock),
            Some(WindowLayer::Below)
        );
        assert_eq!(WindowLayer::from_state(ClientFlags::empty(), WindowType::Dock), Some(WindowLayer::Above));
        assert_eq!(WindowLayer::from_state(ClientFlags::empty(), WindowType::Dialog), None);
    }

    #[test]
    fn test_type_names() {
        for name in ["normal", "dialog", "popup_menu", "dnd"] {
            assert_eq!(WindowType::from_name(name).map(WindowType::as_str), Some(name));
        }
        assert_eq!(WindowType::from_name("bogus"), None);
    }
}
