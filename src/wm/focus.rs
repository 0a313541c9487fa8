//! Focus Module
//!
//! Tracks the focused client, focus history and the counted suppression of
//! pointer crossing events used while windows are moved around under the
//! cursor.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Focus policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusPolicy {
    /// Click to focus
    #[default]
    ClickToFocus,
    /// Focus follows mouse
    FocusFollowsMouse,
    /// Sloppy focus (focus on enter, keep it on leave)
    SloppyFocus,
}

impl FocusPolicy {
    pub fn follows_mouse(self) -> bool {
        !matches!(self, Self::ClickToFocus)
    }
}

/// Who gets focus after the focused client loses it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessorPolicy {
    /// Leave focus unset; an external collaborator decides.
    #[default]
    None,
    /// Most recently focused eligible client.
    History,
}

/// Event filter status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStatus {
    /// Pass event through
    Pass,
    /// Remove/ignore event
    Remove,
}

/// Nesting counter for enter/leave suppression.
///
/// Only the outermost ignore and the matching restore change anything on
/// the server; both report that edge to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnterLeaveSuppression {
    depth: u32,
}

impl EnterLeaveSuppression {
    /// Returns true when this call starts suppression.
    pub fn ignore(&mut self) -> bool {
        self.depth += 1;
        self.depth == 1
    }

    /// Returns true when this call ends suppression.
    pub fn restore(&mut self) -> bool {
        match self.depth {
            0 => {
                warn!("restore_enterleave_events without matching ignore");
                false
            }
            depth => {
                self.depth = depth - 1;
                self.depth == 0
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.depth > 0
    }
}

/// Focus manager
#[derive(Debug)]
pub struct FocusManager {
    /// Currently focused window
    focused_window: Option<u32>,

    /// Focus history, most recent first
    focus_history: VecDeque<u32>,

    /// Maximum history size
    max_history_size: usize,

    pub focus_policy: FocusPolicy,
    pub successor_policy: SuccessorPolicy,

    suppression: EnterLeaveSuppression,
}

impl FocusManager {
    /// Create a new focus manager
    pub fn new(focus_policy: FocusPolicy, successor_policy: SuccessorPolicy, max_history_size: usize) -> Self {
        Self {
            focused_window: None,
            focus_history: VecDeque::new(),
            max_history_size,
            focus_policy,
            successor_policy,
            suppression: EnterLeaveSuppression::default(),
        }
    }

    /// Record `window` as focused. Returns the previously focused window.
    pub fn set_focused(&mut self, window: u32) -> Option<u32> {
        self.focus_history.retain(|&w| w != window);
        self.focus_history.push_front(window);
        self.focus_history.truncate(self.max_history_size);

        let previous = self.focused_window.replace(window);
        debug!("Focus record 0x{:x} (was {:?})", window, previous);
        previous.filter(|&w| w != window)
    }

    /// Clear the focus record if it points at `window`.
    pub fn clear(&mut self, window: u32) -> bool {
        if self.focused_window == Some(window) {
            self.focused_window = None;
            true
        } else {
            false
        }
    }

    /// Drop every trace of a destroyed window. Returns true if it was focused.
    pub fn forget(&mut self, window: u32) -> bool {
        self.focus_history.retain(|&w| w != window);
        self.clear(window)
    }

    /// Pick a successor according to the policy.
    pub fn successor(&self, eligible: impl Fn(u32) -> bool) -> Option<u32> {
        match self.successor_policy {
            SuccessorPolicy::None => None,
            SuccessorPolicy::History => self.focus_history.iter().copied().find(|&w| eligible(w)),
        }
    }

    /// Get currently focused window
    pub fn get_focused_window(&self) -> Option<u32> {
        self.focused_window
    }

    /// Get focus history (most recent first)
    pub fn get_focus_history(&self) -> &VecDeque<u32> {
        &self.focus_history
    }

    /// Returns true when suppression starts.
    pub fn ignore_enterleave_events(&mut self) -> bool {
        self.suppression.ignore()
    }

    /// Returns true when suppression ends.
    pub fn restore_enterleave_events(&mut self) -> bool {
        self.suppression.restore()
    }

    pub fn enterleave_suppressed(&self) -> bool {
        self.suppression.is_active()
    }

    /// Filter for pointer enter/leave notifications.
    pub fn filter_crossing(&self) -> FilterStatus {
        if self.suppression.is_active() {
            FilterStatus::Remove
        } else {
            FilterStatus::Pass
        }
    }
}

impl Default for FocusManager {
    fn default() -> Self {
        Self::new(FocusPolicy::default(), SuccessorPolicy::default(), 20)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suppression_nests() {
        let mut focus = FocusManager::default();
        assert!(focus.ignore_enterleave_events());
        assert!(!focus.ignore_enterleave_events());
        assert!(!focus.restore_enterleave_events());
        assert_eq!(focus.filter_crossing(), FilterStatus::Remove);
        assert!(focus.restore_enterleave_events());
        assert_eq!(focus.filter_crossing(), FilterStatus::Pass);
    }

    #[test]
    fn test_unmatched_restore_does_not_underflow() {
        let mut focus = FocusManager::default();
        assert!(!focus.restore_enterleave_events());
        assert!(focus.ignore_enterleave_events());
        assert!(focus.enterleave_suppressed());
    }

    #[test]
    fn test_history_successor() {
        let mut focus = FocusManager::new(FocusPolicy::ClickToFocus, SuccessorPolicy::History, 3);
        for w in [1, 2, 3, 4] {
            focus.set_focused(w);
        }
        assert_eq!(focus.get_focus_history().len(), 3);
        assert!(focus.clear(4));
        assert_eq!(focus.successor(|w| w != 4 && w != 3), Some(2));
        assert_eq!(focus.get_focused_window(), None);
    }

    #[test]
    fn test_no_successor_by_default() {
        let mut focus = FocusManager::default();
        focus.set_focused(1);
        focus.set_focused(2);
        assert_eq!(focus.successor(|_| true), None);
    }

    #[test]
    fn test_set_focused_returns_previous() {
        let mut focus = FocusManager::default();
        assert_eq!(focus.set_focused(1), None);
        assert_eq!(focus.set_focused(1), None);
        assert_eq!(focus.set_focused(2), Some(1));
        assert!(focus.forget(2));
        assert!(!focus.get_focus_history().contains(&2));
    }
}
