use crate::models::FileInfo;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// How long a notification stays on screen before auto-clearing.
pub const NOTIFICATION_TTL: Duration = Duration::from_millis(700);

/// Axis-aligned bounding box in the file list's coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    /// Normalize a drag between two corners into a well-formed rectangle.
    pub fn from_drag(start_x: f64, start_y: f64, current_x: f64, current_y: f64) -> Self {
        Self {
            left: start_x.min(current_x),
            top: start_y.min(current_y),
            right: start_x.max(current_x),
            bottom: start_y.max(current_y),
        }
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.left <= other.right
            && self.right >= other.left
            && self.top <= other.bottom
            && self.bottom >= other.top
    }
}

/// An item's rendered position, reported by the webview for rubber-band
/// hit testing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRect {
    pub id: String,
    pub rect: Rect,
}

/// Multi-selection over file ids, in selection order.
#[derive(Debug, Default, Clone)]
pub struct SelectionModel {
    selected: Vec<String>,
}

impl SelectionModel {
    pub fn selected(&self) -> Vec<String> {
        self.selected.clone()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.iter().any(|s| s == id)
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Plain click selects exclusively; clicking an already-selected item
    /// clears the selection. A modifier click toggles the item without
    /// touching the rest.
    pub fn click(&mut self, id: &str, modifier: bool) {
        if modifier {
            if self.is_selected(id) {
                self.selected.retain(|s| s != id);
            } else {
                self.selected.push(id.to_string());
            }
        } else if self.is_selected(id) {
            self.selected.clear();
        } else {
            self.selected = vec![id.to_string()];
        }
    }

    /// Rubber-band update: items intersecting the band join the selection,
    /// items outside it drop out unless a modifier is held during the drag.
    pub fn drag_update(&mut self, band: Rect, items: &[ItemRect], modifier_held: bool) {
        for item in items {
            if band.intersects(&item.rect) {
                if !self.is_selected(&item.id) {
                    self.selected.push(item.id.clone());
                }
            } else if !modifier_held {
                self.selected.retain(|s| *s != item.id);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Background,
    File,
    Folder,
}

/// Context-menu state. A right-click replaces any previous menu; an
/// outside click clears it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextMenu {
    pub x: f64,
    pub y: f64,
    pub target_type: TargetType,
    pub target: Option<FileInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

/// Single-slot notification with its display deadline.
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
    pub seq: u64,
    shown_at: Instant,
}

impl Notification {
    pub fn expired(&self, now: Instant) -> bool {
        now.duration_since(self.shown_at) >= NOTIFICATION_TTL
    }
}

/// Derived UI state for the file browser: selection set, context menu and
/// the notification slot.
#[derive(Debug, Default)]
pub struct BrowserState {
    pub selection: SelectionModel,
    context_menu: Option<ContextMenu>,
    notification: Option<Notification>,
    notification_seq: u64,
}

impl BrowserState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_context_menu(&mut self, menu: ContextMenu) {
        self.context_menu = Some(menu);
    }

    pub fn close_context_menu(&mut self) {
        self.context_menu = None;
    }

    pub fn context_menu(&self) -> Option<&ContextMenu> {
        self.context_menu.as_ref()
    }

    /// Show a notification, replacing the current one. Returns the sequence
    /// number the auto-clear timer must present to dismiss it, so a timer
    /// belonging to a replaced notification cannot clear its successor.
    pub fn notify(&mut self, message: impl Into<String>, kind: NotificationKind) -> u64 {
        self.notification_seq += 1;
        let seq = self.notification_seq;
        self.notification = Some(Notification {
            message: message.into(),
            kind,
            seq,
            shown_at: Instant::now(),
        });
        seq
    }

    pub fn clear_notification(&mut self, seq: u64) {
        if self.notification.as_ref().is_some_and(|n| n.seq == seq) {
            self.notification = None;
        }
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }
}
