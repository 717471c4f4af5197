use crate::browser::{BrowserState, ContextMenu, ItemRect, NotificationKind, Rect, NOTIFICATION_TTL};
use serde::Serialize;
use std::sync::Mutex;
use tauri::{AppHandle, Manager, State};

/// Managed file-browser UI state shared with the webview.
#[derive(Default)]
pub struct Browser(pub Mutex<BrowserState>);

#[derive(Debug, Clone, Serialize)]
pub struct NotificationView {
    pub message: String,
    pub kind: NotificationKind,
}

#[tauri::command]
pub fn select_file(browser: State<'_, Browser>, id: String, modifier: bool) -> Vec<String> {
    let mut state = browser.0.lock().unwrap();
    state.selection.click(&id, modifier);
    state.selection.selected()
}

#[tauri::command]
pub fn selected_files(browser: State<'_, Browser>) -> Vec<String> {
    browser.0.lock().unwrap().selection.selected()
}

#[tauri::command]
pub fn clear_selection(browser: State<'_, Browser>) -> Vec<String> {
    let mut state = browser.0.lock().unwrap();
    state.selection.clear();
    state.selection.selected()
}

/// Rubber-band update during a drag. `items` carries the rendered position
/// of every visible entry; `modifier_held` suppresses deselection of items
/// outside the band.
#[tauri::command]
pub fn update_rubber_band(
    browser: State<'_, Browser>,
    band: Rect,
    items: Vec<ItemRect>,
    modifier_held: bool,
) -> Vec<String> {
    let mut state = browser.0.lock().unwrap();
    state.selection.drag_update(band, &items, modifier_held);
    state.selection.selected()
}

#[tauri::command]
pub fn open_context_menu(browser: State<'_, Browser>, menu: ContextMenu) {
    browser.0.lock().unwrap().open_context_menu(menu);
}

#[tauri::command]
pub fn close_context_menu(browser: State<'_, Browser>) {
    browser.0.lock().unwrap().close_context_menu();
}

#[tauri::command]
pub fn context_menu(browser: State<'_, Browser>) -> Option<ContextMenu> {
    browser.0.lock().unwrap().context_menu().cloned()
}

/// Show a notification and schedule its auto-clear. The sequence number
/// keeps a stale timer from clearing a notification that replaced this one.
#[tauri::command]
pub fn show_notification(
    app: AppHandle,
    browser: State<'_, Browser>,
    message: String,
    kind: NotificationKind,
) {
    let seq = browser.0.lock().unwrap().notify(message, kind);
    tauri::async_runtime::spawn(async move {
        tokio::time::sleep(NOTIFICATION_TTL).await;
        let browser = app.state::<Browser>();
        browser.0.lock().unwrap().clear_notification(seq);
    });
}

#[tauri::command]
pub fn current_notification(browser: State<'_, Browser>) -> Option<NotificationView> {
    browser
        .0
        .lock()
        .unwrap()
        .notification()
        .map(|n| NotificationView {
            message: n.message.clone(),
            kind: n.kind,
        })
}
