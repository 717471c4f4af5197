use crate::models::ModelSettings;
use std::sync::Mutex;
use tauri::State;

/// In-memory model settings; deliberately not persisted across restarts.
#[derive(Default)]
pub struct SettingsState(pub Mutex<ModelSettings>);

#[tauri::command]
pub fn get_model_settings(state: State<'_, SettingsState>) -> ModelSettings {
    state.0.lock().unwrap().clone()
}

/// Replace the settings bundle, clamping every field into its documented
/// range, and return the normalized result.
#[tauri::command]
pub fn update_model_settings(
    state: State<'_, SettingsState>,
    settings: ModelSettings,
) -> ModelSettings {
    let settings = settings.clamped();
    *state.0.lock().unwrap() = settings.clone();
    settings
}
