use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::settings::settings_directory;

#[derive(Serialize, Deserialize, Default, Debug, PartialEq, Eq)]
pub struct AppState {
    #[serde(default)]
    pub selected_server: Option<String>,
}

impl AppState {
    pub fn state_file_path() -> PathBuf {
        settings_directory().join("openconnect-ui.toml")
    }

    pub fn load() -> Self {
        Self::load_from(&Self::state_file_path())
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(state) => {
                    log::info!("[app_state] loaded from {}", path.display());
                    state
                }
                Err(error) => {
                    log::warn!("[app_state] failed to parse {}: {error}", path.display());
                    Self::default()
                }
            },
            Err(_) => {
                log::info!(
                    "[app_state] no state file at {}, using defaults",
                    path.display()
                );
                Self::default()
            }
        }
    }

    pub fn save(&self) {
        self.save_to(&Self::state_file_path());
    }

    pub fn save_to(&self, path: &Path) {
        match toml::to_string_pretty(self) {
            Ok(content) => {
                if let Err(error) = std::fs::write(path, content) {
                    log::warn!("[app_state] failed to write {}: {error}", path.display());
                }
            }
            Err(error) => {
                log::warn!("[app_state] failed to serialize state: {error}");
            }
        }
    }

    /// Index of the remembered server in `names`, if it still exists.
    pub fn selected_index(&self, names: &[String]) -> Option<usize> {
        let selected = self.selected_server.as_ref()?;
        names.iter().position(|name| name == selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("state.toml");
        let state = AppState {
            selected_server: Some("gw".into()),
        };
        state.save_to(&path);
        assert_eq!(AppState::load_from(&path), state);
    }

    #[test]
    fn test_garbage_falls_back_to_default() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("state.toml");
        std::fs::write(&path, "selected_server = [").unwrap();
        assert_eq!(AppState::load_from(&path), AppState::default());
    }

    #[test]
    fn test_selected_index() {
        let names = vec!["a".to_string(), "b".to_string()];
        let state = AppState {
            selected_server: Some("b".into()),
        };
        assert_eq!(state.selected_index(&names), Some(1));
        assert_eq!(AppState::default().selected_index(&names), None);
    }
}
