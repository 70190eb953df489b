//! Persisted light/dark theme preference

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

const THEME_FILE: &str = "theme.json";
const DARK_FROM_HOUR: u32 = 19;
const DARK_UNTIL_HOUR: u32 = 7;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    Light,
    Dark,
}

impl ThemePreference {
    /// Dark between 19:00 and 07:00, light otherwise
    pub fn for_time(time: NaiveTime) -> Self {
        let hour = time.hour();
        if hour >= DARK_FROM_HOUR || hour < DARK_UNTIL_HOUR {
            Self::Dark
        } else {
            Self::Light
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredTheme {
    theme: Option<ThemePreference>,
}

/// Reads and writes the single `theme` key under the cache directory
#[derive(Clone, Debug)]
pub struct ThemeStore {
    path: PathBuf,
}

impl ThemeStore {
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            path: cache_dir.join(THEME_FILE),
        }
    }

    /// Stored preference, if any. An unreadable file counts as no preference.
    pub fn stored(&self) -> Option<ThemePreference> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<StoredTheme>(&content) {
            Ok(stored) => stored.theme,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring unreadable theme file");
                None
            }
        }
    }

    pub fn load(&self) -> ThemePreference {
        self.stored()
            .unwrap_or_else(|| ThemePreference::for_time(Local::now().time()))
    }

    pub fn save(&self, theme: ThemePreference) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&StoredTheme { theme: Some(theme) })?;
        std::fs::write(&self.path, json)?;
        tracing::debug!(theme = ?theme, "Theme preference saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn default_follows_time_of_day() {
        assert_eq!(ThemePreference::for_time(at(19, 0)), ThemePreference::Dark);
        assert_eq!(ThemePreference::for_time(at(6, 59)), ThemePreference::Dark);
        assert_eq!(ThemePreference::for_time(at(7, 0)), ThemePreference::Light);
        assert_eq!(ThemePreference::for_time(at(18, 59)), ThemePreference::Light);
    }

    #[test]
    fn saved_preference_wins_over_clock() {
        let dir = tempfile::tempdir().unwrap();
        let store = ThemeStore::new(dir.path());
        assert_eq!(store.stored(), None);

        store.save(ThemePreference::Light).unwrap();
        assert_eq!(store.stored(), Some(ThemePreference::Light));
        assert_eq!(store.load(), ThemePreference::Light);

        let raw = std::fs::read_to_string(dir.path().join(THEME_FILE)).unwrap();
        assert!(raw.contains("\"theme\": \"light\""));
    }

    #[test]
    fn corrupt_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(THEME_FILE), "not json").unwrap();
        let store = ThemeStore::new(dir.path());
        assert_eq!(store.stored(), None);
    }
}
