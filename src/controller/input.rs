//! Key event handling

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::AppController;

impl AppController {
    pub async fn handle_key_event(&self, key: KeyEvent) -> Result<()> {
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }

        // Error banner: retry or dismiss, quit still works
        if self.model.has_error().await {
            match key.code {
                KeyCode::Char('r') | KeyCode::Char('R') | KeyCode::Enter => self.retry().await,
                KeyCode::Esc => self.model.dismiss_error().await,
                KeyCode::Char('q') | KeyCode::Char('Q') => self.model.set_should_quit(true).await,
                _ => {}
            }
            return Ok(());
        }

        // Handle help popup
        if self.model.is_help_popup_open().await {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
                self.model.hide_help_popup().await;
            }
            return Ok(());
        }

        // Global keybindings
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.model.set_should_quit(true).await;
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.model.set_should_quit(true).await;
            }
            KeyCode::Left => self.cycle_genre(-1),
            KeyCode::Right => self.cycle_genre(1),
            KeyCode::Tab => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.cycle_rank(-1);
                } else {
                    self.cycle_rank(1);
                }
            }
            KeyCode::BackTab => self.cycle_rank(-1),
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                self.select_rank_at(index).await;
            }
            KeyCode::Up => self.model.move_selection_up().await,
            KeyCode::Down => self.model.move_selection_down().await,
            KeyCode::Char('t') | KeyCode::Char('T') => self.toggle_theme().await,
            KeyCode::Char('r') | KeyCode::Char('R') => self.retry().await,
            KeyCode::Char('?') => self.model.toggle_help_popup().await,
            _ => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::coordinator::test_support::{ScriptedAssets, ScriptedQueries};
    use crate::coordinator::{Coordinator, CoordinatorSettings, ErrorBanner, RenderSurface, RetryHandle};
    use crate::model::{AppModel, ThemePreference, ThemeStore};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn controller(cache_dir: &std::path::Path) -> AppController {
        let model = Arc::new(AppModel::new(ThemePreference::Light));
        let coordinator = Coordinator::new(
            Arc::new(ScriptedQueries::new()),
            Arc::new(ScriptedAssets::new()),
            model.clone(),
            CoordinatorSettings::default(),
        );
        AppController::new(model, coordinator, ThemeStore::new(cache_dir))
    }

    #[tokio::test]
    async fn help_popup_swallows_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path());

        controller.handle_key_event(press(KeyCode::Char('?'))).await.unwrap();
        assert!(controller.model.is_help_popup_open().await);

        controller.handle_key_event(press(KeyCode::Char('q'))).await.unwrap();
        assert!(!controller.model.should_quit().await);

        controller.handle_key_event(press(KeyCode::Esc)).await.unwrap();
        controller.handle_key_event(press(KeyCode::Char('q'))).await.unwrap();
        assert!(controller.model.should_quit().await);
    }

    #[tokio::test]
    async fn theme_toggle_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path());

        controller.handle_key_event(press(KeyCode::Char('t'))).await.unwrap();
        assert_eq!(controller.model.theme().await, ThemePreference::Dark);
        assert_eq!(ThemeStore::new(dir.path()).stored(), Some(ThemePreference::Dark));
    }

    #[tokio::test]
    async fn retry_key_fires_banner_handle() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path());
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        controller
            .model
            .show_error(
                ErrorBanner {
                    message: "Please try again.".to_string(),
                    technical_detail: String::new(),
                },
                RetryHandle::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .await;

        // Navigation is blocked while the banner shows
        controller.handle_key_event(press(KeyCode::Char('?'))).await.unwrap();
        assert!(!controller.model.is_help_popup_open().await);

        controller.handle_key_event(press(KeyCode::Char('r'))).await.unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
