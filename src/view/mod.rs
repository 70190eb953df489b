//! View module - UI rendering
//!
//! This module handles all UI rendering for the application using ratatui.
//! It is organized into submodules by component type:
//!
//! - `utils`: Palette and formatting helpers
//! - `layout`: Controls row and status bar
//! - `playlist`: Ranked table and service panels
//! - `overlays`: Error banner and help popup

mod utils;
mod layout;
mod playlist;
mod overlays;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::Style,
    widgets::Block,
    Frame,
};

use crate::model::ScreenSnapshot;
use utils::Palette;

pub struct AppView;

impl AppView {
    pub fn render(frame: &mut Frame, snapshot: &ScreenSnapshot) {
        let palette = Palette::for_theme(snapshot.ui.theme);
        frame.render_widget(
            Block::default().style(Style::default().bg(palette.background)),
            frame.area(),
        );

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Genre + rank tabs
                Constraint::Min(0),    // Playlist + service panels
                Constraint::Length(1), // Status bar
            ])
            .split(frame.area());

        layout::render_controls(frame, chunks[0], snapshot, &palette);

        let main_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(65), // Ranked table
                Constraint::Percentage(35), // Service panels
            ])
            .split(chunks[1]);

        playlist::render_main_playlist(frame, main_chunks[0], snapshot, &palette);
        playlist::render_service_panels(frame, main_chunks[1], snapshot, &palette);

        layout::render_status_bar(frame, chunks[2], snapshot, &palette);

        if let Some(banner) = &snapshot.ui.error {
            overlays::render_error_banner(frame, banner, &palette);
        }

        if snapshot.ui.show_help_popup {
            overlays::render_help_popup(frame, &palette);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::{ErrorBanner, SkeletonPlan};
    use crate::model::{LayoutType, SurfaceSet, ThemePreference, Track};
    use ratatui::{backend::TestBackend, Terminal};

    fn draw(snapshot: &ScreenSnapshot) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| AppView::render(f, snapshot)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn committed_rows_are_drawn() {
        let mut snapshot = ScreenSnapshot::default();
        let mut track = Track::new("A", 1);
        track.name = "Paper Planes".to_string();
        snapshot.content.main_rows = vec![track];

        let screen = draw(&snapshot);
        assert!(screen.contains("Paper Planes"));
        assert!(screen.contains("1 tracks"));
    }

    #[test]
    fn skeleton_hides_rows_until_cleared() {
        let mut snapshot = ScreenSnapshot::default();
        let mut track = Track::new("A", 1);
        track.name = "Paper Planes".to_string();
        snapshot.content.main_rows = vec![track];
        snapshot.ui.theme = ThemePreference::Dark;
        snapshot.ui.skeleton = Some(SkeletonPlan {
            surfaces: SurfaceSet::Both,
            layout: LayoutType::PrimaryRank,
            is_initial_load: false,
        });

        let screen = draw(&snapshot);
        assert!(!screen.contains("Paper Planes"));
        assert!(screen.contains("Loading"));
    }

    #[test]
    fn error_banner_shows_retry_hint() {
        let mut snapshot = ScreenSnapshot::default();
        snapshot.ui.error = Some(ErrorBanner {
            message: "Please try again.".to_string(),
            technical_detail: "HTTP 503".to_string(),
        });

        let screen = draw(&snapshot);
        assert!(screen.contains("r to retry"));
        assert!(screen.contains("HTTP 503"));
    }
}
