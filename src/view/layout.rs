//! Layout rendering (controls row, status bar)

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Padding, Paragraph, Tabs},
    Frame,
};

use crate::model::{ScreenSnapshot, UiState};
use super::utils::Palette;

const SKELETON_TAB: &str = "░░░░░░";

pub fn render_controls(frame: &mut Frame, area: Rect, snapshot: &ScreenSnapshot, palette: &Palette) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(55), // Genre tabs
            Constraint::Percentage(45), // Rank tabs
        ])
        .split(area);

    let ui = &snapshot.ui;
    let controls = &snapshot.controls;

    let genre_titles: Vec<String> = controls.genres.iter().map(|g| g.display_name.clone()).collect();
    let genre_index = controls
        .active_genre
        .as_ref()
        .and_then(|active| controls.genres.iter().position(|g| &g.name == active));
    render_tabs(frame, chunks[0], " Genre (←/→) ", genre_titles, genre_index, ui, palette);

    let rank_titles: Vec<String> = controls
        .ranks
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{} {}", i + 1, r.display_name))
        .collect();
    render_tabs(
        frame,
        chunks[1],
        " Rank (Tab/1-9) ",
        rank_titles,
        controls.active_rank_index(),
        ui,
        palette,
    );
}

fn render_tabs(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    titles: Vec<String>,
    selected: Option<usize>,
    ui: &UiState,
    palette: &Palette,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title.to_string())
        .padding(Padding::horizontal(1))
        .border_style(Style::default().fg(palette.border));

    // Placeholders stand in until the first load has mounted real controls
    if titles.is_empty() || ui.controls_skeleton() {
        let placeholders = vec![SKELETON_TAB; 4].join("  ");
        let skeleton = Paragraph::new(placeholders)
            .style(palette.skeleton_style(ui.skeleton_fading))
            .block(block);
        frame.render_widget(skeleton, area);
        return;
    }

    let tabs = Tabs::new(titles)
        .block(block)
        .style(Style::default().fg(palette.text))
        .highlight_style(
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )
        .select(selected.unwrap_or(0));
    frame.render_widget(tabs, area);
}

pub fn render_status_bar(frame: &mut Frame, area: Rect, snapshot: &ScreenSnapshot, palette: &Palette) {
    let status = match (&snapshot.ui.skeleton, snapshot.ui.skeleton_fading) {
        (Some(_), false) => Span::styled("Loading…", Style::default().fg(palette.header)),
        (Some(_), true) => Span::styled("Almost there…", Style::default().fg(palette.muted)),
        (None, _) => Span::styled(
            format!("{} tracks", snapshot.content.main_rows.len()),
            Style::default().fg(palette.muted),
        ),
    };

    let line = Line::from(vec![
        Span::styled(" tunemeld ", Style::default().fg(palette.accent).add_modifier(Modifier::BOLD)),
        status,
        Span::styled(
            "   ? help · t theme · q quit",
            Style::default().fg(palette.muted),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
