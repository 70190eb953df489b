//! Ranked playlist table and per-service panels

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, List, ListItem, ListState, Padding, Paragraph},
    Frame,
};

use crate::model::{LayoutType, ScreenSnapshot, ServiceId, Track};
use super::utils::{calculate_num_width, format_play_counts, truncate_string, Palette};

const SKELETON_ROWS: usize = 12;
const PANEL_SKELETON_ROWS: usize = 3;
const METRIC_WIDTH: usize = 10;
const CHANGE_WIDTH: usize = 8;
const BADGE_WIDTH: usize = 14;

pub fn render_main_playlist(frame: &mut Frame, area: Rect, snapshot: &ScreenSnapshot, palette: &Palette) {
    let ui = &snapshot.ui;
    let content = &snapshot.content;

    let title = content
        .headers
        .get(&ServiceId::Aggregate)
        .and_then(|info| info.playlist_name.clone())
        .unwrap_or_else(|| "tunemeld".to_string());
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", title))
        .padding(Padding::horizontal(1))
        .border_style(Style::default().fg(palette.border));

    let content_width = area.width.saturating_sub(4) as usize;

    if let Some(layout) = ui.playlist_skeleton() {
        let items = skeleton_items(layout, content_width, SKELETON_ROWS, palette, ui.skeleton_fading);
        frame.render_widget(List::new(items).block(block), area);
        return;
    }

    if content.main_rows.is_empty() {
        let empty = Paragraph::new("No tracks for this genre yet")
            .style(Style::default().fg(palette.muted))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let items = track_items(&content.main_rows, content.main_layout, ui.selected_row, content_width, palette);
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default()); // Highlight handled by item styles

    let mut list_state = ListState::default();
    list_state.select(Some(ui.selected_row + 1)); // +1 for header

    frame.render_stateful_widget(list, area, &mut list_state);
}

fn track_items(
    tracks: &[Track],
    layout: LayoutType,
    selected_index: usize,
    content_width: usize,
    palette: &Palette,
) -> Vec<ListItem<'static>> {
    let num_width = calculate_num_width(tracks.len());
    let metric_width = match layout {
        LayoutType::PrimaryRank => 0,
        LayoutType::SecondaryMetric => METRIC_WIDTH + 3 + CHANGE_WIDTH + 3,
    };
    let fixed_width = 1 + num_width + 3 + 3 + metric_width + BADGE_WIDTH;
    let remaining_width = content_width.saturating_sub(fixed_width);
    let title_width = (remaining_width * 55) / 100;
    let artist_width = remaining_width.saturating_sub(title_width);

    let metric_header = match layout {
        LayoutType::PrimaryRank => String::new(),
        LayoutType::SecondaryMetric => format!("{:>METRIC_WIDTH$}   {:>CHANGE_WIDTH$}   ", "Plays", "Week"),
    };

    // Create header as first item
    let mut items: Vec<ListItem<'static>> = vec![ListItem::new(format!(
        " {:<num_width$}   {:<title_width$}   {:<artist_width$}{}{}",
        "#",
        "Title",
        "Artist",
        metric_header,
        "Seen on",
    ))
    .style(Style::default().fg(palette.header).add_modifier(Modifier::BOLD))];

    items.extend(tracks.iter().enumerate().map(|(i, track)| {
        let style = if i == selected_index {
            Style::default().fg(palette.accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(palette.text)
        };

        let metrics = match layout {
            LayoutType::PrimaryRank => String::new(),
            LayoutType::SecondaryMetric => {
                let (total, change) = format_play_counts(track.play_counts.as_ref());
                format!("{:>METRIC_WIDTH$}   {:>CHANGE_WIDTH$}   ", total, change)
            }
        };

        ListItem::new(format!(
            " {:<num_width$}   {}   {}{}{}",
            track.display_rank,
            truncate_string(&track.name, title_width),
            truncate_string(&track.artist, artist_width),
            metrics,
            seen_on_badges(track),
        ))
        .style(style)
    }));
    items
}

/// "SP 3 · AM 12 · SC" for the ranking services that list the track
fn seen_on_badges(track: &Track) -> String {
    track
        .seen_on()
        .map(|(service, rank)| {
            let code = match service {
                ServiceId::Spotify => "SP",
                ServiceId::AppleMusic => "AM",
                ServiceId::SoundCloud => "SC",
                _ => "",
            };
            match rank {
                Some(rank) => format!("{} {}", code, rank),
                None => code.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(" · ")
}

fn skeleton_items(
    layout: LayoutType,
    content_width: usize,
    rows: usize,
    palette: &Palette,
    fading: bool,
) -> Vec<ListItem<'static>> {
    let style = palette.skeleton_style(fading);
    let metric = match layout {
        LayoutType::PrimaryRank => String::new(),
        LayoutType::SecondaryMetric => format!("   {}", "▒".repeat(METRIC_WIDTH)),
    };
    let bar_width = content_width.saturating_sub(6 + metric.chars().count());
    (0..rows)
        .map(|_| ListItem::new(format!(" ▒▒   {}{}", "░".repeat(bar_width), metric)).style(style))
        .collect()
}

pub fn render_service_panels(frame: &mut Frame, area: Rect, snapshot: &ScreenSnapshot, palette: &Palette) {
    let content = &snapshot.content;
    let ui = &snapshot.ui;
    if content.mounted_panels.is_empty() {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Services ")
            .border_style(Style::default().fg(palette.border));
        let body = if ui.services_skeleton() {
            Paragraph::new("░░░░░░░░░░░░").style(palette.skeleton_style(ui.skeleton_fading))
        } else {
            Paragraph::new("No service playlists").style(Style::default().fg(palette.muted))
        };
        frame.render_widget(body.block(block), area);
        return;
    }

    let constraints: Vec<Constraint> = content
        .mounted_panels
        .iter()
        .map(|_| Constraint::Ratio(1, content.mounted_panels.len() as u32))
        .collect();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (service, chunk) in content.mounted_panels.iter().zip(chunks.iter()) {
        render_service_panel(frame, *chunk, *service, snapshot, palette);
    }
}

fn render_service_panel(
    frame: &mut Frame,
    area: Rect,
    service: ServiceId,
    snapshot: &ScreenSnapshot,
    palette: &Palette,
) {
    let ui = &snapshot.ui;
    let header = snapshot.content.headers.get(&service);
    let title = match header.and_then(|h| h.playlist_name.as_deref()) {
        Some(name) => format!(" {} · {} ", service.display_name(), name),
        None => format!(" {} ", service.display_name()),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .padding(Padding::horizontal(1))
        .border_style(Style::default().fg(palette.border));

    let content_width = area.width.saturating_sub(4) as usize;

    if ui.services_skeleton() {
        let items = skeleton_items(LayoutType::PrimaryRank, content_width, PANEL_SKELETON_ROWS, palette, ui.skeleton_fading);
        frame.render_widget(List::new(items).block(block), area);
        return;
    }

    let tracks = snapshot
        .content
        .panel_rows
        .get(&service)
        .map(Vec::as_slice)
        .unwrap_or_default();
    if tracks.is_empty() {
        let empty = Paragraph::new("Unavailable")
            .style(Style::default().fg(palette.muted))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let num_width = calculate_num_width(tracks.len());
    let text_width = content_width.saturating_sub(num_width + 2);
    let items: Vec<ListItem> = tracks
        .iter()
        .map(|track| {
            let line = format!("{} – {}", track.name, track.artist);
            ListItem::new(format!(
                "{:<num_width$} {}",
                track.display_rank,
                truncate_string(&line, text_width),
            ))
            .style(Style::default().fg(palette.text))
        })
        .collect();
    frame.render_widget(List::new(items).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ServiceSlot, ThemePreference};

    #[test]
    fn badges_list_ranking_services_in_order() {
        let mut track = Track::new("A", 1);
        track.slots.insert(
            ServiceId::SoundCloud,
            ServiceSlot::Present { rank: None, link: None },
        );
        track.slots.insert(
            ServiceId::Spotify,
            ServiceSlot::Present { rank: Some(3), link: None },
        );
        track.slots.insert(ServiceId::YouTube, ServiceSlot::Present { rank: None, link: None });
        assert_eq!(seen_on_badges(&track), "SP 3 · SC");
    }

    #[test]
    fn secondary_layout_adds_metric_columns() {
        let palette = Palette::for_theme(ThemePreference::Dark);
        let tracks = vec![Track::new("A", 1)];
        let primary = track_items(&tracks, LayoutType::PrimaryRank, 0, 80, &palette);
        let secondary = track_items(&tracks, LayoutType::SecondaryMetric, 0, 80, &palette);
        assert_eq!(primary.len(), 2);
        assert_eq!(secondary.len(), 2);
        assert_eq!(skeleton_items(LayoutType::SecondaryMetric, 80, 5, &palette, true).len(), 5);
    }
}
