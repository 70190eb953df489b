//! Overlay rendering (error banner, help popup)

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::coordinator::ErrorBanner;
use super::utils::Palette;

pub fn render_error_banner(frame: &mut Frame, banner: &ErrorBanner, palette: &Palette) {
    let area = frame.area();

    // Fixed width popup (responsive to screen size)
    let popup_width = 64.min(area.width.saturating_sub(4));
    let inner_width = popup_width.saturating_sub(4).max(1) as usize;

    let wrapped = |text: &str| ((text.chars().count() as f32) / (inner_width as f32)).ceil().max(1.0) as u16;
    let body_lines = wrapped(&banner.message) + 1 + wrapped(&banner.technical_detail);

    // Height: borders (2) + message + blank + detail
    let popup_height = (2 + body_lines).min(area.height.saturating_sub(4));

    let popup_area = Rect {
        x: area.width.saturating_sub(popup_width) / 2,
        y: area.height.saturating_sub(popup_height) / 2,
        width: popup_width,
        height: popup_height,
    };

    // Clear the area behind the popup first
    frame.render_widget(Clear, popup_area);

    let lines = vec![
        Line::from(Span::styled(
            banner.message.clone(),
            Style::default().fg(palette.error).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            banner.technical_detail.clone(),
            Style::default().fg(palette.muted),
        )),
    ];

    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.error))
                .title(" Error (r to retry, Esc to dismiss) ")
                .title_style(Style::default().fg(palette.error).add_modifier(Modifier::BOLD))
                .style(Style::default().bg(palette.background)),
        );

    frame.render_widget(widget, popup_area);
}

pub fn render_help_popup(frame: &mut Frame, palette: &Palette) {
    let area = frame.area();

    // Define keybindings organized by category
    let keybindings = vec![
        ("", "── Browse ──"),
        ("← / →", "Previous / next genre"),
        ("Tab / Shift+Tab", "Next / previous rank"),
        ("1-9", "Pick rank"),
        ("↑ / ↓", "Move selection"),
        ("", ""),
        ("", "── General ──"),
        ("T", "Toggle light / dark theme"),
        ("R", "Retry after an error"),
        ("?", "Toggle this help"),
        ("Q", "Quit"),
    ];

    let popup_width = 56.min(area.width);
    let popup_height = (keybindings.len() as u16 + 2).min(area.height.saturating_sub(4));

    let popup_area = Rect {
        x: area.width.saturating_sub(popup_width) / 2,
        y: area.height.saturating_sub(popup_height) / 2,
        width: popup_width,
        height: popup_height,
    };

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let lines: Vec<Line> = keybindings
        .iter()
        .map(|(key, desc)| {
            if key.is_empty() {
                // Section header or empty line
                Line::from(Span::styled(
                    format!("{:^38}", desc),
                    Style::default().fg(palette.header).add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(vec![
                    Span::styled(
                        format!("{:>18}", key),
                        Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw("  "),
                    Span::styled(desc.to_string(), Style::default().fg(palette.text)),
                ])
            }
        })
        .collect();

    let help_text = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.header))
            .title(" Help (? or Esc to close) ")
            .title_style(Style::default().fg(palette.header).add_modifier(Modifier::BOLD))
            .style(Style::default().bg(palette.background)),
    );

    frame.render_widget(help_text, popup_area);
}
