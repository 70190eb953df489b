//! Utility functions for rendering UI components

use ratatui::style::{Color, Modifier, Style};

use crate::model::{PlayCounts, ThemePreference};

/// Colours for one theme
#[derive(Clone, Copy, Debug)]
pub struct Palette {
    pub text: Color,
    pub muted: Color,
    pub accent: Color,
    pub header: Color,
    pub border: Color,
    pub background: Color,
    pub error: Color,
    pub skeleton: Color,
}

impl Palette {
    pub fn for_theme(theme: ThemePreference) -> Self {
        match theme {
            ThemePreference::Dark => Self {
                text: Color::White,
                muted: Color::DarkGray,
                accent: Color::Green,
                header: Color::Cyan,
                border: Color::Gray,
                background: Color::Black,
                error: Color::Red,
                skeleton: Color::DarkGray,
            },
            ThemePreference::Light => Self {
                text: Color::Black,
                muted: Color::Gray,
                accent: Color::Blue,
                header: Color::Magenta,
                border: Color::DarkGray,
                background: Color::White,
                error: Color::Red,
                skeleton: Color::Gray,
            },
        }
    }

    /// Placeholder style; a fading skeleton is dimmed
    pub fn skeleton_style(&self, fading: bool) -> Style {
        let style = Style::default().fg(self.skeleton);
        if fading {
            style.add_modifier(Modifier::DIM)
        } else {
            style
        }
    }
}

/// Calculate width needed for index column (log10(n) + padding)
pub fn calculate_num_width(item_count: usize) -> usize {
    if item_count == 0 {
        2
    } else {
        let digits = (item_count as f64).log10().floor() as usize + 1;
        digits + 1
    }
}

pub fn truncate_string(s: &str, max_width: usize) -> String {
    if s.chars().count() > max_width {
        let truncated: String = s.chars().take(max_width.saturating_sub(3)).collect();
        format!("{:<width$}", format!("{}...", truncated), width = max_width)
    } else {
        format!("{:<width$}", s, width = max_width)
    }
}

/// 1234567 -> "1.2M"
pub fn abbreviate_count(count: u64) -> String {
    match count {
        0..=999 => count.to_string(),
        1_000..=999_999 => format!("{:.1}K", count as f64 / 1_000.0),
        1_000_000..=999_999_999 => format!("{:.1}M", count as f64 / 1_000_000.0),
        _ => format!("{:.1}B", count as f64 / 1_000_000_000.0),
    }
}

/// Metric column for secondary layouts; backend formatting wins when present
pub fn format_play_counts(counts: Option<&PlayCounts>) -> (String, String) {
    let Some(counts) = counts else {
        return ("-".to_string(), String::new());
    };
    let total = counts
        .total_abbreviated
        .clone()
        .or_else(|| counts.total.map(abbreviate_count))
        .unwrap_or_else(|| "-".to_string());
    let change = counts
        .weekly_change_formatted
        .clone()
        .or_else(|| counts.weekly_change_pct.map(|pct| format!("{:+.1}%", pct)))
        .unwrap_or_default();
    (total, change)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_are_abbreviated() {
        assert_eq!(abbreviate_count(999), "999");
        assert_eq!(abbreviate_count(1_240), "1.2K");
        assert_eq!(abbreviate_count(3_400_000), "3.4M");
    }

    #[test]
    fn backend_formatting_takes_precedence() {
        let counts = PlayCounts {
            total: Some(1_500),
            total_abbreviated: Some("1.5K plays".to_string()),
            weekly_change_pct: Some(12.0),
            ..Default::default()
        };
        assert_eq!(
            format_play_counts(Some(&counts)),
            ("1.5K plays".to_string(), "+12.0%".to_string())
        );
        assert_eq!(format_play_counts(None), ("-".to_string(), String::new()));
    }

    #[test]
    fn long_strings_are_truncated() {
        assert_eq!(truncate_string("abcdefgh", 6), "abc...");
        assert_eq!(truncate_string("ab", 4), "ab  ");
    }
}
