//! Theme and styling for the TUI.

use ratatui::style::{Color, Modifier, Style};

/// Color palette for a theme.
#[derive(Debug, Clone)]
pub struct ThemeColors {
    // Brand Colors
    pub primary: Color,
    pub accent: Color,

    // Semantic Colors
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,

    // Background Colors
    pub bg: Color,
    pub bg_highlight: Color,

    // Text Colors
    pub text: Color,
    pub text_muted: Color,
    pub text_dim: Color,

    // Answer Colors
    pub correct: Color,
    pub incorrect: Color,
}

/// Available theme names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeName {
    Dark,
    Light,
}

impl ThemeName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeName::Dark => "dark",
            ThemeName::Light => "light",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ThemeName::Dark => "Dark",
            ThemeName::Light => "Light",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "light" | "day" => ThemeName::Light,
            _ => ThemeName::Dark,
        }
    }

    pub fn next(&self) -> Self {
        match self {
            ThemeName::Dark => ThemeName::Light,
            ThemeName::Light => ThemeName::Dark,
        }
    }
}

/// Theme struct that holds colors and provides style methods.
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: ThemeName,
    pub colors: ThemeColors,
}

impl Theme {
    pub fn new(name: ThemeName) -> Self {
        let colors = match name {
            ThemeName::Dark => Self::dark_colors(),
            ThemeName::Light => Self::light_colors(),
        };
        Self { name, colors }
    }

    pub fn from_name(name: &str) -> Self {
        Self::new(ThemeName::parse(name))
    }

    fn dark_colors() -> ThemeColors {
        ThemeColors {
            primary: Color::Rgb(96, 165, 250),      // Blue 400
            accent: Color::Rgb(167, 139, 250),      // Violet 400

            success: Color::Rgb(74, 222, 128),      // Green 400
            warning: Color::Rgb(250, 204, 21),      // Yellow 400
            error: Color::Rgb(248, 113, 113),       // Red 400
            info: Color::Rgb(56, 189, 248),         // Sky 400

            bg: Color::Rgb(17, 24, 39),             // Gray 900
            bg_highlight: Color::Rgb(55, 65, 81),   // Gray 700

            text: Color::Rgb(243, 244, 246),        // Gray 100
            text_muted: Color::Rgb(156, 163, 175),  // Gray 400
            text_dim: Color::Rgb(107, 114, 128),    // Gray 500

            correct: Color::Rgb(34, 197, 94),       // Green 500
            incorrect: Color::Rgb(239, 68, 68),     // Red 500
        }
    }

    fn light_colors() -> ThemeColors {
        ThemeColors {
            primary: Color::Rgb(37, 99, 235),       // Blue 600
            accent: Color::Rgb(124, 58, 237),       // Violet 600

            success: Color::Rgb(22, 163, 74),       // Green 600
            warning: Color::Rgb(202, 138, 4),       // Yellow 600
            error: Color::Rgb(220, 38, 38),         // Red 600
            info: Color::Rgb(2, 132, 199),          // Sky 600

            bg: Color::Rgb(243, 244, 246),          // Gray 100
            bg_highlight: Color::Rgb(209, 213, 219), // Gray 300

            text: Color::Rgb(17, 24, 39),           // Gray 900
            text_muted: Color::Rgb(75, 85, 99),     // Gray 600
            text_dim: Color::Rgb(156, 163, 175),    // Gray 400

            correct: Color::Rgb(22, 163, 74),       // Green 600
            incorrect: Color::Rgb(220, 38, 38),     // Red 600
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Styles
    // ══════════════════════════════════════════════════════════════════════

    pub fn title(&self) -> Style {
        Style::default()
            .fg(self.colors.text)
            .add_modifier(Modifier::BOLD)
    }

    pub fn muted(&self) -> Style {
        Style::default().fg(self.colors.text_muted)
    }

    pub fn dim(&self) -> Style {
        Style::default().fg(self.colors.text_dim)
    }

    pub fn highlight(&self) -> Style {
        Style::default()
            .fg(self.colors.primary)
            .add_modifier(Modifier::BOLD)
    }

    pub fn selected(&self) -> Style {
        Style::default()
            .bg(self.colors.bg_highlight)
            .fg(self.colors.text)
    }

    pub fn question(&self) -> Style {
        Style::default()
            .fg(self.colors.accent)
            .add_modifier(Modifier::BOLD)
    }

    pub fn answer(&self) -> Style {
        Style::default()
            .fg(self.colors.success)
            .add_modifier(Modifier::BOLD)
    }

    /// Color for an accuracy value: red below 50%, amber below 80%, green above.
    pub fn accuracy_color(&self, accuracy: f64) -> Color {
        if accuracy < 0.5 {
            self.colors.error
        } else if accuracy < 0.8 {
            self.colors.warning
        } else {
            self.colors.success
        }
    }

    pub fn key_hint(&self) -> Style {
        Style::default()
            .fg(self.colors.text_dim)
    }

    pub fn key_highlight(&self) -> Style {
        Style::default()
            .fg(self.colors.accent)
            .add_modifier(Modifier::BOLD)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::new(ThemeName::Dark)
    }
}
