//! Boxed progress reports on stdout.
//!
//! Purely informational: nothing reads them back, and tests run with [`Console::silent`].

use colored::{ColoredString, Colorize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Success,
    Warning,
    Failure,
}

#[derive(Debug, Clone, Copy)]
pub struct Console {
    enabled: bool,
    colored: bool,
}

impl Console {
    pub fn new(colored: bool) -> Self {
        Self {
            enabled: true,
            colored,
        }
    }

    pub fn silent() -> Self {
        Self {
            enabled: false,
            colored: false,
        }
    }

    pub fn report(&self, tone: Tone, title: &str, lines: &[String]) {
        if !self.enabled {
            return;
        }
        let text = render(title, lines);
        if self.colored {
            println!("{}", paint(tone, &text));
        } else {
            println!("{text}");
        }
    }
}

fn paint(tone: Tone, text: &str) -> ColoredString {
    match tone {
        Tone::Info => text.cyan(),
        Tone::Success => text.green(),
        Tone::Warning => text.yellow(),
        Tone::Failure => text.red(),
    }
}

/// Draws `title` and `lines` inside a box as wide as the longest of them.
pub fn render(title: &str, lines: &[String]) -> String {
    let width = lines
        .iter()
        .map(|line| line.chars().count())
        .chain(std::iter::once(title.chars().count()))
        .max()
        .unwrap_or(0);

    let row = |text: &str| {
        let pad = width - text.chars().count();
        format!("│ {text}{} │", " ".repeat(pad))
    };

    let mut out = Vec::with_capacity(lines.len() + 4);
    out.push(format!("┌{}┐", "─".repeat(width + 2)));
    out.push(row(title));
    if !lines.is_empty() {
        out.push(format!("├{}┤", "─".repeat(width + 2)));
        out.extend(lines.iter().map(|line| row(line)));
    }
    out.push(format!("└{}┘", "─".repeat(width + 2)));
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_fits_longest_line() {
        let text = render("Order 1", &["Pancakes x2".to_string()]);
        let rows: Vec<&str> = text.lines().collect();

        assert_eq!(rows.len(), 5);
        assert_eq!(rows[1], "│ Order 1     │");
        assert_eq!(rows[3], "│ Pancakes x2 │");
        assert!(rows.iter().all(|row| row.chars().count() == 15));
    }

    #[test]
    fn test_title_only_box() {
        assert_eq!(render("Bye", &[]), "┌─────┐\n│ Bye │\n└─────┘");
    }
}
