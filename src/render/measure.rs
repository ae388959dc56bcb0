//! Text measurement for wrapped content.

use crate::types::CellStyle;

/// Horizontal padding inside a cell, each side.
pub const CELL_PADDING: f64 = 4.0;
pub const DEFAULT_FONT_SIZE: f64 = 11.0;
const LINE_HEIGHT_FACTOR: f64 = 1.2;
const DEFAULT_FONT_FAMILY: &str = "Calibri, Arial, sans-serif";

/// Font attributes relevant to measuring.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub size: f64,
    pub bold: bool,
    pub italic: bool,
}

impl FontSpec {
    pub fn from_style(style: Option<&CellStyle>) -> Self {
        Self {
            size: style.and_then(|s| s.font_size).unwrap_or(DEFAULT_FONT_SIZE),
            bold: style.and_then(|s| s.bold).unwrap_or(false),
            italic: style.and_then(|s| s.italic).unwrap_or(false),
        }
    }

    /// CSS font shorthand.
    pub fn css(&self) -> String {
        let italic = if self.italic { "italic " } else { "" };
        let bold = if self.bold { "bold " } else { "" };
        format!("{italic}{bold}{}px {DEFAULT_FONT_FAMILY}", self.size)
    }

    pub fn line_height(&self) -> f64 {
        self.size * LINE_HEIGHT_FACTOR
    }
}

/// Measures rendered text width.
pub trait TextMeasurer {
    fn text_width(&mut self, text: &str, font: &FontSpec) -> f64;
}

/// Fixed-advance estimate; used off-browser and in tests.
#[derive(Debug, Clone)]
pub struct ApproxTextMeasurer {
    /// Advance of one character as a fraction of the font size
    pub advance: f64,
}

impl Default for ApproxTextMeasurer {
    fn default() -> Self {
        Self { advance: 0.6 }
    }
}

impl TextMeasurer for ApproxTextMeasurer {
    #[allow(clippy::cast_precision_loss)]
    fn text_width(&mut self, text: &str, font: &FontSpec) -> f64 {
        let bold = if font.bold { 1.1 } else { 1.0 };
        text.chars().count() as f64 * font.size * self.advance * bold
    }
}

/// Break `text` into lines no wider than `max_width`. Words longer than a
/// line are split by character.
pub fn wrap_lines<M: TextMeasurer + ?Sized>(
    measurer: &mut M,
    text: &str,
    max_width: f64,
    font: &FontSpec,
) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() {
            let candidate = format!("{current} {word}");
            if measurer.text_width(&candidate, font) <= max_width {
                current = candidate;
                continue;
            }
            lines.push(std::mem::take(&mut current));
        }
        if measurer.text_width(word, font) <= max_width {
            current = word.to_string();
            continue;
        }
        let mut parts = break_word(measurer, word, max_width, font);
        if let Some(last) = parts.pop() {
            lines.extend(parts);
            current = last;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn break_word<M: TextMeasurer + ?Sized>(
    measurer: &mut M,
    word: &str,
    max_width: f64,
    font: &FontSpec,
) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    let mut parts = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let mut end = chars.len();
        while end > start + 1 {
            let piece: String = chars.get(start..end).unwrap_or_default().iter().collect();
            if measurer.text_width(&piece, font) <= max_width {
                break;
            }
            end -= 1;
        }
        parts.push(chars.get(start..end).unwrap_or_default().iter().collect());
        start = end;
    }
    parts
}

/// Pixel height needed to show `text` wrapped inside a cell `width` wide.
#[allow(clippy::cast_precision_loss)]
pub fn wrapped_height<M: TextMeasurer + ?Sized>(
    measurer: &mut M,
    text: &str,
    width: f64,
    style: Option<&CellStyle>,
) -> f64 {
    let font = FontSpec::from_style(style);
    let max_width = (width - 2.0 * CELL_PADDING).max(1.0);
    let lines = wrap_lines(measurer, text, max_width, &font).len().max(1);
    lines as f64 * font.line_height() + 2.0 * CELL_PADDING
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn wraps_on_words() {
        let mut measurer = ApproxTextMeasurer { advance: 1.0 };
        let font = FontSpec {
            size: 1.0,
            bold: false,
            italic: false,
        };
        let lines = wrap_lines(&mut measurer, "aaa bbb cc", 7.0, &font);
        assert_eq!(lines, vec!["aaa bbb", "cc"]);
    }

    #[test]
    fn long_words_are_broken() {
        let mut measurer = ApproxTextMeasurer { advance: 1.0 };
        let font = FontSpec {
            size: 1.0,
            bold: false,
            italic: false,
        };
        let lines = wrap_lines(&mut measurer, "abcdefgh x", 3.0, &font);
        assert_eq!(lines, vec!["abc", "def", "gh", "x"]);
    }

    #[test]
    fn wrapped_height_grows_with_lines() {
        let mut measurer = ApproxTextMeasurer::default();
        let one = wrapped_height(&mut measurer, "short", 100.0, None);
        let many = wrapped_height(
            &mut measurer,
            "a considerably longer sentence that cannot fit on one line",
            100.0,
            None,
        );
        assert!(many > one);
        assert!((one - (DEFAULT_FONT_SIZE * 1.2 + 8.0)).abs() < 1e-9);
    }

    #[test]
    fn css_font() {
        let font = FontSpec {
            size: 12.0,
            bold: true,
            italic: false,
        };
        assert_eq!(font.css(), "bold 12px Calibri, Arial, sans-serif");
    }
}
