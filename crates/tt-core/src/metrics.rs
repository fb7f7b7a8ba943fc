//! Rendered text width, used to place the suggestion overlay after the text.

use unicode_width::UnicodeWidthStr;

use crate::config::MetricsConfig;

/// A CSS `font` shorthand reduced to what width estimation needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Font {
    pub size_px: f64,
    pub family: String,
}

const ROOT_FONT_PX: f64 = 16.0;

impl Font {
    /// Parse a computed `font` shorthand such as `"italic 400 14px/20px Arial, sans-serif"`.
    ///
    /// The size token is the first one that ends in a length unit (optionally
    /// followed by `/line-height`); everything after it is the family list.
    /// Without a usable size, `default_px` is used.
    pub fn parse(shorthand: &str, default_px: f64) -> Self {
        let tokens: Vec<&str> = shorthand.split_whitespace().collect();
        for (i, token) in tokens.iter().enumerate() {
            let size_part = token.split('/').next().unwrap_or(token);
            if let Some(px) = parse_length(size_part) {
                return Self {
                    size_px: px,
                    family: tokens[i + 1..].join(" "),
                };
            }
        }
        Self {
            size_px: default_px,
            family: String::new(),
        }
    }
}

fn parse_length(token: &str) -> Option<f64> {
    let (number, scale) = if let Some(n) = token.strip_suffix("px") {
        (n, 1.0)
    } else if let Some(n) = token.strip_suffix("pt") {
        (n, 4.0 / 3.0)
    } else if let Some(n) = token.strip_suffix("rem") {
        (n, ROOT_FONT_PX)
    } else if let Some(n) = token.strip_suffix("em") {
        (n, ROOT_FONT_PX)
    } else if let Some(n) = token.strip_suffix('%') {
        (n, ROOT_FONT_PX / 100.0)
    } else {
        return None;
    };
    let value: f64 = number.parse().ok()?;
    (value.is_finite() && value > 0.0).then_some(value * scale)
}

/// Measures the pixel width of a text run under a font.
pub trait TextMeasurer: Send + Sync {
    fn measure(&self, text: &str, font: &str) -> f64;
}

/// Width estimate from Unicode display cells: each cell advances a fixed
/// fraction of the font size. Wide (CJK) characters count as two cells.
#[derive(Debug, Clone)]
pub struct EstimatingMeasurer {
    default_font_px: f64,
    advance_em: f64,
}

impl EstimatingMeasurer {
    pub fn new(config: &MetricsConfig) -> Self {
        Self {
            default_font_px: config.default_font_px,
            advance_em: config.advance_em,
        }
    }
}

impl TextMeasurer for EstimatingMeasurer {
    fn measure(&self, text: &str, font: &str) -> f64 {
        // Only the last line is on the caret's row.
        let line = text.rsplit('\n').next().unwrap_or(text);
        let font = Font::parse(font, self.default_font_px);
        line.width() as f64 * font.size_px * self.advance_em
    }
}
