//! On-screen text: word wrapping, styles and drawtext filter building.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Line width used for the title card.
pub const TITLE_WRAP_WIDTH: usize = 15;

/// Greedily wrap `text` into lines of at most `width` characters.
///
/// Words are never split; a word longer than `width` sits alone on its line.
/// Runs of whitespace collapse to one space.
pub fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word.chars().count() <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Escape a value placed inside single quotes in a filter argument.
///
/// Apostrophes cannot be escaped inside a quoted filter value, so they
/// become typographic apostrophes.
pub fn escape_filter_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace(':', "\\:")
        .replace('\'', "\u{2019}")
}

/// Font used for a text layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontSource {
    /// A TrueType/OpenType file
    File(PathBuf),
    /// A fontconfig family name
    Family(String),
}

impl Default for FontSource {
    fn default() -> Self {
        FontSource::Family("Sans".to_string())
    }
}

/// Horizontal alignment of the lines of a multi-line text layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

impl TextAlign {
    /// The drawtext `text_align` flag.
    pub fn as_flag(&self) -> &'static str {
        match self {
            TextAlign::Left => "L",
            TextAlign::Center => "C",
            TextAlign::Right => "R",
        }
    }
}

/// Visual style of a text layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    #[serde(default)]
    pub font: FontSource,
    pub size: u32,
    pub color: String,
    pub border_width: u32,
    pub border_color: String,
    /// Line alignment inside the text block; unset leaves ffmpeg's default
    #[serde(default)]
    pub align: Option<TextAlign>,
}

impl TextStyle {
    /// Dark text with a thin light outline, drawn on the title card.
    pub fn title() -> Self {
        Self {
            font: FontSource::default(),
            size: 60,
            color: "black".to_string(),
            border_width: 2,
            border_color: "white".to_string(),
            align: Some(TextAlign::Center),
        }
    }

    /// Large light text with a heavy dark outline, for captions.
    pub fn caption() -> Self {
        Self {
            font: FontSource::default(),
            size: 100,
            color: "white".to_string(),
            border_width: 4,
            border_color: "black".to_string(),
            align: None,
        }
    }

    pub fn with_font(mut self, font: FontSource) -> Self {
        self.font = font;
        self
    }
}

/// Screen position as ffmpeg expressions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub x: String,
    pub y: String,
}

impl Position {
    pub fn new(x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
        }
    }

    /// Centered in the frame.
    pub fn centered() -> Self {
        Self::new("(w-text_w)/2", "(h-text_h)/2")
    }

    /// Horizontally centered, `offset` pixels below the vertical center.
    pub fn centered_below(offset: u32) -> Self {
        Self::new("(w-text_w)/2", format!("{}+((h-text_h)/2)", offset))
    }

    /// Horizontally centered, with the text block centered on the line
    /// one sixth of the way down the frame. Keeps a title clear of the
    /// caption band around the vertical center.
    pub fn upper_band() -> Self {
        Self::new("(w-text_w)/2", "(h/6)-(text_h/2)")
    }

    /// Top-left corner, for image overlays.
    pub fn origin() -> Self {
        Self::new("0", "0")
    }
}

/// Time window `[start, end]` in seconds on the output timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// The `enable` option value for timeline-aware filters.
    pub fn enable_expr(&self) -> String {
        format!("'between(t,{:.3},{:.3})'", self.start, self.end)
    }
}

/// Build a `drawtext` filter (without input/output labels).
pub fn drawtext_filter(
    text: &str,
    style: &TextStyle,
    position: &Position,
    window: Option<TimeWindow>,
) -> String {
    let font = match &style.font {
        FontSource::File(path) => format!(
            "fontfile='{}'",
            escape_filter_value(&path.to_string_lossy())
        ),
        FontSource::Family(name) => format!("font='{}'", escape_filter_value(name)),
    };

    let mut filter = format!(
        "drawtext=expansion=none:text='{text}':{font}:fontsize={size}:fontcolor={color}:\
         borderw={bw}:bordercolor={bc}:x={x}:y={y}",
        text = escape_filter_value(text),
        font = font,
        size = style.size,
        color = style.color,
        bw = style.border_width,
        bc = style.border_color,
        x = position.x,
        y = position.y,
    );

    if let Some(align) = style.align {
        filter.push_str(":text_align=");
        filter.push_str(align.as_flag());
    }

    if let Some(window) = window {
        filter.push_str(":enable=");
        filter.push_str(&window.enable_expr());
    }

    filter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_words_greedy() {
        assert_eq!(
            wrap_words("What is the worst thing you have ever done", 15),
            vec!["What is the", "worst thing you", "have ever done"]
        );
        assert_eq!(wrap_words("", 15), Vec::<String>::new());
        assert_eq!(wrap_words("   spaced    out   ", 15), vec!["spaced out"]);
    }

    #[test]
    fn test_wrap_words_long_word_alone() {
        let lines = wrap_words("a supercalifragilistic word", 15);
        assert_eq!(lines, vec!["a", "supercalifragilistic", "word"]);
    }

    #[test]
    fn test_wrap_words_properties() {
        let text = "Reddit, what is something that everyone should know how to do but \
                    surprisingly few people actually can? Incomprehensibilities abound.";
        for width in [1, 5, 10, 15, 40] {
            let lines = wrap_words(text, width);
            for line in &lines {
                let words: Vec<&str> = line.split(' ').collect();
                assert!(line.chars().count() <= width || words.len() == 1, "{:?}", line);
            }
            // Words survive intact and in order
            assert_eq!(
                lines.join(" ").split(' ').collect::<Vec<_>>(),
                text.split_whitespace().collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn test_wrap_counts_characters_not_bytes() {
        assert_eq!(wrap_words("café café café", 9), vec!["café café", "café"]);
    }

    #[test]
    fn test_escape_filter_value() {
        assert_eq!(escape_filter_value("What's up: now"), "What\u{2019}s up\\: now");
        assert_eq!(escape_filter_value("C:\\fonts"), "C\\:\\\\fonts");
        assert_eq!(escape_filter_value("100% real"), "100% real");
    }

    #[test]
    fn test_drawtext_filter() {
        let filter = drawtext_filter(
            "hello world",
            &TextStyle::caption(),
            &Position::centered_below(20),
            Some(TimeWindow::new(1.5, 3.0)),
        );
        assert!(filter.starts_with("drawtext=expansion=none:text='hello world'"));
        assert!(filter.contains("fontsize=100"));
        assert!(filter.contains("borderw=4:bordercolor=black"));
        assert!(filter.contains("y=20+((h-text_h)/2)"));
        assert!(filter.ends_with(":enable='between(t,1.500,3.000)'"));
    }

    #[test]
    fn test_drawtext_font_file() {
        let style = TextStyle::title().with_font(FontSource::File(PathBuf::from("/fonts/verdana.ttf")));
        let filter = drawtext_filter("t", &style, &Position::centered(), None);
        assert!(filter.contains("fontfile='/fonts/verdana.ttf'"));
        assert!(!filter.contains("enable"));
    }

    #[test]
    fn test_title_lines_are_centered() {
        let filter = drawtext_filter("line one\nline two", &TextStyle::title(), &Position::centered(), None);
        assert!(filter.ends_with(":text_align=C"));

        let caption = drawtext_filter("hi", &TextStyle::caption(), &Position::centered(), None);
        assert!(!caption.contains("text_align"));
    }

    #[test]
    fn test_align_precedes_enable() {
        let style = TextStyle {
            align: Some(TextAlign::Right),
            ..TextStyle::caption()
        };
        let filter = drawtext_filter("hi", &style, &Position::centered(), Some(TimeWindow::new(0.0, 1.0)));
        assert!(filter.contains(":text_align=R:enable='between(t,0.000,1.000)'"));
    }

    #[test]
    fn test_upper_band_sits_above_captions() {
        let title = Position::upper_band();
        let caption = Position::centered_below(20);
        assert_eq!(title.x, caption.x);
        assert_ne!(title.y, caption.y);
        assert_eq!(title.y, "(h/6)-(text_h/2)");
    }
}
