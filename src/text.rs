//! Text page queries
//!
//! A [`TextPage`] indexes the character stream the engine extracted from one
//! page. All queries are answered from that snapshot; the page itself is not
//! consulted again.
//!
//! Indices are `i32` because that is what hosts pass in. Negative or
//! out-of-range indices never panic, they produce neutral answers.

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::engine::TextChar;
use crate::geometry::RectF;

/// Glyph box in page space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CharBox {
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
}

impl CharBox {
    pub fn new(left: f64, right: f64, bottom: f64, top: f64) -> Self {
        Self {
            left,
            right,
            bottom,
            top,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.left + self.right) / 2.0, (self.bottom + self.top) / 2.0)
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x <= self.right && y >= self.bottom && y <= self.top
    }

    /// Per-axis distance from a point to the box (zero inside)
    fn distance(&self, x: f64, y: f64) -> (f64, f64) {
        let dx = (self.left - x).max(x - self.right).max(0.0);
        let dy = (self.bottom - y).max(y - self.top).max(0.0);
        (dx, dy)
    }

    pub fn to_rect(self) -> RectF {
        RectF::new(self.left, self.top, self.right, self.bottom)
    }
}

/// Extracted text of one page
#[derive(Debug, Clone, Default)]
pub struct TextPage {
    chars: Vec<TextChar>,
    /// Result of the last `count_rects`
    rects: Vec<RectF>,
}

impl TextPage {
    pub fn new(chars: Vec<TextChar>) -> Self {
        Self {
            chars,
            rects: Vec::new(),
        }
    }

    pub fn count_chars(&self) -> usize {
        self.chars.len()
    }

    fn char_at(&self, index: i32) -> Option<&TextChar> {
        usize::try_from(index).ok().and_then(|i| self.chars.get(i))
    }

    /// Codepoint of the character at `index`
    pub fn unicode(&self, index: i32) -> Option<u32> {
        self.char_at(index).map(|c| c.unicode)
    }

    pub fn char_box(&self, index: i32) -> Option<CharBox> {
        self.char_at(index).map(|c| c.bounds)
    }

    /// Index of the character at a page-space position
    ///
    /// A character whose box contains the point wins. Otherwise the nearest
    /// character within `x_tolerance` horizontally and `y_tolerance`
    /// vertically is chosen.
    pub fn char_index_at_pos(
        &self,
        x: f64,
        y: f64,
        x_tolerance: f64,
        y_tolerance: f64,
    ) -> Option<usize> {
        let drawn = || self.chars.iter().enumerate().filter(|(_, c)| !c.generated);

        if let Some((index, _)) = drawn().find(|(_, c)| c.bounds.contains(x, y)) {
            return Some(index);
        }

        drawn()
            .filter_map(|(index, c)| {
                let (dx, dy) = c.bounds.distance(x, y);
                (dx <= x_tolerance && dy <= y_tolerance).then_some((index, dx * dx + dy * dy))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    /// Character range for a start index and count (`count < 0` means to the end)
    fn range(&self, start: i32, count: i32) -> Range<usize> {
        let len = self.chars.len();
        let start = match usize::try_from(start) {
            Ok(start) if start < len => start,
            _ => return 0..0,
        };
        let end = match usize::try_from(count) {
            Ok(count) => start.saturating_add(count).min(len),
            Err(_) => len,
        };
        start..end
    }

    fn utf16_units(&self, range: Range<usize>) -> impl Iterator<Item = u16> + '_ {
        self.chars[range].iter().flat_map(|c| {
            let ch = char::from_u32(c.unicode).unwrap_or(char::REPLACEMENT_CHARACTER);
            let mut units = [0u16; 2];
            let len = ch.encode_utf16(&mut units).len();
            units.into_iter().take(len)
        })
    }

    /// Write UTF-16 text for a character range followed by a NUL
    ///
    /// Returns the number of units written including the terminator, or 0
    /// when nothing fits.
    pub fn text_range(&self, start: i32, count: i32, out: &mut [u16]) -> usize {
        if out.is_empty() {
            return 0;
        }
        let room = out.len() - 1;
        let mut written = 0;
        for unit in self.utf16_units(self.range(start, count)).take(room) {
            out[written] = unit;
            written += 1;
        }
        out[written] = 0;
        written + 1
    }

    pub fn text_range_string(&self, start: i32, count: i32) -> String {
        let units: Vec<u16> = self.utf16_units(self.range(start, count)).collect();
        String::from_utf16_lossy(&units)
    }

    /// Whole page text
    pub fn text(&self) -> String {
        self.text_range_string(0, -1)
    }

    /// Text of the characters whose box center lies inside `rect`
    ///
    /// Always returns the full length in UTF-16 units; copies as much as
    /// fits when a buffer is given.
    pub fn bounded_text(&self, rect: RectF, out: Option<&mut [u16]>) -> usize {
        let units: Vec<u16> = self
            .chars
            .iter()
            .filter(|c| {
                let (cx, cy) = c.bounds.center();
                !c.generated && rect.contains(cx, cy)
            })
            .flat_map(|c| {
                let ch = char::from_u32(c.unicode).unwrap_or(char::REPLACEMENT_CHARACTER);
                let mut buf = [0u16; 2];
                let len = ch.encode_utf16(&mut buf).len();
                buf.into_iter().take(len)
            })
            .collect();

        if let Some(out) = out {
            let n = out.len().min(units.len());
            out[..n].copy_from_slice(&units[..n]);
        }
        units.len()
    }

    /// Merge the range into one rectangle per run of characters on a line
    ///
    /// The rectangles are kept for [`TextPage::rect`].
    pub fn count_rects(&mut self, start: i32, count: i32) -> usize {
        let range = self.range(start, count);
        let mut rects: Vec<RectF> = Vec::new();
        let mut current_line = None;

        for c in &self.chars[range] {
            if c.generated {
                current_line = None;
                continue;
            }
            let rect = c.bounds.to_rect();
            match (current_line, rects.last_mut()) {
                (Some(line), Some(last)) if line == c.line => *last = last.union(&rect),
                _ => rects.push(rect),
            }
            current_line = Some(c.line);
        }

        self.rects = rects;
        self.rects.len()
    }

    /// Rectangle from the last `count_rects` call
    pub fn rect(&self, index: i32) -> Option<RectF> {
        usize::try_from(index).ok().and_then(|i| self.rects.get(i).copied())
    }
}
