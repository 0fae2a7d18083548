// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Boundary mark decoding.
//!
//! A boundary mark is an integer read as seven hexadecimal digits. Each digit
//! position carries one attribute (line pattern, weight, flags, colour). A
//! reference pattern matches a mark when every non-zero digit of the pattern
//! equals the mark's digit at the same position.

use smallvec::SmallVec;

/// Number of hexadecimal digits a mark is compared over.
const MARK_DIGITS: u32 = 7;

pub mod mask {
    pub const SOLID: u32 = 0x1;
    pub const BROKEN: u32 = 0x2;
    pub const SOLID_SOLID: u32 = 0x11;
    pub const BROKEN_BROKEN: u32 = 0x22;
    pub const BROKEN_SOLID: u32 = 0x12;
    pub const SOLID_BROKEN: u32 = 0x21;
    pub const CURB: u32 = 0x100;
    pub const FENCE: u32 = 0x200;
    pub const ROAD_EDGE: u32 = 0x400;
    pub const BOLD: u32 = 0x1000;
    pub const YELLOW: u32 = 0x10000;
    pub const YELLOW2: u32 = 0x20000;
    pub const YELLOW_YELLOW: u32 = 0x30000;
    pub const RED: u32 = 0x50000;
    pub const GREEN: u32 = 0x60000;
    pub const BLUE: u32 = 0x70000;

    pub const SINGLE_DASH_WHITE: u32 = BROKEN;
    pub const SINGLE_SOLID_WHITE: u32 = SOLID;
    pub const DOUBLE_SOLID_YELLOW: u32 = YELLOW | SOLID_SOLID;
}

/// Digit-wise pattern match over the low seven hex digits.
pub fn mark_matches(value: u32, pattern: u32) -> bool {
    (0..MARK_DIGITS).all(|i| {
        let shift = i * 4;
        let want = (pattern >> shift) & 0xF;
        want == 0 || (value >> shift) & 0xF == want
    })
}

/// Painted line pattern of one boundary line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinePattern {
    Solid,
    Dashed,
}

/// Paint colour of a boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkColor {
    #[default]
    White,
    Yellow,
    Red,
    Green,
    Blue,
}

impl MarkColor {
    /// Display colour as `0xRRGGBB`.
    pub fn rgb(self) -> u32 {
        match self {
            MarkColor::White => 0xF1F1F1,
            MarkColor::Yellow => 0xF1EA15,
            MarkColor::Red => 0xFC2D2D,
            MarkColor::Green => 0x00D82C,
            MarkColor::Blue => 0x0DC2EC,
        }
    }
}

/// Decoded boundary mark.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoundaryStyle {
    pub color: MarkColor,
    pub bold: bool,
    /// Zero, one or two lines. Of a double line the first one is painted on
    /// the right of the boundary direction.
    pub lines: SmallVec<[LinePattern; 2]>,
    pub curb: bool,
    pub fence: bool,
    pub road_edge: bool,
}

impl BoundaryStyle {
    /// Decode a raw mark.
    pub fn from_mask(value: u32) -> Self {
        use LinePattern::{Dashed, Solid};

        let mut lines: SmallVec<[LinePattern; 2]> = SmallVec::new();
        if value == 0 {
            return Self::default();
        }

        // Two-line patterns must be tested before the single-line ones
        // because a single digit pattern matches its double counterpart.
        let table: [(u32, &[LinePattern]); 6] = [
            (mask::SOLID_SOLID, &[Solid, Solid]),
            (mask::BROKEN_BROKEN, &[Dashed, Dashed]),
            (mask::BROKEN_SOLID, &[Dashed, Solid]),
            (mask::SOLID_BROKEN, &[Solid, Dashed]),
            (mask::BROKEN, &[Dashed]),
            (mask::SOLID, &[Solid]),
        ];
        if let Some((_, pattern)) = table.iter().find(|(m, _)| mark_matches(value, *m)) {
            lines.extend_from_slice(pattern);
        }

        let color = if [mask::YELLOW, mask::YELLOW2, mask::YELLOW_YELLOW]
            .iter()
            .any(|m| mark_matches(value, *m))
        {
            MarkColor::Yellow
        } else if mark_matches(value, mask::RED) {
            MarkColor::Red
        } else if mark_matches(value, mask::GREEN) {
            MarkColor::Green
        } else if mark_matches(value, mask::BLUE) {
            MarkColor::Blue
        } else {
            MarkColor::White
        };

        Self {
            color,
            bold: mark_matches(value, mask::BOLD),
            lines,
            curb: mark_matches(value, mask::CURB),
            fence: mark_matches(value, mask::FENCE),
            road_edge: mark_matches(value, mask::ROAD_EDGE),
        }
    }

    #[inline]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[inline]
    pub fn is_double(&self) -> bool {
        self.lines.len() == 2
    }
}
