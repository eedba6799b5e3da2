use serde::Serialize;

use crate::DecodeError;

// Bit layout used by `Segment::bits`, one bit per display segment.
const A: u8 = 1 << 0;
const B: u8 = 1 << 1;
const C: u8 = 1 << 2;
const D: u8 = 1 << 3;
const E: u8 = 1 << 4;
const F: u8 = 1 << 5;
const G: u8 = 1 << 6;

/// Every pattern the display can show.
const GLYPHS: [(u8, char); 15] = [
    (A | B | C | D | E | F, '0'),
    (B | C, '1'),
    (A | B | D | E | G, '2'),
    (A | B | C | D | G, '3'),
    (B | C | F | G, '4'),
    (A | C | D | F | G, '5'),
    (A | C | D | E | F | G, '6'),
    (A | B | C, '7'),
    (A | B | C | D | E | F | G, '8'),
    (A | B | C | D | F | G, '9'),
    (A | D | E | F, 'C'),
    (A | E | F | G, 'F'),
    (G, '-'),
    (0, ' '),
    (D | E | F, 'L'),
];

/// Occupancy of one 7-segment digit.
///
/// ```text
///  -A-
/// F   B
///  -G-
/// E   C
///  -D-
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Segment {
    pub a: bool,
    pub b: bool,
    pub c: bool,
    pub d: bool,
    pub e: bool,
    pub f: bool,
    pub g: bool,
}

impl Segment {
    /// Extracts a digit from its two wire bytes.
    pub(crate) fn from_wire(first: u8, second: u8) -> Self {
        Self {
            a: first & 0b1000 != 0,
            b: second & 0b1000 != 0,
            c: second & 0b0010 != 0,
            d: second & 0b0001 != 0,
            e: first & 0b0010 != 0,
            f: first & 0b0100 != 0,
            g: second & 0b0100 != 0,
        }
    }

    /// Flags in A..G order.
    pub fn occupancy(&self) -> [bool; 7] {
        [self.a, self.b, self.c, self.d, self.e, self.f, self.g]
    }

    /// Packs the flags into the low seven bits, A in bit 0 through G in bit 6.
    pub fn bits(&self) -> u8 {
        self.occupancy()
            .iter()
            .enumerate()
            .filter(|(_, lit)| **lit)
            .fold(0, |acc, (i, _)| acc | (1 << i))
    }

    /// Interprets the pattern as a display character.
    pub fn to_char(&self) -> Result<char, DecodeError> {
        let bits = self.bits();
        GLYPHS
            .iter()
            .find(|(pattern, _)| *pattern == bits)
            .map(|(_, ch)| *ch)
            .ok_or(DecodeError::UnknownSegmentPattern { pattern: bits })
    }
}

impl From<[bool; 7]> for Segment {
    fn from(flags: [bool; 7]) -> Self {
        let [a, b, c, d, e, f, g] = flags;
        Self { a, b, c, d, e, f, g }
    }
}
