use serde::Serialize;

use crate::segment::Segment;
use crate::symbol::{extract_symbols, Symbol, SymbolSet};
use crate::DecodeError;

/// Length of one frame on the wire.
pub const FRAME_LEN: usize = 15;

/// First byte of every frame: index tag 0, empty payload.
pub const FRAME_START: u8 = 0b0000_0010;

pub const SEGMENT_COUNT: usize = 4;
pub const DOT_COUNT: usize = SEGMENT_COUNT - 1;

/// Undecoded frame bytes, aligned to the start marker.
pub type RawFrame = [u8; FRAME_LEN];

/// One decoded display state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frame {
    segments: [Segment; SEGMENT_COUNT],
    dots: [bool; DOT_COUNT],
    sign: bool,
    symbols: SymbolSet,
}

/// Checks that every byte carries its own index in the high nibble.
pub fn validate(raw: &RawFrame) -> Result<(), DecodeError> {
    for (index, byte) in raw.iter().enumerate() {
        let found = byte >> 4;
        if usize::from(found) != index {
            return Err(DecodeError::Framing { index, found });
        }
    }
    Ok(())
}

/// Decodes an aligned frame. Pure; no state is kept between calls.
pub fn decode(raw: &RawFrame) -> Result<Frame, DecodeError> {
    validate(raw)?;

    let segments = std::array::from_fn(|p| Segment::from_wire(raw[3 + 2 * p], raw[4 + 2 * p]));
    let dots = std::array::from_fn(|d| raw[5 + 2 * d] & 1 != 0);

    Ok(Frame {
        segments,
        dots,
        sign: raw[3] & 1 != 0,
        symbols: extract_symbols(raw),
    })
}

impl TryFrom<&[u8]> for Frame {
    type Error = DecodeError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let raw: &RawFrame = bytes
            .try_into()
            .map_err(|_| DecodeError::Length { len: bytes.len() })?;
        decode(raw)
    }
}

impl Frame {
    pub fn segments(&self) -> &[Segment; SEGMENT_COUNT] {
        &self.segments
    }

    /// `dots()[i]` is the decimal point right of segment `i`.
    pub fn dots(&self) -> &[bool; DOT_COUNT] {
        &self.dots
    }

    /// True for a negative reading.
    pub fn sign(&self) -> bool {
        self.sign
    }

    pub fn symbols(&self) -> &SymbolSet {
        &self.symbols
    }

    pub fn has(&self, symbol: Symbol) -> bool {
        self.symbols.contains(&symbol)
    }

    /// Renders the digits with decimal points, without the sign.
    pub fn segment_string(&self) -> Result<String, DecodeError> {
        let mut out = String::with_capacity(SEGMENT_COUNT + DOT_COUNT);
        for (i, segment) in self.segments.iter().enumerate() {
            out.push(segment.to_char()?);
            if self.dots.get(i).copied().unwrap_or(false) {
                out.push('.');
            }
        }
        Ok(out)
    }

    /// Renders the digits as shown on the LCD, including a leading minus.
    pub fn display_string(&self) -> Result<String, DecodeError> {
        let digits = self.segment_string()?;
        Ok(if self.sign { format!("-{digits}") } else { digits })
    }

    /// Numeric reading, or `None` when the display does not show a number
    /// (overload, dashes, a unit letter).
    pub fn value(&self) -> Result<Option<f64>, DecodeError> {
        Ok(parse_reading(&self.segment_string()?, self.sign))
    }
}

/// Parses rendered digits, blanks allowed around them.
pub fn parse_reading(digits: &str, negative: bool) -> Option<f64> {
    let trimmed = digits.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    let value: f64 = trimmed.parse().ok()?;
    Some(if negative { -value } else { value })
}
