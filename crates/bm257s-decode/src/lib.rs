//! Decoding of the 15-byte frame sent by Brymen BM257s multimeters.

pub mod frame;
pub mod segment;
pub mod symbol;

pub use frame::{decode, validate, Frame, RawFrame, FRAME_LEN, FRAME_START};
pub use segment::Segment;
pub use symbol::{Symbol, SymbolSet};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid byte index at byte {index}: found {found}")]
    Framing { index: usize, found: u8 },
    #[error("frame must be {} bytes, got {len}", FRAME_LEN)]
    Length { len: usize },
    #[error("unknown segment pattern {pattern:#09b}")]
    UnknownSegmentPattern { pattern: u8 },
}
