use bm257s_decode::{decode, DecodeError, Frame, RawFrame, FRAME_LEN, FRAME_START};

/// Cuts a continuous byte stream into frames.
///
/// Bytes are accumulated until a start marker sits at offset 0 and a full
/// frame is buffered. A candidate that fails validation only gives up its
/// marker byte, so a real frame starting inside it is still found.
#[derive(Debug, Default)]
pub struct FrameAligner {
    buffer: Vec<u8>,
}

impl FrameAligner {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(2 * FRAME_LEN),
        }
    }

    /// How many bytes to request next to complete the pending frame.
    pub fn need(&self) -> usize {
        FRAME_LEN.saturating_sub(self.buffer.len()).max(1)
    }

    /// Bytes held back waiting for the rest of a frame.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Adds bytes and returns every frame completed by them, oldest first.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Frame> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        loop {
            self.resync();
            let Some(result) = self.next_candidate() else {
                break;
            };
            match result {
                Ok(frame) => frames.push(frame),
                Err(e) => log::trace!("dropping candidate frame: {e}"),
            }
        }
        frames
    }

    /// Drops leading bytes until the buffer starts with a marker.
    fn resync(&mut self) {
        match self.buffer.iter().position(|&b| b == FRAME_START) {
            Some(0) => {}
            Some(offset) => {
                log::trace!("resync: skipping {offset} bytes");
                self.buffer.drain(..offset);
            }
            None => {
                if !self.buffer.is_empty() {
                    log::trace!("resync: no marker in {} bytes", self.buffer.len());
                }
                self.buffer.clear();
            }
        }
    }

    fn next_candidate(&mut self) -> Option<Result<Frame, DecodeError>> {
        let raw: RawFrame = self.buffer.get(..FRAME_LEN)?.try_into().ok()?;
        let result = decode(&raw);
        let consumed = if result.is_ok() { FRAME_LEN } else { 1 };
        self.buffer.drain(..consumed);
        Some(result)
    }
}
