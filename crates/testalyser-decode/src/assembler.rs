//! Per-connection accumulation of partial frames.

use crate::frame::{DecodeError, Frame, FRAME_LEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyState {
    /// Fewer than [`FRAME_LEN`] bytes held.
    Accumulating(usize),
    FrameReady,
}

/// Fixed 16-byte buffer that is filled by the reader and emptied after each
/// completed frame, whether or not the frame decodes.
///
/// Only the missing tail is ever exposed for reading, so bytes of the next
/// frame are never pulled in early.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    buf: [u8; FRAME_LEN],
    held: usize,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AssemblyState {
        if self.held == FRAME_LEN {
            AssemblyState::FrameReady
        } else {
            AssemblyState::Accumulating(self.held)
        }
    }

    pub fn held(&self) -> usize {
        self.held
    }

    /// Unfilled part of the buffer; read into this, then call [`advance`](Self::advance).
    pub fn spare(&mut self) -> &mut [u8] {
        &mut self.buf[self.held..]
    }

    /// Record `n` freshly read bytes. Returns the decoded frame once the
    /// buffer is full and clears it.
    pub fn advance(&mut self, n: usize) -> Option<Result<Frame, DecodeError>> {
        self.held = (self.held + n).min(FRAME_LEN);
        match self.state() {
            AssemblyState::FrameReady => Some(self.take()),
            AssemblyState::Accumulating(_) => None,
        }
    }

    pub fn clear(&mut self) {
        self.held = 0;
    }

    fn take(&mut self) -> Result<Frame, DecodeError> {
        let result = Frame::decode(&self.buf[..self.held]);
        self.clear();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feeds `data` the way a socket reader does, at most `spare()` bytes
    /// per read.
    fn feed(asm: &mut FrameAssembler, mut data: &[u8]) -> Vec<Result<Frame, DecodeError>> {
        let mut out = Vec::new();
        while !data.is_empty() {
            let spare = asm.spare();
            let n = spare.len().min(data.len());
            spare[..n].copy_from_slice(&data[..n]);
            data = &data[n..];
            out.extend(asm.advance(n));
        }
        out
    }

    #[test]
    fn partial_data_is_held_not_decoded() {
        let mut asm = FrameAssembler::new();
        assert!(feed(&mut asm, &[1, 2, 3, 4, 5]).is_empty());
        assert_eq!(asm.state(), AssemblyState::Accumulating(5));
        assert_eq!(asm.spare().len(), FRAME_LEN - 5);
    }

    #[test]
    fn completes_across_reads_and_resets() {
        let bytes = Frame::new(42, 7).encode();
        let mut asm = FrameAssembler::new();
        assert!(feed(&mut asm, &bytes[..10]).is_empty());
        let frames = feed(&mut asm, &bytes[10..]);
        assert_eq!(frames, vec![Ok(Frame::new(42, 7))]);
        assert_eq!(asm.state(), AssemblyState::Accumulating(0));
    }

    #[test]
    fn splits_back_to_back_frames_in_order() {
        let mut stream = Frame::new(1, 2).encode().to_vec();
        stream.extend_from_slice(&Frame::new(3, 4).encode());
        stream.extend_from_slice(&[9, 9]);
        let mut asm = FrameAssembler::new();
        let frames = feed(&mut asm, &stream);
        assert_eq!(frames, vec![Ok(Frame::new(1, 2)), Ok(Frame::new(3, 4))]);
        assert_eq!(asm.held(), 2);
    }

    #[test]
    fn advance_via_spare() {
        let bytes = Frame::new(5, 6).encode();
        let mut asm = FrameAssembler::new();
        asm.spare()[..16].copy_from_slice(&bytes);
        assert_eq!(asm.advance(16), Some(Ok(Frame::new(5, 6))));
        assert_eq!(asm.held(), 0);
    }
}
