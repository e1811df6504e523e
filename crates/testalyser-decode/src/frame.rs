use thiserror::Error;

/// Size of one frame on the wire.
pub const FRAME_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid frame length: expected 16 bytes, got {0}")]
    InvalidLength(usize),
}

/// Two little-endian u64 values, `value1` in bytes 0..8 and `value2` in 8..16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame {
    pub value1: u64,
    pub value2: u64,
}

impl Frame {
    pub const fn new(value1: u64, value2: u64) -> Self {
        Self { value1, value2 }
    }

    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let bytes: &[u8; FRAME_LEN] = buf
            .try_into()
            .map_err(|_| DecodeError::InvalidLength(buf.len()))?;
        Ok(Self::from_bytes(bytes))
    }

    pub fn from_bytes(bytes: &[u8; FRAME_LEN]) -> Self {
        let mut lo = [0u8; 8];
        let mut hi = [0u8; 8];
        lo.copy_from_slice(&bytes[..8]);
        hi.copy_from_slice(&bytes[8..]);
        Self {
            value1: u64::from_le_bytes(lo),
            value2: u64::from_le_bytes(hi),
        }
    }

    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let mut out = [0u8; FRAME_LEN];
        out[..8].copy_from_slice(&self.value1.to_le_bytes());
        out[8..].copy_from_slice(&self.value2.to_le_bytes());
        out
    }
}

pub fn decode(buf: &[u8]) -> Result<Frame, DecodeError> {
    Frame::decode(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn decodes_stop_sentinel_bytes() {
        let bytes = [
            0x57, 0x04, 0, 0, 0, 0, 0, 0, //
            0x0F, 0x27, 0, 0, 0, 0, 0, 0,
        ];
        let frame = decode(&bytes).unwrap();
        assert_eq!(frame, Frame::new(1111, 9999));
    }

    #[test]
    fn value1_occupies_low_bytes() {
        let frame = Frame::new(0x0102_0304_0506_0708, 1);
        let bytes = frame.encode();
        assert_eq!(&bytes[..8], &[8, 7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(&bytes[8..], &[1, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn rejects_empty_and_oversized() {
        assert_eq!(decode(&[]), Err(DecodeError::InvalidLength(0)));
        assert_eq!(decode(&[0u8; 17]), Err(DecodeError::InvalidLength(17)));
    }

    proptest! {
        #[test]
        fn any_other_length_is_invalid(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            prop_assume!(bytes.len() != FRAME_LEN);
            prop_assert_eq!(decode(&bytes), Err(DecodeError::InvalidLength(bytes.len())));
        }

        #[test]
        fn sixteen_bytes_survive_reencoding(bytes in any::<[u8; 16]>()) {
            let frame = decode(&bytes).unwrap();
            prop_assert_eq!(frame.encode(), bytes);
        }
    }
}
