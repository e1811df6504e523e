use serde::{Deserialize, Serialize};

use crate::frame::Frame;

/// `(1111, 9999)`: stop the running capture.
pub const STOP: Frame = Frame::new(1111, 9999);
/// `(0, 1234)`: sent by the device once it has connected.
pub const HANDSHAKE: Frame = Frame::new(0, 1234);

/// Raw counts are reported at half the analyzer's sample resolution.
const SAMPLE_SCALE: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    Stop,
    Handshake,
    SampleReport { min_samples: u64, max_samples: u64 },
}

/// Stop is matched first, then Handshake; everything else is a sample report.
pub fn classify(frame: Frame) -> Message {
    if frame == STOP {
        Message::Stop
    } else if frame == HANDSHAKE {
        Message::Handshake
    } else {
        Message::SampleReport {
            min_samples: frame.value1.saturating_mul(SAMPLE_SCALE),
            max_samples: frame.value2.saturating_mul(SAMPLE_SCALE),
        }
    }
}
