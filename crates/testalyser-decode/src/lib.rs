//! Wire frames, message classification and clock drift maths for the
//! capture control channel.

pub mod assembler;
pub mod frame;
pub mod message;
pub mod ppm;

pub use assembler::{AssemblyState, FrameAssembler};
pub use frame::{decode, DecodeError, Frame, FRAME_LEN};
pub use message::{classify, Message, HANDSHAKE, STOP};
pub use ppm::{compute, DriftCalculator, DriftReport, RateError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SampleRate(pub u64); // Hz

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ClockFrequency(pub u64); // Hz

impl Default for SampleRate {
    fn default() -> Self {
        Self(500_000_000)
    }
}

impl Default for ClockFrequency {
    fn default() -> Self {
        Self(3_072_000)
    }
}
