//! Crate-wide error type.

use core::convert::Infallible;

use derive_more::{Display, Error};
use embedded_hal::{digital, i2c};

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Everything that can go wrong while driving a PCA9685.
///
/// Range, conflict and lookup errors are detected before any bus traffic. Transport errors
/// carry the HAL's [`ErrorKind`](i2c::ErrorKind) and are never retried, because a register
/// write that failed halfway may or may not have landed.
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Channel index outside `0..=15`.
    #[display("channel index {index} is outside 0..=15")]
    ChannelOutOfRange {
        /// The rejected index.
        index: i64,
    },

    /// The channel slot already holds a registered channel.
    #[display("channel {index} is already registered")]
    ChannelAlreadyRegistered {
        /// The occupied slot.
        index: u8,
    },

    /// The channel slot is empty.
    #[display("channel {index} is not registered")]
    ChannelNotRegistered {
        /// The empty slot.
        index: u8,
    },

    /// An on/off step outside `0..=4095`.
    #[display("step {step} is outside 0..=4095")]
    StepOutOfRange {
        /// The rejected step.
        step: i64,
    },

    /// A PWM frequency that is zero or needs a prescale outside `0..=255`.
    #[display("{hz} Hz needs a prescale outside 0..=255")]
    FrequencyOutOfRange {
        /// The rejected frequency in Hertz.
        hz: u32,
    },

    /// A pulse width was requested before any PWM frequency was programmed.
    #[display("PWM frequency has not been set")]
    FrequencyNotSet,

    /// A bus address that does not fit in seven bits.
    #[display("bus address {address:#04x} is not a 7-bit address")]
    AddressOutOfRange {
        /// The rejected address.
        address: u8,
    },

    /// Servo bounds with `min_us > max_us` or `max_degrees == 0`.
    #[display("servo bounds {min_us}..={max_us} µs over {max_degrees} degrees are invalid")]
    InvalidServoConfig {
        /// Minimum pulse width in microseconds.
        min_us: u16,
        /// Maximum pulse width in microseconds.
        max_us: u16,
        /// Full deflection in degrees.
        max_degrees: u16,
    },

    /// The I2C bus reported a failure.
    #[display("I2C bus error: {kind}")]
    Bus {
        /// What the HAL reported.
        kind: i2c::ErrorKind,
    },

    /// The output-enable pin reported a failure.
    #[display("output-enable pin error: {kind}")]
    Pin {
        /// What the HAL reported.
        kind: digital::ErrorKind,
    },
}

/// Lets a [`ChannelIndex`](crate::ChannelIndex) be passed where a convertible index is taken.
impl From<Infallible> for Error {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}
