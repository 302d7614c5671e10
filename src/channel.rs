//! One of the PCA9685's 16 PWM outputs.
//!
//! See [`PwmChannel`] for usage.

use embassy_sync::blocking_mutex::raw::{NoopRawMutex, RawMutex};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::StatefulOutputPin;
use embedded_hal::i2c::I2c;

use crate::controller::Pca9685;
use crate::register::{CHANNEL_COUNT, ChannelRegisters, FULL_OVERRIDE, MAX_STEP};
use crate::{Error, Result};

// ============================================================================
// ChannelIndex
// ============================================================================

/// A validated channel number in `0..=15`.
///
/// Controller methods accept a `ChannelIndex` or anything convertible into one (`i32`, `u8`,
/// `usize`), so out-of-range and negative numbers are reported as
/// [`Error::ChannelOutOfRange`] rather than being unrepresentable at the call site.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelIndex(u8);

impl ChannelIndex {
    /// Validate `index`.
    ///
    /// # Errors
    ///
    /// [`Error::ChannelOutOfRange`] if `index` is 16 or more.
    pub const fn new(index: u8) -> Result<Self> {
        if (index as usize) < CHANNEL_COUNT {
            Ok(Self(index))
        } else {
            Err(Error::ChannelOutOfRange {
                index: index as i64,
            })
        }
    }

    /// The channel number.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// The channel's four register addresses.
    #[must_use]
    pub const fn registers(self) -> ChannelRegisters {
        ChannelRegisters::for_index(self.0)
    }

    pub(crate) const fn slot(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<u8> for ChannelIndex {
    type Error = Error;

    fn try_from(index: u8) -> Result<Self> {
        Self::new(index)
    }
}

impl TryFrom<i32> for ChannelIndex {
    type Error = Error;

    fn try_from(index: i32) -> Result<Self> {
        u8::try_from(index)
            .map_err(|_| Error::ChannelOutOfRange {
                index: i64::from(index),
            })
            .and_then(Self::new)
    }
}

impl TryFrom<usize> for ChannelIndex {
    type Error = Error;

    fn try_from(index: usize) -> Result<Self> {
        u8::try_from(index)
            .map_err(|_| Error::ChannelOutOfRange {
                index: i64::try_from(index).unwrap_or(i64::MAX),
            })
            .and_then(Self::new)
    }
}

// ============================================================================
// PwmOutput - the capability a servo is built on
// ============================================================================

/// Raw step programming on a PWM output whose period is known.
///
/// [`PwmChannel`] implements this. [`Servo`](crate::Servo) is generic over it, so a servo can
/// sit on any output that can place a falling edge at a given step.
pub trait PwmOutput {
    /// Program the rising edge at `on` and the falling edge at `off`, both in `0..=4095`.
    ///
    /// # Errors
    ///
    /// [`Error::StepOutOfRange`] for a step above 4095, or whatever the output's transport
    /// reports.
    fn set_pwm(&mut self, on: u16, off: u16) -> Result<()>;

    /// The PWM frequency in Hertz the steps are counted against.
    ///
    /// # Errors
    ///
    /// [`Error::FrequencyNotSet`] if no frequency has been programmed yet.
    fn pwm_frequency(&self) -> Result<u32>;
}

// ============================================================================
// PwmChannel
// ============================================================================

/// A handle to one registered channel of a [`Pca9685`].
///
/// Handles are created by [`Pca9685::register_channel`] and [`Pca9685::channel`]. They borrow
/// the controller, and all register writes go through it. The last programmed on/off steps are
/// kept in the controller's registry slot, so every handle to the same channel sees the same
/// state. Once the slot is dropped with [`Pca9685::drop_channel`], writes through an old handle
/// fail with [`Error::ChannelNotRegistered`].
///
/// # Example
///
/// ```rust,ignore
/// let led = pca.register_channel(4)?;
/// led.set_pwm(0, 1024)?; // 25% duty
/// led.set_full(true)?;   // always on, counters ignored
/// led.set_full(false)?;  // always off
/// pca.drop_channel(4)?;  // the output keeps its last state
/// ```
pub struct PwmChannel<'a, I2C, OE, D, M: RawMutex = NoopRawMutex> {
    controller: &'a Pca9685<I2C, OE, D, M>,
    index: ChannelIndex,
}

impl<'a, I2C, OE, D, M> PwmChannel<'a, I2C, OE, D, M>
where
    I2C: I2c,
    OE: StatefulOutputPin,
    D: DelayNs,
    M: RawMutex,
{
    pub(crate) const fn new(controller: &'a Pca9685<I2C, OE, D, M>, index: ChannelIndex) -> Self {
        Self { controller, index }
    }

    /// This channel's number.
    #[must_use]
    pub const fn index(&self) -> ChannelIndex {
        self.index
    }

    /// The controller this channel writes through.
    #[must_use]
    pub const fn controller(&self) -> &'a Pca9685<I2C, OE, D, M> {
        self.controller
    }

    /// The last on/off steps programmed with [`set_pwm`](Self::set_pwm).
    ///
    /// # Errors
    ///
    /// [`Error::ChannelNotRegistered`] if the channel has been dropped.
    pub fn steps(&self) -> Result<(u16, u16)> {
        self.controller
            .with_slot(self.index, |_, slot| Ok((slot.on, slot.off)))
    }

    /// Place the rising edge at step `on` and the falling edge at step `off`.
    ///
    /// Writes exactly four registers, in order: `ON_L`, `ON_H`, `OFF_L`, `OFF_H`.
    ///
    /// # Errors
    ///
    /// [`Error::StepOutOfRange`] if either step is above 4095 (nothing is written),
    /// [`Error::ChannelNotRegistered`] if the channel has been dropped, or [`Error::Bus`].
    pub fn set_pwm(&self, on: u16, off: u16) -> Result<()> {
        for step in [on, off] {
            if step > MAX_STEP {
                return Err(Error::StepOutOfRange {
                    step: i64::from(step),
                });
            }
        }
        let registers = self.index.registers();
        self.controller.with_slot(self.index, |bus, slot| {
            let [on_h, on_l] = on.to_be_bytes();
            let [off_h, off_l] = off.to_be_bytes();
            bus.write_register(registers.on_l, on_l)?;
            bus.write_register(registers.on_h, on_h)?;
            bus.write_register(registers.off_l, off_l)?;
            bus.write_register(registers.off_h, off_h)?;
            slot.on = on;
            slot.off = off;
            Ok(())
        })?;
        trace!("channel {} on={} off={}", self.index.get(), on, off);
        Ok(())
    }

    /// Force the output fully on (`true`) or fully off (`false`) using the override bit.
    ///
    /// Only the two high registers are written; the stored steps are left as they were.
    ///
    /// # Errors
    ///
    /// [`Error::ChannelNotRegistered`] if the channel has been dropped, or [`Error::Bus`].
    pub fn set_full(&self, full_on: bool) -> Result<()> {
        let registers = self.index.registers();
        let (on_h, off_h) = full_values(full_on);
        self.controller.with_slot(self.index, |bus, _| {
            bus.write_register(registers.on_h, on_h)?;
            bus.write_register(registers.off_h, off_h)
        })?;
        debug!("channel {} full_on={}", self.index.get(), full_on);
        Ok(())
    }
}

impl<I2C, OE, D, M> PwmOutput for PwmChannel<'_, I2C, OE, D, M>
where
    I2C: I2c,
    OE: StatefulOutputPin,
    D: DelayNs,
    M: RawMutex,
{
    fn set_pwm(&mut self, on: u16, off: u16) -> Result<()> {
        PwmChannel::set_pwm(self, on, off)
    }

    fn pwm_frequency(&self) -> Result<u32> {
        self.controller.pwm_frequency().ok_or(Error::FrequencyNotSet)
    }
}

/// `(ON_H, OFF_H)` for a full-on or full-off override.
pub(crate) const fn full_values(full_on: bool) -> (u8, u8) {
    if full_on {
        (FULL_OVERRIDE, 0x00)
    } else {
        (0x00, FULL_OVERRIDE)
    }
}
