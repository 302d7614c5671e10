//! A device abstraction for the PCA9685 16-channel, 12-bit PWM controller.
//!
//! See [`Pca9685`] for usage.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::{NoopRawMutex, RawMutex};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, StatefulOutputPin};
use embedded_hal::i2c::{self, I2c};

use crate::channel::{ChannelIndex, PwmChannel, full_values};
use crate::register::{
    CHANNEL_COUNT, MODE1_RESTART, MODE1_SLEEP, OSCILLATOR_HZ, Register, STEPS_PER_PERIOD,
};
use crate::servo::{Servo, ServoConfig};
use crate::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Bus address of a board with all address jumpers open.
pub const DEFAULT_ADDRESS: u8 = 0x40;

/// Time the oscillator needs after a prescale change before it may be restarted.
const PRESCALE_SETTLE_MS: u32 = 500;

/// Prescale value for a PWM frequency: `round(25 MHz / (4096 * hz)) - 1`.
///
/// # Errors
///
/// [`Error::FrequencyOutOfRange`] if `hz` is zero or the result does not fit the 8-bit
/// prescale register (roughly below 24 Hz or above 6 kHz).
pub fn prescale_for(hz: u32) -> Result<u8> {
    let out_of_range = Error::FrequencyOutOfRange { hz };
    if hz == 0 {
        return Err(out_of_range);
    }
    let divisor = u64::from(STEPS_PER_PERIOD) * u64::from(hz);
    // The quotient is never exactly x.5 for an integer frequency, so half-up is nearest.
    let rounded = (u64::from(OSCILLATOR_HZ) + divisor / 2) / divisor;
    rounded
        .checked_sub(1)
        .and_then(|prescale| u8::try_from(prescale).ok())
        .ok_or(out_of_range)
}

// ============================================================================
// Internal state
// ============================================================================

/// What the controller remembers about a registered channel.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct ChannelSlot {
    pub(crate) on: u16,
    pub(crate) off: u16,
}

/// Byte-wide register access to one device on the bus.
pub(crate) struct RegisterBus<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> RegisterBus<I2C> {
    pub(crate) fn read_register(&mut self, register: u8) -> Result<u8> {
        let mut buffer = [0_u8];
        self.i2c
            .write_read(self.address, &[register], &mut buffer)
            .map_err(bus_error)?;
        let [value] = buffer;
        Ok(value)
    }

    pub(crate) fn write_register(&mut self, register: u8, value: u8) -> Result<()> {
        self.i2c
            .write(self.address, &[register, value])
            .map_err(bus_error)
    }
}

struct State<I2C, OE, D> {
    bus: RegisterBus<I2C>,
    output_enable: OE,
    delay: D,
    pwm_frequency: Option<u32>,
    slots: [Option<ChannelSlot>; CHANNEL_COUNT],
}

fn bus_error(error: impl i2c::Error) -> Error {
    Error::Bus { kind: error.kind() }
}

fn pin_error(error: impl digital::Error) -> Error {
    Error::Pin { kind: error.kind() }
}

// ============================================================================
// Pca9685
// ============================================================================

/// A device abstraction for the PCA9685 16-channel, 12-bit PWM controller.
///
/// The controller owns the I2C bus, the output-enable pin and a blocking delay. It holds the
/// PWM frequency shared by every output and a registry of the 16 channel slots. Channels are
/// handed out as [`PwmChannel`] handles that borrow the controller, so several channels and
/// servos can be driven side by side.
///
/// # Locking
///
/// All state sits behind one [`embassy_sync`] blocking mutex. With the default
/// [`NoopRawMutex`] there is no locking and the caller serializes access. With
/// `CriticalSectionRawMutex` (see [`with_raw_mutex`](Self::with_raw_mutex)) each register burst
/// (a channel's four writes, a whole frequency change) runs in one critical section. The
/// frequency change includes its 500 ms settle delay, so interrupts stay masked that long.
///
/// # Example
///
/// ```rust,ignore
/// use pca9685_envoy::{DEFAULT_ADDRESS, Pca9685};
///
/// let pca = Pca9685::new(i2c, DEFAULT_ADDRESS, output_enable_pin, delay)?;
/// pca.set_pwm_frequency(1000)?;
/// pca.set_output_enabled(true)?;
///
/// let channel = pca.register_channel(0)?;
/// channel.set_pwm(0, 2048)?; // 50% duty
///
/// // Dropping a slot does not stop the output; switch it off first.
/// channel.set_full(false)?;
/// pca.drop_channel(0)?;
/// ```
pub struct Pca9685<I2C, OE, D, M: RawMutex = NoopRawMutex> {
    address: u8,
    state: Mutex<M, RefCell<State<I2C, OE, D>>>,
}

impl<I2C, OE, D> Pca9685<I2C, OE, D> {
    /// Create a controller for the device at `address`, for use from one execution context.
    ///
    /// The pin is taken as it is; call [`set_output_enabled`](Self::set_output_enabled) to
    /// drive it. Nothing is written to the bus.
    ///
    /// # Errors
    ///
    /// [`Error::AddressOutOfRange`] if `address` does not fit in seven bits.
    pub fn new(i2c: I2C, address: u8, output_enable: OE, delay: D) -> Result<Self> {
        Self::with_raw_mutex(i2c, address, output_enable, delay)
    }
}

impl<I2C, OE, D, M: RawMutex> Pca9685<I2C, OE, D, M> {
    /// Like [`new`](Pca9685::new), with a caller-chosen raw mutex guarding the bus.
    ///
    /// The lock is held for a whole register burst, and a
    /// [`set_pwm_frequency`](Self::set_pwm_frequency) burst includes its 500 ms settle delay.
    /// With `CriticalSectionRawMutex` on a single-core chip such as the RP2040 that means
    /// interrupts stay masked for half a second on every frequency change.
    ///
    /// # Errors
    ///
    /// [`Error::AddressOutOfRange`] if `address` does not fit in seven bits.
    pub fn with_raw_mutex(i2c: I2C, address: u8, output_enable: OE, delay: D) -> Result<Self> {
        if address > 0x7F {
            return Err(Error::AddressOutOfRange { address });
        }
        Ok(Self {
            address,
            state: Mutex::new(RefCell::new(State {
                bus: RegisterBus { i2c, address },
                output_enable,
                delay,
                pwm_frequency: None,
                slots: [None; CHANNEL_COUNT],
            })),
        })
    }

    /// The 7-bit bus address.
    #[must_use]
    pub const fn address(&self) -> u8 {
        self.address
    }

    /// The PWM frequency last programmed, or `None` before the first
    /// [`set_pwm_frequency`](Self::set_pwm_frequency).
    #[must_use]
    pub fn pwm_frequency(&self) -> Option<u32> {
        self.state.lock(|state| state.borrow().pwm_frequency)
    }

    /// Give back the bus, the output-enable pin and the delay.
    ///
    /// The chip keeps running with whatever was last programmed.
    pub fn release(self) -> (I2C, OE, D) {
        let State {
            bus,
            output_enable,
            delay,
            ..
        } = self.state.into_inner().into_inner();
        (bus.i2c, output_enable, delay)
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut State<I2C, OE, D>) -> Result<R>) -> Result<R> {
        self.state.lock(|state| f(&mut state.borrow_mut()))
    }
}

impl<I2C, OE, D, M> Pca9685<I2C, OE, D, M>
where
    I2C: I2c,
    OE: StatefulOutputPin,
    D: DelayNs,
    M: RawMutex,
{
    /// Whether outputs are enabled. OE is active-low, so this is `true` while the pin is low.
    ///
    /// # Errors
    ///
    /// [`Error::Pin`] if the pin state cannot be read.
    pub fn output_enabled(&self) -> Result<bool> {
        self.with_state(|state| state.output_enable.is_set_low().map_err(pin_error))
    }

    /// Enable (`true`, pin low) or disable (`false`, pin high) every output at once.
    ///
    /// # Errors
    ///
    /// [`Error::Pin`] if the pin cannot be driven.
    pub fn set_output_enabled(&self, enabled: bool) -> Result<()> {
        self.with_state(|state| {
            let driven = if enabled {
                state.output_enable.set_low()
            } else {
                state.output_enable.set_high()
            };
            driven.map_err(pin_error)
        })?;
        debug!("output enable={}", enabled);
        Ok(())
    }

    /// Program the PWM frequency shared by all channels.
    ///
    /// The chip is put to sleep, the prescale register is written, and after the oscillator
    /// has had 500 ms to settle the previous mode is restored with the restart bit set. The
    /// delay always runs in full; this call blocks for at least half a second.
    ///
    /// # Errors
    ///
    /// [`Error::FrequencyOutOfRange`] (before any bus traffic) if the prescale would not fit in
    /// a byte, or [`Error::Bus`]. On error the stored frequency is unchanged.
    pub fn set_pwm_frequency(&self, hz: u32) -> Result<()> {
        let prescale = prescale_for(hz)?;
        self.with_state(|state| {
            let mode1 = Register::Mode1.address();
            let old_mode = state.bus.read_register(mode1)?;
            state
                .bus
                .write_register(mode1, (old_mode & !MODE1_RESTART) | MODE1_SLEEP)?;
            state
                .bus
                .write_register(Register::Prescale.address(), prescale)?;
            state.delay.delay_ms(PRESCALE_SETTLE_MS);
            state.bus.write_register(mode1, old_mode | MODE1_RESTART)?;
            state.pwm_frequency = Some(hz);
            Ok(())
        })?;
        info!("PWM frequency {} Hz, prescale {}", hz, prescale);
        Ok(())
    }

    /// Claim channel slot `index` and return a handle to it.
    ///
    /// The slot starts with on/off steps of 0; the hardware is not touched.
    ///
    /// # Errors
    ///
    /// [`Error::ChannelOutOfRange`] or [`Error::ChannelAlreadyRegistered`].
    pub fn register_channel(
        &self,
        index: impl TryInto<ChannelIndex, Error: Into<Error>>,
    ) -> Result<PwmChannel<'_, I2C, OE, D, M>> {
        let index = index.try_into().map_err(Into::into)?;
        self.with_state(|state| {
            let slot = state
                .slots
                .get_mut(index.slot())
                .ok_or(Error::ChannelOutOfRange {
                    index: i64::from(index.get()),
                })?;
            if slot.is_some() {
                return Err(Error::ChannelAlreadyRegistered { index: index.get() });
            }
            *slot = Some(ChannelSlot::default());
            Ok(())
        })?;
        debug!("channel {} registered", index.get());
        Ok(PwmChannel::new(self, index))
    }

    /// Claim channel slot `index` and wrap it in a [`Servo`].
    ///
    /// # Errors
    ///
    /// [`Error::InvalidServoConfig`] (the slot stays free), or the errors of
    /// [`register_channel`](Self::register_channel).
    pub fn register_servo(
        &self,
        index: impl TryInto<ChannelIndex, Error: Into<Error>>,
        config: ServoConfig,
    ) -> Result<Servo<PwmChannel<'_, I2C, OE, D, M>>> {
        config.validate()?;
        Servo::new(self.register_channel(index)?, config)
    }

    /// A handle to the already registered channel `index`.
    ///
    /// # Errors
    ///
    /// [`Error::ChannelOutOfRange`] or [`Error::ChannelNotRegistered`].
    pub fn channel(
        &self,
        index: impl TryInto<ChannelIndex, Error: Into<Error>>,
    ) -> Result<PwmChannel<'_, I2C, OE, D, M>> {
        let index = index.try_into().map_err(Into::into)?;
        self.with_slot(index, |_, _| Ok(()))?;
        Ok(PwmChannel::new(self, index))
    }

    /// Whether slot `index` holds a registered channel.
    ///
    /// # Errors
    ///
    /// [`Error::ChannelOutOfRange`].
    pub fn is_registered(
        &self,
        index: impl TryInto<ChannelIndex, Error: Into<Error>>,
    ) -> Result<bool> {
        let index = index.try_into().map_err(Into::into)?;
        self.with_state(|state| {
            Ok(matches!(state.slots.get(index.slot()), Some(Some(_))))
        })
    }

    /// Free slot `index`. Freeing an empty slot is not an error.
    ///
    /// The hardware keeps driving the output as last programmed. Call
    /// [`PwmChannel::set_full`] with `false` first to leave it off.
    ///
    /// # Errors
    ///
    /// [`Error::ChannelOutOfRange`].
    pub fn drop_channel(
        &self,
        index: impl TryInto<ChannelIndex, Error: Into<Error>>,
    ) -> Result<()> {
        let index = index.try_into().map_err(Into::into)?;
        self.with_state(|state| {
            if let Some(slot) = state.slots.get_mut(index.slot()) {
                *slot = None;
            }
            Ok(())
        })?;
        debug!("channel {} dropped", index.get());
        Ok(())
    }

    /// Force all 16 outputs fully on or fully off with the `ALL_LED` registers.
    ///
    /// Two writes, whatever is registered. Stored channel steps are not changed.
    ///
    /// # Errors
    ///
    /// [`Error::Bus`].
    pub fn set_all_full(&self, full_on: bool) -> Result<()> {
        let (on_h, off_h) = full_values(full_on);
        self.with_state(|state| {
            state
                .bus
                .write_register(Register::AllLedOnH.address(), on_h)?;
            state
                .bus
                .write_register(Register::AllLedOffH.address(), off_h)
        })?;
        debug!("all channels full_on={}", full_on);
        Ok(())
    }

    /// Read one register.
    ///
    /// # Errors
    ///
    /// [`Error::Bus`].
    pub fn read_register(&self, register: impl Into<u8>) -> Result<u8> {
        let register = register.into();
        self.with_state(|state| state.bus.read_register(register))
    }

    /// Write one register.
    ///
    /// # Errors
    ///
    /// [`Error::Bus`].
    pub fn write_register(&self, register: impl Into<u8>, value: u8) -> Result<()> {
        let register = register.into();
        self.with_state(|state| state.bus.write_register(register, value))
    }

    /// Run `f` on the bus and the registry slot of `index`.
    pub(crate) fn with_slot<R>(
        &self,
        index: ChannelIndex,
        f: impl FnOnce(&mut RegisterBus<I2C>, &mut ChannelSlot) -> Result<R>,
    ) -> Result<R> {
        self.with_state(|state| {
            let State { bus, slots, .. } = state;
            let slot = slots
                .get_mut(index.slot())
                .and_then(Option::as_mut)
                .ok_or(Error::ChannelNotRegistered { index: index.get() })?;
            f(bus, slot)
        })
    }
}
