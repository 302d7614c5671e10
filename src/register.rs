//! PCA9685 register map and chip constants.
//!
//! Each channel owns four consecutive registers starting at
//! `LED0_ON_L + 4 * channel`: on-low, on-high, off-low, off-high.
//! The `ALL_LED_*` block mirrors that layout and writes every channel at once.

/// Number of PWM channels on the chip.
pub const CHANNEL_COUNT: usize = 16;

/// Counter ticks per PWM period.
pub const STEPS_PER_PERIOD: u32 = 4096;

/// Largest on/off step a channel accepts.
pub const MAX_STEP: u16 = 4095;

/// Frequency of the chip's internal oscillator.
pub const OSCILLATOR_HZ: u32 = 25_000_000;

/// Bit 4 of `ON_H`/`OFF_H`: forces the output fully on or fully off.
pub const FULL_OVERRIDE: u8 = 0x10;

/// `MODE1` bit that restarts the PWM channels after sleep.
pub const MODE1_RESTART: u8 = 0x80;

/// `MODE1` bit that puts the oscillator to sleep. Prescale is only writable while asleep.
pub const MODE1_SLEEP: u8 = 0x10;

/// Fixed-address control registers.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Register {
    /// Mode register 1 (sleep, restart, auto-increment).
    Mode1 = 0x00,
    /// Channel 0 on step, low byte.
    Led0OnL = 0x06,
    /// Channel 0 on step, high nibble plus full-on bit.
    Led0OnH = 0x07,
    /// Channel 0 off step, low byte.
    Led0OffL = 0x08,
    /// Channel 0 off step, high nibble plus full-off bit.
    Led0OffH = 0x09,
    /// All channels on step, low byte (write-only).
    AllLedOnL = 0xFA,
    /// All channels on step, high nibble plus full-on bit (write-only).
    AllLedOnH = 0xFB,
    /// All channels off step, low byte (write-only).
    AllLedOffL = 0xFC,
    /// All channels off step, high nibble plus full-off bit (write-only).
    AllLedOffH = 0xFD,
    /// Clock prescaler.
    Prescale = 0xFE,
}

impl Register {
    /// The register's address on the chip.
    #[must_use]
    pub const fn address(self) -> u8 {
        self as u8
    }
}

impl From<Register> for u8 {
    fn from(register: Register) -> Self {
        register.address()
    }
}

/// The four register addresses that belong to one channel.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelRegisters {
    /// On step, low byte.
    pub on_l: u8,
    /// On step, high nibble plus full-on bit.
    pub on_h: u8,
    /// Off step, low byte.
    pub off_l: u8,
    /// Off step, high nibble plus full-off bit.
    pub off_h: u8,
}

impl ChannelRegisters {
    /// Registers for channel `index`. `index` must already be known to be below 16.
    #[must_use]
    pub(crate) const fn for_index(index: u8) -> Self {
        let base = Register::Led0OnL.address() + 4 * index;
        Self {
            on_l: base,
            on_h: base + 1,
            off_l: base + 2,
            off_h: base + 3,
        }
    }
}
