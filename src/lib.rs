//! Device abstractions for the PCA9685 16-channel, 12-bit PWM driver and the servos wired to it.
//!
//! The crate is `no_std` and talks to the chip through the `embedded-hal` 1.0 traits, so any
//! HAL that provides an I2C bus, a stateful output pin (for output-enable) and a blocking delay
//! can drive it.
//!
//! - [`Pca9685`] owns the bus and the output-enable pin, programs the PWM frequency and keeps a
//!   registry of the 16 channel slots.
//! - [`PwmChannel`] programs one slot's on/off steps, or forces it fully on or off.
//! - [`Servo`] turns an angle into a pulse width and the pulse width into steps on any
//!   [`PwmOutput`].
//!
//! # Example
//!
//! ```rust,ignore
//! use pca9685_envoy::{DEFAULT_ADDRESS, Pca9685, ServoConfig};
//!
//! let pca = Pca9685::new(i2c, DEFAULT_ADDRESS, output_enable_pin, delay)?;
//! pca.set_pwm_frequency(50)?; // blocks for the oscillator to settle
//! pca.set_output_enabled(true)?;
//!
//! let mut servo = pca.register_servo(0, ServoConfig::default())?;
//! servo.set_angle(90)?; // 1500 µs => set_pwm(0, 307) at 50 Hz
//! ```
//!
//! # Glossary
//!
//! - **Step:** one of the 4096 counter ticks in a PWM period. A channel's *on step* and
//!   *off step* place the rising and falling edges within the period.
//! - **Prescale:** the chip's clock divisor register. It sets the PWM frequency shared by all
//!   channels.
//! - **Full-on/full-off override:** bit 4 of a channel's `ON_H`/`OFF_H` register. It forces the
//!   output without using the step counters.
//! - **Output-enable (OE):** an active-low pin that enables or disables every output at once.
#![no_std]

#[macro_use]
mod fmt;

pub mod channel;
pub mod controller;
mod error;
pub mod register;
pub mod servo;

pub use crate::channel::{ChannelIndex, PwmChannel, PwmOutput};
pub use crate::controller::{DEFAULT_ADDRESS, Pca9685};
pub use crate::error::{Error, Result};
pub use crate::servo::{Servo, ServoConfig};
