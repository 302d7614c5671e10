//! A device abstraction for hobby positional servos on a PWM output.
//!
//! See [`Servo`] for usage.

use crate::channel::PwmOutput;
use crate::register::{MAX_STEP, STEPS_PER_PERIOD};
use crate::{Error, Result};

/// Default pulse width at 0 degrees (microseconds).
pub const SERVO_MIN_US_DEFAULT: u16 = 1_000;

/// Default pulse width at full deflection (microseconds).
pub const SERVO_MAX_US_DEFAULT: u16 = 2_000;

/// Default full deflection (degrees).
pub const SERVO_MAX_DEGREES_DEFAULT: u16 = 180;

const MICROS_PER_SECOND: i128 = 1_000_000;

/// Length of one step in microseconds at `hz`: `(1_000_000 / hz) / 4096`.
///
/// For example 50 Hz gives about 4.8828 µs.
#[must_use]
pub fn step_length_us(hz: u32) -> f64 {
    1_000_000.0 / f64::from(hz) / f64::from(STEPS_PER_PERIOD)
}

/// Steps covered by a pulse of `pulse_us` at `hz`, rounded to nearest.
///
/// Same value as `round(pulse_us / step_length_us(hz))`, computed as the exact fraction
/// `pulse_us * hz * 4096 / 1_000_000` so no precision is lost.
#[must_use]
pub fn pulse_steps(pulse_us: i32, hz: u32) -> i64 {
    let numerator = i128::from(pulse_us) * i128::from(hz) * i128::from(STEPS_PER_PERIOD);
    let half = MICROS_PER_SECOND / 2;
    let rounded = if numerator.is_negative() {
        (numerator - half) / MICROS_PER_SECOND
    } else {
        (numerator + half) / MICROS_PER_SECOND
    };
    // |pulse_us * hz * 4096| < 2^75, so the quotient always fits.
    i64::try_from(rounded).unwrap_or(i64::MAX)
}

// ============================================================================
// ServoConfig
// ============================================================================

/// Pulse-width and angle bounds for a [`Servo`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServoConfig {
    /// Pulse width at 0 degrees, in microseconds.
    pub min_us: u16,
    /// Pulse width at `max_degrees`, in microseconds.
    pub max_us: u16,
    /// Full deflection in degrees.
    pub max_degrees: u16,
    /// Pass angles and pulse widths through unclamped (for calibration).
    pub ignore_limits: bool,
}

impl ServoConfig {
    /// Bounds with limits enforced.
    #[must_use]
    pub const fn new(min_us: u16, max_us: u16, max_degrees: u16) -> Self {
        Self {
            min_us,
            max_us,
            max_degrees,
            ignore_limits: false,
        }
    }

    /// The same bounds, with clamping turned off.
    #[must_use]
    pub const fn ignoring_limits(self) -> Self {
        Self {
            ignore_limits: true,
            ..self
        }
    }

    /// Check that `min_us <= max_us` and `max_degrees > 0`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidServoConfig`].
    pub const fn validate(&self) -> Result<()> {
        if self.min_us > self.max_us || self.max_degrees == 0 {
            Err(Error::InvalidServoConfig {
                min_us: self.min_us,
                max_us: self.max_us,
                max_degrees: self.max_degrees,
            })
        } else {
            Ok(())
        }
    }
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self::new(
            SERVO_MIN_US_DEFAULT,
            SERVO_MAX_US_DEFAULT,
            SERVO_MAX_DEGREES_DEFAULT,
        )
    }
}

// ============================================================================
// Servo
// ============================================================================

/// A device abstraction for a positional servo driven by a [`PwmOutput`].
///
/// The servo keeps the rising edge at step 0 and moves the falling edge: an angle maps
/// linearly onto `min_us..=max_us`, and the pulse width becomes a step count using the
/// output's PWM frequency (50 Hz is the usual servo frame rate).
///
/// With [`ServoConfig::ignore_limits`] off, angles are clamped to `0..=max_degrees` and pulse
/// widths to `min_us..=max_us`. With it on, values pass through unchanged. Either way the value
/// actually used is what [`angle`](Self::angle) and [`pulse_width_us`](Self::pulse_width_us)
/// report afterwards. Nothing is written until the first set call.
///
/// # Example
///
/// ```rust,ignore
/// use pca9685_envoy::{Servo, ServoConfig};
///
/// pca.set_pwm_frequency(50)?;
/// let mut servo = Servo::new(pca.register_channel(0)?, ServoConfig::default())?;
///
/// servo.set_angle(90)?;          // 1500 µs, set_pwm(0, 307)
/// servo.set_angle(200)?;         // clamped to 180 => 2000 µs
/// servo.set_pulse_width_us(1250)?;
/// servo.center()?;
/// ```
pub struct Servo<C> {
    output: C,
    config: ServoConfig,
    angle: i32,
    pulse_width_us: i32,
}

impl<C: PwmOutput> Servo<C> {
    /// Wrap `output` with the given bounds.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidServoConfig`] if `min_us > max_us` or `max_degrees == 0`.
    pub fn new(output: C, config: ServoConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            output,
            config,
            angle: 0,
            pulse_width_us: i32::from(config.min_us),
        })
    }

    /// The angle last set, in degrees.
    #[must_use]
    pub const fn angle(&self) -> i32 {
        self.angle
    }

    /// The pulse width last set, in microseconds.
    #[must_use]
    pub const fn pulse_width_us(&self) -> i32 {
        self.pulse_width_us
    }

    /// The servo's bounds.
    #[must_use]
    pub const fn config(&self) -> ServoConfig {
        self.config
    }

    /// The underlying output.
    #[must_use]
    pub const fn channel(&self) -> &C {
        &self.output
    }

    /// The underlying output, mutably (for full-on/off or raw steps).
    pub const fn channel_mut(&mut self) -> &mut C {
        &mut self.output
    }

    /// Unwrap the servo, giving back the output.
    pub fn into_inner(self) -> C {
        self.output
    }

    /// Move to `degrees`: `pulse = min_us + floor(degrees * (max_us - min_us) / max_degrees)`.
    ///
    /// # Errors
    ///
    /// The errors of [`set_pulse_width_us`](Self::set_pulse_width_us).
    pub fn set_angle(&mut self, degrees: i32) -> Result<()> {
        let ServoConfig {
            min_us,
            max_us,
            max_degrees,
            ignore_limits,
        } = self.config;
        let angle = if ignore_limits {
            degrees
        } else {
            degrees.clamp(0, i32::from(max_degrees))
        };
        self.angle = angle;

        let span = i64::from(max_us) - i64::from(min_us);
        let offset = (i64::from(angle) * span).div_euclid(i64::from(max_degrees));
        let pulse = i64::from(min_us) + offset;
        let pulse = i32::try_from(pulse).unwrap_or(if pulse.is_negative() {
            i32::MIN
        } else {
            i32::MAX
        });
        debug!("servo angle {} => {} us", angle, pulse);
        self.set_pulse_width_us(pulse)
    }

    /// Set the pulse width directly, in microseconds, as `set_pwm(0, steps)`.
    ///
    /// # Errors
    ///
    /// [`Error::FrequencyNotSet`] if the output has no PWM frequency yet,
    /// [`Error::StepOutOfRange`] if the pulse does not fit in one period (possible with limits
    /// ignored, or with a frequency too high for the bounds), or whatever the output reports.
    pub fn set_pulse_width_us(&mut self, us: i32) -> Result<()> {
        let pulse = if self.config.ignore_limits {
            us
        } else {
            us.clamp(i32::from(self.config.min_us), i32::from(self.config.max_us))
        };
        self.pulse_width_us = pulse;

        let hz = self.output.pwm_frequency()?;
        let steps = pulse_steps(pulse, hz);
        let off = u16::try_from(steps)
            .ok()
            .filter(|&off| off <= MAX_STEP)
            .ok_or(Error::StepOutOfRange { step: steps })?;
        self.output.set_pwm(0, off)
    }

    /// Move to the middle of the range, `max_degrees / 2`.
    ///
    /// # Errors
    ///
    /// The errors of [`set_angle`](Self::set_angle).
    pub fn center(&mut self) -> Result<()> {
        self.set_angle(i32::from(self.config.max_degrees / 2))
    }
}
