//! `embedded-hal` fakes shared by the host tests.
//!
//! Every fake records into one [`Log`], so a test can assert on the exact interleaving of
//! register reads, register writes, delays and pin changes.
#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::cell::RefCell;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, OutputPin, StatefulOutputPin};
use embedded_hal::i2c::{self, I2c, Operation};
use pca9685_envoy::{DEFAULT_ADDRESS, Pca9685};

/// One observable collaborator call.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Event {
    Read(u8),
    Write(u8, u8),
    DelayMs(u32),
    PinLow,
    PinHigh,
}

#[derive(Default)]
struct Shared {
    events: Vec<Event>,
    registers: Vec<u8>,
    bus_failure: Option<i2c::ErrorKind>,
    pin_failure: Option<digital::ErrorKind>,
}

/// Handle for inspecting and steering the fakes after they were moved into the controller.
#[derive(Clone)]
pub struct Log(Rc<RefCell<Shared>>);

impl Log {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(Shared {
            registers: vec![0; 256],
            ..Shared::default()
        })))
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().events.clone()
    }

    /// Only the register writes, in order.
    pub fn writes(&self) -> Vec<(u8, u8)> {
        self.0
            .borrow()
            .events
            .iter()
            .filter_map(|event| match *event {
                Event::Write(register, value) => Some((register, value)),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().events.clear();
    }

    pub fn register(&self, register: u8) -> u8 {
        self.0.borrow().registers[usize::from(register)]
    }

    pub fn preset_register(&self, register: u8, value: u8) {
        self.0.borrow_mut().registers[usize::from(register)] = value;
    }

    pub fn fail_bus(&self, kind: i2c::ErrorKind) {
        self.0.borrow_mut().bus_failure = Some(kind);
    }

    pub fn fail_pin(&self, kind: digital::ErrorKind) {
        self.0.borrow_mut().pin_failure = Some(kind);
    }

    fn record(&self, event: Event) {
        self.0.borrow_mut().events.push(event);
    }
}

// ============================================================================
// Bus
// ============================================================================

/// A register-addressed device: `[register]` sets the pointer, `[register, value]` writes.
pub struct FakeBus {
    log: Log,
    address: u8,
}

impl i2c::ErrorType for FakeBus {
    type Error = i2c::ErrorKind;
}

impl I2c for FakeBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        assert_eq!(address, self.address, "transaction sent to the wrong device");
        if let Some(kind) = self.log.0.borrow().bus_failure {
            return Err(kind);
        }
        let mut pointer = None;
        for operation in operations {
            match operation {
                Operation::Write([register]) => pointer = Some(*register),
                Operation::Write([register, value]) => {
                    self.log.preset_register(*register, *value);
                    self.log.record(Event::Write(*register, *value));
                }
                Operation::Write(bytes) => panic!("unexpected write of {} bytes", bytes.len()),
                Operation::Read(buffer) => {
                    let register = pointer.expect("read without a register pointer");
                    for byte in buffer.iter_mut() {
                        *byte = self.log.register(register);
                    }
                    self.log.record(Event::Read(register));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Pin
// ============================================================================

/// Output pin that remembers its level. Starts high (outputs disabled).
pub struct FakePin {
    log: Log,
    low: bool,
}

impl digital::ErrorType for FakePin {
    type Error = digital::ErrorKind;
}

impl FakePin {
    fn check(&self) -> Result<(), digital::ErrorKind> {
        self.log.0.borrow().pin_failure.map_or(Ok(()), Err)
    }
}

impl OutputPin for FakePin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.check()?;
        self.low = true;
        self.log.record(Event::PinLow);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.check()?;
        self.low = false;
        self.log.record(Event::PinHigh);
        Ok(())
    }
}

impl StatefulOutputPin for FakePin {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        self.check()?;
        Ok(!self.low)
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        self.check()?;
        Ok(self.low)
    }
}

// ============================================================================
// Delay
// ============================================================================

/// Delay that returns immediately and records how long it was asked to wait.
pub struct FakeDelay {
    log: Log,
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.log.record(Event::DelayMs(ns / 1_000_000));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.log.record(Event::DelayMs(ms));
    }
}

// ============================================================================
// Constructors
// ============================================================================

pub fn fakes(log: &Log, address: u8) -> (FakeBus, FakePin, FakeDelay) {
    (
        FakeBus {
            log: log.clone(),
            address,
        },
        FakePin {
            log: log.clone(),
            low: false,
        },
        FakeDelay { log: log.clone() },
    )
}

pub type TestPca9685 = Pca9685<FakeBus, FakePin, FakeDelay>;

/// A controller at the default address plus the log its fakes record into.
pub fn controller() -> (TestPca9685, Log) {
    let log = Log::new();
    let (bus, pin, delay) = fakes(&log, DEFAULT_ADDRESS);
    let pca = Pca9685::new(bus, DEFAULT_ADDRESS, pin, delay).expect("default address is valid");
    (pca, log)
}

/// A controller already running at `hz`, with the log cleared.
pub fn controller_at(hz: u32) -> (TestPca9685, Log) {
    let (pca, log) = controller();
    pca.set_pwm_frequency(hz).expect("frequency in range");
    log.clear();
    (pca, log)
}
