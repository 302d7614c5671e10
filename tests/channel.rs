#![allow(missing_docs)]
//! Host-level tests for per-channel PWM programming.

mod common;

use common::{Event, controller, controller_at};
use embedded_hal::i2c;
use pca9685_envoy::register::ChannelRegisters;
use pca9685_envoy::{ChannelIndex, Error, PwmOutput};

#[test]
fn channel_registers_are_four_apart_from_0x06() {
    assert_eq!(
        ChannelIndex::new(0).map(ChannelIndex::registers),
        Ok(ChannelRegisters {
            on_l: 0x06,
            on_h: 0x07,
            off_l: 0x08,
            off_h: 0x09,
        })
    );
    assert_eq!(
        ChannelIndex::new(15).map(|index| index.registers().on_l),
        Ok(0x42)
    );
    assert_eq!(
        ChannelIndex::new(16),
        Err(Error::ChannelOutOfRange { index: 16 })
    );
    assert_eq!(
        ChannelIndex::try_from(-3),
        Err(Error::ChannelOutOfRange { index: -3 })
    );
}

#[test]
fn set_pwm_writes_low_high_pairs_in_order() {
    let (pca, log) = controller_at(50);
    let channel = pca.register_channel(3).expect("register");

    channel.set_pwm(0x123, 0xABC).expect("set");

    assert_eq!(
        log.events(),
        [
            Event::Write(0x12, 0x23),
            Event::Write(0x13, 0x01),
            Event::Write(0x14, 0xBC),
            Event::Write(0x15, 0x0A),
        ]
    );
    assert_eq!(channel.steps(), Ok((0x123, 0xABC)));
}

#[test]
fn set_pwm_accepts_full_step_range() {
    let (pca, log) = controller_at(50);
    let channel = pca.register_channel(0).expect("register");

    channel.set_pwm(4095, 0).expect("max on");

    assert_eq!(
        log.writes(),
        [(0x06, 0xFF), (0x07, 0x0F), (0x08, 0x00), (0x09, 0x00)]
    );
}

#[test]
fn step_above_4095_writes_nothing() {
    let (pca, log) = controller_at(50);
    let channel = pca.register_channel(1).expect("register");
    channel.set_pwm(10, 20).expect("set");
    log.clear();

    assert_eq!(
        channel.set_pwm(0, 4096),
        Err(Error::StepOutOfRange { step: 4096 })
    );
    assert_eq!(
        channel.set_pwm(5000, 0),
        Err(Error::StepOutOfRange { step: 5000 })
    );
    assert!(log.events().is_empty());
    assert_eq!(channel.steps(), Ok((10, 20)), "stored steps unchanged");
}

#[test]
fn set_full_touches_only_high_registers() {
    let (pca, log) = controller_at(50);
    let channel = pca.register_channel(2).expect("register");
    channel.set_pwm(100, 200).expect("set");
    log.clear();

    channel.set_full(true).expect("full on");
    channel.set_full(false).expect("full off");

    assert_eq!(
        log.writes(),
        [(0x0F, 0x10), (0x11, 0x00), (0x0F, 0x00), (0x11, 0x10)]
    );
    assert_eq!(channel.steps(), Ok((100, 200)));
}

#[test]
fn handles_to_one_channel_share_state() {
    let (pca, _log) = controller_at(50);
    let first = pca.register_channel(7).expect("register");
    let second = pca.channel(7).expect("lookup");

    first.set_pwm(0, 1024).expect("set");

    assert_eq!(second.steps(), Ok((0, 1024)));
    assert_eq!(second.index(), first.index());
    assert_eq!(second.controller().address(), pca.address());
}

#[test]
fn stale_handle_fails_after_drop_and_works_again_after_reregister() {
    let (pca, log) = controller_at(50);
    let channel = pca.register_channel(9).expect("register");
    pca.drop_channel(9).expect("drop");

    assert_eq!(
        channel.set_full(true),
        Err(Error::ChannelNotRegistered { index: 9 })
    );
    assert_eq!(
        channel.steps(),
        Err(Error::ChannelNotRegistered { index: 9 })
    );
    assert!(log.events().is_empty());

    pca.register_channel(9).expect("re-register");
    assert_eq!(channel.steps(), Ok((0, 0)), "fresh slot starts at zero");
    channel.set_pwm(0, 1).expect("old handle reaches new slot");
}

#[test]
fn bus_failure_surfaces_kind_and_keeps_steps() {
    let (pca, log) = controller_at(50);
    let channel = pca.register_channel(4).expect("register");
    log.fail_bus(i2c::ErrorKind::NoAcknowledge(
        i2c::NoAcknowledgeSource::Address,
    ));

    assert_eq!(
        channel.set_pwm(0, 500),
        Err(Error::Bus {
            kind: i2c::ErrorKind::NoAcknowledge(i2c::NoAcknowledgeSource::Address)
        })
    );
    assert_eq!(channel.steps(), Ok((0, 0)));
}

#[test]
fn pwm_output_reports_controller_frequency() {
    let (pca, _log) = controller();
    let mut channel = pca.register_channel(0).expect("register");

    assert_eq!(
        PwmOutput::pwm_frequency(&channel),
        Err(Error::FrequencyNotSet)
    );

    pca.set_pwm_frequency(60).expect("frequency");
    assert_eq!(PwmOutput::pwm_frequency(&channel), Ok(60));

    PwmOutput::set_pwm(&mut channel, 0, 2048).expect("set through trait");
    assert_eq!(channel.steps(), Ok((0, 2048)));
}
