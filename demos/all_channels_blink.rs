#![no_std]
#![no_main]

use core::convert::Infallible;
use core::panic;

use embassy_executor::Spawner;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::i2c::{self, I2c};
use embassy_time::{Delay, Timer};
use pca9685_envoy::{DEFAULT_ADDRESS, Pca9685, Result};
use {defmt::info, defmt_rtt as _, panic_probe as _};

#[embassy_executor::main]
async fn main(spawner: Spawner) -> ! {
    let err = inner_main(spawner).await.unwrap_err();
    panic!("{err}");
}

async fn inner_main(_spawner: Spawner) -> Result<Infallible> {
    let p = embassy_rp::init(Default::default());

    // LEDs on all 16 outputs of a PCA9685 board on I2C0 (SDA GPIO 4, SCL GPIO 5, OE GPIO 6).
    let i2c = I2c::new_blocking(p.I2C0, p.PIN_5, p.PIN_4, i2c::Config::default());
    let output_enable = Output::new(p.PIN_6, Level::High);
    let pca = Pca9685::new(i2c, DEFAULT_ADDRESS, output_enable, Delay)?;

    pca.set_pwm_frequency(1000)?;
    pca.set_output_enabled(true)?;

    // Three blinks with the ALL_LED registers.
    for _ in 0..3 {
        pca.set_all_full(true)?;
        Timer::after_millis(250).await;
        pca.set_all_full(false)?;
        Timer::after_millis(250).await;
    }

    // Then a dimming ramp, one channel brighter than the next.
    let mut channels = [const { None }; 16];
    for (index, slot) in channels.iter_mut().enumerate() {
        *slot = Some(pca.register_channel(index)?);
    }
    loop {
        for level in (0..16_u16).chain((0..15).rev()) {
            for (index, channel) in channels.iter().flatten().enumerate() {
                let offset = u16::try_from(index).unwrap_or_default();
                let duty = ((level + offset) % 16) * 256;
                channel.set_pwm(0, duty)?;
            }
            info!("ramp level {}", level);
            Timer::after_millis(60).await;
        }
    }
}
