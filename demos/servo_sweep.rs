#![no_std]
#![no_main]

use core::convert::Infallible;
use core::panic;

use embassy_executor::Spawner;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::i2c::{self, I2c};
use embassy_time::{Delay, Timer};
use pca9685_envoy::{DEFAULT_ADDRESS, Pca9685, Result, ServoConfig};
use {defmt::info, defmt_rtt as _, panic_probe as _};

#[embassy_executor::main]
async fn main(spawner: Spawner) -> ! {
    let err = inner_main(spawner).await.unwrap_err();
    panic!("{err}");
}

async fn inner_main(_spawner: Spawner) -> Result<Infallible> {
    let p = embassy_rp::init(Default::default());

    // PCA9685 board on I2C0: SDA on GPIO 4, SCL on GPIO 5, OE on GPIO 6.
    let i2c = I2c::new_blocking(p.I2C0, p.PIN_5, p.PIN_4, i2c::Config::default());
    let output_enable = Output::new(p.PIN_6, Level::High);
    let pca = Pca9685::new(i2c, DEFAULT_ADDRESS, output_enable, Delay)?;

    pca.set_pwm_frequency(50)?;
    pca.set_output_enabled(true)?;

    let mut servo = pca.register_servo(0, ServoConfig::default())?;
    servo.set_angle(0)?;
    Timer::after_millis(400).await;
    servo.set_angle(180)?;
    Timer::after_millis(400).await;
    servo.center()?;
    Timer::after_millis(400).await;

    // Sweep in 10 degree steps, including 180.
    loop {
        for degrees in (0..=180).step_by(10).chain((0..180).step_by(10).rev()) {
            servo.set_angle(degrees)?;
            info!("angle {} => {} us", servo.angle(), servo.pulse_width_us());
            Timer::after_millis(100).await;
        }
    }
}
