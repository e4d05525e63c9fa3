//! Four ESCs on GPIO 2..=5, standard PWM at 400 Hz, free running.
//! Ramps all motors from idle to 1300 µs and back, staggered per channel.

#![no_std]
#![no_main]
#![cfg(not(feature = "host"))]

use core::{convert::Infallible, panic};
use embassy_executor::Spawner;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::interrupt;
use embassy_time::Timer;
use esc_envoy::{
    Result,
    driver::{EscDriver, EscDriverStatic},
    hal::rp::RpEscHal,
    protocol::EscProtocol,
};
use {defmt::info, defmt_rtt as _, panic_probe as _};

const MOTOR_COUNT: usize = 4;
const IDLE_US: u16 = 1_000;
const TOP_US: u16 = 1_300;
const RAMP_US: u16 = TOP_US - IDLE_US;

static ESC_STATIC: EscDriverStatic<RpEscHal<MOTOR_COUNT>, MOTOR_COUNT> = EscDriver::new_static();

#[cfg(feature = "pico1")]
#[interrupt]
fn TIMER_IRQ_1() {
    RpEscHal::<MOTOR_COUNT>::acknowledge_timer_interrupt();
    ESC_STATIC.on_timer_interrupt();
}

#[cfg(feature = "pico2")]
#[interrupt]
fn TIMER0_IRQ_1() {
    RpEscHal::<MOTOR_COUNT>::acknowledge_timer_interrupt();
    ESC_STATIC.on_timer_interrupt();
}

#[embassy_executor::main]
async fn main(spawner: Spawner) -> ! {
    let err = inner_main(spawner).await.unwrap_err();
    panic!("{err}");
}

async fn inner_main(_spawner: Spawner) -> Result<Infallible> {
    let p = embassy_rp::init(Default::default());

    let hal = RpEscHal::new([
        Output::new(p.PIN_2, Level::Low),
        Output::new(p.PIN_3, Level::Low),
        Output::new(p.PIN_4, Level::Low),
        Output::new(p.PIN_5, Level::Low),
    ]);
    let esc = EscDriver::new(&ESC_STATIC, hal)?;
    for (channel, pin) in (0u8..).take(MOTOR_COUNT).enumerate() {
        esc.attach(channel, pin, IDLE_US)?;
    }
    esc.begin(EscProtocol::Pwm, true, 400)?;
    info!("ESC output running: {}", esc.config()?);

    // ESCs arm on a steady idle signal.
    Timer::after_secs(3).await;

    loop {
        for step in (0..=RAMP_US).step_by(10).chain((0..=RAMP_US).rev().step_by(10)) {
            for (channel, stagger) in (0..MOTOR_COUNT).zip((0u16..).step_by(25)) {
                let width = IDLE_US.saturating_add(step).saturating_sub(stagger);
                esc.write(channel, width.max(IDLE_US))?;
            }
            Timer::after_millis(20).await;
        }
    }
}
