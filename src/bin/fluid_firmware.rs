//! Fluid Bridge firmware for the Raspberry Pi Pico 2 (RP2350)
//!
//! Serves READ/PRINT commands for the A0/A1 analog inputs and an SLF3S
//! liquid flow sensor over USB CDC.
//!
//! # Hardware
//!
//! - A0: GPIO26 (ADC0), A1: GPIO27 (ADC1)
//! - SLF3S on I2C0 (QWIIC: GPIO4=SDA, GPIO5=SCL)
//! - Status LED: GPIO25
//!
//! # Usage
//!
//! ```bash
//! cargo run --release --features rp --bin fluid_firmware --target thumbv8m.main-none-eabihf
//! cargo run --features std --bin fluid_host -- poll --csv
//! ```

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::adc::{Adc, Channel as AdcChannel};
use embassy_rp::gpio::{Level, Output, Pull};
use embassy_rp::i2c::{self, I2c};
use embassy_rp::usb::{Driver, InterruptHandler as UsbInterruptHandler};
use embassy_rp::{bind_interrupts, peripherals};
use embassy_time::{Duration, Timer};
use embassy_usb::class::cdc_acm::{CdcAcmClass, State};
use embassy_usb::{Builder, Config};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use fluid_bridge::adapters::{Rp2350AnalogInputs, Slf3sAdapter, UsbCdcAdapter};
use fluid_bridge::config::{FlowSensorConfig, ServerConfig};
use fluid_bridge::dispatcher::Dispatcher;
use fluid_bridge::ports::{CommunicationError, CommunicationPort};
use fluid_bridge::server::{bring_up, CommandServer, TickOutcome};

#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: embassy_rp::block::ImageDef = embassy_rp::block::ImageDef::secure_exe();

bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => UsbInterruptHandler<peripherals::USB>;
    I2C0_IRQ => i2c::InterruptHandler<peripherals::I2C0>;
});

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("=== Fluid Bridge ===");
    let server_config = ServerConfig::default();

    let p = embassy_rp::init(Default::default());
    let mut led = Output::new(p.PIN_25, Level::Low);

    // Setup USB
    info!("Setting up USB...");
    let driver = Driver::new(p.USB, Irqs);

    let mut config = Config::new(0x2e8a, 0x000a);
    config.manufacturer = Some("Raspberry Pi");
    config.product = Some("Fluid Bridge");
    config.serial_number = Some("FLUID001");
    config.max_power = 100;
    config.max_packet_size_0 = 64;

    static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
    static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
    static MSOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
    static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();
    static STATE: StaticCell<State> = StaticCell::new();

    let mut builder = Builder::new(
        driver,
        config,
        CONFIG_DESCRIPTOR.init([0; 256]),
        BOS_DESCRIPTOR.init([0; 256]),
        MSOS_DESCRIPTOR.init([0; 256]),
        CONTROL_BUF.init([0; 64]),
    );
    let class = CdcAcmClass::new(&mut builder, STATE.init(State::new()), 64);
    let usb = builder.build();

    // Spawn USB first so enumeration works even if sensor init fails
    spawner.spawn(usb_device_task(usb).expect("usb task"));

    // Analog inputs
    let adc = Adc::new_blocking(p.ADC, embassy_rp::adc::Config::default());
    let a0 = AdcChannel::new_pin(p.PIN_26, Pull::None);
    let a1 = AdcChannel::new_pin(p.PIN_27, Pull::None);
    let analog = Rp2350AnalogInputs::new(adc, a0, a1);

    // Flow sensor
    let mut i2c_config = i2c::Config::default();
    i2c_config.frequency = 400_000;
    let i2c = I2c::new_async(p.I2C0, p.PIN_5, p.PIN_4, Irqs, i2c_config);
    let mut flow = Slf3sAdapter::new(i2c, FlowSensorConfig::default());

    // Sensor needs ~25 ms after power-up before it answers
    Timer::after(Duration::from_millis(50)).await;
    if let Err(e) = bring_up(&mut flow).await {
        error!("Flow sensor init failed: {:?}", e);
        fault_blink(&mut led).await;
    }
    led.set_high();

    let comm = UsbCdcAdapter::new(class, server_config.rx_poll_ms);
    let mut server = CommandServer::new(comm, Dispatcher::new(analog, flow));

    loop {
        server.comm_mut().wait_connection().await;
        info!("Host connected");
        server.reset();

        loop {
            match server.tick().await {
                Ok(TickOutcome::Served { command, ok }) => {
                    debug!("{:?} -> ok={}", command, ok);
                }
                Ok(_) => {}
                Err(CommunicationError::Disconnected) => {
                    info!("Host disconnected");
                    break;
                }
                Err(e) => warn!("Transport error: {:?}", e),
            }
            Timer::after(Duration::from_millis(server_config.tick_interval_ms)).await;
        }
    }
}

#[embassy_executor::task]
async fn usb_device_task(
    mut usb: embassy_usb::UsbDevice<'static, Driver<'static, peripherals::USB>>,
) -> ! {
    info!("USB device task started");
    usb.run().await
}

/// Startup failed: blink the LED forever
async fn fault_blink(led: &mut Output<'static>) -> ! {
    loop {
        led.toggle();
        Timer::after(Duration::from_millis(200)).await;
    }
}
