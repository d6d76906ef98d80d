#![no_std]
#![no_main]

// Required for ESP-IDF bootloader compatibility
// Use explicit parameters to ensure correct efuse block revision values
esp_bootloader_esp_idf::esp_app_desc!(
    env!("CARGO_PKG_VERSION"),  // version
    env!("CARGO_PKG_NAME"),     // project_name
    "00:00:00",                 // build_time
    "2025-01-01",               // build_date
    "0.0.0",                    // idf_ver (not using IDF)
    0x10000,                    // mmu_page_size (64KB)
    0,                          // min_efuse_blk_rev_full (accept all)
    u16::MAX                    // max_efuse_blk_rev_full (accept all)
);

use embassy_executor::Spawner;
use esp_backtrace as _;
use esp_hal::delay::Delay;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use esp_hal::spi::Mode as SpiMode;
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use esp_hal::uart::{Config as UartConfig, Uart};
use esp_hal::{Async, Blocking};
use static_cell::StaticCell;

use si446x_link::config;
use si446x_link::device::{Clock, Device, Identity, LinkConfig, Node};
use si446x_link::dispatcher::{MemoryEeprom, NullApplication};
use si446x_link::radio::{Radio, Si4463Pins, SpiChipBus};
use si446x_link::scheduler::Controller;
use si446x_link::serial::IoSerial;
use si446x_link::tasks;

/// Chip bus on the SPI2 master with GPIO nSEL and SDN
type ChipSpi = SpiChipBus<Spi<'static, Blocking>, Output<'static>, Output<'static>>;

type LinkController =
    Controller<'static, ChipSpi, NullApplication, MemoryEeprom<{ config::eeprom::SIZE }>>;

/// Shared by the timer and nIRQ tasks and the link loop
static CLOCK: Clock = Clock::new();

/// Static executor for embassy
static EXECUTOR: StaticCell<esp_rtos::embassy::Executor> = StaticCell::new();

#[esp_hal::main]
fn main() -> ! {
    let peripherals = esp_hal::init(esp_hal::Config::default());
    si446x_link::logger::init(log::LevelFilter::Info);

    // Turn on LED (active low)
    let led = Output::new(peripherals.GPIO48, Level::Low, OutputConfig::default());

    // Initialise the RTOS scheduler with timer - MUST be done before any async operations
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // Configure SPI for the Si4463
    let spi = Spi::new(
        peripherals.SPI2,
        SpiConfig::default()
            .with_frequency(Rate::from_mhz(1))
            .with_mode(SpiMode::_0),
    )
    .unwrap()
    .with_sck(peripherals.GPIO7)
    .with_miso(peripherals.GPIO8)
    .with_mosi(peripherals.GPIO9);

    let nsel = Output::new(peripherals.GPIO41, Level::High, OutputConfig::default());
    let sdn = Output::new(peripherals.GPIO42, Level::High, OutputConfig::default());
    let nirq = Input::new(peripherals.GPIO39, InputConfig::default().with_pull(Pull::Up));

    let mut chip_bus = SpiChipBus::new(spi, Si4463Pins { nsel, sdn });
    if let Err(e) = chip_bus.reset(&mut Delay::new()) {
        log::error!("chip reset failed: {:?}", e);
    }

    // Host line on UART0
    let uart = Uart::new(
        peripherals.UART0,
        UartConfig::default().with_baudrate(config::serial::BAUD_RATE),
    )
    .unwrap()
    .with_tx(peripherals.GPIO43)
    .with_rx(peripherals.GPIO44)
    .into_async();

    // Identity from the eFuse MAC address (last 4 bytes)
    let mac = esp_hal::efuse::Efuse::read_base_mac_address();
    let identity = Identity::new(mac[2], mac[3], mac[4], mac[5]);
    log::info!(
        "si446x link v{}.{} identity {:02x}{:02x}{:02x}{:02x}",
        config::firmware::VERSION_MAJOR,
        config::firmware::VERSION_MINOR,
        identity.cat1,
        identity.cat2,
        identity.num1,
        identity.num2
    );

    let node = Node::new(
        Radio::new(chip_bus),
        Device::new(&CLOCK, identity, LinkConfig::default()),
        NullApplication,
        MemoryEeprom::new(),
    );
    let controller = Controller::new(node);

    // Create and run the embassy executor
    let executor = EXECUTOR.init(esp_rtos::embassy::Executor::new());
    executor.run(|spawner| {
        spawner.must_spawn(async_main(spawner, controller, uart, nirq, led));
    })
}

#[embassy_executor::task]
async fn async_main(
    spawner: Spawner,
    controller: LinkController,
    uart: Uart<'static, Async>,
    nirq: Input<'static>,
    led: Output<'static>,
) {
    spawner.spawn(link_task(controller)).unwrap();
    spawner.spawn(serial_task(uart)).unwrap();
    spawner.spawn(timer_task()).unwrap();
    spawner.spawn(irq_task(nirq)).unwrap();
    spawner.spawn(led_task(led)).unwrap();
    spawner.spawn(admin_task()).unwrap();
}

#[embassy_executor::task]
async fn link_task(controller: LinkController) {
    tasks::link_task(controller).await;
}

#[embassy_executor::task]
async fn serial_task(uart: Uart<'static, Async>) {
    tasks::serial_task(IoSerial::new(uart)).await;
}

#[embassy_executor::task]
async fn timer_task() {
    tasks::timer_task(&CLOCK, tasks::LED_CHANNEL.sender()).await;
}

#[embassy_executor::task]
async fn irq_task(nirq: Input<'static>) {
    tasks::irq_task(&CLOCK, nirq).await;
}

#[embassy_executor::task]
async fn led_task(led: Output<'static>) {
    tasks::led_task(led, tasks::LED_CHANNEL.receiver()).await;
}

#[embassy_executor::task]
async fn admin_task() {
    tasks::admin_task(tasks::ADMIN_CHANNEL.receiver()).await;
}
