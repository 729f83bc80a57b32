#![no_std]
#![no_main]

use core::cell::RefCell;

use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use embedded_hal_bus::i2c::RefCellDevice;
use esp_hal::clock::CpuClock;
use esp_hal::delay::Delay;
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use esp_hal::uart::{Config as UartConfig, Uart};
use esp_hal::{Async, Blocking};
use esp_hal_embassy::Executor;
use esp_println::println;
use heapless::String;
use log::{error, info, warn};
use static_cell::StaticCell;

use sensor_node_rs::at::status::HexUpper;
use sensor_node_rs::at::{CommandTable, LineBuffer, init_interval_at, init_status_at};
use sensor_node_rs::config;
use sensor_node_rs::eeprom::EepromStorage;
use sensor_node_rs::interval::PeriodicTimer;
use sensor_node_rs::radio::RadioSettings;
use sensor_node_rs::sensor::{EnvSensor, RealSensor, Shtc3, SimulatedSensor};
use sensor_node_rs::{Node, telemetry};

// Add app descriptor for espflash compatibility
esp_bootloader_esp_idf::esp_app_desc!();

type SharedI2c = RefCellDevice<'static, I2c<'static, Blocking>>;
type FirmwareNode = Node<EepromStorage<SharedI2c, Delay>, SignalTimer, RadioSettings>;
type Rak1901 = RealSensor<Shtc3<SharedI2c, Delay>>;

/// What the AT console asks of the send loop
#[derive(Clone, Copy)]
enum TimerCommand {
    Start(u32),
    Stop,
}

static TIMER_SIGNAL: Signal<CriticalSectionRawMutex, TimerCommand> = Signal::new();

static I2C_BUS: StaticCell<RefCell<I2c<'static, Blocking>>> = StaticCell::new();
static NODE_CELL: StaticCell<FirmwareNode> = StaticCell::new();
static REAL_SENSOR_CELL: StaticCell<Rak1901> = StaticCell::new();
static SIM_SENSOR_CELL: StaticCell<SimulatedSensor> = StaticCell::new();
static EXECUTOR: StaticCell<Executor> = StaticCell::new();

/// Periodic timer backed by the send task
struct SignalTimer {
    signal: &'static Signal<CriticalSectionRawMutex, TimerCommand>,
}

impl PeriodicTimer for SignalTimer {
    fn start(&mut self, period_ms: u32) {
        self.signal.signal(TimerCommand::Start(period_ms));
    }

    fn stop(&mut self) {
        self.signal.signal(TimerCommand::Stop);
    }
}

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    println!("[PANIC] {}", info);
    loop {}
}

/// AT console on UART0: one command per line, replies written back in full
#[embassy_executor::task]
async fn console_task(mut uart: Uart<'static, Async>, node: &'static mut FirmwareNode) {
    let mut table: CommandTable<FirmwareNode, 8> = CommandTable::new();
    if !init_interval_at(&mut table) || !init_status_at(&mut table) {
        error!("[AT] Failed to register custom AT commands");
    }
    info!("[AT] {} custom commands ready", table.len());

    let mut line_buffer: LineBuffer<{ config::AT_LINE_MAX }> = LineBuffer::new();
    let mut reply: String<1024> = String::new();
    let mut rx = [0u8; 64];

    loop {
        let n = match uart.read_async(&mut rx).await {
            Ok(n) => n,
            Err(e) => {
                warn!("[AT] Console read error: {:?}", e);
                continue;
            }
        };

        for &byte in &rx[..n] {
            let Some(line) = line_buffer.push(byte) else {
                continue;
            };
            reply.clear();
            if let Some(status) = table.dispatch_line(node, &line, &mut reply) {
                info!("[AT] {} -> {}", line.as_str(), status.as_str());
                write_all(&mut uart, reply.as_bytes()).await;
            }
        }
    }
}

async fn write_all(uart: &mut Uart<'static, Async>, mut bytes: &[u8]) {
    while !bytes.is_empty() {
        match uart.write_async(bytes).await {
            Ok(0) => return,
            Ok(n) => bytes = &bytes[n..],
            Err(e) => {
                warn!("[AT] Console write error: {:?}", e);
                return;
            }
        }
    }
}

/// Reads the sensor every period and hands the payload to the uplink
#[embassy_executor::task]
async fn send_task(sensor: &'static mut dyn EnvSensor) {
    let mut period_ms: u32 = 0;
    let mut frames: u32 = 0;

    loop {
        let command = if period_ms == 0 {
            // stopped, nothing to do until the next command
            Some(TIMER_SIGNAL.wait().await)
        } else {
            let period = Duration::from_millis(u64::from(period_ms));
            match select(TIMER_SIGNAL.wait(), Timer::after(period)).await {
                Either::First(command) => Some(command),
                Either::Second(()) => None,
            }
        };

        match command {
            Some(TimerCommand::Start(ms)) => {
                info!("[SEND] Timer started, period {} ms", ms);
                period_ms = ms;
            }
            Some(TimerCommand::Stop) => {
                info!("[SEND] Timer stopped");
                period_ms = 0;
            }
            None => {
                let reading = sensor.read();
                let payload = telemetry::encode(&reading);
                frames = frames.wrapping_add(1);
                info!(
                    "[SEND] #{} T={} C RH={} % payload {}",
                    frames,
                    reading.temperature,
                    reading.humidity,
                    HexUpper(&payload)
                );
            }
        }
    }
}

#[esp_hal::main]
fn main() -> ! {
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_println::logger::init_logger_from_env();
    println!("[BOOT] sensor-node-rs {}", sensor_node_rs::VERSION);

    // Initialize embassy time system
    let timer_group0 = TimerGroup::new(peripherals.TIMG0);
    esp_hal_embassy::init(timer_group0.timer0);

    // One I2C bus shared by the RAK1901 and the settings EEPROM
    let i2c = match I2c::new(
        peripherals.I2C0,
        I2cConfig::default().with_frequency(Rate::from_khz(100)),
    ) {
        Ok(i2c) => i2c.with_sda(peripherals.GPIO6).with_scl(peripherals.GPIO7),
        Err(e) => {
            println!("[BOOT] ❌ Failed to initialize I2C: {:?}", e);
            panic!("I2C initialization failed");
        }
    };
    let i2c_bus = I2C_BUS.init(RefCell::new(i2c));

    let uart = match Uart::new(
        peripherals.UART0,
        UartConfig::default().with_baudrate(config::CONSOLE_BAUD_RATE),
    ) {
        Ok(uart) => uart
            .with_rx(peripherals.GPIO20)
            .with_tx(peripherals.GPIO21)
            .into_async(),
        Err(e) => {
            println!("[BOOT] ❌ Failed to initialize console UART: {:?}", e);
            panic!("UART initialization failed");
        }
    };

    let storage = EepromStorage::new(RefCellDevice::new(i2c_bus), Delay::new());
    let timer = SignalTimer {
        signal: &TIMER_SIGNAL,
    };
    let node = NODE_CELL.init(Node::new(
        storage,
        timer,
        RadioSettings::from_build_config(),
    ));
    if node.boot() {
        println!("[BOOT] ✅ Restored send interval {} s", node.send_interval_seconds());
    }

    let sensor: &'static mut dyn EnvSensor = if cfg!(feature = "simulated-sensor") {
        println!("[BOOT] Using simulated sensor");
        SIM_SENSOR_CELL.init(SimulatedSensor::new())
    } else {
        REAL_SENSOR_CELL.init(RealSensor::new(Shtc3::new(
            RefCellDevice::new(i2c_bus),
            Delay::new(),
        )))
    };
    sensor.init();

    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        println!("[MAIN] Spawning send task...");
        match spawner.spawn(send_task(sensor)) {
            Ok(_) => println!("[MAIN] ✅ Send task spawned successfully"),
            Err(e) => println!("[MAIN] ❌ Failed to spawn send task: {:?}", e),
        }

        println!("[MAIN] Spawning AT console task...");
        match spawner.spawn(console_task(uart, node)) {
            Ok(_) => println!("[MAIN] ✅ AT console task spawned successfully"),
            Err(e) => println!("[MAIN] ❌ Failed to spawn AT console task: {:?}", e),
        }
    });
}
