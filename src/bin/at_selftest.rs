//! On-target AT command self test
//!
//! Runs scripted AT lines against a RAM backed node and checks the replies,
//! the persisted record and the timer requests.

#![no_std]
#![no_main]

use esp_hal::clock::CpuClock;
use esp_println::println;
use heapless::String;

use sensor_node_rs::Node;
use sensor_node_rs::at::{AtStatus, CommandTable, init_interval_at, init_status_at};
use sensor_node_rs::interval::PeriodicTimer;
use sensor_node_rs::radio::RadioSettings;
use sensor_node_rs::storage::{PersistedConfig, RamStorage};

// Add app descriptor for espflash compatibility
esp_bootloader_esp_idf::esp_app_desc!();

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    println!("❌ {}", info);
    loop {}
}

/// Remembers the last request instead of driving a real timer
#[derive(Default)]
struct LastRequest {
    period_ms: Option<u32>,
    requests: u32,
}

impl PeriodicTimer for LastRequest {
    fn start(&mut self, period_ms: u32) {
        self.period_ms = Some(period_ms);
        self.requests += 1;
    }

    fn stop(&mut self) {
        self.period_ms = None;
        self.requests += 1;
    }
}

type TestNode = Node<RamStorage<64>, LastRequest, RadioSettings>;

fn run(
    table: &CommandTable<TestNode, 4>,
    node: &mut TestNode,
    line: &str,
) -> (Option<AtStatus>, String<1024>) {
    let mut out = String::new();
    let status = table.dispatch_line(node, line, &mut out);
    (status, out)
}

#[esp_hal::main]
fn main() -> ! {
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let _peripherals = esp_hal::init(config);

    println!("=== AT command self test ===");

    let mut node: TestNode = Node::new(
        RamStorage::new(),
        LastRequest::default(),
        RadioSettings::from_build_config(),
    );
    let mut table = CommandTable::new();
    assert!(init_interval_at(&mut table));
    assert!(init_status_at(&mut table));

    println!("\n1. First boot");
    assert!(!node.boot());
    assert_eq!(node.store.config(), PersistedConfig::initialized(0));
    assert_eq!(node.interval.timer().period_ms, None);
    println!("✅ Defaults written, timer stopped");

    println!("\n2. Query on fresh node");
    let (status, out) = run(&table, &mut node, "AT+SENDINT=?");
    assert_eq!(status, Some(AtStatus::Ok));
    assert_eq!(out.as_str(), "SENDINT=0\r\nOK\r\n");
    println!("✅ {}", out.as_str().trim_end());

    println!("\n3. Set interval");
    let (status, _) = run(&table, &mut node, "AT+SENDINT=3600");
    assert_eq!(status, Some(AtStatus::Ok));
    assert_eq!(node.interval.timer().period_ms, Some(3_600_000));
    assert_eq!(node.store.config(), PersistedConfig::initialized(3_600_000));
    println!("✅ Timer restarted with 3600000 ms");

    println!("\n4. Same value again");
    let requests = node.interval.timer().requests;
    let writes = node.store.storage().write_count();
    run(&table, &mut node, "AT+SENDINT=3600");
    assert_eq!(node.interval.timer().requests, requests);
    assert_eq!(node.store.storage().write_count(), writes);
    println!("✅ No timer or storage activity");

    println!("\n5. Invalid values");
    for line in ["AT+SENDINT=abc", "AT+SENDINT=-5", "AT+SENDINT=", "AT+SENDINT=1:2"] {
        let (status, out) = run(&table, &mut node, line);
        assert_eq!(status, Some(AtStatus::ParamError));
        assert_eq!(out.as_str(), "AT_PARAM_ERROR\r\n");
    }
    assert_eq!(node.send_interval_seconds(), 3600);
    println!("✅ Rejected, interval kept");

    println!("\n6. Disable sending");
    run(&table, &mut node, "AT+SENDINT=0");
    assert_eq!(node.interval.timer().period_ms, None);
    println!("✅ Timer stopped");

    println!("\n7. Status dump");
    let (status, out) = run(&table, &mut node, "AT+STATUS");
    assert_eq!(status, Some(AtStatus::Ok));
    assert!(out.starts_with("Device Status:\r\n"));
    assert!(out.contains("Send time: 0 s\r\n"));
    assert!(out.ends_with("OK\r\n"));
    for line in out.split_terminator("\r\n") {
        println!("   {}", line);
    }
    println!("✅ Status printed");

    println!("\n8. Reboot keeps the interval");
    run(&table, &mut node, "AT+SENDINT=90");
    let storage = *node.store.storage().contents();
    let mut rebooted: TestNode = Node::new(
        RamStorage::with_contents(&storage),
        LastRequest::default(),
        RadioSettings::from_build_config(),
    );
    assert!(rebooted.boot());
    assert_eq!(rebooted.interval.timer().period_ms, Some(90_000));
    println!("✅ Restored 90 s");

    println!("\n=== All AT self tests passed ===");

    loop {}
}
