//! End-to-end pipeline tests over the mock platform.
//!
//! Run with `cargo test --features mock`.

#![cfg(feature = "mock")]

use pico_airmon::core::console::Console;
use pico_airmon::core::supervisor::{
    PendingEvents, Supervisor, SupervisorConfig, CONSOLE_IDLE_TIMEOUT, GPS_IDLE_TIMEOUT,
    PMS_IDLE_TIMEOUT, PMS_RX_BUF_SZ,
};
use pico_airmon::core::tick::Tick;
use pico_airmon::devices::channel::{Channel, RxDescriptor};
use pico_airmon::devices::pms::{encode_frame, PmsReading};
use pico_airmon::platform::mock::{MockClock, MockGpio, MockUart};
use pico_airmon::platform::traits::UartConfig;

const SENTENCE: &[u8] = b"$GPGLL,4043.9620,N,07959.0350,W,075959.00,A,A*7B\r\n";

struct Rig {
    clock: MockClock,
    gps_uart: MockUart,
    pms_uart: MockUart,
    con_uart: MockUart,
}

impl Rig {
    fn new() -> Self {
        Self {
            clock: MockClock::new(),
            gps_uart: MockUart::new(),
            pms_uart: MockUart::new(),
            con_uart: MockUart::new(),
        }
    }
}

fn reading() -> PmsReading {
    PmsReading {
        pm1_0_atm: 11,
        pm2_5_atm: 17,
        pm10_atm: 20,
        particles_0_3um: 2_100,
        ..PmsReading::default()
    }
}

/// Polls the supervisor for `iterations` ticks of 5 ms each.
#[allow(clippy::too_many_arguments)]
fn run(
    rig: &Rig,
    sup: &mut Supervisor,
    gps: &mut Channel<'_, &MockUart>,
    pms: &mut Channel<'_, &MockUart>,
    con: &mut Channel<'_, &MockUart>,
    console: &mut Console,
    led: &mut MockGpio,
    iterations: usize,
) {
    for _ in 0..iterations {
        sup.poll(
            &rig.clock,
            gps,
            pms,
            con,
            console,
            led,
            PendingEvents::empty(),
        );
        rig.clock.advance_micros(5_000);
    }
}

#[test]
fn full_pipeline_from_bytes_to_console_line() {
    let rig = Rig::new();
    let mut gps = Channel::new(&rig.gps_uart, UartConfig::new(0, GPS_IDLE_TIMEOUT));
    let mut pms = Channel::new(&rig.pms_uart, UartConfig::new(0, PMS_IDLE_TIMEOUT));
    let mut con = Channel::new(&rig.con_uart, UartConfig::new(0, CONSOLE_IDLE_TIMEOUT));
    let mut gps_buf = [0u8; 256];
    let mut pms_buf = [0u8; PMS_RX_BUF_SZ];
    assert!(gps.submit(RxDescriptor::new(&mut gps_buf)).is_ok());
    assert!(pms.submit(RxDescriptor::new(&mut pms_buf)).is_ok());
    let mut console = Console::new();
    let mut led = MockGpio::new();
    let mut sup = Supervisor::new(SupervisorConfig {
        tz_offset_hours: 8,
        ..SupervisorConfig::default()
    });

    rig.gps_uart.inject_rx(SENTENCE);
    rig.pms_uart.inject_rx(&encode_frame(&reading()));

    run(
        &rig, &mut sup, &mut gps, &mut pms, &mut con, &mut console, &mut led, 500,
    );

    let out = rig.con_uart.tx_data();
    let text = core::str::from_utf8(&out).unwrap();
    assert!(
        text.contains(
            "[GPS] 15:59:59 | Lat: 40.732700 deg, N | Lon: 79.983917 deg, W \
             [PM] PM1.0: 11 ug/m3 | PM2.5: 17 ug/m3 | PM10: 20 ug/m3"
        ),
        "console output: {}",
        text
    );
    // Every rendered line carries the console tag.
    for line in text.split("\r\n").filter(|l| !l.is_empty()) {
        assert!(line.starts_with("[airmon] "), "untagged line: {}", line);
    }
}

#[test]
fn sentences_split_across_completions_still_decode() {
    let rig = Rig::new();
    let mut gps = Channel::new(&rig.gps_uart, UartConfig::new(0, GPS_IDLE_TIMEOUT));
    let mut pms = Channel::new(&rig.pms_uart, UartConfig::new(0, PMS_IDLE_TIMEOUT));
    let mut con = Channel::new(&rig.con_uart, UartConfig::new(0, CONSOLE_IDLE_TIMEOUT));
    let mut gps_buf = [0u8; 256];
    assert!(gps.submit(RxDescriptor::new(&mut gps_buf)).is_ok());
    let mut console = Console::new();
    let mut led = MockGpio::new();
    let mut sup = Supervisor::new(SupervisorConfig {
        tz_offset_hours: 8,
        ..SupervisorConfig::default()
    });

    // First half of the sentence, an idle gap long enough to complete the
    // transfer, then the rest. The assembler stitches them back together.
    let (head, tail) = SENTENCE.split_at(20);
    rig.gps_uart.inject_rx(head);
    run(
        &rig, &mut sup, &mut gps, &mut pms, &mut con, &mut console, &mut led, 40,
    );
    rig.gps_uart.inject_rx(tail);
    run(
        &rig, &mut sup, &mut gps, &mut pms, &mut con, &mut console, &mut led, 100,
    );

    assert!(sup.position().as_str().starts_with("15:59:59"));
}

#[test]
fn corrupted_pms_frame_recovers_on_next_frame() {
    let rig = Rig::new();
    let mut gps = Channel::new(&rig.gps_uart, UartConfig::new(0, GPS_IDLE_TIMEOUT));
    let mut pms = Channel::new(&rig.pms_uart, UartConfig::new(0, PMS_IDLE_TIMEOUT));
    let mut con = Channel::new(&rig.con_uart, UartConfig::new(0, CONSOLE_IDLE_TIMEOUT));
    let mut pms_buf = [0u8; PMS_RX_BUF_SZ];
    assert!(pms.submit(RxDescriptor::new(&mut pms_buf)).is_ok());
    let mut console = Console::new();
    let mut led = MockGpio::new();
    let mut sup = Supervisor::new(SupervisorConfig {
        tz_offset_hours: 8,
        ..SupervisorConfig::default()
    });

    let mut bad = encode_frame(&reading());
    bad[9] ^= 0x55;
    rig.pms_uart.inject_rx(&bad);
    run(
        &rig, &mut sup, &mut gps, &mut pms, &mut con, &mut console, &mut led, 80,
    );
    assert_eq!(sup.reading().pm2_5_atm, 0);

    rig.pms_uart.inject_rx(&encode_frame(&reading()));
    run(
        &rig, &mut sup, &mut gps, &mut pms, &mut con, &mut console, &mut led, 80,
    );
    assert_eq!(sup.reading().pm2_5_atm, 17);
}

#[test]
fn silent_bus_recovers_via_watchdog() {
    let rig = Rig::new();
    let mut gps = Channel::new(&rig.gps_uart, UartConfig::new(0, GPS_IDLE_TIMEOUT));
    let mut pms = Channel::new(&rig.pms_uart, UartConfig::new(0, PMS_IDLE_TIMEOUT));
    let mut con = Channel::new(&rig.con_uart, UartConfig::new(0, CONSOLE_IDLE_TIMEOUT));
    let mut gps_buf = [0u8; 128];
    assert!(gps.submit(RxDescriptor::new(&mut gps_buf)).is_ok());
    let mut console = Console::new();
    let mut led = MockGpio::new();
    let mut sup = Supervisor::new(SupervisorConfig::default());

    // Six seconds of silence tripping the 5 s watchdog, then data.
    for _ in 0..12 {
        sup.poll(
            &rig.clock,
            &mut gps,
            &mut pms,
            &mut con,
            &mut console,
            &mut led,
            PendingEvents::empty(),
        );
        rig.clock.advance(Tick::from_millis(500));
    }
    // The receiver survived the recovery cycle and is armed again.
    assert!(gps.rx_busy());

    rig.gps_uart.inject_rx(SENTENCE);
    run(
        &rig, &mut sup, &mut gps, &mut pms, &mut con, &mut console, &mut led, 100,
    );
    assert!(sup.position().as_str().contains("Lat: 40.732700 deg, N"));
}
