//! Mock UART implementation for testing

use core::cell::{Cell, RefCell};

use heapless::{Deque, Vec};

use crate::platform::traits::{RxFlags, UartHw};

const RX_SCRIPT_CAP: usize = 512;
const TX_SINK_CAP: usize = 2048;

/// Mock UART implementation
///
/// Scripted received words (byte plus error flags) are consumed through the
/// status-before-data protocol; transmitted bytes are captured in a sink.
/// With manual drain enabled, written bytes stay "in flight" until the test
/// calls [`MockUart::drain_tx`], which lets tests exercise the distinction
/// between holding-path room and deep transmitter idle.
///
/// Interior mutability so tests can inject and inspect through the shared
/// reference the channel driver exposes.
pub struct MockUart {
    rx_script: RefCell<Deque<(u8, RxFlags), RX_SCRIPT_CAP>>,
    latched: Cell<Option<(u8, RxFlags)>>,
    tx_sink: RefCell<Vec<u8, TX_SINK_CAP>>,
    tx_in_flight: Cell<usize>,
    manual_drain: Cell<bool>,
}

impl MockUart {
    pub fn new() -> Self {
        Self {
            rx_script: RefCell::new(Deque::new()),
            latched: Cell::new(None),
            tx_sink: RefCell::new(Vec::new()),
            tx_in_flight: Cell::new(0),
            manual_drain: Cell::new(false),
        }
    }

    /// Script clean received bytes.
    pub fn inject_rx(&self, data: &[u8]) {
        let mut script = self.rx_script.borrow_mut();
        for &b in data {
            let _ = script.push_back((b, RxFlags::empty()));
        }
    }

    /// Script one received byte carrying error flags.
    pub fn inject_rx_flagged(&self, byte: u8, flags: RxFlags) {
        let _ = self.rx_script.borrow_mut().push_back((byte, flags));
    }

    /// Everything written to the transmitter so far.
    pub fn tx_data(&self) -> Vec<u8, TX_SINK_CAP> {
        self.tx_sink.borrow().clone()
    }

    pub fn clear_tx(&self) {
        self.tx_sink.borrow_mut().clear();
    }

    /// When enabled, written bytes count as in flight until
    /// [`MockUart::drain_tx`] retires them, and the holding path only has
    /// room while nothing is in flight.
    pub fn set_manual_drain(&self, enabled: bool) {
        self.manual_drain.set(enabled);
    }

    /// Scripted received words not yet consumed through status-then-data.
    pub fn rx_pending(&self) -> usize {
        self.rx_script.borrow().len() + usize::from(self.latched.get().is_some())
    }

    /// Retire up to `n` in-flight bytes.
    pub fn drain_tx(&self, n: usize) {
        let left = self.tx_in_flight.get().saturating_sub(n);
        self.tx_in_flight.set(left);
    }
}

impl Default for MockUart {
    fn default() -> Self {
        Self::new()
    }
}

impl MockUart {
    // Interior-mutability implementations shared by the owned and borrowed
    // trait impls.
    fn do_rx_ready(&self) -> bool {
        self.latched.get().is_some() || !self.rx_script.borrow().is_empty()
    }

    fn do_rx_status(&self) -> RxFlags {
        if self.latched.get().is_none() {
            self.latched.set(self.rx_script.borrow_mut().pop_front());
        }
        self.latched.get().map(|(_, f)| f).unwrap_or_default()
    }

    fn do_rx_data(&self) -> u8 {
        let word = self.latched.take();
        debug_assert!(word.is_some(), "rx_data without a prior rx_status");
        word.map(|(b, _)| b).unwrap_or(0)
    }

    fn do_tx_ready(&self) -> bool {
        !self.manual_drain.get() || self.tx_in_flight.get() == 0
    }

    fn do_tx_write(&self, byte: u8) {
        let _ = self.tx_sink.borrow_mut().push(byte);
        if self.manual_drain.get() {
            self.tx_in_flight.set(self.tx_in_flight.get() + 1);
        }
    }

    fn do_tx_idle(&self) -> bool {
        self.tx_in_flight.get() == 0
    }
}

impl UartHw for MockUart {
    fn rx_ready(&self) -> bool {
        self.do_rx_ready()
    }

    fn rx_status(&mut self) -> RxFlags {
        self.do_rx_status()
    }

    fn rx_data(&mut self) -> u8 {
        self.do_rx_data()
    }

    fn tx_ready(&self) -> bool {
        self.do_tx_ready()
    }

    fn tx_write(&mut self, byte: u8) {
        self.do_tx_write(byte)
    }

    fn tx_idle(&self) -> bool {
        self.do_tx_idle()
    }
}

/// A channel can borrow the mock, leaving the test free to inject and drain
/// through its own reference while the channel runs.
impl UartHw for &MockUart {
    fn rx_ready(&self) -> bool {
        self.do_rx_ready()
    }

    fn rx_status(&mut self) -> RxFlags {
        self.do_rx_status()
    }

    fn rx_data(&mut self) -> u8 {
        self.do_rx_data()
    }

    fn tx_ready(&self) -> bool {
        self.do_tx_ready()
    }

    fn tx_write(&mut self, byte: u8) {
        self.do_tx_write(byte)
    }

    fn tx_idle(&self) -> bool {
        self.do_tx_idle()
    }
}
