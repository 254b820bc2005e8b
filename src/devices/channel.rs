//! Polling UART channel driver
//!
//! One [`Channel`] owns one UART peripheral and carries at most one
//! outstanding transfer per direction. All progress happens inside
//! [`Channel::tick`], which the cooperative loop calls every iteration: it
//! moves at most one received word and a bounded burst of transmit bytes, so
//! a single tick never stalls the loop.
//!
//! Receive buffers stay caller-owned: the caller arms the receiver with an
//! [`RxDescriptor`] borrowing its buffer, and gets the descriptor back inside
//! the [`RxDone`] completion. Transmit submissions are copied into a
//! driver-owned staging buffer at [`Channel::enqueue`] time, so the caller's
//! fragments can be short-lived.

use heapless::Vec;

use crate::core::tick::Tick;
use crate::platform::error::{PlatformError, Result, UartError};
use crate::platform::traits::{RxFlags, UartConfig, UartHw};

/// Largest receive buffer a descriptor may carry.
pub const RX_LEN_MAX: usize = 65_528;

/// Maximum number of fragments per transmit submission.
pub const TX_FRAGS_MAX: usize = 8;

/// Capacity of the transmit staging buffer; bounds one submission.
pub const TX_STAGING_CAP: usize = 256;

/// Most bytes a single tick will push into the transmit holding path.
pub const TX_BURST_MAX: usize = 16;

/// Caller-owned receive buffer descriptor.
///
/// The borrow is held by the channel from [`Channel::submit`] until the
/// completion is taken back and [`RxDone::into_descriptor`] is called.
#[derive(Debug)]
pub struct RxDescriptor<'buf> {
    buf: &'buf mut [u8],
}

impl<'buf> RxDescriptor<'buf> {
    pub fn new(buf: &'buf mut [u8]) -> Self {
        Self { buf }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }
}

/// How a receive transfer finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxCompletionKind {
    /// Buffer filled, or an idle gap closed a partial transfer, or the
    /// caller aborted.
    Data,
    /// A break condition ended the transfer.
    Break,
}

/// A finished receive transfer.
///
/// Holds the descriptor so the received bytes stay readable until the caller
/// reclaims the buffer.
#[derive(Debug)]
pub struct RxDone<'buf> {
    kind: RxCompletionKind,
    len: u16,
    desc: RxDescriptor<'buf>,
}

impl<'buf> RxDone<'buf> {
    pub fn kind(&self) -> RxCompletionKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The received bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.desc.buf[..self.len as usize]
    }

    /// Release the buffer borrow, typically to resubmit it.
    pub fn into_descriptor(self) -> RxDescriptor<'buf> {
        self.desc
    }
}

struct RxSide<'buf> {
    active: Option<RxDescriptor<'buf>>,
    idx: u16,
    last_byte: Tick,
    done: Option<RxDone<'buf>>,
}

struct TxSide {
    staged: Vec<u8, TX_STAGING_CAP>,
    cursor: usize,
}

/// A UART channel: one peripheral, one receive slot, one transmit slot.
pub struct Channel<'buf, U: UartHw> {
    hw: U,
    cfg: UartConfig,
    rx: RxSide<'buf>,
    tx: TxSide,
}

impl<'buf, U: UartHw> Channel<'buf, U> {
    pub fn new(hw: U, cfg: UartConfig) -> Self {
        Self {
            hw,
            cfg,
            rx: RxSide {
                active: None,
                idx: 0,
                last_byte: Tick::ZERO,
                done: None,
            },
            tx: TxSide {
                staged: Vec::new(),
                cursor: 0,
            },
        }
    }

    pub fn hw(&self) -> &U {
        &self.hw
    }

    /// Arm the receiver with a caller-owned buffer.
    ///
    /// Fails (returning the descriptor so the buffer is not lost) when the
    /// buffer is empty or oversized, a transfer is already outstanding, or a
    /// previous completion has not been consumed yet.
    pub fn submit(
        &mut self,
        desc: RxDescriptor<'buf>,
    ) -> core::result::Result<(), (PlatformError, RxDescriptor<'buf>)> {
        if desc.capacity() == 0 {
            return Err((UartError::EmptyTransfer.into(), desc));
        }
        if desc.capacity() > RX_LEN_MAX {
            return Err((UartError::TransferTooLong.into(), desc));
        }
        if self.rx.active.is_some() {
            return Err((UartError::RxBusy.into(), desc));
        }
        if self.rx.done.is_some() {
            return Err((UartError::CompletionPending.into(), desc));
        }
        self.rx.idx = 0;
        self.rx.active = Some(desc);
        Ok(())
    }

    /// A receive transfer is outstanding.
    pub fn rx_busy(&self) -> bool {
        self.rx.active.is_some()
    }

    /// Take the pending receive completion, if any.
    pub fn take_rx_completion(&mut self) -> Option<RxDone<'buf>> {
        self.rx.done.take()
    }

    /// Force the outstanding receive transfer to complete with whatever has
    /// arrived so far. The completion is delivered through
    /// [`Channel::take_rx_completion`] like any other.
    pub fn rx_abort(&mut self) {
        self.complete_rx(RxCompletionKind::Data);
    }

    /// Stage a transmit submission, copying the fragments.
    ///
    /// Fails while a previous submission is still draining, and rejects
    /// empty or oversized submissions up front.
    pub fn enqueue(&mut self, frags: &[&[u8]]) -> Result<()> {
        if self.tx_busy() {
            return Err(UartError::TxBusy.into());
        }
        if frags.is_empty() {
            return Err(UartError::EmptyTransfer.into());
        }
        if frags.len() > TX_FRAGS_MAX {
            return Err(UartError::TransferTooLong.into());
        }
        let total: usize = frags.iter().map(|f| f.len()).sum();
        if total == 0 {
            return Err(UartError::EmptyTransfer.into());
        }
        if total > TX_STAGING_CAP {
            return Err(UartError::TransferTooLong.into());
        }
        self.tx.staged.clear();
        self.tx.cursor = 0;
        for frag in frags {
            self.tx
                .staged
                .extend_from_slice(frag)
                .map_err(|_| UartError::TransferTooLong)?;
        }
        Ok(())
    }

    /// Staged transmit bytes remain unsent.
    pub fn tx_busy(&self) -> bool {
        self.tx.cursor < self.tx.staged.len()
    }

    /// The channel has fully let go of the line: nothing staged and the
    /// hardware transmitter deeply idle. This is the condition the debug
    /// serializer waits on, not mere holding-path room.
    pub fn tx_hw_idle(&self) -> bool {
        !self.tx_busy() && self.hw.tx_idle()
    }

    /// Work is pending in either direction.
    pub fn busy(&self) -> bool {
        (self.rx.active.is_some() && self.hw.rx_ready()) || self.tx_busy()
    }

    /// Advance both directions by a bounded amount.
    pub fn tick(&mut self, now: Tick) {
        self.tick_rx(now);
        self.tick_tx();
    }

    fn tick_rx(&mut self, now: Tick) {
        // At most one received word per call. Status is read before data;
        // the flags describe exactly the byte consumed here.
        let word = if self.hw.rx_ready() {
            let flags = self.hw.rx_status();
            Some((flags, self.hw.rx_data()))
        } else {
            None
        };

        if self.rx.active.is_none() {
            // No receiver armed; the word (if any) is discarded.
            return;
        }

        if let Some((flags, byte)) = word {
            if flags.contains(RxFlags::BREAK) {
                self.complete_rx(RxCompletionKind::Break);
                return;
            }
            if !flags.intersects(RxFlags::FRAMING | RxFlags::PARITY) {
                let idx = self.rx.idx as usize;
                let full = if let Some(desc) = self.rx.active.as_mut() {
                    desc.buf[idx] = byte;
                    self.rx.idx += 1;
                    self.rx.idx as usize >= desc.capacity()
                } else {
                    false
                };
                self.rx.last_byte = now;
                if full {
                    self.complete_rx(RxCompletionKind::Data);
                }
            }
            // A corrupted byte is dropped; the transfer keeps running.
            return;
        }

        // Quiet call: close a partial transfer once the line has been idle
        // long enough.
        if self.rx.idx > 0 && Tick::delta(now, self.rx.last_byte) >= self.cfg.idle_timeout {
            self.complete_rx(RxCompletionKind::Data);
        }
    }

    fn tick_tx(&mut self) {
        let mut budget = TX_BURST_MAX;
        while budget > 0 && self.tx.cursor < self.tx.staged.len() && self.hw.tx_ready() {
            self.hw.tx_write(self.tx.staged[self.tx.cursor]);
            self.tx.cursor += 1;
            budget -= 1;
        }
        if !self.tx.staged.is_empty() && self.tx.cursor >= self.tx.staged.len() {
            self.tx.staged.clear();
            self.tx.cursor = 0;
        }
    }

    fn complete_rx(&mut self, kind: RxCompletionKind) {
        if let Some(desc) = self.rx.active.take() {
            self.rx.done = Some(RxDone {
                kind,
                len: self.rx.idx,
                desc,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::MockUart;

    fn test_cfg() -> UartConfig {
        UartConfig::new(0, Tick::from_micros(781))
    }

    fn chan<'b>(hw: MockUart) -> Channel<'b, MockUart> {
        Channel::new(hw, test_cfg())
    }

    #[test]
    fn test_submit_rejects_empty_buffer() {
        let mut ch = chan(MockUart::new());
        let mut buf: [u8; 0] = [];
        let err = ch.submit(RxDescriptor::new(&mut buf)).unwrap_err();
        assert_eq!(err.0, PlatformError::Uart(UartError::EmptyTransfer));
    }

    #[test]
    fn test_submit_rejects_double_arm() {
        let mut ch = chan(MockUart::new());
        let mut a = [0u8; 16];
        let mut b = [0u8; 16];
        assert!(ch.submit(RxDescriptor::new(&mut a)).is_ok());
        let err = ch.submit(RxDescriptor::new(&mut b)).unwrap_err();
        assert_eq!(err.0, PlatformError::Uart(UartError::RxBusy));
    }

    #[test]
    fn test_idle_gap_completes_partial_transfer() {
        let mut ch = chan(MockUart::new());
        let mut buf = [0u8; 64];
        assert!(ch.submit(RxDescriptor::new(&mut buf)).is_ok());
        ch.hw().inject_rx(b"hello");

        let mut now = Tick::ZERO;
        for _ in 0..5 {
            ch.tick(now);
            now = Tick::new(now.secs, now.nanos + 100_000);
        }
        // Bytes consumed, transfer still open.
        assert!(ch.take_rx_completion().is_none());
        assert!(ch.rx_busy());

        // A quiet tick past the idle timeout closes it.
        now = Tick::new(now.secs, now.nanos + 2_000_000);
        ch.tick(now);
        let done = ch.take_rx_completion().unwrap();
        assert_eq!(done.kind(), RxCompletionKind::Data);
        assert_eq!(done.bytes(), b"hello");
        assert!(!ch.rx_busy());
    }

    #[test]
    fn test_buffer_full_completes_immediately() {
        let mut ch = chan(MockUart::new());
        let mut buf = [0u8; 3];
        assert!(ch.submit(RxDescriptor::new(&mut buf)).is_ok());
        ch.hw().inject_rx(b"abcd");

        let mut now = Tick::ZERO;
        for _ in 0..3 {
            ch.tick(now);
            now = Tick::new(now.secs, now.nanos + 100_000);
        }
        let done = ch.take_rx_completion().unwrap();
        assert_eq!(done.bytes(), b"abc");
        // The fourth byte arrived with no receiver armed and was dropped.
        ch.tick(now);
        assert!(ch.take_rx_completion().is_none());
    }

    #[test]
    fn test_corrupted_byte_is_dropped() {
        let mut ch = chan(MockUart::new());
        let mut buf = [0u8; 16];
        assert!(ch.submit(RxDescriptor::new(&mut buf)).is_ok());
        ch.hw().inject_rx(b"a");
        ch.hw().inject_rx_flagged(b'x', RxFlags::FRAMING);
        ch.hw().inject_rx(b"b");

        let mut now = Tick::ZERO;
        for _ in 0..4 {
            ch.tick(now);
            now = Tick::new(now.secs, now.nanos + 100_000);
        }
        now = Tick::new(now.secs, now.nanos + 2_000_000);
        ch.tick(now);
        let done = ch.take_rx_completion().unwrap();
        assert_eq!(done.bytes(), b"ab");
    }

    #[test]
    fn test_break_completes_with_break_kind() {
        let mut ch = chan(MockUart::new());
        let mut buf = [0u8; 16];
        assert!(ch.submit(RxDescriptor::new(&mut buf)).is_ok());
        ch.hw().inject_rx(b"ab");
        ch.hw().inject_rx_flagged(0, RxFlags::BREAK);

        let mut now = Tick::ZERO;
        for _ in 0..3 {
            ch.tick(now);
            now = Tick::new(now.secs, now.nanos + 100_000);
        }
        let done = ch.take_rx_completion().unwrap();
        assert_eq!(done.kind(), RxCompletionKind::Break);
        assert_eq!(done.bytes(), b"ab");
    }

    #[test]
    fn test_abort_delivers_partial_completion() {
        let mut ch = chan(MockUart::new());
        let mut buf = [0u8; 16];
        assert!(ch.submit(RxDescriptor::new(&mut buf)).is_ok());
        ch.hw().inject_rx(b"xy");
        ch.tick(Tick::ZERO);
        ch.tick(Tick::new(0, 100_000));

        ch.rx_abort();
        let done = ch.take_rx_completion().unwrap();
        assert_eq!(done.bytes(), b"xy");

        // The descriptor comes back and can be rearmed.
        let desc = done.into_descriptor();
        assert!(ch.submit(desc).is_ok());
    }

    #[test]
    fn test_resubmit_blocked_until_completion_taken() {
        let mut ch = chan(MockUart::new());
        let mut a = [0u8; 8];
        let mut b = [0u8; 8];
        assert!(ch.submit(RxDescriptor::new(&mut a)).is_ok());
        ch.rx_abort();
        let err = ch.submit(RxDescriptor::new(&mut b)).unwrap_err();
        assert_eq!(err.0, PlatformError::Uart(UartError::CompletionPending));
    }

    #[test]
    fn test_enqueue_drains_to_hardware() {
        let mut ch = chan(MockUart::new());
        assert!(ch.enqueue(&[b"one ", b"two"]).is_ok());
        assert!(ch.tx_busy());
        ch.tick(Tick::ZERO);
        assert!(!ch.tx_busy());
        assert_eq!(ch.hw().tx_data(), b"one two");
    }

    #[test]
    fn test_enqueue_while_draining_fails() {
        let hw = MockUart::new();
        hw.set_manual_drain(true);
        let mut ch = chan(hw);
        assert!(ch.enqueue(&[&[0u8; 40]]).is_ok());
        ch.tick(Tick::ZERO);
        assert!(ch.tx_busy());
        let err = ch.enqueue(&[b"more"]).unwrap_err();
        assert_eq!(err, PlatformError::Uart(UartError::TxBusy));
    }

    #[test]
    fn test_tx_burst_is_bounded() {
        let mut ch = chan(MockUart::new());
        assert!(ch.enqueue(&[&[0xAAu8; 40]]).is_ok());
        ch.tick(Tick::ZERO);
        assert_eq!(ch.hw().tx_data().len(), TX_BURST_MAX);
        ch.tick(Tick::ZERO);
        assert_eq!(ch.hw().tx_data().len(), 2 * TX_BURST_MAX);
        ch.tick(Tick::ZERO);
        assert_eq!(ch.hw().tx_data().len(), 40);
        assert!(ch.tx_hw_idle());
    }

    #[test]
    fn test_enqueue_rejects_oversized_submission() {
        let mut ch = chan(MockUart::new());
        let big = [0u8; TX_STAGING_CAP + 1];
        let err = ch.enqueue(&[&big]).unwrap_err();
        assert_eq!(err, PlatformError::Uart(UartError::TransferTooLong));
        assert!(ch.enqueue(&[]).is_err());
    }
}
