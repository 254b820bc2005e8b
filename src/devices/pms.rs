//! PMS-family particulate sensor frame parser
//!
//! The sensor streams fixed-format binary frames: two magic bytes
//! `0x42 0x4D`, a big-endian length field counting everything after itself,
//! the payload, and a big-endian checksum that sums every byte from the first
//! magic byte through the last payload byte (mod 65536). A standard reading
//! carries 12 big-endian u16 fields in the first 24 payload bytes.
//!
//! [`PmsParser::feed`] consumes one byte at a time so input can arrive in
//! arbitrary chunks; any structural error resets the parser so it hunts for
//! the next magic sequence, and a valid frame embedded in garbage still
//! decodes.

use heapless::Vec;

use crate::core::tick::Tick;

/// Frame start bytes.
pub const PMS_MAGIC: [u8; 2] = [0x42, 0x4D];

/// Largest whole frame on the wire: magic + length + max payload + checksum.
pub const PMS_FRAME_MAX: usize = 32;

/// Length field bounds. The field counts payload plus the 2 checksum bytes.
const PMS_LEN_MIN: u16 = 2;
const PMS_LEN_MAX: u16 = (PMS_FRAME_MAX - 4) as u16;

/// Payload bytes (length field minus checksum) a full frame may carry.
const PMS_PAYLOAD_CAP: usize = (PMS_LEN_MAX - 2) as usize;

/// Bytes the 12 reading fields occupy at the head of the payload.
const PMS_READING_BYTES: usize = 24;

/// One decoded particulate reading.
///
/// Concentrations in ug/m3, particle counts per 0.1 L of air.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PmsReading {
    pub pm1_0_std: u16,
    pub pm2_5_std: u16,
    pub pm10_std: u16,
    pub pm1_0_atm: u16,
    pub pm2_5_atm: u16,
    pub pm10_atm: u16,
    pub particles_0_3um: u16,
    pub particles_0_5um: u16,
    pub particles_1_0um: u16,
    pub particles_2_5um: u16,
    pub particles_5_0um: u16,
    pub particles_10um: u16,
}

/// Outcome of feeding one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PmsStatus {
    /// Mid-frame, keep feeding.
    Pending,
    /// A reading was decoded into the output.
    Complete,
    /// Second magic byte missing; parser resynchronized.
    BadStart,
    /// Length field out of range, or a checksum-valid frame too short to
    /// carry a reading (sensor acks).
    BadLength,
    /// Frame arrived intact but the checksum disagreed.
    ChecksumMismatch,
    /// Internal payload buffer exhausted; parser resynchronized.
    Overflow,
}

#[derive(Debug, Clone, Copy)]
enum State {
    WaitStart1,
    WaitStart2,
    LenHigh,
    LenLow,
    Data { remaining: u16 },
    ChecksumHigh,
    ChecksumLow { hi: u8 },
}

/// Byte-at-a-time frame parser.
pub struct PmsParser {
    state: State,
    sum: u16,
    frame_len: u16,
    payload: Vec<u8, PMS_PAYLOAD_CAP>,
}

impl PmsParser {
    pub fn new() -> Self {
        Self {
            state: State::WaitStart1,
            sum: 0,
            frame_len: 0,
            payload: Vec::new(),
        }
    }

    /// Drop any partial frame and hunt for the next magic sequence.
    pub fn reset(&mut self) {
        self.state = State::WaitStart1;
        self.sum = 0;
        self.frame_len = 0;
        self.payload.clear();
    }

    /// Consume one byte. On [`PmsStatus::Complete`] the decoded reading has
    /// been written to `out`; on any error status the parser has already
    /// reset itself.
    pub fn feed(&mut self, byte: u8, out: &mut PmsReading) -> PmsStatus {
        match self.state {
            State::WaitStart1 => {
                if byte == PMS_MAGIC[0] {
                    self.begin();
                }
                // Anything else between frames is ignored.
                PmsStatus::Pending
            }
            State::WaitStart2 => {
                if byte == PMS_MAGIC[1] {
                    self.sum = self.sum.wrapping_add(byte as u16);
                    self.state = State::LenHigh;
                    PmsStatus::Pending
                } else {
                    // Re-offer the byte as a possible new frame start.
                    self.reset();
                    if byte == PMS_MAGIC[0] {
                        self.begin();
                    }
                    PmsStatus::BadStart
                }
            }
            State::LenHigh => {
                self.sum = self.sum.wrapping_add(byte as u16);
                self.frame_len = (byte as u16) << 8;
                self.state = State::LenLow;
                PmsStatus::Pending
            }
            State::LenLow => {
                self.sum = self.sum.wrapping_add(byte as u16);
                self.frame_len |= byte as u16;
                if self.frame_len < PMS_LEN_MIN || self.frame_len > PMS_LEN_MAX {
                    self.reset();
                    return PmsStatus::BadLength;
                }
                let data_len = self.frame_len - 2;
                self.state = if data_len == 0 {
                    State::ChecksumHigh
                } else {
                    State::Data {
                        remaining: data_len,
                    }
                };
                PmsStatus::Pending
            }
            State::Data { remaining } => {
                self.sum = self.sum.wrapping_add(byte as u16);
                if self.payload.push(byte).is_err() {
                    self.reset();
                    return PmsStatus::Overflow;
                }
                self.state = if remaining <= 1 {
                    State::ChecksumHigh
                } else {
                    State::Data {
                        remaining: remaining - 1,
                    }
                };
                PmsStatus::Pending
            }
            State::ChecksumHigh => {
                self.state = State::ChecksumLow { hi: byte };
                PmsStatus::Pending
            }
            State::ChecksumLow { hi } => {
                let expected = ((hi as u16) << 8) | byte as u16;
                if expected != self.sum {
                    self.reset();
                    return PmsStatus::ChecksumMismatch;
                }
                // Only a checksum-verified payload may touch the caller's reading.
                let decoded = self.try_decode(out);
                self.reset();
                if decoded {
                    PmsStatus::Complete
                } else {
                    // Checksum-valid but too short for a reading.
                    PmsStatus::BadLength
                }
            }
        }
    }

    fn begin(&mut self) {
        self.state = State::WaitStart2;
        self.sum = PMS_MAGIC[0] as u16;
        self.frame_len = 0;
        self.payload.clear();
    }

    fn try_decode(&self, out: &mut PmsReading) -> bool {
        if self.payload.len() < PMS_READING_BYTES {
            return false;
        }
        let mut fields = [0u16; 12];
        for (i, f) in fields.iter_mut().enumerate() {
            *f = u16::from_be_bytes([self.payload[2 * i], self.payload[2 * i + 1]]);
        }
        *out = PmsReading {
            pm1_0_std: fields[0],
            pm2_5_std: fields[1],
            pm10_std: fields[2],
            pm1_0_atm: fields[3],
            pm2_5_atm: fields[4],
            pm10_atm: fields[5],
            particles_0_3um: fields[6],
            particles_0_5um: fields[7],
            particles_1_0um: fields[8],
            particles_2_5um: fields[9],
            particles_5_0um: fields[10],
            particles_10um: fields[11],
        };
        true
    }
}

impl Default for PmsParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode a full-length frame for a reading. Used by the host-side
/// simulation and tests; shares the checksum boundary with the parser.
pub fn encode_frame(reading: &PmsReading) -> Vec<u8, PMS_FRAME_MAX> {
    let fields = [
        reading.pm1_0_std,
        reading.pm2_5_std,
        reading.pm10_std,
        reading.pm1_0_atm,
        reading.pm2_5_atm,
        reading.pm10_atm,
        reading.particles_0_3um,
        reading.particles_0_5um,
        reading.particles_1_0um,
        reading.particles_2_5um,
        reading.particles_5_0um,
        reading.particles_10um,
    ];
    let mut frame: Vec<u8, PMS_FRAME_MAX> = Vec::new();
    let _ = frame.extend_from_slice(&PMS_MAGIC);
    let _ = frame.extend_from_slice(&PMS_LEN_MAX.to_be_bytes());
    for f in fields {
        let _ = frame.extend_from_slice(&f.to_be_bytes());
    }
    // Reserved trailing payload bytes.
    let _ = frame.extend_from_slice(&[0, 0]);
    let sum: u16 = frame
        .iter()
        .fold(0u16, |acc, &b| acc.wrapping_add(b as u16));
    let _ = frame.extend_from_slice(&sum.to_be_bytes());
    frame
}

/// Accumulates raw receive chunks until enough has arrived (or the stream
/// has gone quiet) to be worth handing to the parser in one pass.
pub struct Batcher<const N: usize> {
    buf: Vec<u8, N>,
    last_push: Tick,
}

/// Batch size that forces a hand-off to the parser.
pub const PMS_BATCH_FLUSH_LEN: usize = PMS_FRAME_MAX;

/// Quiet period after which a non-empty batch is handed off anyway.
pub const PMS_BATCH_TIMEOUT: Tick = Tick::from_millis(25);

impl<const N: usize> Batcher<N> {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            last_push: Tick::ZERO,
        }
    }

    /// Append a chunk. Returns false (batch untouched) when it would not
    /// fit; the caller should flush and retry.
    pub fn push(&mut self, data: &[u8], now: Tick) -> bool {
        if self.buf.len() + data.len() > N {
            return false;
        }
        let _ = self.buf.extend_from_slice(data);
        self.last_push = now;
        true
    }

    pub fn ready(&self, now: Tick) -> bool {
        self.buf.len() >= PMS_BATCH_FLUSH_LEN
            || (!self.buf.is_empty()
                && Tick::delta(now, self.last_push) >= PMS_BATCH_TIMEOUT)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Cleared unconditionally after a hand-off, decoded or not.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl<const N: usize> Default for Batcher<N> {
    fn default() -> Self {
        Self::new()
    }
}
