//! GNSS position decoding
//!
//! The receiver streams NMEA 0183 text. Only `$GPGLL` (geographic position,
//! latitude/longitude) is decoded; everything else is skipped. Raw receive
//! chunks carry no sentence alignment, so a [`LineAssembler`] first splices
//! them into CRLF-terminated lines.
//!
//! A decoded fix is cached as a fully rendered [`PositionRecord`] line,
//! ready for display: a fix that never arrives shows an explicit waiting
//! placeholder rather than fake zero coordinates.

use core::fmt::Write;

use heapless::{String, Vec};

/// Local timezone offset applied to UTC timestamps, in whole hours.
/// Compile-time configuration via `AIRMON_TZ_OFFSET_HOURS` (see build.rs).
pub const TZ_OFFSET_HOURS: i8 = const_parse_i8(env!("AIRMON_TZ_OFFSET_HOURS"));

/// Sentence tag handled by the decoder.
pub const GPGLL_PREFIX: &[u8] = b"$GPGLL,";

/// Capacity of a rendered position line.
pub const POSITION_LINE_CAP: usize = 96;

const WAIT_COORD: &str = "Waiting for data..., -";
const WAIT_TIME: &str = "--:--:--";

/// Parse a signed decimal integer at compile time. Stops at the first
/// non-digit, like the C library parser the env defaults came from.
const fn const_parse_i8(s: &str) -> i8 {
    let bytes = s.as_bytes();
    let mut i = 0;
    let mut neg = false;
    if !bytes.is_empty() && bytes[0] == b'-' {
        neg = true;
        i = 1;
    }
    let mut v: i32 = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b < b'0' || b > b'9' {
            break;
        }
        v = v * 10 + (b - b'0') as i32;
        i += 1;
    }
    if neg {
        v = -v;
    }
    v as i8
}

/// Decode failures. A malformed field inside a `$GPGLL` sentence is not an
/// error; the affected part of the record falls back to its placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NmeaError {
    /// Not a `$GPGLL` sentence.
    NotGpgll,
    /// The rendered record did not fit its buffer.
    Truncated,
}

/// The latest fix, rendered as `HH:MM:SS | Lat: ... | Lon: ...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionRecord {
    line: String<POSITION_LINE_CAP>,
}

impl PositionRecord {
    pub fn as_str(&self) -> &str {
        &self.line
    }
}

impl Default for PositionRecord {
    fn default() -> Self {
        let mut line = String::new();
        let _ = write!(
            line,
            "{} | Lat: {} | Lon: {}",
            WAIT_TIME, WAIT_COORD, WAIT_COORD
        );
        PositionRecord { line }
    }
}

/// Decode one `$GPGLL` sentence into `out`.
///
/// On error the record is left untouched, so the previous fix survives a
/// garbled sentence.
pub fn decode_gpgll(
    sentence: &[u8],
    tz_offset_hours: i8,
    out: &mut PositionRecord,
) -> Result<(), NmeaError> {
    if sentence.len() < GPGLL_PREFIX.len() || &sentence[..GPGLL_PREFIX.len()] != GPGLL_PREFIX {
        return Err(NmeaError::NotGpgll);
    }

    // Comma-separated fields, terminated by the '*' checksum marker.
    // Field order: lat, N/S, lon, E/W, UTC hhmmss.sss.
    let mut fields: [&[u8]; 5] = [&[]; 5];
    let body = &sentence[GPGLL_PREFIX.len()..];
    let mut start = 0;
    let mut idx = 0;
    for (i, &b) in body.iter().enumerate() {
        if b == b',' || b == b'*' {
            if idx < fields.len() {
                fields[idx] = &body[start..i];
                idx += 1;
            }
            if b == b'*' {
                break;
            }
            start = i + 1;
        }
    }
    let [lat, lat_dir, lon, lon_dir, utc] = fields;

    let mut line: String<POSITION_LINE_CAP> = String::new();

    match local_time(utc, tz_offset_hours) {
        Some((h, m, s)) => {
            write!(line, "{:02}:{:02}:{:02}", h, m, s).map_err(|_| NmeaError::Truncated)?
        }
        None => line.push_str(WAIT_TIME).map_err(|_| NmeaError::Truncated)?,
    }

    write_coordinate(&mut line, "Lat", lat, lat_dir, 2).map_err(|_| NmeaError::Truncated)?;
    write_coordinate(&mut line, "Lon", lon, lon_dir, 3).map_err(|_| NmeaError::Truncated)?;

    out.line = line;
    Ok(())
}

fn write_coordinate(
    line: &mut String<POSITION_LINE_CAP>,
    label: &str,
    value: &[u8],
    dir: &[u8],
    deg_width: usize,
) -> core::fmt::Result {
    if value.is_empty() {
        return write!(line, " | {}: {}", label, WAIT_COORD);
    }
    let degrees = decimal_degrees(value, deg_width);
    let hemi = dir.first().copied().unwrap_or(b'-') as char;
    write!(line, " | {}: {:.6} deg, {}", label, degrees, hemi)
}

/// `ddmm.mmmm` (or `dddmm.mmmm`) to decimal degrees.
fn decimal_degrees(field: &[u8], deg_width: usize) -> f64 {
    let split = deg_width.min(field.len());
    let degrees = ascii_u32(&field[..split]);
    let minutes = if field.len() > deg_width {
        ascii_f64(&field[deg_width..])
    } else {
        0.0
    };
    degrees as f64 + minutes / 60.0
}

/// UTC `hhmmss[.sss]` shifted into the local timezone, wrapped to [0, 24).
fn local_time(utc: &[u8], tz_offset_hours: i8) -> Option<(u32, u32, u32)> {
    if utc.len() < 6 {
        return None;
    }
    let h = two_digits(&utc[0..2])?;
    let m = two_digits(&utc[2..4])?;
    let s = two_digits(&utc[4..6])?;
    let local = (h as i32 + tz_offset_hours as i32).rem_euclid(24);
    Some((local as u32, m, s))
}

fn two_digits(b: &[u8]) -> Option<u32> {
    if b[0].is_ascii_digit() && b[1].is_ascii_digit() {
        Some(((b[0] - b'0') as u32) * 10 + (b[1] - b'0') as u32)
    } else {
        None
    }
}

/// Unsigned decimal, stopping at the first non-digit.
fn ascii_u32(b: &[u8]) -> u32 {
    let mut v = 0u32;
    for &c in b {
        if !c.is_ascii_digit() {
            break;
        }
        v = v.wrapping_mul(10).wrapping_add((c - b'0') as u32);
    }
    v
}

/// Non-negative decimal with an optional fractional part, stopping at the
/// first byte that fits neither.
fn ascii_f64(b: &[u8]) -> f64 {
    let mut v = 0.0f64;
    let mut scale = 0.0f64;
    for &c in b {
        if c.is_ascii_digit() {
            let d = (c - b'0') as f64;
            if scale == 0.0 {
                v = v * 10.0 + d;
            } else {
                v += d * scale;
                scale /= 10.0;
            }
        } else if c == b'.' && scale == 0.0 {
            scale = 0.1;
        } else {
            break;
        }
    }
    v
}

/// Splices raw receive chunks into CRLF-terminated lines.
///
/// Overflow means sentence framing has been lost, so the whole assembly
/// buffer is dropped and accumulation restarts from the next chunk.
pub struct LineAssembler<const N: usize> {
    buf: [u8; N],
    len: usize,
}

impl<const N: usize> LineAssembler<N> {
    pub fn new() -> Self {
        Self {
            buf: [0; N],
            len: 0,
        }
    }

    /// Append a chunk. Returns false after an overflow reset.
    pub fn push(&mut self, data: &[u8]) -> bool {
        if self.len + data.len() >= N {
            self.len = 0;
            return false;
        }
        self.buf[self.len..self.len + data.len()].copy_from_slice(data);
        self.len += data.len();
        true
    }

    /// Extract the next complete line, without its CRLF.
    pub fn next_line(&mut self) -> Option<Vec<u8, N>> {
        let pos = self.buf[..self.len].windows(2).position(|w| w == b"\r\n")?;
        let mut line = Vec::new();
        let _ = line.extend_from_slice(&self.buf[..pos]);
        let consumed = pos + 2;
        self.buf.copy_within(consumed..self.len, 0);
        self.len -= consumed;
        Some(line)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<const N: usize> Default for LineAssembler<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENTENCE: &[u8] = b"$GPGLL,4043.9620,N,07959.0350,W,075959.00,A,A*7B";

    #[test]
    fn test_decode_full_sentence() {
        let mut rec = PositionRecord::default();
        decode_gpgll(SENTENCE, 8, &mut rec).unwrap();
        assert_eq!(
            rec.as_str(),
            "15:59:59 | Lat: 40.732700 deg, N | Lon: 79.983917 deg, W"
        );
    }

    #[test]
    fn test_timezone_wraps_forward_and_back() {
        let mut rec = PositionRecord::default();
        decode_gpgll(
            b"$GPGLL,4043.9620,N,07959.0350,W,235959.00,A,A*77",
            8,
            &mut rec,
        )
        .unwrap();
        assert_eq!(
            rec.as_str(),
            "07:59:59 | Lat: 40.732700 deg, N | Lon: 79.983917 deg, W"
        );

        decode_gpgll(
            b"$GPGLL,4043.9620,N,07959.0350,W,013000.00,A,A*00",
            -8,
            &mut rec,
        )
        .unwrap();
        assert!(rec.as_str().starts_with("17:30:00"));
    }

    #[test]
    fn test_empty_fields_render_placeholders() {
        let mut rec = PositionRecord::default();
        decode_gpgll(b"$GPGLL,,,,,*7A", 8, &mut rec).unwrap();
        assert_eq!(
            rec.as_str(),
            "--:--:-- | Lat: Waiting for data..., - | Lon: Waiting for data..., -"
        );
    }

    #[test]
    fn test_empty_coordinates_with_valid_time() {
        let mut rec = PositionRecord::default();
        decode_gpgll(b"$GPGLL,,,,,123519.00,V,N*4D", 8, &mut rec).unwrap();
        assert_eq!(
            rec.as_str(),
            "20:35:19 | Lat: Waiting for data..., - | Lon: Waiting for data..., -"
        );
    }

    #[test]
    fn test_short_time_field_renders_placeholder() {
        let mut rec = PositionRecord::default();
        decode_gpgll(b"$GPGLL,4043.9620,N,07959.0350,W,0759,A,A*7B", 8, &mut rec).unwrap();
        assert!(rec.as_str().starts_with("--:--:-- | Lat: 40.732700"));
    }

    #[test]
    fn test_other_sentences_leave_record_untouched() {
        let mut rec = PositionRecord::default();
        decode_gpgll(SENTENCE, 8, &mut rec).unwrap();
        let before = rec.clone();
        assert_eq!(
            decode_gpgll(b"$GPGSV,3,1,11,10,63,137,17*77", 8, &mut rec),
            Err(NmeaError::NotGpgll)
        );
        assert_eq!(rec, before);
    }

    #[test]
    fn test_default_record_is_placeholder() {
        let rec = PositionRecord::default();
        assert_eq!(
            rec.as_str(),
            "--:--:-- | Lat: Waiting for data..., - | Lon: Waiting for data..., -"
        );
    }

    #[test]
    fn test_const_parse_i8() {
        assert_eq!(const_parse_i8("8"), 8);
        assert_eq!(const_parse_i8("-5"), -5);
        assert_eq!(const_parse_i8("12x"), 12);
        assert_eq!(const_parse_i8(""), 0);
    }

    #[test]
    fn test_assembler_joins_chunks() {
        let mut asm: LineAssembler<64> = LineAssembler::new();
        assert!(asm.push(b"$GPGLL,ab"));
        assert!(asm.next_line().is_none());
        assert!(asm.push(b"cd\r\n$GPG"));
        let line = asm.next_line().unwrap();
        assert_eq!(line.as_slice(), b"$GPGLL,abcd");
        // Remainder stays queued for the next chunk.
        assert_eq!(asm.len(), 4);
    }

    #[test]
    fn test_assembler_yields_multiple_lines() {
        let mut asm: LineAssembler<64> = LineAssembler::new();
        assert!(asm.push(b"one\r\ntwo\r\n"));
        assert_eq!(asm.next_line().unwrap().as_slice(), b"one");
        assert_eq!(asm.next_line().unwrap().as_slice(), b"two");
        assert!(asm.next_line().is_none());
        assert!(asm.is_empty());
    }

    #[test]
    fn test_assembler_overflow_drops_everything() {
        let mut asm: LineAssembler<16> = LineAssembler::new();
        assert!(asm.push(b"0123456789"));
        assert!(!asm.push(b"0123456789"));
        assert!(asm.is_empty());
        // Accumulation restarts cleanly.
        assert!(asm.push(b"ok\r\n"));
        assert_eq!(asm.next_line().unwrap().as_slice(), b"ok");
    }
}
