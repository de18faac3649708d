//! # CRC16 for Modbus RTU
//!
//! Table-driven CRC16 with the reflected Modbus polynomial 0xA001 and an
//! initial value of 0xFFFF. The 256-entry table is split into a high-byte
//! and a low-byte half so each step is two lookups and one XOR on 8-bit
//! accumulators.
//!
//! The returned value is the standard CRC16/MODBUS value. On the wire its
//! low byte is transmitted first:
//!
//! ```rust
//! use modbus_rtu_core::crc::crc16;
//!
//! let crc = crc16(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x01]);
//! assert_eq!(crc, 0x0A84);
//! assert_eq!(crc.to_le_bytes(), [0x84, 0x0A]);
//! ```

/// Reflected Modbus polynomial.
pub const POLYNOMIAL: u16 = 0xA001;

/// Initial accumulator value.
pub const INITIAL: u16 = 0xFFFF;

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u16;
        let mut bit = 0;
        while bit < 8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ POLYNOMIAL;
            } else {
                crc >>= 1;
            }
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

const fn split_table(high: bool) -> [u8; 256] {
    let full = build_table();
    let mut half = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        half[i] = if high {
            (full[i] >> 8) as u8
        } else {
            (full[i] & 0xFF) as u8
        };
        i += 1;
    }
    half
}

/// High bytes of the CRC table.
static TABLE_HI: [u8; 256] = split_table(true);

/// Low bytes of the CRC table.
static TABLE_LO: [u8; 256] = split_table(false);

/// Compute the Modbus CRC16 over `data`.
///
/// Pure and total: an empty slice yields the initial value 0xFFFF.
///
/// The "accumulator hi" that indexes the classic hi/lo table formulation is
/// the register's low byte here, hence `lo ^ byte`.
pub fn crc16(data: &[u8]) -> u16 {
    let [mut lo, mut hi] = INITIAL.to_le_bytes();
    for &byte in data {
        let index = usize::from(lo ^ byte);
        lo = hi ^ TABLE_LO[index];
        hi = TABLE_HI[index];
    }
    u16::from_be_bytes([hi, lo])
}

/// Check a complete frame whose last two bytes are the CRC (low byte first).
///
/// Returns `(computed, received)` so callers can report both on mismatch.
/// Frames shorter than the CRC field itself compare as a mismatch.
pub fn check_frame(frame: &[u8]) -> (u16, u16) {
    if frame.len() < 2 {
        return (crc16(&[]), !crc16(&[]));
    }
    let (body, tail) = frame.split_at(frame.len() - 2);
    (crc16(body), u16::from_le_bytes([tail[0], tail[1]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modbus_reference_vector() {
        let crc = crc16(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x01]);
        assert_eq!(crc, 0x0A84);
        assert_eq!((crc >> 8) as u8, 0x0A);
        assert_eq!((crc & 0xFF) as u8, 0x84);
    }

    #[test]
    fn test_check_string() {
        // CRC-16/MODBUS catalogue check value
        assert_eq!(crc16(b"123456789"), 0x4B37);
    }

    #[test]
    fn test_more_known_frames() {
        assert_eq!(crc16(&[0x11, 0x03, 0x00, 0x6B, 0x00, 0x03]), 0x8776);
        assert_eq!(crc16(&[0x01, 0x06, 0x00, 0x00, 0x00, 0x01]), 0x0A48);
        assert_eq!(crc16(&[0x01, 0x83, 0x02]), 0xF1C0);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(crc16(&[]), INITIAL);
    }

    #[test]
    fn test_deterministic() {
        let frame = [0x01, 0x10, 0x00, 0x00, 0x00, 0x02, 0x04, 0x00, 0x0A, 0x01, 0x02];
        assert_eq!(crc16(&frame), crc16(&frame));
        assert_eq!(crc16(&frame), 0xFC53);
    }

    #[test]
    fn test_table_halves() {
        assert_eq!(TABLE_HI[0], 0x00);
        assert_eq!(TABLE_LO[0], 0x00);
        // Entry 1 of the reflected 0xA001 table is 0xC0C1
        assert_eq!(TABLE_HI[1], 0xC0);
        assert_eq!(TABLE_LO[1], 0xC1);
        // Entry 255 is 0x4040
        assert_eq!(TABLE_HI[255], 0x40);
        assert_eq!(TABLE_LO[255], 0x40);
    }

    #[test]
    fn test_check_frame() {
        let frame = [0x01, 0x03, 0x00, 0x00, 0x00, 0x01, 0x84, 0x0A];
        let (computed, received) = check_frame(&frame);
        assert_eq!(computed, received);

        let corrupted = [0x01, 0x03, 0x00, 0x00, 0x00, 0x01, 0x84, 0x0B];
        let (computed, received) = check_frame(&corrupted);
        assert_ne!(computed, received);

        let (computed, received) = check_frame(&[0x01]);
        assert_ne!(computed, received);
    }
}
