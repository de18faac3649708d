//! # Bit and Byte Packing
//!
//! Multi-byte Modbus fields (addresses, quantities, register values, CRC)
//! are split into a high and a low byte. Coil and discrete-input states are
//! packed eight per byte, least significant bit first.
//!
//! ## Naming Convention
//!
//! For 16-bit value `0x1234`:
//! - high byte (Hi): `0x12`
//! - low byte (Low): `0x34`
//!
//! For coils `[on, off, on]` packed: `0b0000_0101`

/// Split a 16-bit value into `(hi, lo)`.
///
/// # Example
///
/// ```rust
/// use modbus_rtu_core::bytes::{join8, split16};
///
/// assert_eq!(split16(0x1234), (0x12, 0x34));
/// assert_eq!(join8(0x12, 0x34), 0x1234);
/// ```
#[inline]
pub fn split16(value: u16) -> (u8, u8) {
    let [hi, lo] = value.to_be_bytes();
    (hi, lo)
}

/// Join a high and a low byte into a 16-bit value. Inverse of [`split16`].
#[inline]
pub fn join8(hi: u8, lo: u8) -> u16 {
    u16::from_be_bytes([hi, lo])
}

/// Number of bytes needed to carry `quantity` packed bits.
#[inline]
pub fn bit_byte_count(quantity: usize) -> usize {
    quantity.div_ceil(8)
}

/// Pack bits eight per byte, LSB first. The last byte is zero-padded.
pub fn pack_bits(bits: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; bit_byte_count(bits.len())];
    for (i, &bit) in bits.iter().enumerate() {
        if bit {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    bytes
}

/// Unpack `quantity` bits from LSB-first packed bytes.
///
/// Missing bytes read as `false`; padding bits beyond `quantity` are dropped.
pub fn unpack_bits(bytes: &[u8], quantity: usize) -> Vec<bool> {
    (0..quantity)
        .map(|i| {
            bytes
                .get(i / 8)
                .map(|byte| (byte >> (i % 8)) & 0x01 != 0)
                .unwrap_or(false)
        })
        .collect()
}

/// Convert register values to big-endian bytes.
pub fn registers_to_bytes(registers: &[u16]) -> Vec<u8> {
    registers.iter().flat_map(|value| value.to_be_bytes()).collect()
}

/// Convert big-endian bytes to register values. A trailing odd byte is ignored.
pub fn bytes_to_registers(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|pair| join8(pair[0], pair[1]))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_split16() {
        assert_eq!(split16(0x0000), (0x00, 0x00));
        assert_eq!(split16(0x00FF), (0x00, 0xFF));
        assert_eq!(split16(0x0100), (0x01, 0x00));
        assert_eq!(split16(0xFFFF), (0xFF, 0xFF));
    }

    #[test]
    fn test_join8_inverts_split16() {
        for value in [0u16, 1, 255, 256, 65535] {
            let (hi, lo) = split16(value);
            assert_eq!(join8(hi, lo), value);
        }
    }

    #[test]
    fn test_bit_byte_count() {
        assert_eq!(bit_byte_count(0), 0);
        assert_eq!(bit_byte_count(1), 1);
        assert_eq!(bit_byte_count(8), 1);
        assert_eq!(bit_byte_count(9), 2);
        assert_eq!(bit_byte_count(2000), 250);
    }

    #[test]
    fn test_pack_bits_lsb_first() {
        assert_eq!(pack_bits(&[true, false, true]), vec![0b0000_0101]);
        // 0xCD 0x01 from the protocol's FC15 example: 10 coils
        let coils = [
            true, false, true, true, false, false, true, true, true, false,
        ];
        assert_eq!(pack_bits(&coils), vec![0xCD, 0x01]);
    }

    #[test]
    fn test_unpack_bits_truncates_padding() {
        let bits = unpack_bits(&[0xCD, 0x01], 10);
        assert_eq!(
            bits,
            vec![true, false, true, true, false, false, true, true, true, false]
        );
        assert_eq!(unpack_bits(&[0xFF], 3), vec![true, true, true]);
        assert_eq!(unpack_bits(&[], 2), vec![false, false]);
    }

    #[test]
    fn test_register_bytes() {
        assert_eq!(registers_to_bytes(&[0x000A, 0x0102]), vec![0x00, 0x0A, 0x01, 0x02]);
        assert_eq!(bytes_to_registers(&[0x00, 0x0A, 0x01, 0x02]), vec![0x000A, 0x0102]);
        assert_eq!(bytes_to_registers(&[0x12, 0x34, 0x56]), vec![0x1234]);
    }

    proptest! {
        #[test]
        fn prop_join8_split16_inverse(value in any::<u16>()) {
            let (hi, lo) = split16(value);
            prop_assert_eq!(join8(hi, lo), value);
        }

        #[test]
        fn prop_pack_unpack_bits(bits in proptest::collection::vec(any::<bool>(), 0..64)) {
            let packed = pack_bits(&bits);
            prop_assert_eq!(packed.len(), bit_byte_count(bits.len()));
            prop_assert_eq!(unpack_bits(&packed, bits.len()), bits);
        }
    }
}
