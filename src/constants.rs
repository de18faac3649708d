//! Modbus RTU protocol constants
//!
//! Derived from the Modbus application protocol and serial line specifications:
//! - Maximum RTU ADU size: 256 bytes
//! - Per-function quantity limits are the largest counts whose frames fit the PDU

// ============================================================================
// Frame Size Constants
// ============================================================================

/// Maximum RTU ADU (Application Data Unit) size on a serial line
pub const MAX_ADU_SIZE: usize = 256;

/// Trailing CRC field length
pub const CRC_LEN: usize = 2;

/// Smallest decodable frame: device address + function code + CRC
pub const MIN_ADU_SIZE: usize = 4;

/// Request frame with address and quantity/value fields and no payload,
/// also the size of a write echo response
/// Format: Device(1) + FC(1) + Address(2) + Quantity(2) + CRC(2) = 8 bytes
pub const FIXED_REQUEST_SIZE: usize = 8;

/// Exception frame: Device(1) + FC|0x80(1) + Exception Code(1) + CRC(2)
pub const EXCEPTION_ADU_SIZE: usize = 5;

// ============================================================================
// Addressing
// ============================================================================

/// Broadcast device address, recognised by every slave and never answered
pub const BROADCAST_ADDRESS: u8 = 0;

/// Lowest unicast slave address
pub const MIN_UNICAST_ADDRESS: u8 = 1;

/// Highest unicast slave address accepted by this stack (247-255 reserved)
pub const MAX_UNICAST_ADDRESS: u8 = 246;

/// Largest bank capacity addressable with a 16-bit start address
pub const MAX_BANK_CAPACITY: u32 = 65_536;

// ============================================================================
// Per-function Quantity Limits
// ============================================================================

/// Maximum number of coils/discrete inputs for FC01/FC02
///
/// Response PDU: FC(1) + Byte Count(1) + ceil(N / 8) ≤ 253, N ≤ 2008;
/// the protocol fixes the limit at 2000 (0x7D0).
pub const MAX_READ_COILS: u16 = 2000;

/// Maximum number of registers for FC03/FC04
///
/// Response PDU: FC(1) + Byte Count(1) + N × 2 ≤ 253, N ≤ 125
pub const MAX_READ_REGISTERS: u16 = 125;

/// Maximum number of coils for FC15
///
/// Request PDU: FC(1) + Address(2) + Quantity(2) + Byte Count(1) + ceil(N / 8) ≤ 253;
/// the protocol fixes the limit at 1968 (0x7B0).
pub const MAX_WRITE_COILS: u16 = 1968;

/// Maximum number of registers for FC16
///
/// Request PDU: FC(1) + Address(2) + Quantity(2) + Byte Count(1) + N × 2 ≤ 253, N ≤ 123
pub const MAX_WRITE_REGISTERS: u16 = 123;

// ============================================================================
// Modbus Function Codes
// ============================================================================

/// Read Coils (FC01)
pub const FC_READ_COILS: u8 = 0x01;

/// Read Discrete Inputs (FC02)
pub const FC_READ_DISCRETE_INPUTS: u8 = 0x02;

/// Read Holding Registers (FC03)
pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;

/// Read Input Registers (FC04)
pub const FC_READ_INPUT_REGISTERS: u8 = 0x04;

/// Write Single Coil (FC05)
pub const FC_WRITE_SINGLE_COIL: u8 = 0x05;

/// Write Single Register (FC06)
pub const FC_WRITE_SINGLE_REGISTER: u8 = 0x06;

/// Diagnostics (FC08), serial line only
pub const FC_DIAGNOSTICS: u8 = 0x08;

/// Write Multiple Coils (FC15)
pub const FC_WRITE_MULTIPLE_COILS: u8 = 0x0F;

/// Write Multiple Registers (FC16)
pub const FC_WRITE_MULTIPLE_REGISTERS: u8 = 0x10;

/// Bit set in the function code of an exception response
pub const EXCEPTION_FLAG: u8 = 0x80;

/// Diagnostics sub-function: Return Query Data
pub const DIAG_RETURN_QUERY_DATA: u8 = 0x00;

// ============================================================================
// Single Coil Values
// ============================================================================

/// FC05 value field for ON
pub const COIL_ON: u16 = 0xFF00;

/// FC05 value field for OFF
pub const COIL_OFF: u16 = 0x0000;

// ============================================================================
// Modbus Exception Codes
// ============================================================================

/// Illegal Function
pub const EXCEPTION_ILLEGAL_FUNCTION: u8 = 0x01;

/// Illegal Data Address
pub const EXCEPTION_ILLEGAL_DATA_ADDRESS: u8 = 0x02;

/// Illegal Data Value
pub const EXCEPTION_ILLEGAL_DATA_VALUE: u8 = 0x03;

/// Slave Device Failure
pub const EXCEPTION_SLAVE_DEVICE_FAILURE: u8 = 0x04;

/// Acknowledge
pub const EXCEPTION_ACKNOWLEDGE: u8 = 0x05;

/// Slave Device Busy
pub const EXCEPTION_SLAVE_DEVICE_BUSY: u8 = 0x06;

/// Memory Parity Error
pub const EXCEPTION_MEMORY_PARITY_ERROR: u8 = 0x08;

/// Gateway Path Unavailable
pub const EXCEPTION_GATEWAY_PATH_UNAVAILABLE: u8 = 0x0A;

/// Gateway Target Device Failed to Respond
pub const EXCEPTION_GATEWAY_TARGET_FAILED: u8 = 0x0B;

#[cfg(test)]
mod tests {
    use super::*;

    /// ADU minus device address and CRC
    const MAX_PDU_SIZE: usize = MAX_ADU_SIZE - 1 - CRC_LEN;

    #[test]
    fn test_frame_size_constants() {
        assert_eq!(MAX_ADU_SIZE, 256);
        assert_eq!(MAX_PDU_SIZE, 253);
        assert_eq!(FIXED_REQUEST_SIZE, 1 + 1 + 2 + 2 + CRC_LEN);
        assert_eq!(EXCEPTION_ADU_SIZE, 1 + 1 + 1 + CRC_LEN);
    }

    #[test]
    fn test_register_limits() {
        let read_pdu_size = 1 + 1 + (MAX_READ_REGISTERS as usize * 2);
        assert!(read_pdu_size <= MAX_PDU_SIZE);

        let write_pdu_size = 1 + 2 + 2 + 1 + (MAX_WRITE_REGISTERS as usize * 2);
        assert!(write_pdu_size <= MAX_PDU_SIZE);
    }

    #[test]
    fn test_coil_limits() {
        let read_coil_pdu = 1 + 1 + (MAX_READ_COILS as usize).div_ceil(8);
        assert!(read_coil_pdu <= MAX_PDU_SIZE);

        let write_coil_pdu = 1 + 2 + 2 + 1 + (MAX_WRITE_COILS as usize).div_ceil(8);
        assert!(write_coil_pdu <= MAX_PDU_SIZE);
    }

    #[test]
    fn test_address_space() {
        assert_eq!(MAX_BANK_CAPACITY, u32::from(u16::MAX) + 1);
        assert!(MIN_UNICAST_ADDRESS > BROADCAST_ADDRESS);
        assert!(MAX_UNICAST_ADDRESS < 247);
    }
}
