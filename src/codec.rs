//! # RTU Frame Codec
//!
//! Conversion between [`Packet`] values and RTU byte sequences.
//!
//! ## Frame Layout
//!
//! | Function | Request body after `[dev][fc]` | Response body after `[dev][fc]` |
//! |----------|-------------------------------|---------------------------------|
//! | 01-04 | addr, qty | byte count, data |
//! | 05 | addr, 0xFF00 / 0x0000 | echo |
//! | 06 | addr, value | echo |
//! | 08 | sub, word, word | echo |
//! | 15 | addr, qty, byte count, packed bits | addr, qty |
//! | 16 | addr, qty, byte count, registers | addr, qty |
//!
//! Every frame ends with the CRC16, low byte first. Decoding verifies the
//! CRC before any field is looked at.
//!
//! Request decoding is split in two stages so a slave can validate fields in
//! protocol order before checking payload structure:
//! [`decode_raw_request`] extracts fields positionally, and
//! [`RawRequest::to_packet`] checks the payload against them.

use ::bytes::Buf;
use tracing::{debug, trace};

use crate::adu::{Adu, AduBuilder};
use crate::bytes::{
    bit_byte_count, bytes_to_registers, pack_bits, registers_to_bytes, unpack_bits,
};
use crate::config::BankCapacities;
use crate::constants::{
    COIL_OFF, COIL_ON, CRC_LEN, DIAG_RETURN_QUERY_DATA, EXCEPTION_ADU_SIZE, EXCEPTION_FLAG,
    FIXED_REQUEST_SIZE, MAX_ADU_SIZE, MIN_ADU_SIZE,
};
use crate::crc::check_frame;
use crate::error::{ModbusError, ModbusResult};
use crate::exception::is_exception_function_code;
use crate::function::ModbusFunction;
use crate::packet::{Packet, PacketData};
use crate::validator;

// ============================================================================
// Frame Checks
// ============================================================================

/// Reject byte sequences that cannot be an RTU frame.
pub fn check_length(frame: &[u8]) -> ModbusResult<()> {
    if frame.len() < MIN_ADU_SIZE {
        return Err(ModbusError::frame(format!(
            "frame too short: {} bytes (minimum {})",
            frame.len(),
            MIN_ADU_SIZE
        )));
    }
    if frame.len() > MAX_ADU_SIZE {
        return Err(ModbusError::frame(format!(
            "frame too long: {} bytes (maximum {})",
            frame.len(),
            MAX_ADU_SIZE
        )));
    }
    Ok(())
}

/// Verify the trailing CRC and return it.
pub fn verify_crc(frame: &[u8]) -> ModbusResult<u16> {
    let (computed, received) = check_frame(frame);
    if computed != received {
        debug!(
            "CRC mismatch: computed={:04X}, received={:04X}, len={}",
            computed,
            received,
            frame.len()
        );
        return Err(ModbusError::CrcMismatch { computed, received });
    }
    Ok(received)
}

/// Length and CRC check; returns the body without the CRC and the CRC.
fn open_frame(frame: &[u8]) -> ModbusResult<(&[u8], u16)> {
    check_length(frame)?;
    let crc = verify_crc(frame)?;
    Ok((&frame[..frame.len() - CRC_LEN], crc))
}

// ============================================================================
// Requests
// ============================================================================

/// Request fields extracted positionally from a CRC-checked frame.
///
/// Nothing beyond the CRC has been checked yet. `word` is the 16-bit field
/// after the address: the quantity for reads and multiple writes, the value
/// for single writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRequest<'a> {
    pub device_id: u8,
    pub function_code: u8,
    pub sub_function: Option<u8>,
    pub address: u16,
    pub word: u16,
    pub byte_count: Option<u8>,
    /// Bytes left after the fixed fields.
    pub payload: &'a [u8],
    pub crc: u16,
    complete: bool,
}

impl<'a> RawRequest<'a> {
    #[inline]
    pub fn function(&self) -> Option<ModbusFunction> {
        ModbusFunction::from_u8(self.function_code)
    }

    /// All fixed fields for the function were present.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Quantity the request covers; single writes always cover one element.
    pub fn quantity(&self) -> u16 {
        match self.function() {
            Some(function) if function.is_single_write() => 1,
            _ => self.word,
        }
    }

    /// Check function code, then start address, then quantity.
    ///
    /// A known function whose fixed fields were cut short fails as invalid
    /// data after the function check.
    pub fn validate(&self, capacities: &BankCapacities) -> ModbusResult<ModbusFunction> {
        let function = validator::check_function_code(self.function_code)?;
        if !self.complete {
            return Err(ModbusError::invalid_data(format!(
                "{} request truncated",
                function
            )));
        }
        validator::check_start_address(function, self.address, capacities)?;
        validator::check_quantity(function, self.address, self.quantity(), capacities)?;
        Ok(function)
    }

    /// Check the payload against the fixed fields and build the packet.
    ///
    /// An unknown function code yields a packet carrying only the device
    /// address, the raw code and the CRC.
    pub fn to_packet(&self) -> ModbusResult<Packet> {
        let mut packet = Packet {
            device_id: self.device_id,
            function_code: self.function_code,
            sub_function: self.sub_function,
            crc: self.crc,
            ..Packet::default()
        };
        let Some(function) = self.function() else {
            return Ok(packet);
        };
        if !self.complete {
            return Err(ModbusError::invalid_data(format!(
                "{} request truncated",
                function
            )));
        }
        packet.address = self.address;
        packet.quantity = self.quantity();

        match function {
            ModbusFunction::WriteSingleCoil => {
                self.expect_no_payload(function)?;
                let on = match self.word {
                    COIL_ON => true,
                    COIL_OFF => false,
                    other => {
                        return Err(ModbusError::invalid_data(format!(
                            "coil value {:#06X} is neither 0xFF00 nor 0x0000",
                            other
                        )))
                    }
                };
                packet.data = PacketData::Coils(vec![on]);
            }
            ModbusFunction::WriteSingleRegister => {
                self.expect_no_payload(function)?;
                packet.data = PacketData::HoldingRegisters(vec![self.word]);
            }
            ModbusFunction::WriteMultipleCoils => {
                let bytes = self.counted_payload(bit_byte_count(usize::from(self.word)))?;
                packet.byte_count = bytes.len() as u8;
                packet.data = PacketData::Coils(unpack_bits(bytes, usize::from(self.word)));
            }
            ModbusFunction::WriteMultipleRegisters => {
                let bytes = self.counted_payload(usize::from(self.word) * 2)?;
                packet.byte_count = bytes.len() as u8;
                packet.data = PacketData::HoldingRegisters(bytes_to_registers(bytes));
            }
            _ => self.expect_no_payload(function)?,
        }
        Ok(packet)
    }

    fn expect_no_payload(&self, function: ModbusFunction) -> ModbusResult<()> {
        if self.payload.is_empty() {
            Ok(())
        } else {
            Err(ModbusError::invalid_data(format!(
                "{} request has {} unexpected trailing bytes",
                function,
                self.payload.len()
            )))
        }
    }

    /// Payload of a multiple write: byte count must match the quantity and
    /// the bytes actually present.
    fn counted_payload(&self, expected: usize) -> ModbusResult<&'a [u8]> {
        let declared = usize::from(self.byte_count.unwrap_or(0));
        if declared != expected {
            return Err(ModbusError::invalid_data(format!(
                "byte count {} does not match quantity {} (expected {})",
                declared, self.word, expected
            )));
        }
        if self.payload.len() != declared {
            return Err(ModbusError::invalid_data(format!(
                "byte count {} but {} data bytes present",
                declared,
                self.payload.len()
            )));
        }
        Ok(self.payload)
    }
}

/// Stage one of request decoding: length, CRC, then positional fields.
///
/// Only syntactic failures (`Frame`, `CrcMismatch`) are returned as errors.
pub fn decode_raw_request(frame: &[u8]) -> ModbusResult<RawRequest<'_>> {
    let (body, crc) = open_frame(frame)?;
    let mut buf = body;

    let mut raw = RawRequest {
        device_id: buf.get_u8(),
        function_code: buf.get_u8(),
        sub_function: None,
        address: 0,
        word: 0,
        byte_count: None,
        payload: &[],
        crc,
        complete: false,
    };

    let Some(function) = raw.function() else {
        trace!("Unknown function code {:02X} in request", raw.function_code);
        return Ok(raw);
    };

    if function.has_sub_function() {
        if !buf.has_remaining() {
            return Ok(raw);
        }
        raw.sub_function = Some(buf.get_u8());
    }

    if buf.remaining() < 4 {
        return Ok(raw);
    }
    raw.address = buf.get_u16();
    raw.word = buf.get_u16();

    if function.is_multiple_write() {
        if !buf.has_remaining() {
            return Ok(raw);
        }
        raw.byte_count = Some(buf.get_u8());
    }

    raw.payload = buf;
    raw.complete = true;
    trace!(
        "Request decoded: device={}, FC={:02X}, addr={}, word={}, payload={}",
        raw.device_id,
        raw.function_code,
        raw.address,
        raw.word,
        raw.payload.len()
    );
    Ok(raw)
}

/// Decode a request frame into a [`Packet`].
///
/// The CRC is verified first. Function codes outside the catalog are kept
/// raw so the caller's validator can report them.
pub fn decode_request(frame: &[u8]) -> ModbusResult<Packet> {
    decode_raw_request(frame)?.to_packet()
}

/// Encode a request packet into a sealed frame.
pub fn encode_request(packet: &Packet) -> ModbusResult<Adu> {
    let function = packet
        .function()
        .ok_or(ModbusError::InvalidFunction {
            code: packet.function_code(),
        })?;

    let mut builder = AduBuilder::new()
        .device(packet.device_id())?
        .function_code(packet.function_code())?;
    if function.has_sub_function() {
        builder = builder.byte(packet.sub_function().unwrap_or(DIAG_RETURN_QUERY_DATA))?;
    }
    builder = builder.address(packet.address())?;

    match (function, packet.data()) {
        (ModbusFunction::WriteSingleCoil, PacketData::Coils(bits)) if bits.len() == 1 => {
            builder.quantity(packet.value_field())?.seal()
        }
        (ModbusFunction::WriteSingleRegister, PacketData::HoldingRegisters(regs))
            if regs.len() == 1 =>
        {
            builder.quantity(packet.value_field())?.seal()
        }
        (ModbusFunction::WriteMultipleCoils, PacketData::Coils(bits))
            if bits.len() == usize::from(packet.quantity()) =>
        {
            let bytes = pack_bits(bits);
            builder
                .quantity(packet.quantity())?
                .byte(byte_count(bytes.len())?)?
                .data(&bytes)?
                .seal()
        }
        (ModbusFunction::WriteMultipleRegisters, PacketData::HoldingRegisters(regs))
            if regs.len() == usize::from(packet.quantity()) =>
        {
            let bytes = registers_to_bytes(regs);
            builder
                .quantity(packet.quantity())?
                .byte(byte_count(bytes.len())?)?
                .data(&bytes)?
                .seal()
        }
        (function, _) if function.is_read() || function == ModbusFunction::Diagnostics => {
            builder.quantity(packet.quantity())?.seal()
        }
        (function, data) => Err(ModbusError::invalid_data(format!(
            "{} request cannot carry payload {:?}",
            function,
            data.bank()
        ))),
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Encode a normal response packet into a sealed frame.
pub fn encode_response(packet: &Packet) -> ModbusResult<Adu> {
    let function = packet
        .function()
        .ok_or(ModbusError::InvalidFunction {
            code: packet.function_code(),
        })?;

    let builder = AduBuilder::new()
        .device(packet.device_id())?
        .function_code(packet.function_code())?;

    if function.is_read() {
        if packet.data().bank() != function.bank() {
            return Err(ModbusError::invalid_data(format!(
                "{} response carries {:?} payload",
                function,
                packet.data().bank()
            )));
        }
        let bytes = match packet.data() {
            PacketData::Coils(bits) | PacketData::DiscreteInputs(bits) => pack_bits(bits),
            PacketData::InputRegisters(regs) | PacketData::HoldingRegisters(regs) => {
                registers_to_bytes(regs)
            }
            PacketData::None => Vec::new(),
        };
        return builder.byte(byte_count(bytes.len())?)?.data(&bytes)?.seal();
    }

    let builder = if function.has_sub_function() {
        builder.byte(packet.sub_function().unwrap_or(DIAG_RETURN_QUERY_DATA))?
    } else {
        builder
    };
    builder
        .address(packet.address())?
        .quantity(packet.value_field())?
        .seal()
}

/// Decode a response frame against the request it answers.
///
/// An exception response becomes [`ModbusError::Exception`]. Any response
/// that does not answer `request` (other device, other function, wrong byte
/// count, mismatched echo) is a [`ModbusError::Protocol`] error. Bit data is
/// truncated to the requested quantity.
pub fn decode_response(frame: &[u8], request: &Packet) -> ModbusResult<Packet> {
    let function = request
        .function()
        .ok_or(ModbusError::InvalidFunction {
            code: request.function_code(),
        })?;
    let (body, crc) = open_frame(frame)?;
    let mut buf = body;

    let device_id = buf.get_u8();
    let function_code = buf.get_u8();

    if device_id != request.device_id() {
        return Err(ModbusError::protocol(format!(
            "Device mismatch: expected {}, got {}",
            request.device_id(),
            device_id
        )));
    }

    if is_exception_function_code(function_code) {
        let base_code = function_code & !EXCEPTION_FLAG;
        if base_code != request.function_code() {
            return Err(ModbusError::protocol(format!(
                "Exception for function {:02X} while waiting for {:02X}",
                base_code,
                request.function_code()
            )));
        }
        if frame.len() != EXCEPTION_ADU_SIZE {
            return Err(ModbusError::protocol(format!(
                "Exception response is {} bytes, expected {}",
                frame.len(),
                EXCEPTION_ADU_SIZE
            )));
        }
        let code = buf.get_u8();
        debug!(
            "Exception response: device={}, FC={:02X}, code={:02X}",
            device_id, base_code, code
        );
        return Err(ModbusError::exception(base_code, code));
    }

    if function_code != request.function_code() {
        return Err(ModbusError::protocol(format!(
            "Function code mismatch: expected {:02X}, got {:02X}",
            request.function_code(),
            function_code
        )));
    }

    let mut response = Packet::response_to(request).with_crc(crc);

    if let (true, Some(bank)) = (function.is_read(), function.bank()) {
        if !buf.has_remaining() {
            return Err(ModbusError::protocol("Read response without byte count"));
        }
        let declared = buf.get_u8();
        let expected = bank.response_byte_count(request.quantity());
        if usize::from(declared) != expected || buf.remaining() != expected {
            return Err(ModbusError::protocol(format!(
                "Byte count mismatch: expected {}, declared {}, present {}",
                expected,
                declared,
                buf.remaining()
            )));
        }
        let data = if bank.is_bit() {
            PacketData::from_bits(bank, unpack_bits(buf, usize::from(request.quantity())))
        } else {
            PacketData::from_registers(bank, bytes_to_registers(buf))
        };
        return Ok(response.with_payload(data));
    }

    let expected_len = FIXED_REQUEST_SIZE + usize::from(function.has_sub_function());
    if frame.len() != expected_len {
        return Err(ModbusError::protocol(format!(
            "{} response is {} bytes, expected {}",
            function,
            frame.len(),
            expected_len
        )));
    }
    if function.has_sub_function() {
        let sub_function = buf.get_u8();
        if Some(sub_function) != request.sub_function() {
            return Err(ModbusError::protocol(format!(
                "Sub-function mismatch: expected {:?}, got {:02X}",
                request.sub_function(),
                sub_function
            )));
        }
    }
    let address = buf.get_u16();
    let word = buf.get_u16();
    if address != request.address() || word != request.value_field() {
        return Err(ModbusError::protocol(format!(
            "Echo mismatch: sent ({}, {:#06X}), got ({}, {:#06X})",
            request.address(),
            request.value_field(),
            address,
            word
        )));
    }
    response.data = match function {
        ModbusFunction::WriteSingleCoil => PacketData::Coils(vec![word == COIL_ON]),
        ModbusFunction::WriteSingleRegister => PacketData::HoldingRegisters(vec![word]),
        _ => PacketData::None,
    };
    Ok(response)
}

fn byte_count(len: usize) -> ModbusResult<u8> {
    u8::try_from(len)
        .map_err(|_| ModbusError::frame(format!("payload of {} bytes exceeds byte count", len)))
}

// ============================================================================
// Tests
// ============================================================================
