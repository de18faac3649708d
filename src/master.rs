//! RTU master
//!
//! Builds requests, sends them through a [`Transport`] and decodes the
//! matching response. Requests are validated locally before anything goes
//! on the bus: against the protocol maxima by default, or against a known
//! device layout with [`RtuMaster::with_capacities`].
//!
//! | Function Code | Method |
//! |---------------|--------|
//! | 0x01 | `read_coils()` |
//! | 0x02 | `read_discrete_inputs()` |
//! | 0x03 | `read_holding_registers()` |
//! | 0x04 | `read_input_registers()` |
//! | 0x05 | `write_single_coil()` |
//! | 0x06 | `write_single_register()` |
//! | 0x08 | `diagnostics_echo()` |
//! | 0x0F | `write_multiple_coils()` |
//! | 0x10 | `write_multiple_registers()` |
//!
//! A slave's exception response surfaces as [`ModbusError::Exception`].
//! Writes to device 0 are broadcast: sent, never answered.

use tracing::debug;

use crate::codec::{decode_response, encode_request};
use crate::config::BankCapacities;
use crate::constants::{BROADCAST_ADDRESS, DIAG_RETURN_QUERY_DATA};
use crate::error::{ModbusError, ModbusResult};
use crate::function::ModbusFunction;
use crate::packet::{Packet, PacketData};
use crate::transport::Transport;

/// Modbus RTU master over any transport.
pub struct RtuMaster<T: Transport> {
    transport: T,
    capacities: BankCapacities,
}

impl<T: Transport> RtuMaster<T> {
    /// Master that only enforces protocol limits.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            capacities: BankCapacities::protocol_maximum(),
        }
    }

    /// Master that also enforces a known device layout.
    pub fn with_capacities(transport: T, capacities: BankCapacities) -> ModbusResult<Self> {
        capacities.validate()?;
        Ok(Self {
            transport,
            capacities,
        })
    }

    pub fn capacities(&self) -> &BankCapacities {
        &self.capacities
    }

    /// Get a reference to the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get a mutable reference to the underlying transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Send a request and wait for its response.
    ///
    /// Broadcast requests return `Ok(None)` without reading from the transport.
    pub fn execute(&mut self, request: &Packet) -> ModbusResult<Option<Packet>> {
        let frame = encode_request(request)?;
        debug!(
            "Request: device={}, FC={:02X} ({}), len={}",
            request.device_id(),
            request.function_code(),
            ModbusFunction::code_description(request.function_code()),
            frame.len()
        );
        self.transport.send(frame.as_slice())?;

        if request.device_id() == BROADCAST_ADDRESS {
            return Ok(None);
        }

        let reply = self.transport.receive()?;
        let response = decode_response(&reply, request)?;
        debug!(
            "Response: device={}, FC={:02X}, elements={}",
            response.device_id(),
            response.function_code(),
            response.data().len()
        );
        Ok(Some(response))
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Read coils (function code 0x01).
    pub fn read_coils(&mut self, device_id: u8, address: u16, quantity: u16) -> ModbusResult<Vec<bool>> {
        self.read_bits(device_id, ModbusFunction::ReadCoils, address, quantity)
    }

    /// Read discrete inputs (function code 0x02).
    pub fn read_discrete_inputs(
        &mut self,
        device_id: u8,
        address: u16,
        quantity: u16,
    ) -> ModbusResult<Vec<bool>> {
        self.read_bits(device_id, ModbusFunction::ReadDiscreteInputs, address, quantity)
    }

    /// Read holding registers (function code 0x03).
    pub fn read_holding_registers(
        &mut self,
        device_id: u8,
        address: u16,
        quantity: u16,
    ) -> ModbusResult<Vec<u16>> {
        self.read_registers(device_id, ModbusFunction::ReadHoldingRegisters, address, quantity)
    }

    /// Read input registers (function code 0x04).
    pub fn read_input_registers(
        &mut self,
        device_id: u8,
        address: u16,
        quantity: u16,
    ) -> ModbusResult<Vec<u16>> {
        self.read_registers(device_id, ModbusFunction::ReadInputRegisters, address, quantity)
    }

    fn read_bits(
        &mut self,
        device_id: u8,
        function: ModbusFunction,
        address: u16,
        quantity: u16,
    ) -> ModbusResult<Vec<bool>> {
        let response = self.read(device_id, function, address, quantity)?;
        match response.data {
            PacketData::Coils(bits) | PacketData::DiscreteInputs(bits) => Ok(bits),
            other => Err(unexpected_payload(function, &other)),
        }
    }

    fn read_registers(
        &mut self,
        device_id: u8,
        function: ModbusFunction,
        address: u16,
        quantity: u16,
    ) -> ModbusResult<Vec<u16>> {
        let response = self.read(device_id, function, address, quantity)?;
        match response.data {
            PacketData::InputRegisters(regs) | PacketData::HoldingRegisters(regs) => Ok(regs),
            other => Err(unexpected_payload(function, &other)),
        }
    }

    fn read(
        &mut self,
        device_id: u8,
        function: ModbusFunction,
        address: u16,
        quantity: u16,
    ) -> ModbusResult<Packet> {
        if device_id == BROADCAST_ADDRESS {
            return Err(ModbusError::invalid_data(format!(
                "{} cannot be broadcast",
                function
            )));
        }
        let request = Packet::read_request(device_id, function, address, quantity, &self.capacities)?;
        self.execute(&request)?
            .ok_or_else(|| ModbusError::protocol("no response to read request"))
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Write single coil (function code 0x05).
    pub fn write_single_coil(&mut self, device_id: u8, address: u16, value: bool) -> ModbusResult<()> {
        let request = Packet::write_single_coil(device_id, address, value, &self.capacities)?;
        self.execute(&request).map(|_| ())
    }

    /// Write single register (function code 0x06).
    pub fn write_single_register(
        &mut self,
        device_id: u8,
        address: u16,
        value: u16,
    ) -> ModbusResult<()> {
        let request = Packet::write_single_register(device_id, address, value, &self.capacities)?;
        self.execute(&request).map(|_| ())
    }

    /// Write multiple coils (function code 0x0F).
    pub fn write_multiple_coils(
        &mut self,
        device_id: u8,
        address: u16,
        values: &[bool],
    ) -> ModbusResult<()> {
        let request =
            Packet::write_multiple_coils(device_id, address, values.to_vec(), &self.capacities)?;
        self.execute(&request).map(|_| ())
    }

    /// Write multiple registers (function code 0x10).
    pub fn write_multiple_registers(
        &mut self,
        device_id: u8,
        address: u16,
        values: &[u16],
    ) -> ModbusResult<()> {
        let request =
            Packet::write_multiple_registers(device_id, address, values.to_vec(), &self.capacities)?;
        self.execute(&request).map(|_| ())
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Return Query Data (function code 0x08, sub-function 0x00).
    ///
    /// The slave echoes both data words; the echo is checked by the decoder.
    pub fn diagnostics_echo(&mut self, device_id: u8, data: [u16; 2]) -> ModbusResult<()> {
        let request = Packet::diagnostics(device_id, DIAG_RETURN_QUERY_DATA, data)?;
        self.execute(&request).map(|_| ())
    }
}

fn unexpected_payload(function: ModbusFunction, data: &PacketData) -> ModbusError {
    ModbusError::protocol(format!(
        "{} response carried {:?} payload",
        function,
        data.bank()
    ))
}
