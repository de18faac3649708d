//! # Packet
//!
//! One request or response frame as a value object. Fields are set through
//! validating setters: a setter either stores its value or returns the
//! failing check and leaves the packet untouched.
//!
//! The payload is a tagged union over the four data banks; single writes
//! carry their one value in it too.
//!
//! ```rust
//! use modbus_rtu_core::{BankCapacities, ModbusFunction, Packet};
//!
//! let caps = BankCapacities::new().with_holding_registers(10);
//! let mut packet = Packet::new();
//! packet.set_device_id(1).unwrap();
//! packet.set_function_code(0x03).unwrap();
//! packet.set_start_address(0, &caps).unwrap();
//! assert!(packet.set_quantity(11, &caps).is_err());
//! packet.set_quantity(10, &caps).unwrap();
//!
//! assert_eq!(packet.function(), Some(ModbusFunction::ReadHoldingRegisters));
//! assert_eq!(packet.quantity(), 10);
//! ```

use crate::bytes::bit_byte_count;
use crate::config::BankCapacities;
use crate::constants::{COIL_OFF, COIL_ON};
use crate::error::{ModbusError, ModbusResult};
use crate::function::{DataBank, ModbusFunction};
use crate::validator;

/// Payload of a packet, tagged by the bank it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PacketData {
    #[default]
    None,
    Coils(Vec<bool>),
    DiscreteInputs(Vec<bool>),
    InputRegisters(Vec<u16>),
    HoldingRegisters(Vec<u16>),
}

impl PacketData {
    /// Wrap bit values for a bit bank; register banks yield `None`.
    pub fn from_bits(bank: DataBank, bits: Vec<bool>) -> Self {
        match bank {
            DataBank::Coils => Self::Coils(bits),
            DataBank::DiscreteInputs => Self::DiscreteInputs(bits),
            _ => Self::None,
        }
    }

    /// Wrap register values for a register bank; bit banks yield `None`.
    pub fn from_registers(bank: DataBank, registers: Vec<u16>) -> Self {
        match bank {
            DataBank::InputRegisters => Self::InputRegisters(registers),
            DataBank::HoldingRegisters => Self::HoldingRegisters(registers),
            _ => Self::None,
        }
    }

    pub fn bank(&self) -> Option<DataBank> {
        match self {
            Self::None => None,
            Self::Coils(_) => Some(DataBank::Coils),
            Self::DiscreteInputs(_) => Some(DataBank::DiscreteInputs),
            Self::InputRegisters(_) => Some(DataBank::InputRegisters),
            Self::HoldingRegisters(_) => Some(DataBank::HoldingRegisters),
        }
    }

    pub fn bits(&self) -> Option<&[bool]> {
        match self {
            Self::Coils(bits) | Self::DiscreteInputs(bits) => Some(bits),
            _ => None,
        }
    }

    pub fn registers(&self) -> Option<&[u16]> {
        match self {
            Self::InputRegisters(regs) | Self::HoldingRegisters(regs) => Some(regs),
            _ => None,
        }
    }

    /// Number of elements carried.
    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Coils(bits) | Self::DiscreteInputs(bits) => bits.len(),
            Self::InputRegisters(regs) | Self::HoldingRegisters(regs) => regs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes the payload occupies on the wire.
    pub fn byte_count(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Coils(bits) | Self::DiscreteInputs(bits) => bit_byte_count(bits.len()),
            Self::InputRegisters(regs) | Self::HoldingRegisters(regs) => regs.len() * 2,
        }
    }
}

/// A Modbus RTU request or response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Packet {
    pub(crate) device_id: u8,
    pub(crate) function_code: u8,
    pub(crate) sub_function: Option<u8>,
    pub(crate) address: u16,
    pub(crate) quantity: u16,
    pub(crate) byte_count: u8,
    pub(crate) data: PacketData,
    pub(crate) crc: u16,
}

impl Packet {
    /// Empty packet: every field zero, no payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset every field.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    // ========================================================================
    // Request constructors
    // ========================================================================

    /// Read request for FC01-FC04.
    pub fn read_request(
        device_id: u8,
        function: ModbusFunction,
        address: u16,
        quantity: u16,
        capacities: &BankCapacities,
    ) -> ModbusResult<Self> {
        if !function.is_read() {
            return Err(ModbusError::invalid_data(format!(
                "{} is not a read function",
                function
            )));
        }
        let mut packet = Self::new();
        packet.set_device_id(device_id)?;
        packet.set_function_code(function.to_u8())?;
        packet.set_start_address(address, capacities)?;
        packet.set_quantity(quantity, capacities)?;
        Ok(packet)
    }

    /// Write Single Coil (FC05).
    pub fn write_single_coil(
        device_id: u8,
        address: u16,
        value: bool,
        capacities: &BankCapacities,
    ) -> ModbusResult<Self> {
        let mut packet = Self::new();
        packet.set_device_id(device_id)?;
        packet.set_function_code(ModbusFunction::WriteSingleCoil.to_u8())?;
        packet.set_start_address(address, capacities)?;
        packet.set_single_coil(value)?;
        Ok(packet)
    }

    /// Write Single Register (FC06).
    pub fn write_single_register(
        device_id: u8,
        address: u16,
        value: u16,
        capacities: &BankCapacities,
    ) -> ModbusResult<Self> {
        let mut packet = Self::new();
        packet.set_device_id(device_id)?;
        packet.set_function_code(ModbusFunction::WriteSingleRegister.to_u8())?;
        packet.set_start_address(address, capacities)?;
        packet.set_single_register(value)?;
        Ok(packet)
    }

    /// Write Multiple Coils (FC15).
    pub fn write_multiple_coils(
        device_id: u8,
        address: u16,
        values: Vec<bool>,
        capacities: &BankCapacities,
    ) -> ModbusResult<Self> {
        let mut packet = Self::new();
        packet.set_device_id(device_id)?;
        packet.set_function_code(ModbusFunction::WriteMultipleCoils.to_u8())?;
        packet.set_start_address(address, capacities)?;
        packet.set_coil_values(values, capacities)?;
        Ok(packet)
    }

    /// Write Multiple Registers (FC16).
    pub fn write_multiple_registers(
        device_id: u8,
        address: u16,
        values: Vec<u16>,
        capacities: &BankCapacities,
    ) -> ModbusResult<Self> {
        let mut packet = Self::new();
        packet.set_device_id(device_id)?;
        packet.set_function_code(ModbusFunction::WriteMultipleRegisters.to_u8())?;
        packet.set_start_address(address, capacities)?;
        packet.set_register_values(values, capacities)?;
        Ok(packet)
    }

    /// Diagnostics (FC08) with a sub-function and two data words.
    pub fn diagnostics(device_id: u8, sub_function: u8, data: [u16; 2]) -> ModbusResult<Self> {
        let mut packet = Self::new();
        packet.set_device_id(device_id)?;
        packet.set_function_code(ModbusFunction::Diagnostics.to_u8())?;
        packet.set_sub_function(sub_function)?;
        packet.address = data[0];
        packet.quantity = data[1];
        Ok(packet)
    }

    // ========================================================================
    // Validating setters
    // ========================================================================

    pub fn set_device_id(&mut self, device_id: u8) -> ModbusResult<()> {
        validator::check_device_address(device_id)?;
        self.device_id = device_id;
        Ok(())
    }

    /// Set the function code. Changing the function drops the address,
    /// quantity and payload, which were checked against the old one.
    pub fn set_function_code(&mut self, code: u8) -> ModbusResult<ModbusFunction> {
        let function = validator::check_function_code(code)?;
        if self.function_code != code {
            self.sub_function = None;
            self.address = 0;
            self.quantity = 0;
            self.byte_count = 0;
            self.data = PacketData::None;
        }
        self.function_code = code;
        Ok(function)
    }

    /// Sub-function byte, only for functions that carry one.
    pub fn set_sub_function(&mut self, sub_function: u8) -> ModbusResult<()> {
        let function = self.require_function()?;
        if !function.has_sub_function() {
            return Err(ModbusError::invalid_data(format!(
                "{} has no sub-function",
                function
            )));
        }
        self.sub_function = Some(sub_function);
        Ok(())
    }

    /// Start address; a quantity already set must still fit behind it.
    pub fn set_start_address(
        &mut self,
        address: u16,
        capacities: &BankCapacities,
    ) -> ModbusResult<()> {
        let function = self.require_function()?;
        validator::check_start_address(function, address, capacities)?;
        if self.quantity != 0 {
            validator::check_quantity(function, address, self.quantity, capacities)?;
        }
        self.address = address;
        Ok(())
    }

    /// Quantity checked against the current start address.
    pub fn set_quantity(&mut self, quantity: u16, capacities: &BankCapacities) -> ModbusResult<()> {
        let function = self.require_function()?;
        validator::check_quantity(function, self.address, quantity, capacities)?;
        self.quantity = quantity;
        Ok(())
    }

    pub fn set_single_coil(&mut self, value: bool) -> ModbusResult<()> {
        self.require(ModbusFunction::WriteSingleCoil)?;
        self.quantity = 1;
        self.data = PacketData::Coils(vec![value]);
        Ok(())
    }

    pub fn set_single_register(&mut self, value: u16) -> ModbusResult<()> {
        self.require(ModbusFunction::WriteSingleRegister)?;
        self.quantity = 1;
        self.data = PacketData::HoldingRegisters(vec![value]);
        Ok(())
    }

    /// Coil values for FC15; quantity and byte count follow from the length.
    pub fn set_coil_values(
        &mut self,
        values: Vec<bool>,
        capacities: &BankCapacities,
    ) -> ModbusResult<()> {
        let function = self.require(ModbusFunction::WriteMultipleCoils)?;
        let quantity = checked_quantity(values.len())?;
        validator::check_quantity(function, self.address, quantity, capacities)?;
        self.quantity = quantity;
        self.byte_count = bit_byte_count(values.len()) as u8;
        self.data = PacketData::Coils(values);
        Ok(())
    }

    /// Register values for FC16; quantity and byte count follow from the length.
    pub fn set_register_values(
        &mut self,
        values: Vec<u16>,
        capacities: &BankCapacities,
    ) -> ModbusResult<()> {
        let function = self.require(ModbusFunction::WriteMultipleRegisters)?;
        let quantity = checked_quantity(values.len())?;
        validator::check_quantity(function, self.address, quantity, capacities)?;
        self.quantity = quantity;
        self.byte_count = (values.len() * 2) as u8;
        self.data = PacketData::HoldingRegisters(values);
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    pub fn device_id(&self) -> u8 {
        self.device_id
    }

    /// Raw function code; may be outside the catalog on a decoded request.
    #[inline]
    pub fn function_code(&self) -> u8 {
        self.function_code
    }

    #[inline]
    pub fn function(&self) -> Option<ModbusFunction> {
        ModbusFunction::from_u8(self.function_code)
    }

    #[inline]
    pub fn sub_function(&self) -> Option<u8> {
        self.sub_function
    }

    #[inline]
    pub fn address(&self) -> u16 {
        self.address
    }

    /// Element count; 1 for single writes.
    #[inline]
    pub fn quantity(&self) -> u16 {
        self.quantity
    }

    #[inline]
    pub fn byte_count(&self) -> u8 {
        self.byte_count
    }

    #[inline]
    pub fn data(&self) -> &PacketData {
        &self.data
    }

    /// CRC of the frame this packet was decoded from or encoded to.
    #[inline]
    pub fn crc(&self) -> u16 {
        self.crc
    }

    /// Word carried after the address: the value for single writes, the
    /// quantity for reads and multiple writes, the second data word for
    /// diagnostics.
    pub fn value_field(&self) -> u16 {
        match self.function() {
            Some(ModbusFunction::WriteSingleCoil) => match self.data.bits() {
                Some([true, ..]) => COIL_ON,
                _ => COIL_OFF,
            },
            Some(ModbusFunction::WriteSingleRegister) => self
                .data
                .registers()
                .and_then(|regs| regs.first().copied())
                .unwrap_or(0),
            _ => self.quantity,
        }
    }

    pub(crate) fn with_crc(mut self, crc: u16) -> Self {
        self.crc = crc;
        self
    }

    /// Response skeleton echoing the request's addressing fields.
    pub(crate) fn response_to(request: &Packet) -> Self {
        Self {
            device_id: request.device_id,
            function_code: request.function_code,
            sub_function: request.sub_function,
            address: request.address,
            quantity: request.quantity,
            byte_count: 0,
            data: PacketData::None,
            crc: 0,
        }
    }

    /// Attach a read payload and the byte count that goes with it.
    pub(crate) fn with_payload(mut self, data: PacketData) -> Self {
        self.byte_count = data.byte_count() as u8;
        self.data = data;
        self
    }

    fn require_function(&self) -> ModbusResult<ModbusFunction> {
        self.function()
            .ok_or(ModbusError::InvalidFunction {
                code: self.function_code,
            })
    }

    fn require(&self, expected: ModbusFunction) -> ModbusResult<ModbusFunction> {
        let function = self.require_function()?;
        if function != expected {
            return Err(ModbusError::invalid_data(format!(
                "field belongs to {}, packet is {}",
                expected, function
            )));
        }
        Ok(function)
    }
}

fn checked_quantity(len: usize) -> ModbusResult<u16> {
    u16::try_from(len)
        .map_err(|_| ModbusError::invalid_data(format!("{} values exceed a 16-bit quantity", len)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps() -> BankCapacities {
        BankCapacities::new()
            .with_coils(16)
            .with_discrete_inputs(16)
            .with_input_registers(8)
            .with_holding_registers(8)
    }

    #[test]
    fn test_rejected_device_id_leaves_packet_unchanged() {
        let mut packet = Packet::new();
        packet.set_device_id(5).unwrap();
        assert!(packet.set_device_id(247).is_err());
        assert_eq!(packet.device_id(), 5);
        packet.set_device_id(0).unwrap();
        assert_eq!(packet.device_id(), 0);
    }

    #[test]
    fn test_rejected_function_code_leaves_packet_unchanged() {
        let mut packet = Packet::new();
        packet.set_function_code(0x03).unwrap();
        assert_eq!(
            packet.set_function_code(0x42),
            Err(ModbusError::InvalidFunction { code: 0x42 })
        );
        assert_eq!(packet.function_code(), 0x03);
    }

    #[test]
    fn test_address_requires_function() {
        let mut packet = Packet::new();
        assert!(matches!(
            packet.set_start_address(0, &caps()),
            Err(ModbusError::InvalidFunction { code: 0 })
        ));
    }

    #[test]
    fn test_rejected_address_and_quantity() {
        let mut packet = Packet::new();
        packet.set_function_code(0x04).unwrap();
        packet.set_start_address(6, &caps()).unwrap();
        assert!(packet.set_start_address(8, &caps()).is_err());
        assert_eq!(packet.address(), 6);

        packet.set_quantity(2, &caps()).unwrap();
        assert!(packet.set_quantity(3, &caps()).is_err());
        assert_eq!(packet.quantity(), 2);
    }

    #[test]
    fn test_read_request_constructor() {
        let packet =
            Packet::read_request(1, ModbusFunction::ReadCoils, 0, 16, &caps()).unwrap();
        assert_eq!(packet.function_code(), 0x01);
        assert_eq!(packet.quantity(), 16);

        let err = Packet::read_request(1, ModbusFunction::ReadCoils, 0, 17, &caps()).unwrap_err();
        assert!(matches!(err, ModbusError::InvalidQuantity { .. }));
        assert!(
            Packet::read_request(1, ModbusFunction::WriteSingleCoil, 0, 1, &caps()).is_err()
        );
    }

    #[test]
    fn test_single_write_values() {
        let coil = Packet::write_single_coil(1, 3, true, &caps()).unwrap();
        assert_eq!(coil.quantity(), 1);
        assert_eq!(coil.value_field(), COIL_ON);

        let off = Packet::write_single_coil(1, 3, false, &caps()).unwrap();
        assert_eq!(off.value_field(), COIL_OFF);

        let reg = Packet::write_single_register(1, 0, 0x1234, &caps()).unwrap();
        assert_eq!(reg.value_field(), 0x1234);
        assert_eq!(reg.data(), &PacketData::HoldingRegisters(vec![0x1234]));
    }

    #[test]
    fn test_value_setter_must_match_function() {
        let mut packet = Packet::new();
        packet.set_function_code(0x06).unwrap();
        assert!(packet.set_single_coil(true).is_err());
        assert_eq!(packet.data(), &PacketData::None);
    }

    #[test]
    fn test_multiple_writes_set_byte_count() {
        let coils = Packet::write_multiple_coils(1, 0, vec![true; 10], &caps()).unwrap();
        assert_eq!(coils.quantity(), 10);
        assert_eq!(coils.byte_count(), 2);

        let regs = Packet::write_multiple_registers(1, 5, vec![1, 2, 3], &caps()).unwrap();
        assert_eq!(regs.quantity(), 3);
        assert_eq!(regs.byte_count(), 6);

        let err = Packet::write_multiple_registers(1, 6, vec![1, 2, 3], &caps()).unwrap_err();
        assert!(matches!(err, ModbusError::InvalidQuantity { .. }));
        assert!(Packet::write_multiple_coils(1, 0, vec![], &caps()).is_err());
    }

    #[test]
    fn test_sub_function_only_for_diagnostics() {
        let mut packet = Packet::new();
        packet.set_function_code(0x03).unwrap();
        assert!(packet.set_sub_function(0).is_err());
        assert_eq!(packet.sub_function(), None);

        let diag = Packet::diagnostics(1, 0x00, [0xA5A5, 0x5A5A]).unwrap();
        assert_eq!(diag.sub_function(), Some(0x00));
        assert_eq!(diag.address(), 0xA5A5);
        assert_eq!(diag.value_field(), 0x5A5A);
    }

    #[test]
    fn test_changing_function_drops_payload() {
        let mut packet = Packet::write_single_register(1, 0, 9, &caps()).unwrap();
        packet.set_function_code(0x03).unwrap();
        assert_eq!(packet.data(), &PacketData::None);
    }

    #[test]
    fn test_moving_address_rechecks_quantity() {
        let mut packet = Packet::new();
        packet.set_device_id(1).unwrap();
        packet.set_function_code(0x03).unwrap();
        packet.set_start_address(0, &caps()).unwrap();
        packet.set_quantity(8, &caps()).unwrap();

        assert_eq!(
            packet.set_start_address(7, &caps()),
            Err(ModbusError::InvalidQuantity {
                function: 0x03,
                address: 7,
                quantity: 8,
                capacity: 8
            })
        );
        assert_eq!(packet.address(), 0);
        assert_eq!(packet.quantity(), 8);
        assert_eq!(
            validator::validate_request(
                packet.function_code(),
                packet.address(),
                packet.quantity(),
                &caps()
            ),
            Ok(ModbusFunction::ReadHoldingRegisters)
        );

        packet.set_quantity(1, &caps()).unwrap();
        packet.set_start_address(7, &caps()).unwrap();
        assert_eq!(packet.address(), 7);
    }

    #[test]
    fn test_changing_function_resets_addressing() {
        let mut packet = Packet::read_request(1, ModbusFunction::ReadCoils, 15, 1, &caps()).unwrap();
        packet.set_function_code(0x03).unwrap();
        assert_eq!(packet.address(), 0);
        assert_eq!(packet.quantity(), 0);

        // same code keeps the fields
        let mut same = Packet::read_request(1, ModbusFunction::ReadCoils, 15, 1, &caps()).unwrap();
        same.set_function_code(0x01).unwrap();
        assert_eq!(same.address(), 15);
        assert_eq!(same.quantity(), 1);
    }

    #[test]
    fn test_clear() {
        let mut packet = Packet::write_single_register(1, 0, 9, &caps()).unwrap();
        packet.clear();
        assert_eq!(packet, Packet::new());
    }

    #[test]
    fn test_packet_data_helpers() {
        let data = PacketData::from_bits(DataBank::DiscreteInputs, vec![true; 9]);
        assert_eq!(data.bank(), Some(DataBank::DiscreteInputs));
        assert_eq!(data.byte_count(), 2);
        assert_eq!(data.len(), 9);
        assert!(data.registers().is_none());

        let regs = PacketData::from_registers(DataBank::InputRegisters, vec![1, 2]);
        assert_eq!(regs.byte_count(), 4);
        assert_eq!(regs.registers(), Some(&[1u16, 2][..]));
        assert_eq!(PacketData::from_registers(DataBank::Coils, vec![1]), PacketData::None);
    }
}
