//! # Function Catalog
//!
//! The closed set of function codes this stack understands, the data bank
//! each one addresses and the per-request protocol limit on its quantity.
//!
//! | Code | Function | Bank | Quantity |
//! |------|----------|------|----------|
//! | 0x01 | Read Coils | Coils | 1..=2000 |
//! | 0x02 | Read Discrete Inputs | Discrete Inputs | 1..=2000 |
//! | 0x03 | Read Holding Registers | Holding Registers | 1..=125 |
//! | 0x04 | Read Input Registers | Input Registers | 1..=125 |
//! | 0x05 | Write Single Coil | Coils | 1 |
//! | 0x06 | Write Single Register | Holding Registers | 1 |
//! | 0x08 | Diagnostics | none | n/a |
//! | 0x0F | Write Multiple Coils | Coils | 1..=1968 |
//! | 0x10 | Write Multiple Registers | Holding Registers | 1..=123 |

use std::fmt;

use crate::constants::{
    EXCEPTION_FLAG, FC_DIAGNOSTICS, FC_READ_COILS, FC_READ_DISCRETE_INPUTS,
    FC_READ_HOLDING_REGISTERS, FC_READ_INPUT_REGISTERS, FC_WRITE_MULTIPLE_COILS,
    FC_WRITE_MULTIPLE_REGISTERS, FC_WRITE_SINGLE_COIL, FC_WRITE_SINGLE_REGISTER, MAX_READ_COILS,
    MAX_READ_REGISTERS, MAX_WRITE_COILS, MAX_WRITE_REGISTERS,
};

/// One of the four Modbus data banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataBank {
    /// Single-bit read/write outputs
    Coils,
    /// Single-bit read-only inputs
    DiscreteInputs,
    /// 16-bit read-only registers
    InputRegisters,
    /// 16-bit read/write registers
    HoldingRegisters,
}

impl DataBank {
    /// All banks, in database order.
    pub const ALL: [DataBank; 4] = [
        DataBank::Coils,
        DataBank::DiscreteInputs,
        DataBank::InputRegisters,
        DataBank::HoldingRegisters,
    ];

    /// True for the single-bit banks.
    #[inline]
    pub fn is_bit(self) -> bool {
        matches!(self, DataBank::Coils | DataBank::DiscreteInputs)
    }

    /// Bytes needed in a read response for `quantity` elements of this bank.
    #[inline]
    pub fn response_byte_count(self, quantity: u16) -> usize {
        if self.is_bit() {
            crate::bytes::bit_byte_count(usize::from(quantity))
        } else {
            usize::from(quantity) * 2
        }
    }
}

impl fmt::Display for DataBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataBank::Coils => "coils",
            DataBank::DiscreteInputs => "discrete inputs",
            DataBank::InputRegisters => "input registers",
            DataBank::HoldingRegisters => "holding registers",
        };
        f.write_str(name)
    }
}

/// Supported Modbus function codes, with the public numeric mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ModbusFunction {
    ReadCoils = FC_READ_COILS,
    ReadDiscreteInputs = FC_READ_DISCRETE_INPUTS,
    ReadHoldingRegisters = FC_READ_HOLDING_REGISTERS,
    ReadInputRegisters = FC_READ_INPUT_REGISTERS,
    WriteSingleCoil = FC_WRITE_SINGLE_COIL,
    WriteSingleRegister = FC_WRITE_SINGLE_REGISTER,
    Diagnostics = FC_DIAGNOSTICS,
    WriteMultipleCoils = FC_WRITE_MULTIPLE_COILS,
    WriteMultipleRegisters = FC_WRITE_MULTIPLE_REGISTERS,
}

impl ModbusFunction {
    /// Look up a function code. Unknown codes yield `None`, never a default.
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            FC_READ_COILS => Some(Self::ReadCoils),
            FC_READ_DISCRETE_INPUTS => Some(Self::ReadDiscreteInputs),
            FC_READ_HOLDING_REGISTERS => Some(Self::ReadHoldingRegisters),
            FC_READ_INPUT_REGISTERS => Some(Self::ReadInputRegisters),
            FC_WRITE_SINGLE_COIL => Some(Self::WriteSingleCoil),
            FC_WRITE_SINGLE_REGISTER => Some(Self::WriteSingleRegister),
            FC_DIAGNOSTICS => Some(Self::Diagnostics),
            FC_WRITE_MULTIPLE_COILS => Some(Self::WriteMultipleCoils),
            FC_WRITE_MULTIPLE_REGISTERS => Some(Self::WriteMultipleRegisters),
            _ => None,
        }
    }

    #[inline]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Function code of the exception response: bit 7 set.
    #[inline]
    pub fn exception_code(self) -> u8 {
        self.to_u8() | EXCEPTION_FLAG
    }

    /// Data bank addressed by this function; `None` for diagnostics.
    pub fn bank(self) -> Option<DataBank> {
        match self {
            Self::ReadCoils | Self::WriteSingleCoil | Self::WriteMultipleCoils => {
                Some(DataBank::Coils)
            }
            Self::ReadDiscreteInputs => Some(DataBank::DiscreteInputs),
            Self::ReadInputRegisters => Some(DataBank::InputRegisters),
            Self::ReadHoldingRegisters | Self::WriteSingleRegister | Self::WriteMultipleRegisters => {
                Some(DataBank::HoldingRegisters)
            }
            Self::Diagnostics => None,
        }
    }

    /// Largest quantity one request may carry.
    pub fn max_quantity(self) -> u16 {
        match self {
            Self::ReadCoils | Self::ReadDiscreteInputs => MAX_READ_COILS,
            Self::ReadHoldingRegisters | Self::ReadInputRegisters => MAX_READ_REGISTERS,
            Self::WriteSingleCoil | Self::WriteSingleRegister => 1,
            Self::WriteMultipleCoils => MAX_WRITE_COILS,
            Self::WriteMultipleRegisters => MAX_WRITE_REGISTERS,
            Self::Diagnostics => 0,
        }
    }

    #[inline]
    pub fn is_read(self) -> bool {
        matches!(
            self,
            Self::ReadCoils
                | Self::ReadDiscreteInputs
                | Self::ReadHoldingRegisters
                | Self::ReadInputRegisters
        )
    }

    #[inline]
    pub fn is_single_write(self) -> bool {
        matches!(self, Self::WriteSingleCoil | Self::WriteSingleRegister)
    }

    #[inline]
    pub fn is_multiple_write(self) -> bool {
        matches!(self, Self::WriteMultipleCoils | Self::WriteMultipleRegisters)
    }

    /// Whether the frame carries a sub-function byte after the function code.
    #[inline]
    pub fn has_sub_function(self) -> bool {
        matches!(self, Self::Diagnostics)
    }

    /// Human-readable name.
    pub fn description(self) -> &'static str {
        match self {
            Self::ReadCoils => "Read Coils",
            Self::ReadDiscreteInputs => "Read Discrete Inputs",
            Self::ReadHoldingRegisters => "Read Holding Registers",
            Self::ReadInputRegisters => "Read Input Registers",
            Self::WriteSingleCoil => "Write Single Coil",
            Self::WriteSingleRegister => "Write Single Register",
            Self::Diagnostics => "Diagnostics",
            Self::WriteMultipleCoils => "Write Multiple Coils",
            Self::WriteMultipleRegisters => "Write Multiple Registers",
        }
    }

    /// Description for any raw code, exception bit ignored.
    pub fn code_description(code: u8) -> &'static str {
        Self::from_u8(code & !EXCEPTION_FLAG)
            .map(Self::description)
            .unwrap_or("Unknown Function")
    }
}

impl TryFrom<u8> for ModbusFunction {
    type Error = crate::error::ModbusError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_u8(code).ok_or(crate::error::ModbusError::InvalidFunction { code })
    }
}

impl From<ModbusFunction> for u8 {
    fn from(function: ModbusFunction) -> u8 {
        function.to_u8()
    }
}

impl fmt::Display for ModbusFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.description(), self.to_u8())
    }
}
