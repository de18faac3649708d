//! Exception codes and exception response frames
//!
//! An exception response echoes the request's function code with bit 7 set,
//! followed by a single exception code:
//!
//! `[Device][Function | 0x80][Exception Code][CRC Lo][CRC Hi]`

use std::fmt;

use tracing::debug;

use crate::adu::{Adu, AduBuilder};
use crate::constants::{
    EXCEPTION_ACKNOWLEDGE, EXCEPTION_FLAG, EXCEPTION_GATEWAY_PATH_UNAVAILABLE,
    EXCEPTION_GATEWAY_TARGET_FAILED, EXCEPTION_ILLEGAL_DATA_ADDRESS, EXCEPTION_ILLEGAL_DATA_VALUE,
    EXCEPTION_ILLEGAL_FUNCTION, EXCEPTION_MEMORY_PARITY_ERROR, EXCEPTION_SLAVE_DEVICE_BUSY,
    EXCEPTION_SLAVE_DEVICE_FAILURE,
};
use crate::error::ModbusResult;
use crate::function::ModbusFunction;

/// Modbus exception codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionCode {
    IllegalFunction,
    IllegalDataAddress,
    IllegalDataValue,
    SlaveDeviceFailure,
    Acknowledge,
    SlaveDeviceBusy,
    MemoryParityError,
    GatewayPathUnavailable,
    GatewayTargetFailedToRespond,
    /// Code outside the published set, preserved as received.
    Unknown(u8),
}

impl ExceptionCode {
    pub const fn from_u8(value: u8) -> Self {
        match value {
            EXCEPTION_ILLEGAL_FUNCTION => Self::IllegalFunction,
            EXCEPTION_ILLEGAL_DATA_ADDRESS => Self::IllegalDataAddress,
            EXCEPTION_ILLEGAL_DATA_VALUE => Self::IllegalDataValue,
            EXCEPTION_SLAVE_DEVICE_FAILURE => Self::SlaveDeviceFailure,
            EXCEPTION_ACKNOWLEDGE => Self::Acknowledge,
            EXCEPTION_SLAVE_DEVICE_BUSY => Self::SlaveDeviceBusy,
            EXCEPTION_MEMORY_PARITY_ERROR => Self::MemoryParityError,
            EXCEPTION_GATEWAY_PATH_UNAVAILABLE => Self::GatewayPathUnavailable,
            EXCEPTION_GATEWAY_TARGET_FAILED => Self::GatewayTargetFailedToRespond,
            other => Self::Unknown(other),
        }
    }

    pub const fn as_u8(self) -> u8 {
        match self {
            Self::IllegalFunction => EXCEPTION_ILLEGAL_FUNCTION,
            Self::IllegalDataAddress => EXCEPTION_ILLEGAL_DATA_ADDRESS,
            Self::IllegalDataValue => EXCEPTION_ILLEGAL_DATA_VALUE,
            Self::SlaveDeviceFailure => EXCEPTION_SLAVE_DEVICE_FAILURE,
            Self::Acknowledge => EXCEPTION_ACKNOWLEDGE,
            Self::SlaveDeviceBusy => EXCEPTION_SLAVE_DEVICE_BUSY,
            Self::MemoryParityError => EXCEPTION_MEMORY_PARITY_ERROR,
            Self::GatewayPathUnavailable => EXCEPTION_GATEWAY_PATH_UNAVAILABLE,
            Self::GatewayTargetFailedToRespond => EXCEPTION_GATEWAY_TARGET_FAILED,
            Self::Unknown(raw) => raw,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::IllegalFunction => "Illegal Function",
            Self::IllegalDataAddress => "Illegal Data Address",
            Self::IllegalDataValue => "Illegal Data Value",
            Self::SlaveDeviceFailure => "Slave Device Failure",
            Self::Acknowledge => "Acknowledge",
            Self::SlaveDeviceBusy => "Slave Device Busy",
            Self::MemoryParityError => "Memory Parity Error",
            Self::GatewayPathUnavailable => "Gateway Path Unavailable",
            Self::GatewayTargetFailedToRespond => "Gateway Target Device Failed to Respond",
            Self::Unknown(_) => "Unknown Exception",
        }
    }
}

impl fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.description(), self.as_u8())
    }
}

/// Exception variant of a raw function code: bit 7 set.
#[inline]
pub fn exception_function_code(function_code: u8) -> u8 {
    function_code | EXCEPTION_FLAG
}

/// True when a response function code carries the exception bit.
#[inline]
pub fn is_exception_function_code(function_code: u8) -> bool {
    function_code & EXCEPTION_FLAG != 0
}

/// A decoded or to-be-sent exception response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionResponse {
    pub device_id: u8,
    /// Request function code, without the exception bit.
    pub function_code: u8,
    pub exception: ExceptionCode,
}

impl ExceptionResponse {
    pub fn new(device_id: u8, function_code: u8, exception: ExceptionCode) -> Self {
        Self {
            device_id,
            function_code: function_code & !EXCEPTION_FLAG,
            exception,
        }
    }

    /// Encode `[device][fc | 0x80][code]` followed by the CRC.
    pub fn encode(&self) -> ModbusResult<Adu> {
        debug!(
            "Exception response: device={}, FC={:02X} ({}), code={}",
            self.device_id,
            self.function_code,
            ModbusFunction::code_description(self.function_code),
            self.exception
        );
        AduBuilder::new()
            .device(self.device_id)?
            .function_code(exception_function_code(self.function_code))?
            .byte(self.exception.as_u8())?
            .seal()
    }
}
