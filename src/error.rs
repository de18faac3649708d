//! Error types for the Modbus RTU core
//!
//! Every failure falls into one of three classes:
//!
//! | Class | Variants | Bus behaviour |
//! |-------|----------|---------------|
//! | Syntactic | `CrcMismatch`, `Frame` | frame discarded, no response |
//! | Semantic | `InvalidFunction`, `InvalidAddress`, `RegisterOutOfRange`, `InvalidQuantity`, `InvalidData`, `DeviceFailure` | exception response |
//! | Local | `InvalidDeviceAddress`, `Configuration`, `Transport`, `Exception`, `Protocol` | reported to the caller |

use thiserror::Error;

use crate::exception::ExceptionCode;
use crate::function::DataBank;

/// Result alias used throughout the crate.
pub type ModbusResult<T> = Result<T, ModbusError>;

/// Errors produced by the codec, validator, database and roles.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModbusError {
    /// Received CRC does not match the CRC computed over the frame.
    #[error("CRC mismatch: computed {computed:#06X}, received {received:#06X}")]
    CrcMismatch { computed: u16, received: u16 },

    /// Frame too short or too long to be an RTU ADU at all.
    #[error("Frame error: {message}")]
    Frame { message: String },

    /// Function code outside the supported catalog.
    #[error("Invalid function code: {code:#04X}")]
    InvalidFunction { code: u8 },

    /// Start address outside the configured bank.
    #[error("Invalid address {address} for function {function:#04X} (bank capacity {capacity})")]
    InvalidAddress {
        function: u8,
        address: u16,
        capacity: u32,
    },

    /// Quantity outside the legal range or running past the end of the bank.
    #[error(
        "Invalid quantity {quantity} at address {address} for function {function:#04X} (bank capacity {capacity})"
    )]
    InvalidQuantity {
        function: u8,
        address: u16,
        quantity: u16,
        capacity: u32,
    },

    /// Register number outside a bank of the database.
    #[error("Register {number} out of range for {bank} (capacity {capacity})")]
    RegisterOutOfRange {
        bank: DataBank,
        number: u32,
        capacity: u32,
    },

    /// Malformed data field (coil value, byte count, payload length, sub-function).
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Storage fault while serving a request.
    #[error("Device failure: {message}")]
    DeviceFailure { message: String },

    /// Device address outside 0 and 1-246.
    #[error("Invalid device address: {address}")]
    InvalidDeviceAddress { address: u8 },

    /// Rejected configuration at initialisation.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Failure reported by the transport collaborator.
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Exception response received from a remote slave.
    #[error("Modbus exception: function={function:#04X}, code={code:#04X} ({message})")]
    Exception {
        function: u8,
        code: u8,
        message: String,
    },

    /// Well-formed response that does not answer the request that was sent.
    #[error("Protocol error: {message}")]
    Protocol { message: String },
}

impl ModbusError {
    pub fn frame(message: impl Into<String>) -> Self {
        Self::Frame {
            message: message.into(),
        }
    }

    pub fn invalid_function(code: u8) -> Self {
        Self::InvalidFunction { code }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    pub fn device_failure(message: impl Into<String>) -> Self {
        Self::DeviceFailure {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Build the error for an exception response received from a slave.
    pub fn exception(function: u8, code: u8) -> Self {
        Self::Exception {
            function,
            code,
            message: ExceptionCode::from_u8(code).description().to_string(),
        }
    }

    /// True for syntactic failures: the frame is dropped without a reply.
    pub fn is_discard(&self) -> bool {
        matches!(self, Self::CrcMismatch { .. } | Self::Frame { .. })
    }

    /// Exception code a slave answers with, for semantic failures.
    pub fn exception_code(&self) -> Option<ExceptionCode> {
        match self {
            Self::InvalidFunction { .. } => Some(ExceptionCode::IllegalFunction),
            Self::InvalidAddress { .. } | Self::RegisterOutOfRange { .. } => {
                Some(ExceptionCode::IllegalDataAddress)
            }
            Self::InvalidQuantity { .. } | Self::InvalidData { .. } => {
                Some(ExceptionCode::IllegalDataValue)
            }
            Self::DeviceFailure { .. } => Some(ExceptionCode::SlaveDeviceFailure),
            _ => None,
        }
    }
}
