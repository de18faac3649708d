//! # Modbus RTU Core
//!
//! Protocol core for Modbus RTU devices: frame codec with CRC16, request
//! validation, a bounds-checked register database, and exception responses.
//! Both roles are provided on top of an abstract frame transport.
//!
//! ## Features
//!
//! - **Stack-allocated frames**: ADUs are built in a fixed 256-byte buffer
//! - **Table-driven CRC16**: split high/low tables generated at compile time
//! - **Ordered validation**: function code, then address, then quantity
//! - **Consistent storage**: one lock per request across all four banks
//! - **Transport agnostic**: serial timing lives behind the [`Transport`] trait
//!
//! ## Supported Function Codes
//!
//! | Code | Function | Master | Slave |
//! |------|----------|--------|-------|
//! | 0x01 | Read Coils | ✅ | ✅ |
//! | 0x02 | Read Discrete Inputs | ✅ | ✅ |
//! | 0x03 | Read Holding Registers | ✅ | ✅ |
//! | 0x04 | Read Input Registers | ✅ | ✅ |
//! | 0x05 | Write Single Coil | ✅ | ✅ |
//! | 0x06 | Write Single Register | ✅ | ✅ |
//! | 0x08 | Diagnostics (Return Query Data) | ✅ | ✅ |
//! | 0x0F | Write Multiple Coils | ✅ | ✅ |
//! | 0x10 | Write Multiple Registers | ✅ | ✅ |
//!
//! ## Quick Start
//!
//! ```rust
//! use modbus_rtu_core::{
//!     BankCapacities, LoopbackTransport, ModbusResult, RtuMaster, RtuSlave, SlaveConfig,
//! };
//!
//! fn main() -> ModbusResult<()> {
//!     let config = SlaveConfig::new(1)
//!         .with_capacities(BankCapacities::new().with_holding_registers(16));
//!     let mut slave = RtuSlave::new(config)?;
//!
//!     let transport = LoopbackTransport::new(move |frame: &[u8]| {
//!         slave.process(frame).reply().map(|adu| adu.to_vec())
//!     });
//!     let mut master = RtuMaster::new(transport);
//!
//!     master.write_single_register(1, 3, 0x1234)?;
//!     assert_eq!(master.read_holding_registers(1, 3, 1)?, vec![0x1234]);
//!     Ok(())
//! }
//! ```

// ============================================================================
// Core modules
// ============================================================================

/// Core error types and result handling
pub mod error;

/// Modbus RTU protocol constants
pub mod constants;

/// CRC16/MODBUS
pub mod crc;

/// Bit packing and big-endian byte helpers
pub mod bytes;

/// Function catalog and data banks
pub mod function;

/// Exception codes and exception responses
pub mod exception;

/// Stack-allocated ADU buffer and builder
pub mod adu;

// ============================================================================
// Device model
// ============================================================================

/// Bank capacities and slave configuration
pub mod config;

/// Request field validation
pub mod validator;

/// Register database
pub mod database;

// ============================================================================
// Framing and roles
// ============================================================================

/// Request/response value object
pub mod packet;

/// RTU frame encoding and decoding
pub mod codec;

/// Frame transport abstraction
pub mod transport;

/// Slave role
pub mod slave;

/// Master role
pub mod master;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// === Error handling ===
pub use error::{ModbusError, ModbusResult};

// === Core types ===
pub use adu::{Adu, AduBuilder};
pub use exception::{ExceptionCode, ExceptionResponse};
pub use function::{DataBank, ModbusFunction};
pub use packet::{Packet, PacketData};

// === Device model ===
pub use config::{BankCapacities, SlaveConfig};
pub use database::{RegisterDatabase, SharedRegisterDatabase};

// === Codec ===
pub use codec::{decode_request, decode_response, encode_request, encode_response, RawRequest};
pub use crc::crc16;

// === Roles ===
pub use master::RtuMaster;
pub use slave::{RtuSlave, SlaveOutcome, SlaveStats};
pub use transport::{LoopbackTransport, MemoryTransport, Transport, TransportStats};

// === Protocol limits (commonly needed constants) ===
pub use constants::{
    MAX_ADU_SIZE, MAX_READ_COILS, MAX_READ_REGISTERS, MAX_WRITE_COILS, MAX_WRITE_REGISTERS,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
