//! Stack-allocated RTU ADU buffer
//!
//! Frames are assembled in a fixed 256-byte array and sealed by appending the
//! CRC computed over every preceding byte, low byte first.

use tracing::debug;

use crate::constants::{CRC_LEN, MAX_ADU_SIZE};
use crate::crc::crc16;
use crate::error::{ModbusError, ModbusResult};
use crate::function::ModbusFunction;

/// RTU frame buffer (device address + PDU + CRC once sealed)
#[derive(Debug, Clone)]
pub struct Adu {
    /// Fixed-size buffer (stack)
    data: [u8; MAX_ADU_SIZE],
    /// Actual data length
    len: usize,
}

impl Adu {
    /// Create an empty ADU
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0; MAX_ADU_SIZE],
            len: 0,
        }
    }

    /// Copy a received frame into a buffer
    pub fn from_slice(data: &[u8]) -> ModbusResult<Self> {
        let mut adu = Self::new();
        adu.extend(data)?;
        Ok(adu)
    }

    /// Push a single byte
    #[inline]
    pub fn push(&mut self, byte: u8) -> ModbusResult<()> {
        if self.len >= MAX_ADU_SIZE {
            return Err(ModbusError::frame("ADU buffer full"));
        }
        self.data[self.len] = byte;
        self.len += 1;
        Ok(())
    }

    /// Push u16 in big-endian
    #[inline]
    pub fn push_u16(&mut self, value: u16) -> ModbusResult<()> {
        let (hi, lo) = crate::bytes::split16(value);
        self.push(hi)?;
        self.push(lo)
    }

    /// Extend with a byte slice
    #[inline]
    pub fn extend(&mut self, data: &[u8]) -> ModbusResult<()> {
        if self.len + data.len() > MAX_ADU_SIZE {
            return Err(ModbusError::frame(format!(
                "ADU would exceed max size: {} + {} > {}",
                self.len,
                data.len(),
                MAX_ADU_SIZE
            )));
        }
        self.data[self.len..self.len + data.len()].copy_from_slice(data);
        self.len += data.len();
        Ok(())
    }

    /// Append the CRC of the current contents, low byte first
    pub fn push_crc(&mut self) -> ModbusResult<u16> {
        if self.len + CRC_LEN > MAX_ADU_SIZE {
            return Err(ModbusError::frame("no room for CRC"));
        }
        let crc = crc16(self.as_slice());
        let [lo, hi] = crc.to_le_bytes();
        self.push(lo)?;
        self.push(hi)?;
        Ok(crc)
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }

    /// Device address (first byte)
    #[inline]
    pub fn device_id(&self) -> Option<u8> {
        self.as_slice().first().copied()
    }

    /// Function code (second byte)
    #[inline]
    pub fn function_code(&self) -> Option<u8> {
        self.as_slice().get(1).copied()
    }
}

impl Default for Adu {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<[u8]> for Adu {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl PartialEq for Adu {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for Adu {}

/// ADU builder - fluent API, finished with [`AduBuilder::seal`]
pub struct AduBuilder {
    adu: Adu,
}

impl Default for AduBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AduBuilder {
    #[inline]
    pub fn new() -> Self {
        Self { adu: Adu::new() }
    }

    /// Set device address
    #[inline]
    pub fn device(mut self, device_id: u8) -> ModbusResult<Self> {
        self.adu.push(device_id)?;
        Ok(self)
    }

    /// Set function code
    #[inline]
    pub fn function_code(mut self, fc: u8) -> ModbusResult<Self> {
        self.adu.push(fc)?;
        Ok(self)
    }

    /// Add address
    #[inline]
    pub fn address(mut self, addr: u16) -> ModbusResult<Self> {
        self.adu.push_u16(addr)?;
        Ok(self)
    }

    /// Add quantity, or the value of a single write
    #[inline]
    pub fn quantity(mut self, qty: u16) -> ModbusResult<Self> {
        self.adu.push_u16(qty)?;
        Ok(self)
    }

    /// Add a byte
    #[inline]
    pub fn byte(mut self, b: u8) -> ModbusResult<Self> {
        self.adu.push(b)?;
        Ok(self)
    }

    /// Add data
    #[inline]
    pub fn data(mut self, data: &[u8]) -> ModbusResult<Self> {
        self.adu.extend(data)?;
        Ok(self)
    }

    /// Append the CRC and return the finished frame
    pub fn seal(mut self) -> ModbusResult<Adu> {
        let crc = self.adu.push_crc()?;
        if let (Some(device), Some(fc)) = (self.adu.device_id(), self.adu.function_code()) {
            debug!(
                "ADU built: device={}, FC={:02X} ({}), total_len={}, crc={:04X}",
                device,
                fc,
                ModbusFunction::code_description(fc),
                self.adu.len(),
                crc
            );
        }
        Ok(self.adu)
    }
}
