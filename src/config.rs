//! # Slave Configuration
//!
//! Bank capacities and the slave's own device address, supplied once at
//! startup and immutable afterwards.
//!
//! ## Limits
//!
//! - **Bank capacity**: 0 to 65 536 elements (the 16-bit address space).
//!   A capacity of zero disables the bank: every request against it fails
//!   validation.
//! - **Own device address**: 1-246. Address 0 is broadcast and 247-255 are
//!   reserved, so neither can identify a slave.

use tracing::warn;

use crate::constants::{MAX_BANK_CAPACITY, MAX_UNICAST_ADDRESS, MIN_UNICAST_ADDRESS};
use crate::error::{ModbusError, ModbusResult};
use crate::function::DataBank;

/// Number of elements in each data bank.
///
/// # Example
///
/// ```rust
/// use modbus_rtu_core::{BankCapacities, DataBank};
///
/// let capacities = BankCapacities::new()
///     .with_coils(16)
///     .with_holding_registers(100);
///
/// assert_eq!(capacities.capacity(DataBank::HoldingRegisters), 100);
/// assert_eq!(capacities.capacity(DataBank::InputRegisters), 0);
/// assert!(capacities.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BankCapacities {
    pub coils: u32,
    pub discrete_inputs: u32,
    pub input_registers: u32,
    pub holding_registers: u32,
}

impl BankCapacities {
    /// All banks empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Full 16-bit address space in every bank. Used by masters that do not
    /// know the remote device's layout.
    pub fn protocol_maximum() -> Self {
        Self {
            coils: MAX_BANK_CAPACITY,
            discrete_inputs: MAX_BANK_CAPACITY,
            input_registers: MAX_BANK_CAPACITY,
            holding_registers: MAX_BANK_CAPACITY,
        }
    }

    pub fn with_coils(mut self, count: u32) -> Self {
        self.coils = count;
        self
    }

    pub fn with_discrete_inputs(mut self, count: u32) -> Self {
        self.discrete_inputs = count;
        self
    }

    pub fn with_input_registers(mut self, count: u32) -> Self {
        self.input_registers = count;
        self
    }

    pub fn with_holding_registers(mut self, count: u32) -> Self {
        self.holding_registers = count;
        self
    }

    /// Configured capacity of one bank.
    #[inline]
    pub fn capacity(&self, bank: DataBank) -> u32 {
        match bank {
            DataBank::Coils => self.coils,
            DataBank::DiscreteInputs => self.discrete_inputs,
            DataBank::InputRegisters => self.input_registers,
            DataBank::HoldingRegisters => self.holding_registers,
        }
    }

    /// Reject any capacity beyond the addressable maximum.
    pub fn validate(&self) -> ModbusResult<()> {
        for bank in DataBank::ALL {
            let capacity = self.capacity(bank);
            if capacity > MAX_BANK_CAPACITY {
                warn!(
                    "Rejected configuration: {} capacity {} exceeds {}",
                    bank, capacity, MAX_BANK_CAPACITY
                );
                return Err(ModbusError::configuration(format!(
                    "{} capacity {} exceeds addressable maximum {}",
                    bank, capacity, MAX_BANK_CAPACITY
                )));
            }
        }
        Ok(())
    }
}

/// Configuration of a slave device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlaveConfig {
    /// The slave's own unicast address.
    pub device_address: u8,
    pub capacities: BankCapacities,
}

impl SlaveConfig {
    /// Configuration with the given address and all banks empty.
    pub fn new(device_address: u8) -> Self {
        Self {
            device_address,
            capacities: BankCapacities::new(),
        }
    }

    pub fn with_capacities(mut self, capacities: BankCapacities) -> Self {
        self.capacities = capacities;
        self
    }

    /// Fail fast on an address that cannot identify a slave or on bad capacities.
    pub fn validate(&self) -> ModbusResult<()> {
        if !(MIN_UNICAST_ADDRESS..=MAX_UNICAST_ADDRESS).contains(&self.device_address) {
            warn!(
                "Rejected configuration: device address {}",
                self.device_address
            );
            return Err(ModbusError::configuration(format!(
                "device address {} outside {}-{}",
                self.device_address, MIN_UNICAST_ADDRESS, MAX_UNICAST_ADDRESS
            )));
        }
        self.capacities.validate()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacities_are_empty() {
        let capacities = BankCapacities::default();
        for bank in DataBank::ALL {
            assert_eq!(capacities.capacity(bank), 0);
        }
        assert!(capacities.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let capacities = BankCapacities::new()
            .with_coils(10)
            .with_discrete_inputs(20)
            .with_input_registers(30)
            .with_holding_registers(40);

        assert_eq!(capacities.capacity(DataBank::Coils), 10);
        assert_eq!(capacities.capacity(DataBank::DiscreteInputs), 20);
        assert_eq!(capacities.capacity(DataBank::InputRegisters), 30);
        assert_eq!(capacities.capacity(DataBank::HoldingRegisters), 40);
    }

    #[test]
    fn test_protocol_maximum_is_valid() {
        assert!(BankCapacities::protocol_maximum().validate().is_ok());
    }

    #[test]
    fn test_capacity_above_address_space_rejected() {
        let capacities = BankCapacities::new().with_holding_registers(MAX_BANK_CAPACITY + 1);
        let err = capacities.validate().unwrap_err();
        assert!(matches!(err, ModbusError::Configuration { .. }));
    }

    #[test]
    fn test_slave_address_range() {
        assert!(SlaveConfig::new(1).validate().is_ok());
        assert!(SlaveConfig::new(246).validate().is_ok());
        assert!(SlaveConfig::new(0).validate().is_err());
        assert!(SlaveConfig::new(247).validate().is_err());
        assert!(SlaveConfig::new(255).validate().is_err());
    }

    #[test]
    fn test_slave_config_checks_capacities() {
        let config = SlaveConfig::new(1)
            .with_capacities(BankCapacities::new().with_coils(MAX_BANK_CAPACITY + 1));
        assert!(config.validate().is_err());
    }
}
