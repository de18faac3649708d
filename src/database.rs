//! # Register Database
//!
//! Four fixed-capacity banks owned by the slave role. Two addressing schemes
//! are exposed:
//!
//! - **Register numbers** (`get`/`set` and the typed single-element
//!   accessors): 1-based, as printed in device documentation. Register 1 is
//!   stored at index 0. Out-of-range reads return zero/`false`, out-of-range
//!   writes are rejected; neither panics.
//! - **Protocol addresses** (`read_*`/`write_*` range accessors): 0-based, as
//!   carried in request frames.
//!
//! [`SharedRegisterDatabase`] serialises every access behind one mutex so a
//! request is served against a consistent view of all four banks.

use std::ops::Range;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::trace;

use crate::config::BankCapacities;
use crate::error::{ModbusError, ModbusResult};
use crate::function::DataBank;

/// Coils, discrete inputs, input registers and holding registers.
///
/// # Example
///
/// ```rust
/// use modbus_rtu_core::{BankCapacities, DataBank, RegisterDatabase};
///
/// let mut db = RegisterDatabase::new(BankCapacities::new().with_holding_registers(1)).unwrap();
/// db.set(DataBank::HoldingRegisters, 1, 42).unwrap();
/// assert_eq!(db.get(DataBank::HoldingRegisters, 1), 42);
/// assert_eq!(db.get(DataBank::HoldingRegisters, 2), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterDatabase {
    capacities: BankCapacities,
    coils: Vec<bool>,
    discrete_inputs: Vec<bool>,
    input_registers: Vec<u16>,
    holding_registers: Vec<u16>,
}

impl RegisterDatabase {
    /// Allocate every bank at its configured capacity, cleared to zero.
    ///
    /// Fails if any capacity exceeds the addressable maximum.
    pub fn new(capacities: BankCapacities) -> ModbusResult<Self> {
        capacities.validate()?;
        Ok(Self {
            capacities,
            coils: vec![false; capacities.coils as usize],
            discrete_inputs: vec![false; capacities.discrete_inputs as usize],
            input_registers: vec![0; capacities.input_registers as usize],
            holding_registers: vec![0; capacities.holding_registers as usize],
        })
    }

    #[inline]
    pub fn capacities(&self) -> &BankCapacities {
        &self.capacities
    }

    #[inline]
    pub fn capacity(&self, bank: DataBank) -> u32 {
        self.capacities.capacity(bank)
    }

    /// Reset every element of every bank to zero.
    pub fn clear(&mut self) {
        self.coils.fill(false);
        self.discrete_inputs.fill(false);
        self.input_registers.fill(0);
        self.holding_registers.fill(0);
    }

    // ========================================================================
    // Single elements, 1-based register numbers
    // ========================================================================

    /// Read one element; bit banks read as 0 or 1. Out of range reads 0.
    pub fn get(&self, bank: DataBank, number: u32) -> u16 {
        let Some(index) = self.index_of(bank, number) else {
            trace!("Read of {} register {} out of range", bank, number);
            return 0;
        };
        match bank {
            DataBank::Coils => u16::from(self.coils[index]),
            DataBank::DiscreteInputs => u16::from(self.discrete_inputs[index]),
            DataBank::InputRegisters => self.input_registers[index],
            DataBank::HoldingRegisters => self.holding_registers[index],
        }
    }

    /// Write one element; bit banks store `value != 0`.
    ///
    /// On rejection the database is unchanged.
    pub fn set(&mut self, bank: DataBank, number: u32, value: u16) -> ModbusResult<()> {
        let index = self.index_of(bank, number).ok_or(ModbusError::RegisterOutOfRange {
            bank,
            number,
            capacity: self.capacity(bank),
        })?;
        match bank {
            DataBank::Coils => self.coils[index] = value != 0,
            DataBank::DiscreteInputs => self.discrete_inputs[index] = value != 0,
            DataBank::InputRegisters => self.input_registers[index] = value,
            DataBank::HoldingRegisters => self.holding_registers[index] = value,
        }
        Ok(())
    }

    pub fn coil(&self, number: u32) -> bool {
        self.get(DataBank::Coils, number) != 0
    }

    pub fn set_coil(&mut self, number: u32, value: bool) -> ModbusResult<()> {
        self.set(DataBank::Coils, number, u16::from(value))
    }

    pub fn discrete_input(&self, number: u32) -> bool {
        self.get(DataBank::DiscreteInputs, number) != 0
    }

    pub fn set_discrete_input(&mut self, number: u32, value: bool) -> ModbusResult<()> {
        self.set(DataBank::DiscreteInputs, number, u16::from(value))
    }

    pub fn input_register(&self, number: u32) -> u16 {
        self.get(DataBank::InputRegisters, number)
    }

    pub fn set_input_register(&mut self, number: u32, value: u16) -> ModbusResult<()> {
        self.set(DataBank::InputRegisters, number, value)
    }

    pub fn holding_register(&self, number: u32) -> u16 {
        self.get(DataBank::HoldingRegisters, number)
    }

    pub fn set_holding_register(&mut self, number: u32, value: u16) -> ModbusResult<()> {
        self.set(DataBank::HoldingRegisters, number, value)
    }

    // ========================================================================
    // Ranges, 0-based protocol addresses
    // ========================================================================

    /// Read `quantity` bits starting at protocol address `address`.
    pub fn read_bits(&self, bank: DataBank, address: u16, quantity: u16) -> ModbusResult<Vec<bool>> {
        let range = self.range_of(bank, address, usize::from(quantity))?;
        match bank {
            DataBank::Coils => Ok(self.coils[range].to_vec()),
            DataBank::DiscreteInputs => Ok(self.discrete_inputs[range].to_vec()),
            _ => Err(ModbusError::invalid_data(format!("{} is not a bit bank", bank))),
        }
    }

    /// Read `quantity` registers starting at protocol address `address`.
    pub fn read_registers(
        &self,
        bank: DataBank,
        address: u16,
        quantity: u16,
    ) -> ModbusResult<Vec<u16>> {
        let range = self.range_of(bank, address, usize::from(quantity))?;
        match bank {
            DataBank::InputRegisters => Ok(self.input_registers[range].to_vec()),
            DataBank::HoldingRegisters => Ok(self.holding_registers[range].to_vec()),
            _ => Err(ModbusError::invalid_data(format!(
                "{} is not a register bank",
                bank
            ))),
        }
    }

    /// Write bits starting at protocol address `address`. All or nothing.
    pub fn write_bits(&mut self, bank: DataBank, address: u16, values: &[bool]) -> ModbusResult<()> {
        let range = self.range_of(bank, address, values.len())?;
        let target = match bank {
            DataBank::Coils => &mut self.coils,
            DataBank::DiscreteInputs => &mut self.discrete_inputs,
            _ => {
                return Err(ModbusError::invalid_data(format!(
                    "{} is not a bit bank",
                    bank
                )))
            }
        };
        target[range].copy_from_slice(values);
        trace!("Wrote {} {} from address {}", values.len(), bank, address);
        Ok(())
    }

    /// Write registers starting at protocol address `address`. All or nothing.
    pub fn write_registers(
        &mut self,
        bank: DataBank,
        address: u16,
        values: &[u16],
    ) -> ModbusResult<()> {
        let range = self.range_of(bank, address, values.len())?;
        let target = match bank {
            DataBank::InputRegisters => &mut self.input_registers,
            DataBank::HoldingRegisters => &mut self.holding_registers,
            _ => {
                return Err(ModbusError::invalid_data(format!(
                    "{} is not a register bank",
                    bank
                )))
            }
        };
        target[range].copy_from_slice(values);
        trace!("Wrote {} {} from address {}", values.len(), bank, address);
        Ok(())
    }

    fn index_of(&self, bank: DataBank, number: u32) -> Option<usize> {
        if number == 0 || number > self.capacity(bank) {
            return None;
        }
        Some((number - 1) as usize)
    }

    fn range_of(&self, bank: DataBank, address: u16, quantity: usize) -> ModbusResult<Range<usize>> {
        let start = usize::from(address);
        let end = start + quantity;
        if quantity == 0 || end > self.capacity(bank) as usize {
            return Err(ModbusError::RegisterOutOfRange {
                bank,
                number: u32::from(address) + 1,
                capacity: self.capacity(bank),
            });
        }
        Ok(start..end)
    }
}

/// Cloneable handle to a database behind a single mutex.
#[derive(Debug, Clone)]
pub struct SharedRegisterDatabase {
    inner: Arc<Mutex<RegisterDatabase>>,
}

impl SharedRegisterDatabase {
    pub fn new(database: RegisterDatabase) -> Self {
        Self {
            inner: Arc::new(Mutex::new(database)),
        }
    }

    /// Lock the whole database. A poisoned lock is a device failure.
    pub fn lock(&self) -> ModbusResult<MutexGuard<'_, RegisterDatabase>> {
        self.inner
            .lock()
            .map_err(|_| ModbusError::device_failure("register database lock poisoned"))
    }

    /// Run `f` with exclusive access to the database.
    pub fn with<R>(&self, f: impl FnOnce(&mut RegisterDatabase) -> R) -> ModbusResult<R> {
        let mut guard = self.lock()?;
        Ok(f(&mut guard))
    }
}

impl From<RegisterDatabase> for SharedRegisterDatabase {
    fn from(database: RegisterDatabase) -> Self {
        Self::new(database)
    }
}

// ============================================================================
// Tests
// ============================================================================
