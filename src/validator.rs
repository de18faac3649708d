//! # Request Validation
//!
//! Independent pure predicates over function code, device address, start
//! address and quantity, plus `check_*` variants that report which check
//! failed. The checks run in a fixed order:
//!
//! 1. function code is in the catalog
//! 2. start address lies inside the function's bank
//! 3. quantity is within `1..=max` for the function and
//!    `start + quantity ≤ capacity` (no wraparound)
//!
//! The error variant of the first failing check selects the exception code.

use crate::config::BankCapacities;
use crate::constants::{BROADCAST_ADDRESS, MAX_UNICAST_ADDRESS, MIN_UNICAST_ADDRESS};
use crate::error::{ModbusError, ModbusResult};
use crate::function::ModbusFunction;

/// Device address 0 (broadcast) or 1-246 (unicast).
#[inline]
pub fn is_valid_device_address(address: u8) -> bool {
    matches!(
        address,
        BROADCAST_ADDRESS | MIN_UNICAST_ADDRESS..=MAX_UNICAST_ADDRESS
    )
}

/// Function code belongs to the catalog.
#[inline]
pub fn is_valid_function_code(code: u8) -> bool {
    ModbusFunction::from_u8(code).is_some()
}

/// Start address lies in `[0, capacity - 1]` of the function's bank.
///
/// Functions without a bank accept any address.
pub fn is_valid_start_address(
    function: ModbusFunction,
    address: u16,
    capacities: &BankCapacities,
) -> bool {
    match function.bank() {
        Some(bank) => u32::from(address) < capacities.capacity(bank),
        None => true,
    }
}

/// Quantity lies in `1..=max_quantity` and `address + quantity ≤ capacity`.
///
/// Functions without a bank accept any quantity.
pub fn is_valid_quantity(
    function: ModbusFunction,
    address: u16,
    quantity: u16,
    capacities: &BankCapacities,
) -> bool {
    match function.bank() {
        Some(bank) => {
            quantity >= 1
                && quantity <= function.max_quantity()
                && u32::from(address) + u32::from(quantity) <= capacities.capacity(bank)
        }
        None => true,
    }
}

pub fn check_device_address(address: u8) -> ModbusResult<()> {
    if is_valid_device_address(address) {
        Ok(())
    } else {
        Err(ModbusError::InvalidDeviceAddress { address })
    }
}

pub fn check_function_code(code: u8) -> ModbusResult<ModbusFunction> {
    ModbusFunction::try_from(code)
}

pub fn check_start_address(
    function: ModbusFunction,
    address: u16,
    capacities: &BankCapacities,
) -> ModbusResult<()> {
    if is_valid_start_address(function, address, capacities) {
        Ok(())
    } else {
        Err(ModbusError::InvalidAddress {
            function: function.to_u8(),
            address,
            capacity: bank_capacity(function, capacities),
        })
    }
}

pub fn check_quantity(
    function: ModbusFunction,
    address: u16,
    quantity: u16,
    capacities: &BankCapacities,
) -> ModbusResult<()> {
    if is_valid_quantity(function, address, quantity, capacities) {
        Ok(())
    } else {
        Err(ModbusError::InvalidQuantity {
            function: function.to_u8(),
            address,
            quantity,
            capacity: bank_capacity(function, capacities),
        })
    }
}

/// Run all three checks in order, stopping at the first failure.
pub fn validate_request(
    function_code: u8,
    address: u16,
    quantity: u16,
    capacities: &BankCapacities,
) -> ModbusResult<ModbusFunction> {
    let function = check_function_code(function_code)?;
    check_start_address(function, address, capacities)?;
    check_quantity(function, address, quantity, capacities)?;
    Ok(function)
}

fn bank_capacity(function: ModbusFunction, capacities: &BankCapacities) -> u32 {
    function
        .bank()
        .map(|bank| capacities.capacity(bank))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::ExceptionCode;

    fn single_holding() -> BankCapacities {
        BankCapacities::new().with_holding_registers(1)
    }

    #[test]
    fn test_device_addresses() {
        assert!(is_valid_device_address(0));
        assert!(is_valid_device_address(1));
        assert!(is_valid_device_address(246));
        assert!(!is_valid_device_address(247));
        assert!(!is_valid_device_address(255));
        assert_eq!(
            check_device_address(250),
            Err(ModbusError::InvalidDeviceAddress { address: 250 })
        );
    }

    #[test]
    fn test_function_codes() {
        assert!(is_valid_function_code(0x03));
        assert!(is_valid_function_code(0x10));
        assert!(!is_valid_function_code(0x00));
        assert!(!is_valid_function_code(0x2B));
    }

    #[test]
    fn test_read_holding_single_register() {
        let caps = single_holding();
        assert_eq!(
            validate_request(0x03, 0, 1, &caps),
            Ok(ModbusFunction::ReadHoldingRegisters)
        );
    }

    #[test]
    fn test_quantity_past_capacity_is_illegal_value() {
        let caps = single_holding();
        let err = validate_request(0x03, 0, 2, &caps).unwrap_err();
        assert_eq!(err.exception_code(), Some(ExceptionCode::IllegalDataValue));
    }

    #[test]
    fn test_address_out_of_range_is_illegal_address() {
        let caps = single_holding();
        let err = validate_request(0x03, 1, 1, &caps).unwrap_err();
        assert_eq!(err.exception_code(), Some(ExceptionCode::IllegalDataAddress));
    }

    #[test]
    fn test_unknown_function_checked_first() {
        // address and quantity are both bad too, function wins
        let caps = single_holding();
        let err = validate_request(0x42, 500, 0, &caps).unwrap_err();
        assert_eq!(err.exception_code(), Some(ExceptionCode::IllegalFunction));
    }

    #[test]
    fn test_address_checked_before_quantity() {
        let caps = single_holding();
        let err = validate_request(0x03, 9, 0, &caps).unwrap_err();
        assert!(matches!(err, ModbusError::InvalidAddress { .. }));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let caps = BankCapacities::new().with_coils(8);
        assert!(!is_valid_quantity(ModbusFunction::ReadCoils, 0, 0, &caps));
    }

    #[test]
    fn test_no_wraparound() {
        let caps = BankCapacities::protocol_maximum();
        assert!(is_valid_quantity(
            ModbusFunction::ReadHoldingRegisters,
            0xFFFF,
            1,
            &caps
        ));
        assert!(!is_valid_quantity(
            ModbusFunction::ReadHoldingRegisters,
            0xFFFF,
            2,
            &caps
        ));
    }

    #[test]
    fn test_zero_capacity_bank_rejects_everything() {
        let caps = BankCapacities::new().with_holding_registers(10);
        assert!(!is_valid_start_address(ModbusFunction::ReadCoils, 0, &caps));
        assert!(!is_valid_start_address(
            ModbusFunction::ReadInputRegisters,
            0,
            &caps
        ));
    }

    #[test]
    fn test_single_writes_fixed_quantity() {
        let caps = BankCapacities::new().with_coils(10).with_holding_registers(10);
        assert!(is_valid_quantity(ModbusFunction::WriteSingleCoil, 3, 1, &caps));
        assert!(!is_valid_quantity(ModbusFunction::WriteSingleCoil, 3, 2, &caps));
        assert!(is_valid_quantity(ModbusFunction::WriteSingleRegister, 9, 1, &caps));
        assert!(!is_valid_quantity(ModbusFunction::WriteSingleRegister, 9, 2, &caps));
    }

    #[test]
    fn test_protocol_maxima() {
        let caps = BankCapacities::protocol_maximum();
        assert!(is_valid_quantity(ModbusFunction::ReadHoldingRegisters, 0, 125, &caps));
        assert!(!is_valid_quantity(ModbusFunction::ReadHoldingRegisters, 0, 126, &caps));
        assert!(is_valid_quantity(ModbusFunction::ReadCoils, 0, 2000, &caps));
        assert!(!is_valid_quantity(ModbusFunction::ReadCoils, 0, 2001, &caps));
        assert!(!is_valid_quantity(ModbusFunction::WriteMultipleRegisters, 0, 124, &caps));
        assert!(!is_valid_quantity(ModbusFunction::WriteMultipleCoils, 0, 1969, &caps));
    }

    #[test]
    fn test_each_function_uses_its_bank() {
        let caps = BankCapacities::new()
            .with_coils(1)
            .with_discrete_inputs(2)
            .with_input_registers(3)
            .with_holding_registers(4);

        assert!(is_valid_start_address(ModbusFunction::ReadCoils, 0, &caps));
        assert!(!is_valid_start_address(ModbusFunction::WriteMultipleCoils, 1, &caps));
        assert!(is_valid_start_address(ModbusFunction::ReadDiscreteInputs, 1, &caps));
        assert!(!is_valid_start_address(ModbusFunction::ReadDiscreteInputs, 2, &caps));
        assert!(is_valid_start_address(ModbusFunction::ReadInputRegisters, 2, &caps));
        assert!(!is_valid_start_address(ModbusFunction::ReadInputRegisters, 3, &caps));
        assert!(is_valid_start_address(ModbusFunction::WriteMultipleRegisters, 3, &caps));
        assert!(!is_valid_start_address(ModbusFunction::WriteSingleRegister, 4, &caps));
    }

    #[test]
    fn test_diagnostics_has_no_bank_checks() {
        let caps = BankCapacities::new();
        assert_eq!(
            validate_request(0x08, 0x1234, 0xABCD, &caps),
            Ok(ModbusFunction::Diagnostics)
        );
    }
}
