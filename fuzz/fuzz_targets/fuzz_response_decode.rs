#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use modbus_rtu_core::{decode_response, BankCapacities, ModbusFunction, Packet};

#[derive(Debug, Arbitrary)]
struct Input {
    function: u8,
    address: u16,
    quantity: u16,
    frame: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let Some(function) = ModbusFunction::from_u8(input.function) else {
        return;
    };
    if !function.is_read() {
        return;
    }
    let caps = BankCapacities::protocol_maximum();
    if let Ok(request) = Packet::read_request(1, function, input.address, input.quantity, &caps) {
        let _ = decode_response(&input.frame, &request);
    }
});
