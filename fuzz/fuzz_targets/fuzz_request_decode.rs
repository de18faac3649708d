#![no_main]

use libfuzzer_sys::fuzz_target;
use modbus_rtu_core::codec::decode_raw_request;

fuzz_target!(|data: &[u8]| {
    if let Ok(raw) = decode_raw_request(data) {
        let _ = raw.validate(&modbus_rtu_core::BankCapacities::protocol_maximum());
        let _ = raw.to_packet();
    }
});
