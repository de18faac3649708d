#![no_main]

use libfuzzer_sys::fuzz_target;
use modbus_rtu_core::{crc16, BankCapacities, RtuSlave, SlaveConfig};

fuzz_target!(|body: &[u8]| {
    let config = SlaveConfig::new(1).with_capacities(
        BankCapacities::new()
            .with_coils(64)
            .with_discrete_inputs(64)
            .with_input_registers(32)
            .with_holding_registers(32),
    );
    let Ok(mut slave) = RtuSlave::new(config) else {
        return;
    };

    // raw bytes, then the same bytes sealed with a valid CRC
    slave.process(body);
    let mut frame = body.to_vec();
    frame.extend_from_slice(&crc16(body).to_le_bytes());
    slave.process(&frame);
});
