//! # RTU Slave
//!
//! Serves requests against a [`RegisterDatabase`]. For each received frame
//! the slave:
//!
//! 1. drops it without a reply if it is too short or fails the CRC
//! 2. ignores it if it is addressed to another device
//! 3. validates function code, start address and quantity, in that order
//! 4. checks the payload structure (byte count, coil value)
//! 5. executes it under a single lock of the database
//! 6. answers with a normal or exception response
//!
//! Broadcast requests (device 0) are executed when they write and never
//! answered.
//!
//! ```rust
//! use modbus_rtu_core::{BankCapacities, RtuSlave, SlaveConfig, SlaveOutcome};
//!
//! let config = SlaveConfig::new(1)
//!     .with_capacities(BankCapacities::new().with_holding_registers(1));
//! let mut slave = RtuSlave::new(config).unwrap();
//!
//! let outcome = slave.process(&[0x01, 0x06, 0x00, 0x00, 0x00, 0x01, 0x48, 0x0A]);
//! assert!(matches!(outcome, SlaveOutcome::Response(_)));
//! assert_eq!(slave.database().with(|db| db.holding_register(1)).unwrap(), 1);
//! ```

use tracing::{debug, info, warn};

use crate::adu::Adu;
use crate::codec::{decode_raw_request, encode_response, RawRequest};
use crate::config::SlaveConfig;
use crate::constants::{BROADCAST_ADDRESS, DIAG_RETURN_QUERY_DATA};
use crate::database::{RegisterDatabase, SharedRegisterDatabase};
use crate::error::{ModbusError, ModbusResult};
use crate::exception::{ExceptionCode, ExceptionResponse};
use crate::function::ModbusFunction;
use crate::packet::{Packet, PacketData};
use crate::transport::Transport;

/// What the slave did with one received frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlaveOutcome {
    /// Not a valid frame (too short, bad CRC); dropped without reply.
    Discarded(ModbusError),
    /// Addressed to another device.
    Ignored,
    /// Broadcast request; no reply goes on the bus. Carries the failure if
    /// the request was rejected.
    Broadcast(Option<ModbusError>),
    /// Normal response.
    Response(Adu),
    /// Exception response.
    Exception { code: ExceptionCode, frame: Adu },
}

impl SlaveOutcome {
    /// Frame to put on the bus, if any.
    pub fn reply(&self) -> Option<&Adu> {
        match self {
            Self::Response(frame) | Self::Exception { frame, .. } => Some(frame),
            _ => None,
        }
    }
}

/// Slave statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlaveStats {
    pub frames_received: u64,
    pub discarded: u64,
    pub ignored: u64,
    pub broadcasts: u64,
    pub responses: u64,
    pub exceptions: u64,
}

/// Modbus RTU slave device.
#[derive(Debug)]
pub struct RtuSlave {
    config: SlaveConfig,
    database: SharedRegisterDatabase,
    stats: SlaveStats,
}

impl RtuSlave {
    /// Validate the configuration and allocate a cleared database.
    pub fn new(config: SlaveConfig) -> ModbusResult<Self> {
        config.validate()?;
        let database = RegisterDatabase::new(config.capacities)?;
        info!(
            "Modbus RTU slave {} ready: coils={}, discrete_inputs={}, input_registers={}, holding_registers={}",
            config.device_address,
            config.capacities.coils,
            config.capacities.discrete_inputs,
            config.capacities.input_registers,
            config.capacities.holding_registers
        );
        Ok(Self {
            config,
            database: database.into(),
            stats: SlaveStats::default(),
        })
    }

    /// Serve an existing database. Its capacities must match the configuration.
    pub fn with_database(
        config: SlaveConfig,
        database: SharedRegisterDatabase,
    ) -> ModbusResult<Self> {
        config.validate()?;
        let actual = database.with(|db| *db.capacities())?;
        if actual != config.capacities {
            return Err(ModbusError::configuration(format!(
                "database capacities {:?} do not match configuration {:?}",
                actual, config.capacities
            )));
        }
        Ok(Self {
            config,
            database,
            stats: SlaveStats::default(),
        })
    }

    pub fn config(&self) -> &SlaveConfig {
        &self.config
    }

    /// Handle to the database, shareable with application code.
    pub fn database(&self) -> &SharedRegisterDatabase {
        &self.database
    }

    pub fn stats(&self) -> SlaveStats {
        self.stats
    }

    /// Receive one frame from `transport`, process it and send the reply.
    pub fn serve_once<T: Transport>(&mut self, transport: &mut T) -> ModbusResult<SlaveOutcome> {
        let frame = transport.receive()?;
        let outcome = self.process(&frame);
        if let Some(reply) = outcome.reply() {
            transport.send(reply.as_slice())?;
        }
        Ok(outcome)
    }

    /// Process one received frame.
    pub fn process(&mut self, frame: &[u8]) -> SlaveOutcome {
        self.stats.frames_received += 1;
        let outcome = self.dispatch(frame);
        match &outcome {
            SlaveOutcome::Discarded(_) => self.stats.discarded += 1,
            SlaveOutcome::Ignored => self.stats.ignored += 1,
            SlaveOutcome::Broadcast(_) => self.stats.broadcasts += 1,
            SlaveOutcome::Response(_) => self.stats.responses += 1,
            SlaveOutcome::Exception { .. } => self.stats.exceptions += 1,
        }
        outcome
    }

    fn dispatch(&mut self, frame: &[u8]) -> SlaveOutcome {
        let raw = match decode_raw_request(frame) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Discarding frame ({} bytes): {}", frame.len(), e);
                return SlaveOutcome::Discarded(e);
            }
        };

        let broadcast = raw.device_id == BROADCAST_ADDRESS;
        if !broadcast && raw.device_id != self.config.device_address {
            debug!("Ignoring frame for device {}", raw.device_id);
            return SlaveOutcome::Ignored;
        }

        debug!(
            "Request: device={}, FC={:02X} ({}), addr={}, word={}",
            raw.device_id,
            raw.function_code,
            ModbusFunction::code_description(raw.function_code),
            raw.address,
            raw.word
        );

        let result = self.serve(&raw, broadcast);

        if broadcast {
            if let Err(e) = &result {
                warn!("Broadcast request rejected: {}", e);
            }
            return SlaveOutcome::Broadcast(result.err());
        }

        match result.and_then(|response| encode_response(&response)) {
            Ok(frame) => SlaveOutcome::Response(frame),
            Err(e) => self.exception(&raw, e),
        }
    }

    /// Validate, decode and execute. Returns the response packet.
    fn serve(&self, raw: &RawRequest<'_>, broadcast: bool) -> ModbusResult<Packet> {
        let function = raw.validate(&self.config.capacities)?;
        let request = raw.to_packet()?;

        if function == ModbusFunction::Diagnostics {
            return Self::diagnostics(&request);
        }
        if broadcast && function.is_read() {
            return Err(ModbusError::invalid_data(format!(
                "{} cannot be broadcast",
                function
            )));
        }

        let mut db = self.database.lock()?;
        Self::execute(&mut db, function, &request)
    }

    fn diagnostics(request: &Packet) -> ModbusResult<Packet> {
        match request.sub_function() {
            Some(DIAG_RETURN_QUERY_DATA) => Ok(Packet::response_to(request)),
            other => {
                warn!("Unsupported diagnostics sub-function {:?}", other);
                Err(ModbusError::invalid_function(request.function_code()))
            }
        }
    }

    fn execute(
        db: &mut RegisterDatabase,
        function: ModbusFunction,
        request: &Packet,
    ) -> ModbusResult<Packet> {
        let address = request.address();
        let quantity = request.quantity();
        let response = Packet::response_to(request);

        match (function, function.bank(), request.data()) {
            (_, Some(bank), _) if function.is_read() => {
                let data = if bank.is_bit() {
                    PacketData::from_bits(bank, db.read_bits(bank, address, quantity)?)
                } else {
                    PacketData::from_registers(bank, db.read_registers(bank, address, quantity)?)
                };
                Ok(response.with_payload(data))
            }
            (_, Some(bank), PacketData::Coils(bits)) => {
                db.write_bits(bank, address, bits)?;
                Ok(response.with_payload(request.data().clone()))
            }
            (_, Some(bank), PacketData::HoldingRegisters(regs)) => {
                db.write_registers(bank, address, regs)?;
                Ok(response.with_payload(request.data().clone()))
            }
            _ => Err(ModbusError::invalid_data(format!(
                "{} request without payload",
                function
            ))),
        }
    }

    fn exception(&self, raw: &RawRequest<'_>, error: ModbusError) -> SlaveOutcome {
        let code = error
            .exception_code()
            .unwrap_or(ExceptionCode::SlaveDeviceFailure);
        warn!(
            "Exception {} for FC={:02X}: {}",
            code, raw.function_code, error
        );
        match ExceptionResponse::new(self.config.device_address, raw.function_code, code).encode() {
            Ok(frame) => SlaveOutcome::Exception { code, frame },
            Err(e) => SlaveOutcome::Discarded(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adu::AduBuilder;
    use crate::config::BankCapacities;
    use crate::transport::MemoryTransport;

    fn slave() -> RtuSlave {
        let capacities = BankCapacities::new()
            .with_coils(16)
            .with_discrete_inputs(16)
            .with_input_registers(4)
            .with_holding_registers(4);
        RtuSlave::new(SlaveConfig::new(1).with_capacities(capacities)).unwrap()
    }

    fn seal(body: &[u8]) -> Vec<u8> {
        AduBuilder::new().data(body).unwrap().seal().unwrap().to_vec()
    }

    fn exception_code(outcome: &SlaveOutcome) -> Option<ExceptionCode> {
        match outcome {
            SlaveOutcome::Exception { code, .. } => Some(*code),
            _ => None,
        }
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        assert!(RtuSlave::new(SlaveConfig::new(0)).is_err());
        assert!(RtuSlave::new(SlaveConfig::new(247)).is_err());
    }

    #[test]
    fn test_read_holding_register() {
        let mut slave = slave();
        slave.database().with(|db| db.set_holding_register(1, 0x1234)).unwrap().unwrap();

        let outcome = slave.process(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x01, 0x84, 0x0A]);
        let reply = outcome.reply().unwrap();
        assert_eq!(&reply.as_slice()[..5], &[0x01, 0x03, 0x02, 0x12, 0x34]);
    }

    #[test]
    fn test_read_coils_packs_bits() {
        let mut slave = slave();
        slave
            .database()
            .with(|db| db.write_bits(crate::DataBank::Coils, 0, &[true, false, true]))
            .unwrap()
            .unwrap();

        let outcome = slave.process(&seal(&[0x01, 0x01, 0x00, 0x00, 0x00, 0x03]));
        assert_eq!(&outcome.reply().unwrap().as_slice()[..4], &[0x01, 0x01, 0x01, 0x05]);
    }

    #[test]
    fn test_corrupted_crc_discarded_without_reply() {
        let mut slave = slave();
        let outcome = slave.process(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x01, 0x84, 0x0B]);
        assert!(matches!(
            outcome,
            SlaveOutcome::Discarded(ModbusError::CrcMismatch { .. })
        ));
        assert!(outcome.reply().is_none());
        assert_eq!(slave.stats().discarded, 1);
    }

    #[test]
    fn test_other_device_ignored() {
        let mut slave = slave();
        let outcome = slave.process(&seal(&[0x02, 0x03, 0x00, 0x00, 0x00, 0x01]));
        assert_eq!(outcome, SlaveOutcome::Ignored);
    }

    #[test]
    fn test_exception_codes() {
        let mut slave = slave();
        let cases: [(&[u8], ExceptionCode); 6] = [
            (&[0x01, 0x42, 0x00, 0x00, 0x00, 0x01], ExceptionCode::IllegalFunction),
            (&[0x01, 0x03, 0x00, 0x04, 0x00, 0x01], ExceptionCode::IllegalDataAddress),
            (&[0x01, 0x03, 0x00, 0x00, 0x00, 0x05], ExceptionCode::IllegalDataValue),
            (&[0x01, 0x03, 0x00, 0x00, 0x00, 0x00], ExceptionCode::IllegalDataValue),
            (&[0x01, 0x05, 0x00, 0x00, 0x12, 0x34], ExceptionCode::IllegalDataValue),
            (&[0x01, 0x08, 0x01, 0x00, 0x00, 0x00, 0x00], ExceptionCode::IllegalFunction),
        ];
        for (body, expected) in cases {
            let outcome = slave.process(&seal(body));
            assert_eq!(exception_code(&outcome), Some(expected), "request {:02X?}", body);
        }
        assert_eq!(slave.stats().exceptions, 6);
    }

    #[test]
    fn test_exception_frame_layout() {
        let mut slave = slave();
        let outcome = slave.process(&seal(&[0x01, 0x03, 0x00, 0x09, 0x00, 0x01]));
        let frame = outcome.reply().unwrap();
        assert_eq!(&frame.as_slice()[..3], &[0x01, 0x83, 0x02]);
        assert_eq!(frame.len(), 5);
    }

    #[test]
    fn test_write_multiple_registers_then_read() {
        let mut slave = slave();
        let write = seal(&[0x01, 0x10, 0x00, 0x01, 0x00, 0x02, 0x04, 0x00, 0x0A, 0x00, 0x0B]);
        let outcome = slave.process(&write);
        assert_eq!(
            &outcome.reply().unwrap().as_slice()[..6],
            &[0x01, 0x10, 0x00, 0x01, 0x00, 0x02]
        );
        let values = slave
            .database()
            .with(|db| (db.holding_register(2), db.holding_register(3)))
            .unwrap();
        assert_eq!(values, (0x0A, 0x0B));
    }

    #[test]
    fn test_write_single_coil_echo() {
        let mut slave = slave();
        let request = seal(&[0x01, 0x05, 0x00, 0x0F, 0xFF, 0x00]);
        let outcome = slave.process(&request);
        assert_eq!(outcome.reply().unwrap().as_slice(), request.as_slice());
        assert!(slave.database().with(|db| db.coil(16)).unwrap());
    }

    #[test]
    fn test_diagnostics_echo() {
        let mut slave = slave();
        let request = seal(&[0x01, 0x08, 0x00, 0xA5, 0x37, 0x12, 0x34]);
        let outcome = slave.process(&request);
        assert_eq!(outcome.reply().unwrap().as_slice(), request.as_slice());
    }

    #[test]
    fn test_broadcast_write_executed_silently() {
        let mut slave = slave();
        let outcome = slave.process(&seal(&[0x00, 0x06, 0x00, 0x02, 0x00, 0x2A]));
        assert_eq!(outcome, SlaveOutcome::Broadcast(None));
        assert_eq!(slave.database().with(|db| db.holding_register(3)).unwrap(), 42);

        let rejected = slave.process(&seal(&[0x00, 0x06, 0x00, 0x09, 0x00, 0x2A]));
        assert!(matches!(rejected, SlaveOutcome::Broadcast(Some(_))));
        assert!(rejected.reply().is_none());

        let read = slave.process(&seal(&[0x00, 0x03, 0x00, 0x00, 0x00, 0x01]));
        assert!(matches!(read, SlaveOutcome::Broadcast(Some(_))));
    }

    #[test]
    fn test_failed_write_leaves_database_unchanged() {
        let mut slave = slave();
        // byte count says 2 registers, quantity says 3
        let outcome = slave.process(&seal(&[
            0x01, 0x10, 0x00, 0x00, 0x00, 0x03, 0x04, 0x00, 0x01, 0x00, 0x02,
        ]));
        assert_eq!(exception_code(&outcome), Some(ExceptionCode::IllegalDataValue));
        let untouched = slave
            .database()
            .with(|db| db.read_registers(crate::DataBank::HoldingRegisters, 0, 4))
            .unwrap()
            .unwrap();
        assert_eq!(untouched, vec![0; 4]);
    }

    #[test]
    fn test_with_database_checks_capacities() {
        let db = RegisterDatabase::new(BankCapacities::new().with_coils(8)).unwrap();
        let config = SlaveConfig::new(3).with_capacities(BankCapacities::new().with_coils(9));
        assert!(RtuSlave::with_database(config, db.into()).is_err());
    }

    #[test]
    fn test_serve_once_replies_through_transport() {
        let mut slave = slave();
        let mut transport = MemoryTransport::new();
        transport.push_incoming(vec![0x01, 0x06, 0x00, 0x00, 0x00, 0x01, 0x48, 0x0A]);
        transport.push_incoming(vec![0x01, 0x06, 0x00, 0x00, 0x00, 0x01, 0x48, 0x0B]);

        slave.serve_once(&mut transport).unwrap();
        slave.serve_once(&mut transport).unwrap();
        assert_eq!(
            transport.sent(),
            &[vec![0x01, 0x06, 0x00, 0x00, 0x00, 0x01, 0x48, 0x0A]]
        );
        assert!(slave.serve_once(&mut transport).is_err());
    }
}
