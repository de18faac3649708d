//! Transport collaborator
//!
//! The protocol core never touches a serial port. Roles hand complete frames
//! to a [`Transport`] and take complete frames back from it; inter-frame
//! timing and framing on the wire belong to the implementation.
//!
//! Two in-memory implementations ship with the crate:
//!
//! - [`MemoryTransport`]: scripted inbound frames, records outbound frames.
//! - [`LoopbackTransport`]: passes every sent frame to a handler (usually a
//!   slave) and queues whatever it answers.

use std::collections::VecDeque;

use tracing::trace;

use crate::error::{ModbusError, ModbusResult};

/// Frame-level link to the bus.
pub trait Transport {
    /// Put one complete frame on the bus.
    fn send(&mut self, frame: &[u8]) -> ModbusResult<()>;

    /// Take the next complete frame off the bus.
    ///
    /// Returns [`ModbusError::Transport`] when nothing arrives.
    fn receive(&mut self) -> ModbusResult<Vec<u8>>;

    /// Traffic counters.
    fn stats(&self) -> TransportStats {
        TransportStats::default()
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, frame: &[u8]) -> ModbusResult<()> {
        (**self).send(frame)
    }

    fn receive(&mut self) -> ModbusResult<Vec<u8>> {
        (**self).receive()
    }

    fn stats(&self) -> TransportStats {
        (**self).stats()
    }
}

/// Transport layer statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    pub frames_sent: u64,
    pub frames_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    /// Receive calls that found nothing.
    pub timeouts: u64,
}

impl TransportStats {
    fn record_sent(&mut self, frame: &[u8]) {
        self.frames_sent += 1;
        self.bytes_sent += frame.len() as u64;
    }

    fn record_received(&mut self, frame: &[u8]) {
        self.frames_received += 1;
        self.bytes_received += frame.len() as u64;
    }
}

/// Scripted transport.
///
/// ```rust
/// use modbus_rtu_core::{MemoryTransport, Transport};
///
/// let mut transport = MemoryTransport::new();
/// transport.push_incoming(vec![0x01, 0x83, 0x02, 0xC0, 0xF1]);
/// assert_eq!(transport.receive().unwrap(), vec![0x01, 0x83, 0x02, 0xC0, 0xF1]);
/// assert!(transport.receive().is_err());
///
/// transport.send(&[0x01, 0x03]).unwrap();
/// assert_eq!(transport.sent(), &[vec![0x01, 0x03]]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemoryTransport {
    incoming: VecDeque<Vec<u8>>,
    sent: Vec<Vec<u8>>,
    stats: TransportStats,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a frame for a later `receive`.
    pub fn push_incoming(&mut self, frame: impl Into<Vec<u8>>) {
        self.incoming.push_back(frame.into());
    }

    /// Frames sent so far, oldest first.
    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    /// Drain the record of sent frames.
    pub fn take_sent(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.sent)
    }

    pub fn pending(&self) -> usize {
        self.incoming.len()
    }
}

impl Transport for MemoryTransport {
    fn send(&mut self, frame: &[u8]) -> ModbusResult<()> {
        trace!("TX {:02X?}", frame);
        self.stats.record_sent(frame);
        self.sent.push(frame.to_vec());
        Ok(())
    }

    fn receive(&mut self) -> ModbusResult<Vec<u8>> {
        match self.incoming.pop_front() {
            Some(frame) => {
                trace!("RX {:02X?}", frame);
                self.stats.record_received(&frame);
                Ok(frame)
            }
            None => {
                self.stats.timeouts += 1;
                Err(ModbusError::transport("no frame received"))
            }
        }
    }

    fn stats(&self) -> TransportStats {
        self.stats
    }
}

/// Transport that answers each sent frame through a handler.
///
/// The handler returns the reply frame, or `None` when the far end stays
/// silent (discarded frame, broadcast, other device).
pub struct LoopbackTransport<F>
where
    F: FnMut(&[u8]) -> Option<Vec<u8>>,
{
    handler: F,
    replies: VecDeque<Vec<u8>>,
    stats: TransportStats,
}

impl<F> LoopbackTransport<F>
where
    F: FnMut(&[u8]) -> Option<Vec<u8>>,
{
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            replies: VecDeque::new(),
            stats: TransportStats::default(),
        }
    }
}

impl<F> Transport for LoopbackTransport<F>
where
    F: FnMut(&[u8]) -> Option<Vec<u8>>,
{
    fn send(&mut self, frame: &[u8]) -> ModbusResult<()> {
        self.stats.record_sent(frame);
        if let Some(reply) = (self.handler)(frame) {
            self.replies.push_back(reply);
        }
        Ok(())
    }

    fn receive(&mut self) -> ModbusResult<Vec<u8>> {
        match self.replies.pop_front() {
            Some(frame) => {
                self.stats.record_received(&frame);
                Ok(frame)
            }
            None => {
                self.stats.timeouts += 1;
                Err(ModbusError::transport("no reply from loopback handler"))
            }
        }
    }

    fn stats(&self) -> TransportStats {
        self.stats
    }
}
