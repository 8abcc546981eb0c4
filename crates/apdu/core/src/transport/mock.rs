//! In-memory transports and device managers for tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;

use super::{CardTransport, DeviceManager, TransportError};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Scripted transport returning queued responses in order
///
/// When a single response remains it is repeated for every further command.
#[derive(Debug, Clone)]
pub struct MockTransport {
    /// Mock responses to return
    pub responses: VecDeque<Bytes>,
    /// Commands that were sent
    pub commands: Vec<Bytes>,
    /// Whether the transport is connected
    pub connected: bool,
    /// ATR reported for the simulated card
    pub atr: Bytes,
    /// Number of transactions begun
    pub transactions_begun: usize,
    /// Number of transactions ended
    pub transactions_ended: usize,
}

impl MockTransport {
    /// Create a new mock transport with the given responses
    pub fn new(responses: Vec<Bytes>) -> Self {
        Self {
            responses: responses.into(),
            commands: Vec::new(),
            connected: true,
            atr: Bytes::from_static(&[0x3B, 0x98, 0x13, 0x40, 0x0A, 0xA5, 0x03, 0x01, 0x01, 0x01, 0xAD, 0x13, 0x11]),
            transactions_begun: 0,
            transactions_ended: 0,
        }
    }

    /// Create a new mock transport that always returns the given response
    pub fn with_response(response: Bytes) -> Self {
        Self::new(vec![response])
    }

    /// Create a new mock transport that always returns success (90 00)
    pub fn with_success() -> Self {
        Self::with_response(Bytes::from_static(&[0x90, 0x00]))
    }

    /// Whether every begun transaction was also ended
    pub const fn transactions_balanced(&self) -> bool {
        self.transactions_begun == self.transactions_ended
    }
}

impl CardTransport for MockTransport {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        if !self.connected {
            return Err(TransportError::Connection);
        }

        self.commands.push(Bytes::copy_from_slice(command));

        // Either clone the single response or take the next one
        match self.responses.len() {
            0 => Err(TransportError::Transmission),
            1 => Ok(self.responses[0].clone()),
            _ => self.responses.pop_front().ok_or(TransportError::Transmission),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn atr(&self) -> Result<Bytes, TransportError> {
        Ok(self.atr.clone())
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        self.connected = true;
        self.commands.clear();
        Ok(())
    }

    fn begin_transaction(&mut self) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::Connection);
        }
        self.transactions_begun += 1;
        Ok(())
    }

    fn end_transaction(&mut self) -> Result<(), TransportError> {
        self.transactions_ended += 1;
        Ok(())
    }
}

/// Device manager over a set of named, in-memory readers
///
/// Clones share the same readers, so a test can keep one handle to insert
/// and remove cards while another is owned by the code under test.
#[derive(Debug)]
pub struct MockDeviceManager<T> {
    readers: Arc<Mutex<Vec<(String, Option<T>)>>>,
}

impl<T> Clone for MockDeviceManager<T> {
    fn clone(&self) -> Self {
        Self {
            readers: Arc::clone(&self.readers),
        }
    }
}

impl<T> Default for MockDeviceManager<T> {
    fn default() -> Self {
        Self {
            readers: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T: CardTransport + Clone + 'static> MockDeviceManager<T> {
    /// Create a manager without readers
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an empty reader
    pub fn with_reader(self, name: &str) -> Self {
        self.lock().push((name.to_string(), None));
        self
    }

    /// Add a reader holding `card`
    pub fn with_card(self, name: &str, card: T) -> Self {
        self.lock().push((name.to_string(), Some(card)));
        self
    }

    /// Insert `card` into `reader`, adding the reader if needed
    pub fn insert_card(&self, reader: &str, card: T) {
        let mut readers = self.lock();
        match readers.iter_mut().find(|(name, _)| name == reader) {
            Some((_, slot)) => *slot = Some(card),
            None => readers.push((reader.to_string(), Some(card))),
        }
    }

    /// Remove the card from `reader`
    pub fn remove_card(&self, reader: &str) {
        if let Some((_, slot)) = self.lock().iter_mut().find(|(name, _)| name == reader) {
            *slot = None;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(String, Option<T>)>> {
        self.readers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn card_present(&self, reader: &str) -> Result<bool, TransportError> {
        self.lock()
            .iter()
            .find(|(name, _)| name == reader)
            .map(|(_, slot)| slot.is_some())
            .ok_or_else(|| TransportError::ReaderNotFound(reader.to_string()))
    }

    fn wait_until(&self, reader: &str, timeout: Duration, present: bool) -> Result<bool, TransportError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.card_present(reader)? == present {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl<T: CardTransport + Clone + 'static> DeviceManager for MockDeviceManager<T> {
    type Transport = T;

    fn reader_names(&self) -> Result<Vec<String>, TransportError> {
        Ok(self.lock().iter().map(|(name, _)| name.clone()).collect())
    }

    fn connect(&self, reader: &str) -> Result<T, TransportError> {
        match self.lock().iter().find(|(name, _)| name == reader) {
            Some((_, Some(card))) => Ok(card.clone()),
            Some((_, None)) => Err(TransportError::NoCard(reader.to_string())),
            None => Err(TransportError::ReaderNotFound(reader.to_string())),
        }
    }

    fn wait_for_card_present(&self, reader: &str, timeout: Duration) -> Result<bool, TransportError> {
        self.wait_until(reader, timeout, true)
    }

    fn wait_for_card_absent(&self, reader: &str, timeout: Duration) -> Result<bool, TransportError> {
        self.wait_until(reader, timeout, false)
    }
}
