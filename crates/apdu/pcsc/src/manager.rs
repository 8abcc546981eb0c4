//! Device manager for PC/SC operations

use std::ffi::CString;
use std::fmt;
use std::time::Duration;

use beid_apdu_core::{DeviceManager, TransportError};
use pcsc::{Context, ReaderState, Scope, State};
use tracing::trace;

use crate::config::PcscConfig;
use crate::error::PcscError;
use crate::reader::{PcscReader, card_present};
use crate::transport::PcscTransport;

/// Manager for PC/SC device operations
pub struct PcscDeviceManager {
    /// PC/SC context
    context: Context,
    /// Configuration handed to every transport opened by this manager
    config: PcscConfig,
}

impl fmt::Debug for PcscDeviceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscDeviceManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PcscDeviceManager {
    /// Create a new PC/SC device manager
    pub fn new() -> Result<Self, PcscError> {
        Self::with_config(PcscConfig::default())
    }

    /// Create a new PC/SC device manager whose transports use `config`
    pub fn with_config(config: PcscConfig) -> Result<Self, PcscError> {
        let context = Context::establish(Scope::User)?;
        Ok(Self { context, config })
    }

    /// List all available card readers
    pub fn list_readers(&self) -> Result<Vec<PcscReader>, PcscError> {
        let readers = match self.context.list_readers_owned() {
            Ok(readers) => readers,
            Err(pcsc::Error::NoReadersAvailable) => return Err(PcscError::NoReadersAvailable),
            Err(e) => return Err(e.into()),
        };
        if readers.is_empty() {
            return Err(PcscError::NoReadersAvailable);
        }

        let mut result = Vec::with_capacity(readers.len());

        for reader_name in readers {
            let mut reader_states = [ReaderState::new(reader_name.clone(), State::UNAWARE)];

            match self.context.get_status_change(None, &mut reader_states) {
                Ok(()) => result.push(PcscReader::from_reader_state(&reader_states[0])),
                Err(_) => {
                    // If we can't get status, assume no card
                    result.push(PcscReader::new(
                        reader_name.to_string_lossy().into_owned(),
                        false,
                        None,
                    ));
                }
            }
        }

        Ok(result)
    }

    /// Open a connection to a specific reader with custom configuration
    pub fn open_reader_with_config(
        &self,
        reader_name: &str,
        config: PcscConfig,
    ) -> Result<PcscTransport, PcscError> {
        PcscTransport::new(self.context.clone(), reader_name, config)
    }

    /// Wait up to `timeout` for the card presence in `reader` to equal `present`
    fn wait_for_presence(
        &self,
        reader: &str,
        timeout: Duration,
        present: bool,
    ) -> Result<bool, PcscError> {
        let name = CString::new(reader).map_err(|_| PcscError::ReaderNotFound(reader.to_string()))?;
        let mut states = [ReaderState::new(name, State::UNAWARE)];

        // Learn the current state first; UNAWARE makes this return immediately
        self.status_change(Some(Duration::ZERO), &mut states, reader)?;
        if card_present(states[0].event_state()) == present {
            return Ok(true);
        }

        states[0].sync_current_state();
        match self.context.get_status_change(Some(timeout), &mut states) {
            Ok(()) => {}
            Err(pcsc::Error::Timeout) => {
                trace!(reader, present, "Presence wait timed out");
                return Ok(false);
            }
            Err(e) => return Err(self.reader_error(e, reader)),
        }

        Ok(card_present(states[0].event_state()) == present)
    }

    fn status_change(
        &self,
        timeout: Option<Duration>,
        states: &mut [ReaderState],
        reader: &str,
    ) -> Result<(), PcscError> {
        match self.context.get_status_change(timeout, states) {
            Ok(()) | Err(pcsc::Error::Timeout) => Ok(()),
            Err(e) => Err(self.reader_error(e, reader)),
        }
    }

    fn reader_error(&self, error: pcsc::Error, reader: &str) -> PcscError {
        match error {
            pcsc::Error::UnknownReader | pcsc::Error::ReaderUnavailable => {
                PcscError::ReaderNotFound(reader.to_string())
            }
            e => e.into(),
        }
    }
}

impl DeviceManager for PcscDeviceManager {
    type Transport = PcscTransport;

    fn reader_names(&self) -> Result<Vec<String>, TransportError> {
        match self.context.list_readers_owned() {
            Ok(readers) => Ok(readers
                .into_iter()
                .map(|name| name.to_string_lossy().into_owned())
                .collect()),
            Err(pcsc::Error::NoReadersAvailable) => Ok(Vec::new()),
            Err(e) => Err(PcscError::from(e).into()),
        }
    }

    fn connect(&self, reader: &str) -> Result<PcscTransport, TransportError> {
        self.open_reader_with_config(reader, self.config.clone())
            .map_err(Into::into)
    }

    fn wait_for_card_present(
        &self,
        reader: &str,
        timeout: Duration,
    ) -> Result<bool, TransportError> {
        self.wait_for_presence(reader, timeout, true)
            .map_err(Into::into)
    }

    fn wait_for_card_absent(
        &self,
        reader: &str,
        timeout: Duration,
    ) -> Result<bool, TransportError> {
        self.wait_for_presence(reader, timeout, false)
            .map_err(Into::into)
    }
}
