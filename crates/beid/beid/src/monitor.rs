//! Card presence monitoring
//!
//! A background thread polls the readers with bounded waits, keeps the
//! shared session connected to the inserted card and reports each change
//! over a channel. The thread ends when the monitor is stopped or dropped,
//! or when the event receiver is dropped.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use beid_apdu_core::{DeviceManager, TransportError};
use bytes::Bytes;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, unbounded};
use tracing::{debug, info, trace, warn};

use crate::config::BeIdConfig;
use crate::session::SharedSession;

/// Card insertion or removal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardEvent {
    /// A card was inserted and the session connected to it
    Inserted {
        /// Reader name
        reader: String,
        /// ATR of the inserted card
        atr: Bytes,
    },
    /// The connected card was removed and the session disconnected
    Removed {
        /// Reader name
        reader: String,
    },
}

/// Receiver for card events
pub type CardEventReceiver = Receiver<CardEvent>;

/// Handle on the presence monitoring thread
#[derive(Debug)]
pub struct PresenceMonitor {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PresenceMonitor {
    /// Start monitoring the readers of `manager` for `session`
    pub fn spawn<M>(
        manager: Arc<M>,
        session: SharedSession<M::Transport>,
        config: &BeIdConfig,
    ) -> (Self, CardEventReceiver)
    where
        M: DeviceManager + 'static,
    {
        let (events, receiver) = unbounded();
        let (stop, stopped) = unbounded();

        let worker = Worker {
            manager,
            session,
            events,
            stopped,
            present_wait: config.card_present_wait,
            absent_wait: config.card_absent_wait,
            read_settle_delay: config.read_settle_delay,
        };
        let handle = thread::spawn(move || worker.run());

        let monitor = Self {
            stop: Some(stop),
            handle: Some(handle),
        };
        (monitor, receiver)
    }

    /// Whether the monitoring thread is still running
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the monitoring thread and wait for it to finish
    pub fn stop(&mut self) {
        self.stop.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("Presence monitor thread panicked");
        }
    }
}

impl Drop for PresenceMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker<M: DeviceManager> {
    manager: Arc<M>,
    session: SharedSession<M::Transport>,
    events: Sender<CardEvent>,
    stopped: Receiver<()>,
    present_wait: Duration,
    absent_wait: Duration,
    read_settle_delay: Duration,
}

impl<M: DeviceManager> Worker<M> {
    fn run(self) {
        debug!("Presence monitor started");
        while !self.is_stopped() && self.poll().is_continue() {}
        debug!("Presence monitor stopped");
    }

    fn is_stopped(&self) -> bool {
        !matches!(self.stopped.try_recv(), Err(TryRecvError::Empty))
    }

    fn poll(&self) -> ControlFlow<()> {
        // Copied out so no wait happens under the lock
        let connected = self.session.lock().reader_name().map(str::to_string);
        match connected {
            Some(reader) => self.wait_for_removal(reader),
            None => self.wait_for_insertion(),
        }
    }

    fn wait_for_insertion(&self) -> ControlFlow<()> {
        let readers = match self.manager.reader_names() {
            Ok(readers) => readers,
            Err(TransportError::NoReaders) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Listing readers failed");
                Vec::new()
            }
        };
        if readers.is_empty() {
            trace!("No readers");
            return self.pause(self.present_wait);
        }

        for reader in readers {
            if self.is_stopped() {
                return ControlFlow::Break(());
            }
            match self.manager.wait_for_card_present(&reader, self.present_wait) {
                Ok(true) => return self.card_inserted(reader),
                Ok(false) => {}
                Err(e) => warn!(reader, error = %e, "Waiting for a card failed"),
            }
        }
        ControlFlow::Continue(())
    }

    fn wait_for_removal(&self, reader: String) -> ControlFlow<()> {
        match self.manager.wait_for_card_absent(&reader, self.absent_wait) {
            Ok(false) => ControlFlow::Continue(()),
            Ok(true) | Err(TransportError::ReaderNotFound(_)) => self.card_removed(reader),
            Err(e) => {
                warn!(reader, error = %e, "Waiting for card removal failed");
                self.pause(self.absent_wait)
            }
        }
    }

    fn card_inserted(&self, reader: String) -> ControlFlow<()> {
        let connected = self
            .session
            .lock()
            .connect_reader(&*self.manager, &reader, self.read_settle_delay)
            .map(|card| card.atr().clone());

        match connected {
            Ok(atr) => {
                info!(reader, "Card inserted");
                self.send(CardEvent::Inserted { reader, atr })
            }
            Err(e) => {
                warn!(reader, error = %e, "Connecting to inserted card failed");
                self.pause(self.present_wait)
            }
        }
    }

    fn card_removed(&self, reader: String) -> ControlFlow<()> {
        {
            let mut session = self.session.lock();
            if session.reader_name() == Some(reader.as_str()) {
                session.disconnect();
            }
        }
        info!(reader, "Card removed");
        self.send(CardEvent::Removed { reader })
    }

    fn send(&self, event: CardEvent) -> ControlFlow<()> {
        if self.events.send(event).is_err() {
            debug!("Event receiver dropped");
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }

    /// Sleep for `duration` unless stopped first
    fn pause(&self, duration: Duration) -> ControlFlow<()> {
        match self.stopped.recv_timeout(duration) {
            Err(RecvTimeoutError::Timeout) => ControlFlow::Continue(()),
            _ => ControlFlow::Break(()),
        }
    }
}
