use std::time::Duration;

use super::{backoff::Backoff, connection::StreamError, message::InboundEvent};
use crate::{
    config::ReconnectConfig,
    notify::{Hooks, Severity},
    sse::Frame,
};

/// Lifecycle of the single logical connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// nothing created yet
    Disconnected,
    /// connection created, waiting for the stream to open
    Connecting,
    /// stream is open
    Open,
    /// connection torn down after a failure, a reconnect is scheduled
    Errored,
}

impl ConnectionState {
    /// Check if a connection object currently exists
    pub fn has_connection(&self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }
}

/// Side effect requested by a [`Session`] transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// create connection `generation`
    Open {
        /// connection generation
        generation: u64,
        /// id to resume after
        last_event_id: Option<String>,
    },
    /// close and discard connection `generation`
    Close {
        /// connection generation
        generation: u64,
    },
    /// call [`Session::on_reconnect_due`] after `delay`
    ScheduleReconnect {
        /// wait time
        delay: Duration,
    },
}

/// Realtime client state machine.
///
/// Holds no IO: every transition returns the [`Action`]s the caller must
/// execute, and reports to the [`Hooks`] synchronously. Events of a
/// connection other than the current one are ignored.
#[derive(Debug)]
pub struct Session {
    state: ConnectionState,
    backoff: Backoff,
    generation: u64,
    last_event_id: Option<String>,
    hooks: Hooks,
}

impl Session {
    /// Create a disconnected session
    pub fn new(hooks: Hooks, config: ReconnectConfig) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            backoff: Backoff::new(config),
            generation: 0,
            last_event_id: None,
            hooks,
        }
    }

    /// current state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// current reconnect attempt counter
    pub fn attempt(&self) -> u32 {
        self.backoff.attempt()
    }

    /// generation of the newest connection, 0 before the first one
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// last event id received on any connection
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    fn is_current(&self, generation: u64) -> bool {
        generation == self.generation && self.state.has_connection()
    }

    fn create(&mut self) -> Action {
        self.generation += 1;
        self.state = ConnectionState::Connecting;

        log::debug!("Create connection {}", self.generation);

        Action::Open {
            generation: self.generation,
            last_event_id: self.last_event_id.clone(),
        }
    }

    fn schedule_reconnect(&mut self) -> Action {
        let delay = self.backoff.next_delay();

        log::info!(
            "Reconnect attempt {} in {} ms",
            self.backoff.attempt(),
            delay.as_millis()
        );

        Action::ScheduleReconnect { delay }
    }

    /// Create a connection unless one already exists
    pub fn connect(&mut self) -> Option<Action> {
        if self.state.has_connection() {
            log::debug!(
                "Connection {} is {:?}, skip connect",
                self.generation,
                self.state
            );
            return None;
        }

        Some(self.create())
    }

    /// Connection `generation` opened
    pub fn on_open(&mut self, generation: u64) {
        if !self.is_current(generation) {
            log::debug!("Ignore open of stale connection {}", generation);
            return;
        }

        log::info!("Realtime connection {} established", generation);

        self.state = ConnectionState::Open;
        self.backoff.reset();
        self.hooks
            .notifier
            .notify("Real-time connection established", Severity::Success);
    }

    /// Connection `generation` delivered a frame
    pub fn on_frame(&mut self, generation: u64, frame: &Frame) {
        if !self.is_current(generation) || self.state != ConnectionState::Open {
            log::debug!("Ignore frame of stale connection {}", generation);
            return;
        }

        if self.last_event_id != frame.id {
            log::trace!("Last event id now {:?}", frame.id);
            self.last_event_id = frame.id.clone();
        }

        if let Some(retry) = frame.retry {
            log::debug!("Server suggests retry after {} ms, keep own backoff", retry);
        }

        if !frame.is_message() {
            log::debug!("Ignore {} event", frame.event);
            return;
        }

        if frame.is_empty() {
            return;
        }

        self.dispatch(InboundEvent::decode(&frame.data));
    }

    fn dispatch(&self, event: InboundEvent) {
        log::trace!("Dispatch inbound event: {:?}", event);

        self.hooks
            .notifier
            .notify(&event.notification(), Severity::Info);

        if let InboundEvent::ResumeUploaded(filename) = event {
            if let (Some(display), Some(filename)) = (&self.hooks.file_info, &filename) {
                display.show_uploaded_file(filename);
            }
            self.hooks.refresher.load_recent_uploads();
        }
    }

    /// Connection `generation` failed, tear it down and schedule a reconnect
    pub fn on_failure(&mut self, generation: u64, err: &StreamError) -> Vec<Action> {
        if !self.is_current(generation) {
            log::debug!("Ignore failure of stale connection {}: {}", generation, err);
            return vec![];
        }

        if err.is_construction() {
            log::error!("Connection {} creation failed: {}", generation, err);
        } else {
            log::warn!("Realtime connection {} error: {}", generation, err);
            self.hooks.notifier.notify(
                "Real-time connection lost — attempting to reconnect...",
                Severity::Warning,
            );
        }

        self.state = ConnectionState::Errored;

        vec![Action::Close { generation }, self.schedule_reconnect()]
    }

    /// A scheduled reconnect elapsed
    pub fn on_reconnect_due(&mut self) -> Option<Action> {
        if self.state.has_connection() {
            log::debug!(
                "Connection {} already exists, skip scheduled reconnect",
                self.generation
            );
            return None;
        }

        Some(self.create())
    }
}
