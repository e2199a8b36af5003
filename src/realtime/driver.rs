use std::sync::Arc;

use futures_util::{stream::FuturesUnordered, StreamExt};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::Sleep,
};

use super::{
    connection::{run_connection, Report, ReportKind},
    session::{Action, ConnectionState, Session},
};
use crate::{config::ReconnectConfig, notify::Hooks, sse::Connector};

#[derive(Debug)]
enum Command {
    Connect,
}

#[derive(Debug)]
struct ConnectionTask {
    generation: u64,
    handle: JoinHandle<()>,
}

struct Driver {
    session: Session,
    connector: Arc<dyn Connector>,
    commands: mpsc::UnboundedReceiver<Command>,
    reports_tx: mpsc::UnboundedSender<Report>,
    reports_rx: mpsc::UnboundedReceiver<Report>,
    state: watch::Sender<ConnectionState>,
    current: Option<ConnectionTask>,
    timers: FuturesUnordered<Sleep>,
}

impl Driver {
    fn apply<I>(&mut self, actions: I)
    where
        I: IntoIterator<Item = Action>,
    {
        for action in actions {
            log::trace!("Apply {:?}", action);

            match action {
                Action::Open {
                    generation,
                    last_event_id,
                } => {
                    if let Some(old) = self.current.take() {
                        old.handle.abort();
                    }
                    let handle = tokio::spawn(run_connection(
                        self.connector.clone(),
                        generation,
                        last_event_id,
                        self.reports_tx.clone(),
                    ));
                    self.current = Some(ConnectionTask { generation, handle });
                }
                Action::Close { generation } => match self.current.take() {
                    Some(task) if task.generation == generation => {
                        log::debug!("Close connection {}", generation);
                        task.handle.abort();
                    }
                    other => self.current = other,
                },
                Action::ScheduleReconnect { delay } => {
                    self.timers.push(tokio::time::sleep(delay));
                }
            }
        }
    }

    fn handle_report(&mut self, report: Report) {
        let Report { generation, kind } = report;

        match kind {
            ReportKind::Opened => self.session.on_open(generation),
            ReportKind::Frame(frame) => self.session.on_frame(generation, &frame),
            ReportKind::Failed(err) => {
                let actions = self.session.on_failure(generation, &err);
                self.apply(actions);
            }
        }
    }

    async fn run(mut self) {
        log::debug!("Realtime driver start");

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Connect) => {
                        let action = self.session.connect();
                        self.apply(action);
                    }
                    None => {
                        log::debug!("Client handle dropped, stop");
                        break;
                    }
                },

                Some(report) = self.reports_rx.recv() => self.handle_report(report),

                Some(()) = self.timers.next(), if !self.timers.is_empty() => {
                    let action = self.session.on_reconnect_due();
                    self.apply(action);
                }
            }

            let state = self.session.state();
            self.state.send_if_modified(|current| {
                let changed = *current != state;
                *current = state;
                changed
            });
        }

        if let Some(task) = self.current.take() {
            task.handle.abort();
        }
    }
}

/// Handle of the realtime update client.
///
/// All state lives in a background task, this handle only sends commands to
/// it. Dropping the handle stops the task and closes the live connection.
#[derive(Debug)]
pub struct RealtimeClient {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
}

impl RealtimeClient {
    /// Start the client task, must be called inside a tokio runtime.
    ///
    /// Nothing is connected until [`connect`](Self::connect) is called.
    pub fn spawn(connector: Arc<dyn Connector>, hooks: Hooks, config: ReconnectConfig) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let driver = Driver {
            session: Session::new(hooks, config),
            connector,
            commands: commands_rx,
            reports_tx,
            reports_rx,
            state: state_tx,
            current: None,
            timers: FuturesUnordered::new(),
        };

        tokio::spawn(driver.run());

        Self {
            commands: commands_tx,
            state: state_rx,
        }
    }

    /// Connect unless a connection already exists, returns immediately
    pub fn connect(&self) {
        if self.commands.send(Command::Connect).is_err() {
            log::warn!("Realtime driver stopped, connect ignored");
        }
    }

    /// current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// subscribe connection state changes
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }
}
