//! UI facing collaborators of the realtime client.

use std::{
    fmt::{Debug, Display},
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};

/// How long a notification stays on the board before it is dropped
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(5);

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// plain information
    Info,
    /// something finished well
    Success,
    /// degraded, recovering automatically
    Warning,
    /// failed
    Error,
}

impl Severity {
    /// name used as css modifier, e.g. `notification-warning`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sink for transient user visible messages.
pub trait Notifier: Send + Sync {
    /// show a message
    fn notify(&self, message: &str, severity: Severity);
}

impl<F> Notifier for F
where
    F: Fn(&str, Severity) + Send + Sync,
{
    fn notify(&self, message: &str, severity: Severity) {
        self(message, severity)
    }
}

/// Reloads the list of recently uploaded resumes.
pub trait UploadsRefresher: Send + Sync {
    /// trigger a reload, result is not reported back
    fn load_recent_uploads(&self);
}

impl<F> UploadsRefresher for F
where
    F: Fn() + Send + Sync,
{
    fn load_recent_uploads(&self) {
        self()
    }
}

/// Element showing the name of the last uploaded file.
pub trait FileInfoDisplay: Send + Sync {
    /// replace displayed file name
    fn show_uploaded_file(&self, filename: &str);
}

impl<F> FileInfoDisplay for F
where
    F: Fn(&str) + Send + Sync,
{
    fn show_uploaded_file(&self, filename: &str) {
        self(filename)
    }
}

/// Collaborators the realtime client reports to
#[derive(Clone)]
pub struct Hooks {
    /// notification sink
    pub notifier: Arc<dyn Notifier>,
    /// recent uploads refresh callback
    pub refresher: Arc<dyn UploadsRefresher>,
    /// uploaded file display, absent when the page has no such element
    pub file_info: Option<Arc<dyn FileInfoDisplay>>,
}

impl Hooks {
    /// Create hooks without a file info display
    pub fn new(notifier: Arc<dyn Notifier>, refresher: Arc<dyn UploadsRefresher>) -> Self {
        Self {
            notifier,
            refresher,
            file_info: None,
        }
    }

    /// Attach a file info display
    pub fn with_file_info(mut self, display: Arc<dyn FileInfoDisplay>) -> Self {
        self.file_info = Some(display);
        self
    }
}

impl Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("file_info", &self.file_info.is_some())
            .finish_non_exhaustive()
    }
}

/// Notifier writing every message to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Info | Severity::Success => log::info!("[{}] {}", severity, message),
            Severity::Warning => log::warn!("{}", message),
            Severity::Error => log::error!("{}", message),
        }
    }
}

/// A notification on the board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// board unique id, used to dismiss it
    pub id: u64,
    /// message text
    pub message: String,
    /// severity
    pub severity: Severity,
    /// when it was shown
    pub created_at: Instant,
}

impl Notification {
    /// Check if the notification outlived [`NOTIFICATION_TTL`] at `now`
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) >= NOTIFICATION_TTL
    }
}

#[derive(Debug, Default)]
struct BoardInner {
    next_id: u64,
    items: Vec<Notification>,
}

/// In memory notification container.
///
/// Notifications disappear after [`NOTIFICATION_TTL`] or when dismissed.
#[derive(Debug, Default)]
pub struct NotificationBoard {
    inner: Mutex<BoardInner>,
}

impl NotificationBoard {
    /// Show a message now, returns its id
    pub fn push(&self, message: &str, severity: Severity) -> u64 {
        self.push_at(message, severity, Instant::now())
    }

    /// Show a message as if created at `created_at`, returns its id
    pub fn push_at(&self, message: &str, severity: Severity, created_at: Instant) -> u64 {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.next_id += 1;
        let id = inner.next_id;
        inner.items.push(Notification {
            id,
            message: message.to_string(),
            severity,
            created_at,
        });
        id
    }

    /// Close a notification, returns false if it is already gone
    pub fn dismiss(&self, id: u64) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let before = inner.items.len();
        inner.items.retain(|n| n.id != id);
        inner.items.len() != before
    }

    /// Drop expired notifications and return the rest, oldest first
    pub fn active(&self, now: Instant) -> Vec<Notification> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.items.retain(|n| !n.is_expired(now));
        inner.items.clone()
    }
}

impl Notifier for NotificationBoard {
    fn notify(&self, message: &str, severity: Severity) {
        let id = self.push(message, severity);
        log::trace!("Notification {} shown: {}", id, message);
    }
}
