use std::sync::Arc;

use futures_util::StreamExt;
use snafu::{prelude::*, IntoError};
use tokio::sync::mpsc;

use crate::sse::{ConnectError, Connector, Frame, FrameStreamError};

/// Error ending a connection
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module(error), context(suffix(false)))]
pub enum StreamError {
    /// the connection could not be opened
    #[snafu(display("open update stream failed: {source}"))]
    Connect {
        /// source error
        source: ConnectError,
    },

    /// the open connection broke
    #[snafu(display("update stream broken: {source}"))]
    Frame {
        /// source error
        source: FrameStreamError,
    },

    /// the server closed the stream
    #[snafu(display("update stream closed by server"))]
    Ended,
}

impl StreamError {
    /// Check if the connection object itself could not be created
    pub fn is_construction(&self) -> bool {
        matches!(self, Self::Connect { source } if source.is_construction())
    }
}

/// What a connection task observed
#[derive(Debug)]
pub(crate) enum ReportKind {
    Opened,
    Frame(Frame),
    Failed(StreamError),
}

/// Report of a connection task, tagged with the connection generation
#[derive(Debug)]
pub(crate) struct Report {
    pub generation: u64,
    pub kind: ReportKind,
}

/// Open one connection and forward everything it yields until it fails.
///
/// Always finishes with exactly one `Failed` report unless the receiver is
/// gone or the task is aborted.
pub(crate) async fn run_connection(
    connector: Arc<dyn Connector>,
    generation: u64,
    last_event_id: Option<String>,
    reports: mpsc::UnboundedSender<Report>,
) {
    let send = |kind| reports.send(Report { generation, kind }).is_ok();

    log::debug!("Connection {} start", generation);

    let mut frames = match connector
        .open(last_event_id.as_deref())
        .await
        .context(error::Connect)
    {
        Ok(frames) => frames,
        Err(err) => {
            log::debug!("Connection {} open failed: {}", generation, err);
            send(ReportKind::Failed(err));
            return;
        }
    };

    if !send(ReportKind::Opened) {
        log::debug!("Driver dropped, connection {} stop", generation);
        return;
    }

    loop {
        let kind = match frames.next().await {
            Some(Ok(frame)) => {
                log::trace!("Connection {} received {} frame", generation, frame.event);
                ReportKind::Frame(frame)
            }
            Some(Err(err)) => ReportKind::Failed(error::Frame.into_error(err)),
            None => ReportKind::Failed(error::Ended.build()),
        };

        let failed = matches!(kind, ReportKind::Failed(_));
        if !send(kind) || failed {
            break;
        }
    }

    log::debug!("Connection {} stop", generation);
}
