use std::task::Poll;

use bytes::{Buf, BytesMut};
use futures_util::{ready, Stream, StreamExt};
use snafu::{prelude::*, IntoError};

/// Event name used when a frame has no `event` field
pub static DEFAULT_EVENT_NAME: &str = "message";

/// Longest line accepted before the stream is considered broken
pub const MAX_LINE_LENGTH: usize = 1024 * 1024;

static BOM: &[u8] = b"\xEF\xBB\xBF";

/// Error when read frame stream
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)), module(error), context(suffix(false)))]
pub enum FrameStreamError {
    /// underlying http body stream broken
    #[snafu(display("underlying body stream broken: {source}"))]
    Body {
        /// source error
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// a line grew past the limit without a line ending
    #[snafu(display("line longer than {limit} bytes"))]
    LineTooLong {
        /// the limit
        limit: usize,
    },
}

/// One dispatched server-sent event
///
/// An event that only carries an `id:` field is delivered with empty `data`,
/// so the last event id is never lost. Such frames have nothing to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// event name, `message` if the server did not name it
    pub event: String,
    /// data lines joined by `\n`
    pub data: String,
    /// last event id of the stream when the frame was dispatched,
    /// `None` after the server reset it with an empty `id:`
    pub id: Option<String>,
    /// reconnection time hint (milliseconds) received since the previous frame
    pub retry: Option<u64>,
}

impl Frame {
    /// Check if the frame would reach an `onmessage` handler
    pub fn is_message(&self) -> bool {
        self.event == DEFAULT_EVENT_NAME
    }

    /// Check if the frame carries no payload, only an id update
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Decode a `text/event-stream` byte stream into [`Frame`]s.
///
/// Chunks may split lines anywhere, lines end with LF, CRLF or a lone CR.
/// A leading byte order mark is skipped. Bytes that are not valid UTF-8 are
/// replaced, an unterminated frame at the end of the body is discarded.
#[derive(Debug)]
pub struct FrameStream<S> {
    inner: S,
    buffer: BytesMut,
    event: Option<String>,
    data: String,
    last_id: Option<String>,
    id_seen: bool,
    retry: Option<u64>,
    bom_checked: bool,
    skip_lf: bool,
    eof: bool,
    terminated: bool,
}

impl<S> FrameStream<S> {
    /// Wrap a stream of body chunks
    pub fn new(inner: S) -> Self {
        Self::resume(inner, None)
    }

    /// Wrap a stream of body chunks of a connection resumed after `last_event_id`
    pub fn resume(inner: S, last_event_id: Option<String>) -> Self {
        Self {
            inner,
            buffer: BytesMut::with_capacity(4096),
            event: None,
            data: String::new(),
            last_id: last_event_id,
            id_seen: false,
            retry: None,
            bom_checked: false,
            skip_lf: false,
            eof: false,
            terminated: false,
        }
    }

    fn strip_bom(&mut self) -> bool {
        if self.bom_checked {
            return true;
        }
        let n = self.buffer.len().min(BOM.len());
        if self.buffer[..n] != BOM[..n] {
            self.bom_checked = true;
        } else if n == BOM.len() {
            self.buffer.advance(n);
            self.bom_checked = true;
        } else if self.eof {
            self.bom_checked = true;
        }
        self.bom_checked
    }

    fn next_line(&mut self) -> Option<BytesMut> {
        if !self.strip_bom() {
            return None;
        }

        // LF right after a CR that ended the previous line
        if self.skip_lf && !self.buffer.is_empty() {
            if self.buffer[0] == b'\n' {
                self.buffer.advance(1);
            }
            self.skip_lf = false;
        }

        let pos = self
            .buffer
            .iter()
            .position(|&b| b == b'\n' || b == b'\r')?;

        self.skip_lf = self.buffer[pos] == b'\r';
        let mut line = self.buffer.split_to(pos + 1);
        line.truncate(pos);
        Some(line)
    }

    fn process_line(&mut self, line: &[u8]) -> Option<Frame> {
        if line.is_empty() {
            return self.dispatch();
        }

        let line = String::from_utf8_lossy(line);
        if line.starts_with(':') {
            log::trace!("Skip comment line: {}", line);
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (&*line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => {
                self.data.push_str(value);
                self.data.push('\n');
            }
            "id" => {
                if !value.contains('\0') {
                    self.last_id = (!value.is_empty()).then(|| value.to_string());
                    self.id_seen = true;
                }
            }
            "retry" => {
                if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
                    self.retry = value.parse().ok();
                }
            }
            _ => log::trace!("Ignore unknown field {}", field),
        }

        None
    }

    fn dispatch(&mut self) -> Option<Frame> {
        let event = self.event.take();
        let id_seen = std::mem::take(&mut self.id_seen);

        if self.data.is_empty() {
            if !id_seen {
                return None;
            }
            log::trace!("Id only event, last event id now {:?}", self.last_id);
        }

        let mut data = std::mem::take(&mut self.data);
        data.pop(); // trailing \n

        Some(Frame {
            event: event.unwrap_or_else(|| DEFAULT_EVENT_NAME.to_string()),
            data,
            id: self.last_id.clone(),
            retry: self.retry.take(),
        })
    }
}

impl<S, B, E> Stream for FrameStream<S>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Item = Result<Frame, FrameStreamError>;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        if self.terminated {
            return Poll::Ready(None);
        }

        loop {
            while let Some(line) = self.next_line() {
                if let Some(frame) = self.process_line(&line) {
                    return Poll::Ready(Some(Ok(frame)));
                }
            }

            if self.eof {
                if !self.buffer.is_empty() || !self.data.is_empty() {
                    log::debug!("Body ended inside a frame, discard it");
                }
                self.terminated = true;
                return Poll::Ready(None);
            }

            if self.buffer.len() > MAX_LINE_LENGTH {
                self.terminated = true;
                return Poll::Ready(Some(
                    error::LineTooLong {
                        limit: MAX_LINE_LENGTH,
                    }
                    .fail(),
                ));
            }

            match ready!(self.inner.poll_next_unpin(cx)) {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(chunk.as_ref()),
                Some(Err(e)) => {
                    self.terminated = true;
                    return Poll::Ready(Some(Err(error::Body.into_error(e.into()))));
                }
                None => self.eof = true,
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bytes::Bytes;
    use futures_util::stream;

    async fn decode(chunks: &[&'static str]) -> Vec<Frame> {
        let chunks = chunks
            .iter()
            .map(|c| Ok::<_, std::io::Error>(Bytes::from_static(c.as_bytes())))
            .collect::<Vec<_>>();

        FrameStream::new(stream::iter(chunks))
            .map(|r| r.unwrap())
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_single_data_frame() {
        let frames = decode(&["data: {\"update\": \"hi\"}\n\n"]).await;

        assert_eq!(
            frames,
            vec![Frame {
                event: "message".to_string(),
                data: "{\"update\": \"hi\"}".to_string(),
                id: None,
                retry: None,
            }]
        );
        assert!(frames[0].is_message());
    }

    #[tokio::test]
    async fn test_multi_line_data_and_crlf() {
        let frames = decode(&["data: first\r\ndata:second\r\n\r\n"]).await;

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "first\nsecond");
    }

    #[tokio::test]
    async fn test_lone_cr_split_across_chunks() {
        let frames = decode(&["data: a\r", "\ndata: b\r", "\r", "data: c\n\n"]).await;

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].data, "a\nb");
        assert_eq!(frames[1].data, "c");
    }

    #[tokio::test]
    async fn test_line_split_across_chunks() {
        let frames = decode(&["da", "ta: resu", "me.pdf\n", "\n"]).await;

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "resume.pdf");
    }

    #[tokio::test]
    async fn test_comments_and_empty_frames_are_skipped() {
        let frames = decode(&[": keep-alive\n\n", "event: ping\n\n", "data: x\n\n"]).await;

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "x");
        assert!(frames[0].is_message());
    }

    #[tokio::test]
    async fn test_event_name_id_and_retry() {
        let frames = decode(&[
            "event: progress\nid: 7\nretry: 1500\ndata: 50%\n\n",
            "data: done\n\n",
        ])
        .await;

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].event, "progress");
        assert!(!frames[0].is_message());
        assert_eq!(frames[0].id.as_deref(), Some("7"));
        assert_eq!(frames[0].retry, Some(1500));

        // id persists, event name and retry do not
        assert_eq!(frames[1].event, "message");
        assert_eq!(frames[1].id.as_deref(), Some("7"));
        assert_eq!(frames[1].retry, None);
    }

    #[tokio::test]
    async fn test_invalid_retry_is_ignored() {
        let frames = decode(&["retry: soon\ndata: x\n\n"]).await;
        assert_eq!(frames[0].retry, None);
    }

    #[tokio::test]
    async fn test_unterminated_frame_is_discarded() {
        let frames = decode(&["data: complete\n\n", "data: partial\n"]).await;

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "complete");
    }

    #[tokio::test]
    async fn test_body_error_ends_stream() {
        let chunks = vec![
            Ok(Bytes::from_static(b"data: one\n\n")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            Ok(Bytes::from_static(b"data: two\n\n")),
        ];

        let results = FrameStream::new(stream::iter(chunks)).collect::<Vec<_>>().await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap().data, "one");
        assert!(matches!(results[1], Err(FrameStreamError::Body { .. })));
    }

    #[tokio::test]
    async fn test_frame_ending_with_lone_cr_is_not_held_back() {
        let chunks = stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from_static(
            b"data: x\r\r",
        ))])
        .chain(stream::pending());
        let mut frames = FrameStream::new(chunks);

        let frame = tokio::time::timeout(std::time::Duration::from_millis(200), frames.next())
            .await
            .expect("frame must be delivered without waiting for more bytes")
            .unwrap()
            .unwrap();
        assert_eq!(frame.data, "x");
    }

    #[tokio::test]
    async fn test_id_only_event_updates_last_id() {
        let frames = decode(&["data: a\nid: 1\n\nid: 2\n\n"]).await;

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].data, "a");
        assert_eq!(frames[0].id.as_deref(), Some("1"));
        assert!(frames[1].is_empty());
        assert_eq!(frames[1].id.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_empty_id_resets_last_id() {
        let chunks = vec![Ok::<_, std::io::Error>(Bytes::from_static(
            b"data: a\n\nid\ndata: b\n\n",
        ))];
        let frames = FrameStream::resume(stream::iter(chunks), Some("5".to_string()))
            .map(|r| r.unwrap())
            .collect::<Vec<_>>()
            .await;

        assert_eq!(frames[0].id.as_deref(), Some("5"));
        assert_eq!(frames[1].data, "b");
        assert_eq!(frames[1].id, None);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let chunks = vec![Ok::<_, std::io::Error>(Bytes::from_static(
            b"data: caf\xff\n\n",
        ))];
        let frames = FrameStream::new(stream::iter(chunks))
            .map(|r| r.unwrap())
            .collect::<Vec<_>>()
            .await;

        assert_eq!(frames[0].data, "caf\u{FFFD}");
    }

    #[tokio::test]
    async fn test_leading_bom_is_skipped() {
        let chunks = vec![
            Ok::<_, std::io::Error>(Bytes::from_static(b"\xEF\xBB")),
            Ok(Bytes::from_static(b"\xBFdata: first\n\n")),
        ];
        let frames = FrameStream::new(stream::iter(chunks))
            .map(|r| r.unwrap())
            .collect::<Vec<_>>()
            .await;

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "first");
    }

    #[tokio::test]
    async fn test_overlong_line_breaks_stream() {
        let chunk = Bytes::from(vec![b'a'; MAX_LINE_LENGTH + 1]);
        let chunks = vec![Ok::<_, std::io::Error>(chunk)];

        let results = FrameStream::new(stream::iter(chunks).chain(stream::pending()))
            .collect::<Vec<_>>()
            .await;

        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0],
            Err(FrameStreamError::LineTooLong { .. })
        ));
    }
}
