use std::pin::Pin;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::{CancellationToken, DropGuard};

use domain::DomainError;
use domain::driver::LineHandler;
use domain::protocol::Line;

use super::line_codec::LineCodec;

type BoxedWriter = Pin<Box<dyn AsyncWrite + Send>>;

/// Line framing over an open byte stream: a framed writer plus a
/// background reader that forwards every complete line to a handler.
///
/// The writer sits behind a mutex so the link is `Sync` without requiring
/// it of the stream. Dropping the link stops the reader.
pub struct StreamLink {
    writer: Mutex<FramedWrite<BoxedWriter, LineCodec>>,
    cancel: CancellationToken,
    reader: JoinHandle<()>,
    _stop_reader: DropGuard,
}

impl StreamLink {
    /// Split `stream` and start the background reader
    pub fn start<S>(stream: S, handler: Arc<dyn LineHandler>) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let frames = FramedRead::new(read_half, LineCodec::new());
        let writer: BoxedWriter = Box::pin(write_half);
        let cancel = CancellationToken::new();

        let reader = tokio::spawn(read_lines(frames, handler, cancel.clone()));

        Self {
            writer: Mutex::new(FramedWrite::new(writer, LineCodec::new())),
            _stop_reader: cancel.clone().drop_guard(),
            cancel,
            reader,
        }
    }

    pub async fn write_line(&mut self, line: &Line) -> Result<(), DomainError> {
        self.writer
            .get_mut()
            .send(line.clone())
            .await
            .map_err(|e| DomainError::Connection(format!("Write error: {}", e)))
    }

    /// Stop the reader and shut the write side down
    pub async fn shutdown(self) -> Result<(), DomainError> {
        self.cancel.cancel();
        if let Err(e) = self.reader.await {
            if e.is_panic() {
                tracing::error!(error = %e, "Line reader panicked");
            }
        }

        let mut writer = self.writer.into_inner().into_inner();
        writer
            .shutdown()
            .await
            .map_err(|e| DomainError::Connection(format!("Shutdown error: {}", e)))
    }

    pub fn is_reading(&self) -> bool {
        !self.reader.is_finished()
    }
}

async fn read_lines<R>(
    mut frames: FramedRead<R, LineCodec>,
    handler: Arc<dyn LineHandler>,
    cancel: CancellationToken,
) where
    R: AsyncRead + Unpin,
{
    let reason = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break None,
            next = frames.next() => match next {
                Some(Ok(line)) => handler.handle_line(line),
                Some(Err(e)) => break Some(format!("Read error: {}", e)),
                None => break Some("Stream closed by peer".to_string()),
            },
        }
    };
    handler.connection_lost(reason);
}
