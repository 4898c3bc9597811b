use std::io::Write;

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

use domain::DeviceEvent;

/// Write each event as one JSON line until the channel closes.
///
/// Returns how many events were written. A lagging receiver skips the
/// events it missed and keeps going.
pub async fn stream_events<W: Write>(
    mut events: broadcast::Receiver<DeviceEvent>,
    out: &mut W,
) -> std::io::Result<usize> {
    let mut written = 0;
    loop {
        match events.recv().await {
            Ok(event) => {
                serde_json::to_writer(&mut *out, &event)?;
                out.write_all(b"\n")?;
                out.flush()?;
                written += 1;
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event watcher fell behind");
            }
            Err(RecvError::Closed) => return Ok(written),
        }
    }
}
