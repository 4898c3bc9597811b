use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use domain::DomainError;
use domain::driver::{LineHandler, LineTransport};
use domain::protocol::{Line, MatchedExchange, Query};

/// Default quiescence timeout for a reply
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(3);

/// Whole milliseconds in `duration`, saturating instead of truncating
pub(crate) fn as_millis_u64(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Serializes access to one half-duplex line link and pairs every query
/// with the next inbound line.
///
/// The exchange slot is held for the whole round trip (write, then wait for
/// the reply or the timeout), so at most one exchange is pending on the link
/// and replies resolve in submission order.
pub struct QueryEngine {
    exchange: Mutex<ExchangeSlot>,
    delivery: mpsc::Sender<MatchedExchange>,
    link: LinkStatus,
}

struct ExchangeSlot {
    transport: Box<dyn LineTransport>,
    inbound: mpsc::UnboundedReceiver<Line>,
}

/// Cancellation shared between the engine, its callers and the reader callback
#[derive(Clone)]
struct LinkStatus {
    token: CancellationToken,
    reason: Arc<StdMutex<Option<String>>>,
}

impl LinkStatus {
    fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            reason: Arc::new(StdMutex::new(None)),
        }
    }

    fn fail(&self, reason: Option<String>) {
        if let Some(reason) = reason {
            if let Ok(mut slot) = self.reason.lock() {
                slot.get_or_insert(reason);
            }
        }
        self.token.cancel();
    }

    fn reason(&self) -> Option<String> {
        self.reason.lock().ok().and_then(|r| r.clone())
    }

    fn error(&self) -> DomainError {
        DomainError::Connection(self.reason().unwrap_or_else(|| "Link closed".to_string()))
    }
}

/// Forwards reader frames into the engine's inbound channel
struct InboundForwarder {
    lines: mpsc::UnboundedSender<Line>,
    link: LinkStatus,
}

impl LineHandler for InboundForwarder {
    fn handle_line(&self, line: Line) {
        debug!(line = %line, "Inbound line");
        if self.lines.send(line).is_err() {
            debug!("Inbound line dropped, engine gone");
        }
    }

    fn connection_lost(&self, reason: Option<String>) {
        match &reason {
            Some(reason) => warn!(reason = %reason, "Link lost"),
            None => debug!("Link reader stopped"),
        }
        self.link.fail(reason);
    }
}

impl QueryEngine {
    /// Open `transport` and return the engine plus the receiving end of its
    /// delivery queue. The queue holds at most `delivery_capacity` exchanges.
    pub async fn open(
        mut transport: Box<dyn LineTransport>,
        delivery_capacity: usize,
    ) -> Result<(Self, mpsc::Receiver<MatchedExchange>), DomainError> {
        let (lines_tx, lines_rx) = mpsc::unbounded_channel();
        let (delivery_tx, delivery_rx) = mpsc::channel(delivery_capacity.max(1));
        let link = LinkStatus::new();

        let handler = Arc::new(InboundForwarder {
            lines: lines_tx,
            link: link.clone(),
        });
        transport.open(handler).await?;

        let engine = Self {
            exchange: Mutex::new(ExchangeSlot {
                transport,
                inbound: lines_rx,
            }),
            delivery: delivery_tx,
            link,
        };
        Ok((engine, delivery_rx))
    }

    /// Write `query` and, if it expects a reply, wait up to `timeout` for it.
    ///
    /// Returns `Ok(None)` for fire-and-forget commands. A successful reply is
    /// also pushed onto the delivery queue as a [`MatchedExchange`].
    pub async fn submit(&self, query: &Query, timeout: Duration) -> Result<Option<Line>, DomainError> {
        let line = Line::new(query.text())?;

        let mut slot = tokio::select! {
            biased;
            _ = self.link.token.cancelled() => return Err(self.link.error()),
            slot = self.exchange.lock() => slot,
        };
        if self.link.token.is_cancelled() {
            return Err(self.link.error());
        }

        // Anything already queued was not asked for by this query: a reply
        // that missed its deadline or unsolicited device output.
        while let Ok(stale) = slot.inbound.try_recv() {
            warn!(query = %query.text(), stale = %stale, "Discarding unclaimed line");
        }

        if let Err(e) = slot.transport.write_line(&line).await {
            self.link.fail(Some(e.to_string()));
            return Err(e);
        }
        debug!(query = %query.text(), "Query written");

        if !query.expects_response() {
            return Ok(None);
        }

        let reply = tokio::select! {
            biased;
            _ = self.link.token.cancelled() => return Err(self.link.error()),
            reply = tokio::time::timeout(timeout, slot.inbound.recv()) => reply,
        };

        match reply {
            Ok(Some(reply)) => {
                self.deliver(MatchedExchange::new(query.text(), reply.clone()));
                Ok(Some(reply))
            }
            Ok(None) => {
                self.link.fail(Some("Inbound line stream ended".to_string()));
                Err(self.link.error())
            }
            Err(_) => {
                let timeout_ms = as_millis_u64(timeout);
                warn!(query = %query.text(), timeout_ms, "Query timed out");
                Err(DomainError::QueryTimeout {
                    query: query.text().to_string(),
                    timeout_ms,
                })
            }
        }
    }

    fn deliver(&self, exchange: MatchedExchange) {
        match self.delivery.try_send(exchange) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                warn!(
                    query = %dropped.query_text(),
                    response = %dropped.response(),
                    "Delivery queue full, dropping exchange"
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Delivery queue closed, exchange discarded");
            }
        }
    }

    /// Fail every pending and future [`submit`](Self::submit) without touching the transport
    pub fn cancel(&self) {
        self.link.fail(None);
    }

    /// Cancel pending exchanges, then close the transport
    pub async fn close(&self) -> Result<(), DomainError> {
        self.cancel();
        let mut slot = self.exchange.lock().await;
        if slot.transport.is_open() {
            slot.transport.close().await?;
        }
        Ok(())
    }

    /// Resolves once the link is closed or lost
    pub async fn closed(&self) {
        self.link.token.cancelled().await
    }

    pub fn is_closed(&self) -> bool {
        self.link.token.is_cancelled()
    }

    /// Why the link went down, if it was lost rather than closed
    pub fn lost_reason(&self) -> Option<String> {
        self.link.reason()
    }
}

impl Drop for QueryEngine {
    fn drop(&mut self) {
        self.link.token.cancel();
    }
}
