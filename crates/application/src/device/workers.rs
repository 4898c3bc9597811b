use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use domain::{MatchedExchange, StatusQuery};

use super::status_board::StatusBoard;
use crate::query::{QueryEngine, as_millis_u64};

/// Issue the fixed battery of status queries every `period` until stopped.
///
/// Replies are not consumed here; they reach the drain loop through the
/// engine's delivery queue.
pub(crate) async fn poll_loop(
    engine: Arc<QueryEngine>,
    period: Duration,
    query_timeout: Duration,
    stop: CancellationToken,
) {
    info!(period_ms = as_millis_u64(period), "Starting poll loop");
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            _ = timer.tick() => {}
        }

        for query in StatusQuery::POLL_ORDER {
            if stop.is_cancelled() {
                break;
            }
            match engine.submit(&query.to_query(), query_timeout).await {
                Ok(_) => {}
                Err(e) if e.is_recoverable() => {
                    warn!(query = %query.as_str(), error = %e, "Poll query failed");
                }
                Err(e) => {
                    debug!(error = %e, "Poll loop stopping");
                    return;
                }
            }
        }
    }
    debug!("Poll loop stopped");
}

/// Dequeue matched exchanges and apply them to the status board until stopped
pub(crate) async fn drain_loop(
    mut deliveries: mpsc::Receiver<MatchedExchange>,
    board: Arc<StatusBoard>,
    stop: CancellationToken,
) {
    loop {
        let exchange = tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            next = deliveries.recv() => match next {
                Some(exchange) => exchange,
                None => break,
            },
        };
        board.apply(&exchange).await;
    }
    debug!("Drain loop stopped");
}
