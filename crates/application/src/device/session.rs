use std::sync::{Arc, RwLock, Weak};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use domain::driver::{ConnectionState, TransportFactory};
use domain::event::EventPublisher;
use domain::protocol::{Query, commands};
use domain::{DeviceEvent, DomainError, StatusField, StatusSnapshot, StatusValue};

use super::config::SessionConfig;
use super::status_board::StatusBoard;
use super::workers::{drain_loop, poll_loop};
use crate::query::QueryEngine;

/// Protocol-aware front of one bench supply.
///
/// While connected it polls the device, routes replies into the status
/// cache and notifies observers on change. Commands are fire-and-forget.
pub struct DeviceSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: SessionConfig,
    factory: Arc<dyn TransportFactory>,
    board: Arc<StatusBoard>,
    state: RwLock<ConnectionState>,
    link: Mutex<Option<ActiveLink>>,
}

/// Everything that lives exactly as long as one connection
struct ActiveLink {
    port: String,
    engine: Arc<QueryEngine>,
    stop: CancellationToken,
    /// Poll and drain loops. The supervisor exits on `stop` by itself.
    workers: Vec<JoinHandle<()>>,
}

impl DeviceSession {
    pub fn new(
        config: SessionConfig,
        factory: Arc<dyn TransportFactory>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                config,
                factory,
                board: Arc::new(StatusBoard::new(publisher)),
                state: RwLock::new(ConnectionState::Disconnected),
                link: Mutex::new(None),
            }),
        }
    }

    /// Open `port` and start the poll and drain loops
    pub async fn connect(&self, port: &str) -> Result<(), DomainError> {
        let inner = &self.inner;
        let mut link = inner.link.lock().await;
        let next = inner.state().to_connected().map_err(DomainError::InvalidState)?;
        inner.config.validate()?;

        info!(port = %port, baud_rate = inner.config.baud_rate, "Connecting");
        let transport = inner.factory.create(port, inner.config.baud_rate)?;
        debug!(driver = transport.driver_type().as_str(), "Transport created");
        let (engine, deliveries) =
            QueryEngine::open(transport, inner.config.delivery_queue_capacity).await?;
        let engine = Arc::new(engine);
        let stop = CancellationToken::new();

        let workers = vec![
            tokio::spawn(poll_loop(
                engine.clone(),
                inner.config.poll_interval(),
                inner.config.query_timeout(),
                stop.clone(),
            )),
            tokio::spawn(drain_loop(deliveries, inner.board.clone(), stop.clone())),
        ];
        tokio::spawn(supervise(
            Arc::downgrade(&self.inner),
            engine.clone(),
            stop.clone(),
        ));

        *link = Some(ActiveLink {
            port: port.to_string(),
            engine,
            stop,
            workers,
        });
        inner.set_state(next);

        // Still under the link lock: a teardown racing an early link loss
        // publishes its disconnect only after this
        info!(port = %port, "Connected");
        inner.board.publish(DeviceEvent::connected()).await;
        drop(link);
        Ok(())
    }

    /// Stop both loops and close the link. No-op when already disconnected.
    pub async fn disconnect(&self) -> Result<(), DomainError> {
        self.inner.teardown(None).await;
        Ok(())
    }

    pub async fn set_voltage(&self, volts: f64) -> Result<(), DomainError> {
        self.send(commands::set_voltage(volts)).await
    }

    pub async fn set_current(&self, amps: f64) -> Result<(), DomainError> {
        self.send(commands::set_current(amps)).await
    }

    pub async fn set_output(&self, enabled: bool) -> Result<(), DomainError> {
        self.send(commands::set_output(enabled)).await
    }

    /// Flip the output relative to the last polled state
    pub async fn toggle_output(&self) -> Result<bool, DomainError> {
        let enabled = !self
            .get_status(StatusField::OutputEnabled)
            .as_bool()
            .unwrap_or(false);
        self.set_output(enabled).await?;
        Ok(enabled)
    }

    /// Last polled value; never touches the link
    pub fn get_status(&self, field: StatusField) -> StatusValue {
        self.inner.board.get(field)
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.inner.board.snapshot()
    }

    /// Update the cache directly, notifying observers on change
    pub async fn set_status(&self, field: StatusField, value: StatusValue) -> bool {
        self.inner.board.set_status(field, value).await
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.state()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state().is_connected()
    }

    pub async fn port(&self) -> Option<String> {
        self.inner.link.lock().await.as_ref().map(|l| l.port.clone())
    }

    async fn send(&self, query: Query) -> Result<(), DomainError> {
        let engine = {
            let link = self.inner.link.lock().await;
            link.as_ref()
                .map(|l| l.engine.clone())
                .ok_or(DomainError::NotConnected)?
        };
        engine
            .submit(&query, self.inner.config.query_timeout())
            .await
            .map(|_| ())
    }
}

impl SessionInner {
    fn state(&self) -> ConnectionState {
        match self.state.read() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set_state(&self, next: ConnectionState) {
        match self.state.write() {
            Ok(mut state) => *state = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    /// Tear down the active link, if any. Returns whether there was one.
    async fn teardown(&self, reason: Option<String>) -> bool {
        let mut link = self.link.lock().await;
        let Some(active) = link.take() else {
            return false;
        };

        active.stop.cancel();
        if let Err(e) = active.engine.close().await {
            warn!(port = %active.port, error = %e, "Error closing link");
        }
        for worker in active.workers {
            worker.abort();
        }
        self.set_state(self.state().to_disconnected());
        drop(link);

        match &reason {
            Some(reason) => error!(port = %active.port, reason = %reason, "Link lost"),
            None => info!(port = %active.port, "Disconnected"),
        }
        self.board.publish(DeviceEvent::disconnected(reason)).await;
        true
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        if let Some(active) = self.link.get_mut().take() {
            active.stop.cancel();
            active.engine.cancel();
            for worker in active.workers {
                worker.abort();
            }
        }
    }
}

/// Watch the link and tear the session down if the transport fails
async fn supervise(session: Weak<SessionInner>, engine: Arc<QueryEngine>, stop: CancellationToken) {
    tokio::select! {
        biased;
        _ = stop.cancelled() => {}
        _ = engine.closed() => {
            let reason = engine
                .lost_reason()
                .unwrap_or_else(|| "Link closed unexpectedly".to_string());
            drop(engine);
            if let Some(session) = session.upgrade() {
                session.teardown(Some(reason)).await;
            }
        }
    }
}
