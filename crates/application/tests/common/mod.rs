#![allow(dead_code)]

use async_trait::async_trait;
use domain::driver::{DriverType, LineHandler, LineTransport, TransportFactory};
use domain::event::EventPublisher;
use domain::{DeviceEvent, DomainError, Line};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

// --- Infrastructure Mocks (Ports) ---

#[derive(Default)]
struct MockState {
    handler: Option<Arc<dyn LineHandler>>,
    written: Vec<String>,
    replies: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    fail_writes: bool,
    fail_open: bool,
    lose_on_open: Option<String>,
}

/// Scriptable far end of a line link, shared by the test and the transport
#[derive(Clone, Default)]
pub struct MockDevice {
    state: Arc<Mutex<MockState>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply `reply` whenever `query` is written
    pub fn reply(&self, query: &str, reply: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .replies
            .insert(query.to_string(), reply.to_string());
        self
    }

    /// Stop answering `query`
    pub fn silence(&self, query: &str) -> &Self {
        self.state.lock().unwrap().replies.remove(query);
        self
    }

    pub fn delay(&self, query: &str, delay: Duration) -> &Self {
        self.state
            .lock()
            .unwrap()
            .delays
            .insert(query.to_string(), delay);
        self
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }

    pub fn fail_open(&self, fail: bool) {
        self.state.lock().unwrap().fail_open = fail;
    }

    /// Drop the link as soon as it opens, like a port that vanishes on connect
    pub fn lose_on_open(&self, reason: &str) {
        self.state.lock().unwrap().lose_on_open = Some(reason.to_string());
    }

    /// Replies to every status query with a fixed, plausible reading
    pub fn answer_status(&self, output: &str, volts: f64, amps: f64) -> &Self {
        self.reply(":OUTP?", output)
            .reply(":MEAS:CURR?", &format!("{:.3}", amps))
            .reply(":MEAS:VOLT?", &format!("{:.3}", volts))
            .reply(":CURR?", &format!("{:.3}", amps))
            .reply(":VOLT?", &format!("{:.3}", volts))
    }

    pub fn written(&self) -> Vec<String> {
        self.state.lock().unwrap().written.clone()
    }

    pub fn clear_written(&self) {
        self.state.lock().unwrap().written.clear();
    }

    /// Push a line the device sent on its own
    pub fn push_line(&self, text: &str) {
        let handler = self.state.lock().unwrap().handler.clone();
        if let Some(handler) = handler {
            handler.handle_line(Line::new(text).unwrap());
        }
    }

    /// Simulate the cable being pulled
    pub fn lose_link(&self, reason: &str) {
        let handler = self.state.lock().unwrap().handler.take();
        if let Some(handler) = handler {
            handler.connection_lost(Some(reason.to_string()));
        }
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().unwrap().handler.is_some()
    }

    pub fn transport(&self) -> Box<dyn LineTransport> {
        Box::new(MockTransport {
            device: self.clone(),
        })
    }
}

pub struct MockTransport {
    device: MockDevice,
}

#[async_trait]
impl LineTransport for MockTransport {
    async fn open(&mut self, handler: Arc<dyn LineHandler>) -> Result<(), DomainError> {
        let lost = {
            let mut state = self.device.state.lock().unwrap();
            if state.fail_open {
                return Err(DomainError::Connection("Simulated open failure".to_string()));
            }
            state.handler = Some(handler);
            state.lose_on_open.take()
        };
        if let Some(reason) = lost {
            self.device.lose_link(&reason);
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DomainError> {
        let handler = self.device.state.lock().unwrap().handler.take();
        if let Some(handler) = handler {
            handler.connection_lost(None);
        }
        Ok(())
    }

    async fn write_line(&mut self, line: &Line) -> Result<(), DomainError> {
        let (handler, reply, delay) = {
            let mut state = self.device.state.lock().unwrap();
            if state.fail_writes {
                return Err(DomainError::Connection("Simulated write failure".to_string()));
            }
            let handler = state
                .handler
                .clone()
                .ok_or_else(|| DomainError::Connection("Not open".to_string()))?;
            state.written.push(line.as_str().to_string());
            (
                handler,
                state.replies.get(line.as_str()).cloned(),
                state.delays.get(line.as_str()).copied(),
            )
        };

        if let Some(reply) = reply {
            let reply = Line::new(reply).unwrap();
            match delay {
                Some(delay) => {
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        handler.handle_line(reply);
                    });
                }
                None => handler.handle_line(reply),
            }
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.device.is_open()
    }

    fn driver_type(&self) -> DriverType {
        DriverType::Simulator
    }
}

pub struct MockFactory {
    pub device: MockDevice,
    pub ports: Mutex<Vec<(String, u32)>>,
}

impl MockFactory {
    pub fn new(device: MockDevice) -> Arc<Self> {
        Arc::new(Self {
            device,
            ports: Mutex::new(Vec::new()),
        })
    }
}

impl TransportFactory for MockFactory {
    fn create(&self, port: &str, baud_rate: u32) -> Result<Box<dyn LineTransport>, DomainError> {
        self.ports
            .lock()
            .unwrap()
            .push((port.to_string(), baud_rate));
        Ok(self.device.transport())
    }
}

pub struct MockEventPublisher {
    tx: mpsc::UnboundedSender<DeviceEvent>,
    connect_delay: Option<Duration>,
}

impl MockEventPublisher {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<DeviceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                tx,
                connect_delay: None,
            }),
            rx,
        )
    }

    /// Observer that is slow to accept `connected: true` events
    pub fn with_connect_delay(
        delay: Duration,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<DeviceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                tx,
                connect_delay: Some(delay),
            }),
            rx,
        )
    }
}

#[async_trait]
impl EventPublisher for MockEventPublisher {
    async fn publish(
        &self,
        event: DeviceEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let (Some(delay), DeviceEvent::ConnectionChanged { connected: true, .. }) =
            (self.connect_delay, &event)
        {
            tokio::time::sleep(delay).await;
        }
        let _ = self.tx.send(event);
        Ok(())
    }
}

/// Everything published so far, without waiting
pub fn drain_events(rx: &mut mpsc::UnboundedReceiver<DeviceEvent>) -> Vec<DeviceEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
