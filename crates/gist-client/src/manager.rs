//! Persistent-connection lifecycle.
//!
//! # Architecture
//!
//! ```text
//! ConnectionManager (handle) ──Command──┐
//! reader task ──Transport(tagged)───────┤
//! retry timer ──RetryElapsed(ticket)────┼──> mpsc ──> ManagerTask
//! heartbeat timer ──HeartbeatExpired────┘              │
//!                                                      ├─ RetryHelper
//!                                                      ├─ HeartbeatTimer
//!                                                      ├─ ConnectionService
//!                                                      ├─ Poller
//!                                                      └─ Store::dispatch
//! ```
//!
//! All connection state is owned by one task and mutated only while it
//! handles a command, so commands are applied one at a time in arrival
//! order. Timers and readers are separate tasks that only post commands
//! back; each command carries the generation or ticket it was created under
//! and is dropped if that is no longer current.

use std::{sync::Arc, time::Duration};

use gist_core::{
    ConnectionError, ConnectionState, Environment, Generation, GenerationTagged, HeartbeatTicket,
    HeartbeatTimer, RetryDecision, RetryHelper, RetryStep, RetryTicket,
};
use gist_proto::{parse_heartbeat_timeout, parse_message_batch};
use gist_store::{Action, Store};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    ClientError, ConnectionService, GatewayConfig, PollingApi, Poller, Transport, TransportEvent, config::headers,
};

/// SSE event carrying a JSON array of messages.
pub const EVENT_MESSAGES: &str = "messages";
/// SSE event carrying the heartbeat window.
pub const EVENT_HEARTBEAT: &str = "heartbeat";
/// SSE event asking the client to reconnect.
pub const EVENT_TTL_EXCEEDED: &str = "ttl_exceeded";

/// Snapshot of the manager's connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStatus {
    /// Lifecycle state.
    pub state: ConnectionState,
    /// Generation of the latest connection attempt.
    pub generation: Generation,
    /// Whether the polling fallback is running.
    pub polling: bool,
    /// Retries consumed in the current failure streak.
    pub retry_count: u32,
}

#[derive(Debug)]
enum Command {
    Start,
    Stop,
    Status(oneshot::Sender<ConnectionStatus>),
    Shutdown(oneshot::Sender<()>),
    Transport(GenerationTagged<TransportEvent>),
    RetryElapsed(RetryTicket),
    HeartbeatExpired(HeartbeatTicket),
}

/// Clonable handle to the connection manager task.
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    commands: mpsc::Sender<Command>,
}

impl ConnectionManager {
    /// Spawn the manager task on the current tokio runtime.
    pub fn spawn<E: Environment>(
        env: E,
        config: GatewayConfig,
        store: Arc<Store>,
        transport: Arc<dyn Transport>,
        polling: Arc<dyn PollingApi>,
    ) -> Self {
        let config = Arc::new(config);
        let (tx, rx) = mpsc::channel(config.command_buffer.max(1));
        let session_id = env.session_id();

        let task = ManagerTask {
            service: ConnectionService::new(transport, Arc::clone(&config)),
            retry: RetryHelper::new(config.retry),
            env,
            config,
            store,
            polling_api: polling,
            poller: Poller::new(),
            commands: tx.clone(),
            state: ConnectionState::Disconnected,
            generation: Generation::default(),
            heartbeat: HeartbeatTimer::new(),
            retry_timer: None,
            heartbeat_timer: None,
            session_id,
            last_event_id: String::new(),
        };
        tokio::spawn(task.run(rx));

        Self { commands: tx }
    }

    /// Open the persistent connection. No-op while connecting or connected.
    pub async fn start_connection(&self) -> Result<(), ClientError> {
        self.send(Command::Start).await
    }

    /// Close the persistent connection and stop polling. Idempotent.
    pub async fn stop_connection(&self) -> Result<(), ClientError> {
        self.send(Command::Stop).await
    }

    /// Current connection status.
    pub async fn status(&self) -> Result<ConnectionStatus, ClientError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Status(tx)).await?;
        rx.await.map_err(|_| ClientError::ManagerStopped)
    }

    /// Stop everything and end the manager task.
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Shutdown(tx)).await?;
        rx.await.map_err(|_| ClientError::ManagerStopped)
    }

    async fn send(&self, command: Command) -> Result<(), ClientError> {
        self.commands.send(command).await.map_err(|_| ClientError::ManagerStopped)
    }
}

struct ManagerTask<E: Environment> {
    env: E,
    config: Arc<GatewayConfig>,
    store: Arc<Store>,
    service: ConnectionService,
    polling_api: Arc<dyn PollingApi>,
    poller: Poller,
    commands: mpsc::Sender<Command>,
    state: ConnectionState,
    generation: Generation,
    retry: RetryHelper,
    heartbeat: HeartbeatTimer,
    retry_timer: Option<JoinHandle<()>>,
    heartbeat_timer: Option<JoinHandle<()>>,
    session_id: String,
    last_event_id: String,
}

impl<E: Environment> ManagerTask<E> {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        while let Some(command) = commands.recv().await {
            match command {
                Command::Start => self.start(),
                Command::Stop => self.stop(),
                Command::Status(reply) => {
                    let _ = reply.send(self.status());
                },
                Command::Shutdown(reply) => {
                    self.stop();
                    let _ = reply.send(());
                    break;
                },
                Command::Transport(tagged) => self.on_transport(tagged).await,
                Command::RetryElapsed(ticket) => {
                    if let Some(decision) = self.retry.delay_elapsed(ticket) {
                        self.on_decision(decision);
                    } else {
                        debug!(generation = %ticket.generation(), "stale retry ignored");
                    }
                },
                Command::HeartbeatExpired(ticket) => self.on_heartbeat_expired(ticket),
            }
        }
        debug!("connection manager exited");
    }

    fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            state: self.state,
            generation: self.generation,
            polling: self.poller.is_active(),
            retry_count: self.retry.retry_count(),
        }
    }

    fn start(&mut self) {
        if self.state.is_active() {
            debug!(generation = %self.generation, state = %self.state, "start ignored: already active");
            return;
        }
        self.open(true);
    }

    /// Open a stream under a new generation.
    ///
    /// `new_streak` zeroes the retry count; retry-driven reopens keep it.
    fn open(&mut self, new_streak: bool) {
        self.generation = self.generation.next();
        let generation = self.generation;

        if new_streak {
            self.retry.set_active_generation(generation);
        } else {
            self.retry.adopt_generation(generation);
        }
        cancel(&mut self.retry_timer);
        self.reset_heartbeat();
        self.poller.stop();

        let request = match self.service.request(&self.store.state(), &self.session_id) {
            Ok(mut request) => {
                if !self.last_event_id.is_empty() {
                    request.headers.push((headers::LAST_EVENT_ID.to_string(), self.last_event_id.clone()));
                }
                request
            },
            Err(error) => {
                warn!(%generation, %error, "cannot build connection request");
                self.state = ConnectionState::Connecting;
                self.fail(&ConnectionError::Rejected(error.to_string()));
                return;
            },
        };

        info!(%generation, "connecting");
        self.state = ConnectionState::Connecting;
        self.service.start(generation, request, self.commands.clone(), Command::Transport);
    }

    fn stop(&mut self) {
        if self.state == ConnectionState::Disconnected && !self.poller.is_active() && self.retry_timer.is_none() {
            debug!("stop ignored: already stopped");
            return;
        }

        let generation = self.generation;
        self.state = ConnectionState::Disconnecting;
        self.service.stop(generation);
        self.retry.reset(generation);
        cancel(&mut self.retry_timer);
        self.reset_heartbeat();
        self.poller.stop();
        self.last_event_id.clear();
        self.state = ConnectionState::Disconnected;
        info!(%generation, "disconnected");
    }

    async fn on_transport(&mut self, tagged: GenerationTagged<TransportEvent>) {
        if !tagged.is_current(self.generation) {
            debug!(generation = %tagged.generation, active = %self.generation, "stale transport event ignored");
            return;
        }
        if !self.state.is_active() {
            debug!(generation = %tagged.generation, state = %self.state, "transport event after stop ignored");
            return;
        }

        match tagged.value {
            TransportEvent::Opened => {
                info!(generation = %self.generation, "connected");
                self.state = ConnectionState::Connected;
                self.retry.reset(self.generation);
                self.arm_heartbeat(self.config.heartbeat_timeout);
            },
            TransportEvent::Message { event_type, data, id } => {
                if !id.is_empty() {
                    self.last_event_id = id;
                }
                self.on_event(&event_type, &data).await;
            },
            TransportEvent::Closed => self.fail(&ConnectionError::Closed),
            TransportEvent::Error(error) => self.fail(&ConnectionError::from(&error)),
        }
    }

    async fn on_event(&mut self, event_type: &str, data: &str) {
        match event_type {
            EVENT_HEARTBEAT => {
                let timeout = parse_heartbeat_timeout(data).unwrap_or(self.config.heartbeat_timeout);
                self.arm_heartbeat(timeout);
            },
            EVENT_MESSAGES => match parse_message_batch(data) {
                Ok(batch) => {
                    if batch.skipped > 0 {
                        debug!(skipped = batch.skipped, "dropped undecodable messages");
                    }
                    if let Err(error) = self.store.dispatch(Action::ProcessMessageQueue(batch.messages)).await {
                        warn!(%error, "dispatch failed");
                    }
                },
                Err(error) => debug!(%error, "malformed messages payload ignored"),
            },
            EVENT_TTL_EXCEEDED => {
                info!(generation = %self.generation, "stream ttl exceeded, reconnecting");
                self.service.stop(self.generation);
                self.state = ConnectionState::Disconnected;
                self.open(true);
            },
            other => debug!(event = other, "unhandled event"),
        }
    }

    fn on_heartbeat_expired(&mut self, ticket: HeartbeatTicket) {
        if !self.heartbeat.expire(ticket) || ticket.generation() != self.generation || !self.state.is_active() {
            debug!(generation = %ticket.generation(), "stale heartbeat ignored");
            return;
        }
        self.heartbeat_timer = None;
        self.fail(&ConnectionError::HeartbeatTimeout { elapsed: ticket.wait() });
    }

    /// The active stream is gone; decide what happens next.
    fn fail(&mut self, error: &ConnectionError) {
        let generation = self.generation;
        warn!(%generation, %error, "connection lost");

        self.state = ConnectionState::Disconnected;
        self.service.stop(generation);
        self.reset_heartbeat();

        match self.retry.schedule(generation, error.is_retryable()) {
            Some(RetryStep::Emit(decision)) => self.on_decision(decision),
            Some(RetryStep::Wait { delay, ticket }) => {
                debug!(%generation, ?delay, "retry scheduled");
                cancel(&mut self.retry_timer);
                self.retry_timer = Some(self.post_after(delay, Command::RetryElapsed(ticket)));
            },
            None => debug!(%generation, "retry already pending"),
        }
    }

    fn on_decision(&mut self, decision: GenerationTagged<RetryDecision>) {
        let Some(decision) = decision.for_generation(self.generation) else {
            return;
        };
        self.retry_timer = None;

        match decision {
            RetryDecision::RetryNow { attempt } => {
                info!(attempt, "retrying connection");
                self.open(false);
            },
            RetryDecision::MaxRetriesReached | RetryDecision::RetryNotPossible => {
                info!(?decision, "falling back to queue polling");
                self.poller.start(
                    self.env.clone(),
                    Arc::clone(&self.polling_api),
                    Arc::clone(&self.store),
                    Arc::clone(&self.config),
                );
            },
        }
    }

    fn arm_heartbeat(&mut self, timeout: Duration) {
        let ticket = self.heartbeat.start(self.generation, timeout);
        cancel(&mut self.heartbeat_timer);
        self.heartbeat_timer = Some(self.post_after(ticket.wait(), Command::HeartbeatExpired(ticket)));
    }

    fn reset_heartbeat(&mut self) {
        self.heartbeat.reset();
        cancel(&mut self.heartbeat_timer);
    }

    fn post_after(&self, delay: Duration, command: Command) -> JoinHandle<()> {
        let env = self.env.clone();
        let commands = self.commands.clone();
        tokio::spawn(async move {
            env.sleep(delay).await;
            let _ = commands.send(command).await;
        })
    }
}

fn cancel(timer: &mut Option<JoinHandle<()>>) {
    if let Some(timer) = timer.take() {
        timer.abort();
    }
}
