//! Fixed-period beacon loop
//!
//! Each tick polls for at most one inbound datagram, answers it, and then,
//! if the link is up, encodes and broadcasts one telemetry frame. Inbound
//! handling always precedes the broadcast, so the tick that receives the
//! first challenge already sends telemetry.

use crate::config::BeaconConfig;
use crate::encoder::FrameEncoder;
use crate::link::LinkManager;
use crate::metrics::Metrics;
use crate::sensors::SensorProvider;
use beacon_protocol::TelemetryFrame;
use beacon_transport::{Broadcaster, SharedSocket, RECV_BUFFER_SIZE};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Everything the loop mutates, owned in one place
pub struct BeaconContext {
    socket: SharedSocket,
    link: LinkManager,
    broadcaster: Broadcaster,
    encoder: FrameEncoder,
    sensors: Arc<dyn SensorProvider>,
    metrics: Metrics,
}

impl BeaconContext {
    pub fn new(
        socket: SharedSocket,
        link: LinkManager,
        sensors: Arc<dyn SensorProvider>,
    ) -> prometheus::Result<Self> {
        Ok(Self {
            broadcaster: Broadcaster::new(socket.clone()),
            socket,
            link,
            encoder: FrameEncoder::new(),
            sensors,
            metrics: Metrics::new()?,
        })
    }

    pub fn link(&self) -> &LinkManager {
        &self.link
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

/// What a single tick did
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickOutcome {
    /// Response byte sent this tick
    pub response: Option<u8>,
    /// Telemetry frame broadcast this tick
    pub frame: Option<TelemetryFrame>,
}

pub struct Scheduler {
    ctx: BeaconContext,
    period: Duration,
    started: Instant,
}

impl Scheduler {
    pub fn new(ctx: BeaconContext, period: Duration) -> Self {
        Self {
            ctx,
            period,
            started: Instant::now(),
        }
    }

    /// Build a scheduler from configuration around an already bound socket
    pub fn from_config(
        config: &BeaconConfig,
        socket: SharedSocket,
        sensors: Arc<dyn SensorProvider>,
    ) -> prometheus::Result<Self> {
        let link = LinkManager::new(
            config.network.remote_port,
            config.network.endpoint_policy,
            config.handshake.challenge_policy,
        );
        let ctx = BeaconContext::new(socket, link, sensors)?;
        Ok(Self::new(ctx, config.scheduler.period()))
    }

    pub fn context(&self) -> &BeaconContext {
        &self.ctx
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Milliseconds since the scheduler was created
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Run one cycle with the given uptime
    pub async fn tick(&mut self, elapsed_ms: u64) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        let ctx = &mut self.ctx;

        let mut buf = [0u8; RECV_BUFFER_SIZE];
        let received = match ctx.socket.try_recv_datagram(&mut buf) {
            // ICMP unreachable from an earlier send, not a problem with this read
            Err(e) if is_unreachable(&e) => {
                debug!("Receive reported unreachable peer: {}", e);
                ctx.socket.try_recv_datagram(&mut buf)
            }
            other => other,
        };
        match received {
            Ok(Some((len, sender))) => {
                ctx.metrics.datagrams_received.inc();
                match ctx.link.handle_datagram(&buf[..len], sender) {
                    Some(response) => {
                        ctx.broadcaster.send_response(response, sender).await;
                        outcome.response = Some(response);
                    }
                    None => ctx.metrics.datagrams_ignored.inc(),
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Receive error: {}", e),
        }

        if ctx.link.is_linked() {
            if let Some(destination) = ctx.link.telemetry_destination() {
                let snapshot = ctx.sensors.snapshot();
                let active = ctx.sensors.control_input_active();
                let frame = ctx.encoder.build(&snapshot, active, elapsed_ms);

                ctx.broadcaster.send(&frame, destination).await;
                outcome.frame = Some(frame);
            }
        }

        ctx.metrics.observe(ctx.link.state(), ctx.broadcaster.stats());

        outcome
    }

    /// Tick forever at the configured period
    pub async fn run(mut self) {
        info!("Beacon loop running every {:?}", self.period);

        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let elapsed = self.elapsed_ms();
            self.tick(elapsed).await;
        }
    }
}

fn is_unreachable(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionRefused
    )
}
