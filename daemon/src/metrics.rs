//! Prometheus metrics

use crate::config::MonitoringConfig;
use crate::link::LinkState;
use beacon_transport::BroadcastStats;
use prometheus::{IntCounter, IntGauge, Opts, Registry};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Beacon metrics, registered on a private registry
pub struct Metrics {
    registry: Registry,

    // Counters
    pub datagrams_received: IntCounter,
    pub datagrams_ignored: IntCounter,
    pub responses_sent: IntCounter,
    pub responses_dropped: IntCounter,
    pub frames_sent: IntCounter,
    pub frames_dropped: IntCounter,

    // Gauges
    pub link_state: IntGauge,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let counter = |name: &str, help: &str| -> prometheus::Result<IntCounter> {
            let counter = IntCounter::with_opts(Opts::new(name, help))?;
            registry.register(Box::new(counter.clone()))?;
            Ok(counter)
        };

        let datagrams_received = counter(
            "beacon_datagrams_received_total",
            "Total inbound datagrams polled",
        )?;
        let datagrams_ignored = counter(
            "beacon_datagrams_ignored_total",
            "Inbound datagrams that carried no usable challenge",
        )?;
        let responses_sent = counter(
            "beacon_responses_sent_total",
            "Handshake responses handed to the socket",
        )?;
        let responses_dropped = counter(
            "beacon_responses_dropped_total",
            "Handshake responses lost to send failures",
        )?;
        let frames_sent = counter(
            "beacon_frames_sent_total",
            "Telemetry frames handed to the socket",
        )?;
        let frames_dropped = counter(
            "beacon_frames_dropped_total",
            "Telemetry frames lost to send failures",
        )?;

        let link_state = IntGauge::with_opts(Opts::new(
            "beacon_link_state",
            "1 once a controller has completed the handshake",
        ))?;
        registry.register(Box::new(link_state.clone()))?;

        Ok(Self {
            registry,
            datagrams_received,
            datagrams_ignored,
            responses_sent,
            responses_dropped,
            frames_sent,
            frames_dropped,
            link_state,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Bring counters in line with the broadcaster's totals
    pub fn observe(&self, link: LinkState, stats: BroadcastStats) {
        self.link_state.set(match link {
            LinkState::Unlinked => 0,
            LinkState::Linked => 1,
        });

        advance(&self.responses_sent, stats.responses_sent);
        advance(&self.responses_dropped, stats.responses_dropped);
        advance(&self.frames_sent, stats.frames_sent);
        advance(&self.frames_dropped, stats.frames_dropped);
    }
}

fn advance(counter: &IntCounter, total: u64) {
    let delta = total.saturating_sub(counter.get());
    if delta > 0 {
        counter.inc_by(delta);
    }
}

/// Start the metrics server
pub fn start_server(config: &MonitoringConfig, registry: Registry) -> JoinHandle<()> {
    let bind = config.prometheus_bind;
    let enabled = config.prometheus_enabled;

    tokio::spawn(async move {
        if !enabled {
            info!("Prometheus metrics disabled");
            return;
        }

        use bytes::Bytes;
        use http_body_util::Full;
        use hyper::header::{HeaderValue, CONTENT_TYPE};
        use hyper::{Response, StatusCode, server::conn::http1, service::service_fn};
        use hyper_util::rt::TokioIo;

        let listener = match tokio::net::TcpListener::bind(bind).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind metrics server: {}", e);
                return;
            }
        };

        info!("Prometheus metrics server listening on {}", bind);

        loop {
            let (stream, _) = match listener.accept().await {
                Ok(r) => r,
                Err(e) => {
                    error!("Metrics accept error: {}", e);
                    continue;
                }
            };

            let io = TokioIo::new(stream);
            let registry = registry.clone();

            tokio::spawn(async move {
                let service = service_fn(move |_req| {
                    let registry = registry.clone();
                    async move {
                        use prometheus::Encoder;

                        let encoder = prometheus::TextEncoder::new();
                        let mut buffer = Vec::new();
                        let mut response = match encoder.encode(&registry.gather(), &mut buffer) {
                            Ok(()) => Response::new(Full::new(Bytes::from(buffer))),
                            Err(e) => {
                                error!("Metrics encode error: {}", e);
                                let mut response = Response::new(Full::new(Bytes::new()));
                                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                                response
                            }
                        };
                        response
                            .headers_mut()
                            .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));

                        Ok::<_, std::convert::Infallible>(response)
                    }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Metrics connection error: {}", e);
                }
            });
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register() {
        let metrics = Metrics::new().unwrap();
        let families = metrics.registry().gather();
        assert_eq!(families.len(), 7);
    }

    #[test]
    fn test_independent_registries() {
        // Each beacon owns its registry, so two instances never collide
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.frames_sent.inc();
        assert_eq!(b.frames_sent.get(), 0);
    }

    #[test]
    fn test_observe_advances_counters() {
        let metrics = Metrics::new().unwrap();
        let mut stats = BroadcastStats {
            frames_sent: 3,
            frames_dropped: 1,
            responses_sent: 1,
            responses_dropped: 0,
        };

        metrics.observe(LinkState::Linked, stats);
        assert_eq!(metrics.frames_sent.get(), 3);
        assert_eq!(metrics.link_state.get(), 1);

        stats.frames_sent = 5;
        metrics.observe(LinkState::Linked, stats);
        assert_eq!(metrics.frames_sent.get(), 5);
        assert_eq!(metrics.frames_dropped.get(), 1);
    }
}
