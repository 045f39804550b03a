use std::sync::Arc;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{
    registry::Registry,
    visor::{Background, LoadVisor},
};
use crate::{
    config::Config,
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`LoadVisor`] with optional subscribers.
pub struct LoadVisorBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl LoadVisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (generator lifecycle, skips,
    /// failures) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the runtime and spawns its background tasks.
    ///
    /// Must be called inside a tokio runtime. Initializes:
    /// - Event bus for broadcasting
    /// - Subscriber workers and the bus listener feeding them
    /// - Registry actor and its command queue
    pub fn build(self) -> Arc<LoadVisor> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let runtime_token = CancellationToken::new();

        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        let listener_token = CancellationToken::new();
        // Without subscribers there is nothing to forward; skip the bus receiver.
        let listener =
            (!subs.is_empty()).then(|| subscriber_listener(&bus, subs, listener_token.clone()));

        let (tx, rx) = mpsc::channel(self.cfg.command_capacity_clamped());
        let registry = Registry::new(
            self.cfg.clone(),
            bus.clone(),
            runtime_token.clone(),
            tx.downgrade(),
        );
        let registry = tokio::spawn(registry.run(rx));

        Arc::new(LoadVisor::new_internal(
            self.cfg,
            bus,
            tx,
            runtime_token,
            Background {
                registry,
                listener,
                listener_token,
            },
        ))
    }
}

/// Forwards bus events to the subscriber set until `stop` fires, then drains
/// what is already buffered and shuts the workers down.
fn subscriber_listener(bus: &Bus, subs: SubscriberSet, stop: CancellationToken) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                msg = rx.recv() => match msg {
                    Ok(ev) => subs.emit(&ev),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "subscriber listener lagged behind the bus");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = stop.cancelled() => break,
            }
        }
        loop {
            match rx.try_recv() {
                Ok(ev) => subs.emit(&ev),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        subs.shutdown().await;
    })
}
