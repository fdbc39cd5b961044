use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, broadcast};
use tokio_util::sync::CancellationToken;

use super::{dispatcher::Dispatcher, scheduler::Scheduler, shared::Shared, workers::WorkerTable};
use crate::{
    config::AlarmConfig,
    events::{Bus, Event},
    output::{AlarmOutput, StdoutOutput},
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a Scheduler with optional collaborators.
pub struct SchedulerBuilder {
    cfg: AlarmConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    output: Arc<dyn AlarmOutput>,
}

impl SchedulerBuilder {
    /// Creates a new builder with the given configuration and a stdout display sink.
    pub fn new(cfg: AlarmConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            output: Arc::new(StdoutOutput),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive runtime events (admission, dispatch, worker
    /// lifecycle, displays) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Replaces the display sink.
    pub fn with_output(mut self, output: Arc<dyn AlarmOutput>) -> Self {
        self.output = output;
        self
    }

    /// Builds the Scheduler and starts its background tasks.
    ///
    /// Must be called from within a tokio runtime. Initializes:
    /// - Event bus and subscriber workers
    /// - Subscriber listener (bus → subscriber set)
    /// - Dispatcher task
    pub fn build(self) -> Arc<Scheduler> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        subscriber_listener(bus.subscribe(), Arc::clone(&subs));

        let runtime_token = CancellationToken::new();
        let shared = Shared::new(self.cfg, bus, self.output);
        let table = Arc::new(RwLock::new(WorkerTable::new()));

        let dispatcher = Dispatcher::new(
            Arc::clone(&shared),
            Arc::clone(&table),
            runtime_token.clone(),
        );
        let dispatcher = tokio::spawn(dispatcher.run());

        Arc::new(Scheduler {
            shared,
            table,
            subs,
            runtime_token,
            dispatcher: Mutex::new(Some(dispatcher)),
        })
    }
}

/// Forwards bus events to the subscriber set (fire-and-forget).
fn subscriber_listener(mut rx: broadcast::Receiver<Event>, set: Arc<SubscriberSet>) {
    if set.is_empty() {
        return;
    }
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => set.emit(&ev),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "subscriber listener lagged behind the bus");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
