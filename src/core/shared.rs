use std::sync::Arc;

use crate::config::AlarmConfig;
use crate::core::sync::SyncCore;
use crate::events::Bus;
use crate::output::AlarmOutput;

/// State owned jointly by the scheduler facade, the dispatcher and every display worker.
pub(crate) struct Shared {
    /// Registry behind the synchronization core.
    pub core: SyncCore,
    /// Event bus shared with every participant.
    pub bus: Bus,
    /// Runtime configuration.
    pub cfg: AlarmConfig,
    /// Display sink.
    pub output: Arc<dyn AlarmOutput>,
}

impl Shared {
    pub fn new(cfg: AlarmConfig, bus: Bus, output: Arc<dyn AlarmOutput>) -> Arc<Self> {
        Arc::new(Self {
            core: SyncCore::new(),
            bus,
            cfg,
            output,
        })
    }
}
