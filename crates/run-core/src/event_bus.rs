use tokio::sync::broadcast;

use run_types::TraceEvent;

/// Fan-out channel for live run updates (UI/log tailers subscribe
/// independently of the durable trace log).
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TraceEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(2048);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TraceEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: TraceEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
