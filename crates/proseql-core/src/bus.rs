use crate::hooks::ChangeKind;
use crate::value::Value;
use tokio::sync::broadcast;

/// Bounded per-subscriber queue depth (spec.md §5 "shared-resource
/// policy"): a slow subscriber sheds oldest events rather than stalling
/// the writer; `watch` detects the resulting `Lagged` error and forces a
/// full re-evaluation.
pub const BUS_CAPACITY: usize = 1024;

///
/// ChangeEvent
///
/// Emitted once per affected entity after every successful mutation
/// (spec.md §4.9). Batch operations emit one event per row, in input
/// order.
///
#[derive(Clone, Debug)]
pub struct ChangeEvent {
    pub collection: String,
    pub kind: ChangeKind,
    pub id: String,
    pub before: Option<Value>,
    pub after: Option<Value>,
}

///
/// ChangeBus
///
/// A process-wide, per-database broadcast bus (spec.md §4.9). Cheap to
/// clone; every `Database` owns exactly one.
///
pub struct ChangeBus {
    sender: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeBus {
    fn default() -> Self {
        let (sender, _receiver) = broadcast::channel(BUS_CAPACITY);
        Self { sender }
    }
}

impl ChangeBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Publishes an event. No receivers is not an error — mutations must
    /// not fail just because nobody is watching.
    pub fn publish(&self, event: ChangeEvent) {
        let _ = self.sender.send(event);
    }
}
