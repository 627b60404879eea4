use crossbeam_channel::{Receiver, Sender};
use rivulet_base::{AssetResource, CanonicalAssetPath};

//
// Completion events. Every subscriber channel receives every event; a
// consumer like the scene-binding layer subscribes once and reacts as
// terminal outcomes arrive.
//

#[derive(Clone, Debug)]
pub enum StreamEvent {
    /// The asset decoded successfully and is ready to use
    Ready {
        path: CanonicalAssetPath,
        resource: AssetResource,
    },
    /// The pipeline failed terminally; a placeholder stands in
    Failed {
        path: CanonicalAssetPath,
        fallback: AssetResource,
    },
    /// Diagnostic detail for a failure (HTTP status, retry count, decode
    /// message), emitted alongside `Failed` for operator-facing logging
    Error {
        path: CanonicalAssetPath,
        message: String,
    },
}

/// Fan-out over any number of subscriber channels. Disconnected subscribers
/// are dropped on the next emit.
#[derive(Default)]
pub struct EventFanout {
    subscribers: Vec<Sender<StreamEvent>>,
}

impl EventFanout {
    pub fn subscribe(&mut self) -> Receiver<StreamEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn emit(
        &mut self,
        event: StreamEvent,
    ) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fallback::fallback_resource;
    use rivulet_base::AssetKind;

    #[test]
    fn every_subscriber_sees_every_event() {
        let mut fanout = EventFanout::default();
        let rx_a = fanout.subscribe();
        let rx_b = fanout.subscribe();

        let path = CanonicalAssetPath::normalize("models/slime.glb");
        fanout.emit(StreamEvent::Failed {
            path: path.clone(),
            fallback: fallback_resource(AssetKind::Model),
        });

        assert!(matches!(rx_a.try_recv().unwrap(), StreamEvent::Failed { .. }));
        assert!(matches!(rx_b.try_recv().unwrap(), StreamEvent::Failed { .. }));
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut fanout = EventFanout::default();
        let rx = fanout.subscribe();
        drop(fanout.subscribe());
        assert_eq!(fanout.subscriber_count(), 2);

        fanout.emit(StreamEvent::Error {
            path: CanonicalAssetPath::normalize("a.png"),
            message: "boom".to_string(),
        });
        assert_eq!(fanout.subscriber_count(), 1);
        assert!(rx.try_recv().is_ok());
    }
}
