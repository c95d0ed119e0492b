use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// User-facing outcome of a store operation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChangeOrigin {
    /// Written by this process through the store.
    Local,
    /// Written by someone else sharing the same storage.
    External,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StoreEvent {
    Notice(Notice),
    DataChanged(ChangeOrigin),
}

/// Fan-out of store events. Cloning shares the same channel.
#[derive(Clone, Debug)]
pub struct Events {
    sender: broadcast::Sender<StoreEvent>,
}

impl Events {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    pub fn success(&self, message: impl Into<String>) {
        self.emit(StoreEvent::Notice(Notice {
            level: NoticeLevel::Success,
            message: message.into(),
        }));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(StoreEvent::Notice(Notice {
            level: NoticeLevel::Error,
            message: message.into(),
        }));
    }

    pub fn data_changed(&self, origin: ChangeOrigin) {
        self.emit(StoreEvent::DataChanged(origin));
    }

    fn emit(&self, event: StoreEvent) {
        // No subscribers is fine; nobody is listening.
        let _ = self.sender.send(event);
    }
}

impl Default for Events {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emitting_without_subscribers_is_silent() {
        let events = Events::new();
        events.success("nobody hears this");
        events.data_changed(ChangeOrigin::Local);
    }

    #[test]
    fn subscribers_receive_in_order() {
        let events = Events::new();
        let mut rx = events.subscribe();
        events.error("Idea not found");
        events.data_changed(ChangeOrigin::External);
        assert_eq!(
            rx.try_recv().expect("notice"),
            StoreEvent::Notice(Notice {
                level: NoticeLevel::Error,
                message: "Idea not found".to_string(),
            })
        );
        assert_eq!(
            rx.try_recv().expect("change"),
            StoreEvent::DataChanged(ChangeOrigin::External)
        );
    }
}
