use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::models::SessionRecord;

/// Receives each finalized session record exactly once. Called after the
/// engine has already returned to idle; implementations must not block.
pub trait SessionSink: Send + Sync {
    fn record(&self, record: &SessionRecord);
}

/// Forwards records to whoever holds the receiving half.
#[derive(Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<SessionRecord>,
}

impl ChannelSink {
    pub fn new() -> (Self, UnboundedReceiver<SessionRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SessionSink for ChannelSink {
    fn record(&self, record: &SessionRecord) {
        if self.tx.send(record.clone()).is_err() {
            log::warn!("Session record {} dropped: no receiver", record.id);
        }
    }
}
