use tokio::sync::broadcast;

const NOTICE_CAPACITY: usize = 64;

/// Payload-free signal that the record set changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeNotice;

/// Broadcasts a [`ChangeNotice`] after each committed mutation.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<ChangeNotice>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(NOTICE_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotice> {
        self.sender.subscribe()
    }

    pub fn notify(&self) {
        // Nobody listening is fine
        let receivers = self.sender.send(ChangeNotice).unwrap_or(0);
        tracing::trace!(receivers, "Change notice sent");
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
