use std::sync::Mutex;

use crate::notifier::Notifier;

/// In-memory [`Notifier`] that records every call instead of sending
/// anything.
#[derive(Default)]
pub struct FakeNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl FakeNotifier {
    /// Construct a notifier with no recorded calls.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(title, message)` pair recorded so far, in call order.
    #[must_use]
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("lock poisoned").clone()
    }
}

impl Notifier for FakeNotifier {
    fn notify(&self, title: &str, message: &str) {
        self.sent
            .lock()
            .expect("lock poisoned")
            .push((title.to_string(), message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_every_call() {
        let notifier = FakeNotifier::new();
        notifier.notify("startup", "governor online");
        notifier.notify("error", "qb unreachable");
        assert_eq!(
            notifier.sent(),
            vec![
                ("startup".to_string(), "governor online".to_string()),
                ("error".to_string(), "qb unreachable".to_string()),
            ]
        );
    }
}
