use std::sync::atomic::{AtomicBool, Ordering};

/// Flags raised by timers and admin actions, consumed by the housekeeping tick.
#[derive(Debug, Default)]
pub struct UpdateSignals {
    update_requested: AtomicBool,
    setup_changed: AtomicBool,
}

impl UpdateSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_update(&self) {
        self.update_requested.store(true, Ordering::Release);
    }

    /// Returns true once per raised request.
    pub fn take_update_request(&self) -> bool {
        self.update_requested.swap(false, Ordering::AcqRel)
    }

    pub fn notify_setup_changed(&self) {
        self.setup_changed.store(true, Ordering::Release);
    }

    pub fn take_setup_changed(&self) -> bool {
        self.setup_changed.swap(false, Ordering::AcqRel)
    }
}
