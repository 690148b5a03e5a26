use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(test)]
use mockall::automock;

/// Command flags written by the command surface and consumed by the engine loop.
/// One-shot requests are cleared by the `take_*` accessors.
#[cfg_attr(test, automock)]
pub trait Flags: Send + Sync + 'static {
    fn triggered_stop(&self) -> bool;
    fn set_stop(&self);
    fn set_reset(&self);
    fn take_reset(&self) -> bool;
    fn request_pause_toggle(&self);
    fn take_pause_toggle(&self) -> bool;
    fn request_split(&self);
    fn take_split(&self) -> bool;
    fn request_start(&self);
    fn take_start(&self) -> bool;
    fn set_boss_only_dps(&self, value: bool);
    fn boss_only_dps(&self) -> bool;
}

pub struct AtomicBoolFlags {
    stop: AtomicBool,
    reset: AtomicBool,
    pause_toggle: AtomicBool,
    split: AtomicBool,
    start: AtomicBool,
    boss_only_dps: AtomicBool,
}

impl Flags for AtomicBoolFlags {
    fn triggered_stop(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    fn set_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    fn set_reset(&self) {
        self.reset.store(true, Ordering::Relaxed);
    }

    fn take_reset(&self) -> bool {
        self.reset.swap(false, Ordering::AcqRel)
    }

    fn request_pause_toggle(&self) {
        self.pause_toggle.fetch_xor(true, Ordering::AcqRel);
    }

    fn take_pause_toggle(&self) -> bool {
        self.pause_toggle.swap(false, Ordering::AcqRel)
    }

    fn request_split(&self) {
        self.split.store(true, Ordering::Relaxed);
    }

    fn take_split(&self) -> bool {
        self.split.swap(false, Ordering::AcqRel)
    }

    fn request_start(&self) {
        self.start.store(true, Ordering::Relaxed);
    }

    fn take_start(&self) -> bool {
        self.start.swap(false, Ordering::AcqRel)
    }

    fn set_boss_only_dps(&self, value: bool) {
        self.boss_only_dps.store(value, Ordering::Relaxed);
    }

    fn boss_only_dps(&self) -> bool {
        self.boss_only_dps.load(Ordering::Relaxed)
    }
}

impl AtomicBoolFlags {
    pub fn new(boss_only_dps: bool) -> Self {
        Self {
            stop: AtomicBool::new(false),
            reset: AtomicBool::new(false),
            pause_toggle: AtomicBool::new(false),
            split: AtomicBool::new(false),
            start: AtomicBool::new(false),
            boss_only_dps: AtomicBool::new(boss_only_dps),
        }
    }
}
