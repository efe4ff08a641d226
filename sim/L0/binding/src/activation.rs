//! Process-wide engine activation gate.
//!
//! Engines with a global license or runtime initialization must be activated
//! once per process. Every binder consults the same gate before its first
//! compile; later binds, retries and reloads find it open and skip the call.

use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};

static ACTIVATION: Once = Once::new();
static ACTIVATIONS: AtomicUsize = AtomicUsize::new(0);

/// Run `activate` if this process has not activated an engine yet.
///
/// Returns `true` if this call performed the activation.
pub fn ensure_activated(activate: impl FnOnce()) -> bool {
    let mut ran = false;
    ACTIVATION.call_once(|| {
        activate();
        ACTIVATIONS.fetch_add(1, Ordering::SeqCst);
        ran = true;
    });
    ran
}

/// Whether the gate has been passed.
#[must_use]
pub fn is_activated() -> bool {
    ACTIVATION.is_completed()
}

/// How many times activation ran in this process (zero or one).
#[must_use]
pub fn activation_count() -> usize {
    ACTIVATIONS.load(Ordering::SeqCst)
}
