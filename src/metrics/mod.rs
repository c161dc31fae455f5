//! Metrics for deadletter.
//!
//! Events implement [`events::InternalEvent`] and record counters through the
//! `metrics` facade. No exporter is installed here; an embedding process may
//! install its own recorder.

pub mod events;

/// Emit an internal event.
///
/// This macro calls the `InternalEvent::emit()` method on the given event,
/// which records the corresponding counter.
///
/// # Example
///
/// ```ignore
/// use deadletter::metrics::events::FunctionUpdated;
///
/// emit!(FunctionUpdated);
/// ```
#[macro_export]
macro_rules! emit {
    ($event:expr) => {
        $crate::metrics::events::InternalEvent::emit($event)
    };
}
