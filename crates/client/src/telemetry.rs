//! Records sync activity so reload races and failed mutations can be traced
//! after the fact.

#[cfg(feature = "telemetry")]
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ReloadRequested { generation: u64 },
    ReloadCompleted { generation: u64, count: usize },
    ReloadFailed { generation: u64, error: String },
    ReloadDiscarded { generation: u64 },
    MutationApplied(String),
    MutationFailed { action: String, error: String },
}

#[derive(Debug, Default)]
pub struct Handle {
    #[cfg(feature = "telemetry")]
    events: Mutex<Vec<Event>>,
}

impl Handle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: Event) {
        #[cfg(feature = "telemetry")]
        {
            match &event {
                Event::ReloadRequested { generation } => {
                    tracing::debug!(generation, "sync reload requested")
                }
                Event::ReloadCompleted { generation, count } => {
                    tracing::debug!(generation, count, "sync reload completed")
                }
                Event::ReloadFailed { generation, error } => {
                    tracing::warn!(generation, error = %error, "sync reload failed")
                }
                Event::ReloadDiscarded { generation } => {
                    tracing::debug!(generation, "stale reload discarded")
                }
                Event::MutationApplied(action) => {
                    tracing::debug!(action = action.as_str(), "sync mutation applied")
                }
                Event::MutationFailed { action, error } => tracing::warn!(
                    action = action.as_str(),
                    error = %error,
                    "sync mutation failed"
                ),
            }
            self.events.lock().push(event);
        }
        #[cfg(not(feature = "telemetry"))]
        {
            let _ = event;
        }
    }

    /// Recorded events, oldest first. Empty when telemetry is compiled out.
    pub fn events(&self) -> Vec<Event> {
        #[cfg(feature = "telemetry")]
        {
            self.events.lock().clone()
        }
        #[cfg(not(feature = "telemetry"))]
        {
            Vec::new()
        }
    }

    pub fn is_enabled(&self) -> bool {
        cfg!(feature = "telemetry")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_events_when_enabled() {
        let handle = Handle::new();
        handle.record(Event::ReloadCompleted {
            generation: 1,
            count: 2,
        });
        if handle.is_enabled() {
            assert_eq!(
                handle.events(),
                vec![Event::ReloadCompleted {
                    generation: 1,
                    count: 2
                }]
            );
        } else {
            assert!(handle.events().is_empty());
        }
    }
}
