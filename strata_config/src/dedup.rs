//! Suppression of consecutively repeated log events.
//!
//! Best-effort conversion can emit the same warning for every lookup of the
//! same malformed value. This filter collapses runs of identical events
//! (same target, level and message) into a single emission. It is a
//! log-hygiene measure, not a correctness mechanism.

use std::fmt::Write as _;
use std::sync::Mutex;

use tracing::{Event, Level, Metadata, Subscriber};
use tracing_subscriber::layer::{Context, Filter};

#[derive(Debug, PartialEq, Eq)]
struct LastEvent {
    target: String,
    level: Level,
    message: String,
}

/// A [`Filter`] that drops an event identical to the one just emitted.
///
/// Attach it to the emitting layer:
///
/// ```
/// use strata_config::DedupFilter;
/// use tracing_subscriber::layer::SubscriberExt as _;
/// use tracing_subscriber::{Layer as _, fmt, registry};
///
/// let subscriber = registry().with(fmt::layer().with_filter(DedupFilter::default()));
/// # let _ = subscriber;
/// ```
#[derive(Debug, Default)]
pub struct DedupFilter {
    last: Mutex<Option<LastEvent>>,
}

struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        }
    }
}

impl<S: Subscriber> Filter<S> for DedupFilter {
    fn enabled(&self, _meta: &Metadata<'_>, _cx: &Context<'_, S>) -> bool {
        // Per-event comparison happens in `event_enabled`.
        true
    }

    fn event_enabled(&self, event: &Event<'_>, _cx: &Context<'_, S>) -> bool {
        let mut visitor = MessageVisitor {
            message: String::new(),
        };
        event.record(&mut visitor);
        let current = LastEvent {
            target: event.metadata().target().to_owned(),
            level: *event.metadata().level(),
            message: visitor.message,
        };
        let mut last = self.last.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if last.as_ref() == Some(&current) {
            return false;
        }
        *last = Some(current);
        true
    }
}
