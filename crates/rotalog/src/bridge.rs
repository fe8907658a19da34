//! Routing `tracing` events through the global logger
//!
//! Libraries that log with `tracing` (and, through `tracing-log`, the `log`
//! crate) end up in the same sinks and encoding as the facade calls.

use crate::{
    caller::{CallSite, Caller},
    field::Field,
    global,
    level::{Disposition, Level},
    Error, Result,
};
use serde_json::{json, Value};
use std::fmt;
use tracing::{field::Visit, subscriber::Interest, Event, Metadata, Subscriber};
use tracing_subscriber::{layer::Context, layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Target of this crate's own diagnostics
const OWN_TARGET: &str = "rotalog";

fn is_own_target(target: &str) -> bool {
    target
        .strip_prefix(OWN_TARGET)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

/// Layer that forwards every event to the currently installed logger
///
/// Events emitted by this crate are skipped: rotation diagnostics are logged
/// while a sink is being written and must not come back into it.
#[derive(Debug, Clone, Copy, Default)]
pub struct FacadeLayer;

impl FacadeLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S: Subscriber> Layer<S> for FacadeLayer {
    fn register_callsite(&self, metadata: &'static Metadata<'static>) -> Interest {
        if is_own_target(metadata.target()) {
            Interest::never()
        } else {
            Interest::sometimes()
        }
    }

    fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        !is_own_target(metadata.target())
            && global::logger().enabled(Level::from(*metadata.level()))
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if is_own_target(metadata.target()) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let caller = match (metadata.file(), metadata.line()) {
            (Some(file), Some(line)) => Caller::new(file, line),
            _ => Caller::new(metadata.target(), 0),
        };

        let disposition = global::logger().emit(
            Level::from(*metadata.level()),
            visitor.message.as_deref().unwrap_or_default(),
            &visitor.fields,
            CallSite::new(caller),
        );
        debug_assert_eq!(disposition, Disposition::Continue);
    }
}

/// Install [`FacadeLayer`] as the global `tracing` subscriber
///
/// Fails if another global subscriber is already set.
pub fn redirect_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(FacadeLayer::new())
        .try_init()
        .map_err(|e| Error::Bridge {
            message: format!("Failed to install tracing bridge: {}", e),
        })
}

/// Collects event fields as JSON values, pulling out the message
#[derive(Default)]
struct FieldVisitor {
    fields: Vec<Field>,
    message: Option<String>,
}

impl FieldVisitor {
    fn push(&mut self, field: &tracing::field::Field, value: Value) {
        self.fields.push(Field::new(field.name(), value));
    }
}

impl Visit for FieldVisitor {
    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.push(field, json!(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.push(field, json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.push(field, json!(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.push(field, json!(value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.push(field, json!(value));
        }
    }

    fn record_error(
        &mut self,
        field: &tracing::field::Field,
        value: &(dyn std::error::Error + 'static),
    ) {
        self.push(field, json!(value.to_string()));
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.push(field, json!(format!("{:?}", value)));
        }
    }
}
