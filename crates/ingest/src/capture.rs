//! Scoped capture of warning events.
//!
//! [`capture_warnings`] runs a closure under a thread-local subscriber whose
//! only layer records the message of every WARN or ERROR event. Events
//! captured this way are not forwarded to the global subscriber.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;

/// Layer collecting warning messages into a shared buffer.
#[derive(Debug, Clone, Default)]
pub struct WarningCapture {
	sink: Arc<Mutex<Vec<String>>>,
}

impl WarningCapture {
	pub fn new() -> Self {
		Self::default()
	}

	/// Drains the captured messages.
	pub fn take(&self) -> Vec<String> {
		std::mem::take(&mut *self.sink.lock())
	}
}

/// Pulls the message and any other fields out of an event.
#[derive(Default)]
struct MessageVisitor {
	message: String,
	fields: Vec<(String, String)>,
}

impl MessageVisitor {
	/// The message, or `key=value` pairs for events without one.
	fn into_text(self, fallback: &str) -> String {
		if !self.message.is_empty() {
			return self.message;
		}
		if self.fields.is_empty() {
			return fallback.to_string();
		}
		let fields: Vec<_> = self.fields.iter().map(|(k, v)| format!("{k}={v}")).collect();
		format!("{fallback} {{{}}}", fields.join(" "))
	}
}

impl Visit for MessageVisitor {
	fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
		if field.name() == "message" {
			self.message = format!("{value:?}");
		} else {
			self.fields.push((field.name().to_string(), format!("{value:?}")));
		}
	}

	fn record_str(&mut self, field: &Field, value: &str) {
		if field.name() == "message" {
			self.message = value.to_string();
		} else {
			self.fields.push((field.name().to_string(), value.to_string()));
		}
	}
}

impl<S> tracing_subscriber::Layer<S> for WarningCapture
where
	S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
	fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
		if *event.metadata().level() > Level::WARN {
			return;
		}
		let mut visitor = MessageVisitor::default();
		event.record(&mut visitor);
		self.sink.lock().push(visitor.into_text(event.metadata().name()));
	}
}

/// Runs `f` and returns its result with every warning it emitted.
pub fn capture_warnings<R>(f: impl FnOnce() -> R) -> (R, Vec<String>) {
	let capture = WarningCapture::new();
	let subscriber = tracing_subscriber::registry().with(capture.clone());
	let result = tracing::subscriber::with_default(subscriber, f);
	(result, capture.take())
}
