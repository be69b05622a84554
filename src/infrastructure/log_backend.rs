//! BLE log backend
//!
//! A `tracing` layer that forwards every record to the connected peer while the peer
//! is subscribed to the log characteristic. Lines are framed the way host tools
//! expect to parse them:
//!
//! ```text
//! [00:01:06.553,161] <inf> sampling: X: -7.967232, Y: -0.689472, Z: 5.285952
//! ```
//!
//! The stack reports subscription changes through
//! [`BleLogBackend::set_transport_available`], and the backend passes each real change
//! on to the single registered status hook.

use std::fmt::{self, Write as _};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// Callback told whether the log transport is usable
pub type StatusHook = Box<dyn Fn(bool) + Send + Sync>;

pub struct BleLogBackend {
    available: AtomicBool,
    hook: RwLock<Option<StatusHook>>,
    outbound: mpsc::UnboundedSender<String>,
    started: Instant,
}

impl BleLogBackend {
    /// Create a backend whose framed lines are sent on `outbound`
    pub fn new(outbound: mpsc::UnboundedSender<String>) -> Self {
        Self {
            available: AtomicBool::new(false),
            hook: RwLock::new(None),
            outbound,
            started: Instant::now(),
        }
    }

    /// Register the status hook, replacing any previous one
    pub fn set_hook(&self, hook: StatusHook) {
        let mut slot = self.hook.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(hook);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    /// Called by the stack when the peer subscribes, unsubscribes or goes away
    pub fn set_transport_available(&self, available: bool) {
        if self.available.swap(available, Ordering::AcqRel) == available {
            return;
        }

        let hook = self.hook.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(hook) = hook.as_ref() {
            hook(available);
        }
    }

    /// Layer to install in the subscriber registry
    pub fn layer(self: &Arc<Self>) -> BleLogLayer {
        BleLogLayer {
            backend: Arc::clone(self),
        }
    }

    fn send_line(&self, line: String) {
        // A closed receiver means nobody drains the link; drop the line.
        let _ = self.outbound.send(line);
    }
}

pub struct BleLogLayer {
    backend: Arc<BleLogBackend>,
}

impl<S: Subscriber> Layer<S> for BleLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if !self.backend.is_available() {
            return;
        }

        let metadata = event.metadata();
        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);

        let line = format!(
            "[{}] <{}> {}: {}",
            format_uptime(self.backend.started.elapsed()),
            level_tag(metadata.level()),
            module_name(metadata.target()),
            visitor.finish()
        );
        self.backend.send_line(line);
    }
}

#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl LineVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.fields
        } else {
            format!("{} {}", self.message, self.fields)
        }
    }

    fn push_field(&mut self, name: &str, value: fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{}={}", name, value);
    }
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            self.push_field(field.name(), format_args!("{}", value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            self.push_field(field.name(), format_args!("{:?}", value));
        }
    }
}

/// `hh:mm:ss.mmm,uuu` since the backend was created
fn format_uptime(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let micros = elapsed.subsec_micros();
    format!(
        "{:02}:{:02}:{:02}.{:03},{:03}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        micros / 1000,
        micros % 1000
    )
}

fn level_tag(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "err",
        Level::WARN => "wrn",
        Level::INFO => "inf",
        Level::DEBUG | Level::TRACE => "dbg",
    }
}

/// Last path segment of a tracing target
fn module_name(target: &str) -> &str {
    target.rsplit("::").next().unwrap_or(target)
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tracing::{error, info};
    use tracing_subscriber::prelude::*;

    #[test]
    fn test_format_uptime() {
        let elapsed = Duration::from_secs(66) + Duration::from_micros(553_161);
        assert_eq!(format_uptime(elapsed), "00:01:06.553,161");
        assert_eq!(format_uptime(Duration::from_secs(3600 * 26)), "26:00:00.000,000");
    }

    #[test]
    fn test_hook_fires_only_on_change() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let backend = BleLogBackend::new(tx);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        backend.set_hook(Box::new(move |available| sink.lock().unwrap().push(available)));

        backend.set_transport_available(true);
        backend.set_transport_available(true);
        backend.set_transport_available(false);
        backend.set_transport_available(false);
        backend.set_transport_available(true);

        assert_eq!(*seen.lock().unwrap(), vec![true, false, true]);
        assert!(backend.is_available());
    }

    #[test]
    fn test_lines_only_flow_while_available() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let backend = Arc::new(BleLogBackend::new(tx));
        let subscriber = tracing_subscriber::registry().with(backend.layer());

        tracing::subscriber::with_default(subscriber, || {
            info!("before subscription");
            backend.set_transport_available(true);
            info!(reason = 0x13, "Disconnected");
            error!("Advertising failed to start (err {})", -120);
            backend.set_transport_available(false);
            info!("after unsubscribe");
        });

        let first = rx.try_recv().unwrap();
        assert!(first.starts_with('['));
        assert!(first.ends_with("<inf> tests: Disconnected reason=19"));
        let second = rx.try_recv().unwrap();
        assert!(second.ends_with("<err> tests: Advertising failed to start (err -120)"));
        assert!(rx.try_recv().is_err());
    }
}
