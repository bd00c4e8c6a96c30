use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Minimum time between two messages shown to the player.
pub const NOTIFICATION_COOLDOWN: Duration = Duration::from_secs(5);

/// Source of the current time.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Drives simulations and tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Cell::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Channel that puts a message in front of the player.
pub trait MessageSink {
    fn show(&self, message: &str);
}

/// Sends player messages to the log under the `player_chat` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMessageSink;

impl MessageSink for LogMessageSink {
    fn show(&self, message: &str) {
        tracing::warn!(target: "player_chat", "{message}");
    }
}

impl<S: MessageSink + ?Sized> MessageSink for Rc<S> {
    fn show(&self, message: &str) {
        (**self).show(message)
    }
}

/// Shows at most one message per cooldown window, across every kind of failure.
///
/// The window is shared by all messages: the aim is to bound how much the
/// player sees during a storm of failures, not to deduplicate by cause.
pub struct RateLimitedNotifier {
    clock: Box<dyn Clock>,
    sink: Box<dyn MessageSink>,
    cooldown: Duration,
    last_shown: Cell<Option<Instant>>,
    dropped: Cell<u64>,
}

impl RateLimitedNotifier {
    pub fn new(sink: Box<dyn MessageSink>) -> Self {
        Self::with_clock(Box::new(SystemClock), sink)
    }

    pub fn with_clock(clock: Box<dyn Clock>, sink: Box<dyn MessageSink>) -> Self {
        Self {
            clock,
            sink,
            cooldown: NOTIFICATION_COOLDOWN,
            last_shown: Cell::new(None),
            dropped: Cell::new(0),
        }
    }

    /// Show `message` unless one was shown less than a cooldown ago.
    /// Returns whether it was shown.
    pub fn notify(&self, message: &str) -> bool {
        let now = self.clock.now();
        let open = match self.last_shown.get() {
            Some(last) => now.saturating_duration_since(last) >= self.cooldown,
            None => true,
        };
        if !open {
            self.dropped.set(self.dropped.get() + 1);
            tracing::trace!(dropped = self.dropped.get(), "player message rate limited");
            return false;
        }
        self.last_shown.set(Some(now));
        self.sink.show(message);
        true
    }

    /// Messages dropped so far because the window was closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.get()
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}

impl std::fmt::Debug for RateLimitedNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitedNotifier")
            .field("cooldown", &self.cooldown)
            .field("last_shown", &self.last_shown.get())
            .field("dropped", &self.dropped.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<String>>);

    impl MessageSink for Recorder {
        fn show(&self, message: &str) {
            self.0.borrow_mut().push(message.to_string());
        }
    }

    fn notifier() -> (RateLimitedNotifier, Rc<ManualClock>, Rc<Recorder>) {
        let clock = Rc::new(ManualClock::new());
        let sink = Rc::new(Recorder::default());
        let notifier =
            RateLimitedNotifier::with_clock(Box::new(clock.clone()), Box::new(sink.clone()));
        (notifier, clock, sink)
    }

    #[test]
    fn first_message_is_shown() {
        let (notifier, _, sink) = notifier();
        assert!(notifier.notify("boom"));
        assert_eq!(*sink.0.borrow(), ["boom"]);
    }

    #[test]
    fn burst_within_window_shows_one() {
        let (notifier, clock, sink) = notifier();
        let mut shown = 0;
        for i in 0..20 {
            if notifier.notify(&format!("failure {i}")) {
                shown += 1;
            }
            clock.advance(Duration::from_millis(200));
        }
        // 20 calls across 4 seconds
        assert_eq!(shown, 1);
        assert_eq!(notifier.dropped(), 19);
        assert_eq!(sink.0.borrow().len(), 1);
    }

    #[test]
    fn window_reopens_after_cooldown() {
        let (notifier, clock, _) = notifier();
        assert!(notifier.notify("a"));
        clock.advance(Duration::from_millis(4_999));
        assert!(!notifier.notify("b"));
        clock.advance(Duration::from_millis(1));
        assert!(notifier.notify("c"));
    }

    #[test]
    fn dropped_messages_do_not_extend_window() {
        let (notifier, clock, _) = notifier();
        assert!(notifier.notify("a"));
        clock.advance(Duration::from_secs(3));
        assert!(!notifier.notify("b"));
        clock.advance(Duration::from_secs(2));
        assert!(notifier.notify("c"));
    }

    #[test]
    fn default_cooldown_is_five_seconds() {
        let notifier = RateLimitedNotifier::new(Box::new(LogMessageSink));
        assert_eq!(notifier.cooldown(), Duration::from_secs(5));
    }
}
