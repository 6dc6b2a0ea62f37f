//! Suspension machinery: the callback-to-blocking bridge.
//!
//! A `Suspend` node in the effect algebra hands its callback a one-shot
//! [`CompletionSink`]; the evaluating thread then blocks on the underlying
//! slot until something fills it. This bridges callback-style asynchrony
//! into the trampoline's blocking step model — genuine parallelism comes
//! from forking further evaluations onto an executor, not from this bridge.

use std::any::Any;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Condvar, Mutex};

use super::outcome::Outcome;

// =============================================================================
// Uncontrolled Failures
// =============================================================================

/// An uncontrolled failure: a panic captured during evaluation.
///
/// Domain errors travel through [`Outcome::Failure`]; panics raised inside
/// a catch region, a suspend callback, or a forked fiber are captured as
/// `Uncaught` values instead. The two channels never convert into each
/// other automatically.
///
/// # Examples
///
/// ```rust
/// use effectus::effect::Uncaught;
///
/// let uncaught = Uncaught::new("boom");
/// assert_eq!(uncaught.message(), "boom");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uncaught {
    message: String,
}

impl Uncaught {
    /// Creates an uncontrolled failure with the given message.
    pub fn new<M: Into<String>>(message: M) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The textual description extracted from the panic payload.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Extracts an `Uncaught` from a `catch_unwind` payload.
    ///
    /// Recognizes re-raised `Uncaught` values as well as the `&str` and
    /// `String` payloads produced by the `panic!` macro.
    pub(crate) fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        match payload.downcast::<Self>() {
            Ok(uncaught) => *uncaught,
            Err(payload) => {
                let message = if let Some(text) = payload.downcast_ref::<&str>() {
                    (*text).to_string()
                } else if let Some(text) = payload.downcast_ref::<String>() {
                    text.clone()
                } else {
                    "unknown panic".to_string()
                };
                Self { message }
            }
        }
    }
}

impl fmt::Display for Uncaught {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.message)
    }
}

impl Error for Uncaught {}

// =============================================================================
// Completion Slot
// =============================================================================

/// What a suspension resolves to: an outcome, or a failure to re-raise.
pub(crate) enum Signal<E, T> {
    /// The suspension produced a domain outcome.
    Outcome(Outcome<E, T>),
    /// The suspension observed an uncontrolled failure to re-raise on the
    /// evaluating thread.
    Raised(Uncaught),
}

/// One-shot slot the evaluating thread parks on.
///
/// The first fill wins and wakes the waiter; later fills are ignored.
pub(crate) struct Slot<V> {
    cell: Mutex<Option<V>>,
    filled: Condvar,
}

impl<V> Slot<V> {
    pub(crate) const fn new() -> Self {
        Self {
            cell: Mutex::new(None),
            filled: Condvar::new(),
        }
    }

    pub(crate) fn fill(&self, value: V) {
        let mut cell = self.cell.lock();
        if cell.is_none() {
            *cell = Some(value);
            self.filled.notify_all();
        }
    }

    pub(crate) fn wait(&self) -> V {
        let mut cell = self.cell.lock();
        loop {
            if let Some(value) = cell.take() {
                return value;
            }
            self.filled.wait(&mut cell);
        }
    }
}

// =============================================================================
// Completion Sink
// =============================================================================

/// One-shot completion sink handed to a suspend callback.
///
/// The callback (or whatever machinery it arranges — a worker thread, an
/// I/O completion, a fiber waiter) fills the sink exactly once; the first
/// completion wins and any later one is ignored. The evaluating thread
/// stays blocked until then, so a callback that never completes its sink
/// leaves the evaluation parked forever.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use effectus::effect::{Outcome, Program};
///
/// let program: Program<(), String, i32> = Program::suspend(|_state, sink| {
///     sink.succeed(42);
/// });
/// assert_eq!(program.eval(Arc::new(())), Outcome::success(42));
/// ```
pub struct CompletionSink<E, T> {
    slot: Arc<Slot<Signal<E, T>>>,
}

impl<E, T> CompletionSink<E, T> {
    pub(crate) fn new(slot: Arc<Slot<Signal<E, T>>>) -> Self {
        Self { slot }
    }

    /// Completes the suspension with a success value.
    pub fn succeed(self, value: T) {
        self.slot.fill(Signal::Outcome(Outcome::Success(value)));
    }

    /// Completes the suspension with a domain failure.
    pub fn fail(self, error: E) {
        self.slot.fill(Signal::Outcome(Outcome::Failure(error)));
    }

    /// Completes the suspension with an already-built outcome.
    pub fn complete(self, outcome: Outcome<E, T>) {
        self.slot.fill(Signal::Outcome(outcome));
    }

    /// Completes the suspension with an uncontrolled failure, which the
    /// evaluating thread re-raises once it wakes.
    pub(crate) fn raise(self, uncaught: Uncaught) {
        self.slot.fill(Signal::Raised(uncaught));
    }
}

impl<E, T> fmt::Debug for CompletionSink<E, T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("CompletionSink").finish_non_exhaustive()
    }
}

// =============================================================================
// Cancellation
// =============================================================================

/// Cooperative cancellation flag shared between a fiber handle and its
/// running evaluation.
///
/// Cancellation is best-effort: the evaluator checks the token between
/// trampoline steps, so it cannot unwind a synchronous leaf call mid-flight
/// and a blocked suspension wakes only when its sink is filled.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_slot_first_fill_wins() {
        let slot: Slot<i32> = Slot::new();
        slot.fill(1);
        slot.fill(2);
        assert_eq!(slot.wait(), 1);
    }

    #[rstest]
    fn test_slot_wakes_waiter_across_threads() {
        let slot = Arc::new(Slot::new());
        let filler = Arc::clone(&slot);

        let handle = std::thread::spawn(move || {
            filler.fill(42);
        });

        assert_eq!(slot.wait(), 42);
        handle.join().unwrap();
    }

    #[rstest]
    fn test_uncaught_from_str_payload() {
        let payload = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(Uncaught::from_payload(payload).message(), "boom");
    }

    #[rstest]
    fn test_uncaught_from_string_payload() {
        let payload = std::panic::catch_unwind(|| panic!("{}", "formatted")).unwrap_err();
        assert_eq!(Uncaught::from_payload(payload).message(), "formatted");
    }

    #[rstest]
    fn test_uncaught_roundtrips_through_panic_any() {
        let payload = std::panic::catch_unwind(|| {
            std::panic::panic_any(Uncaught::new("typed"));
        })
        .unwrap_err();
        assert_eq!(Uncaught::from_payload(payload), Uncaught::new("typed"));
    }

    #[rstest]
    fn test_cancel_token_is_idempotent() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());

        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }
}
