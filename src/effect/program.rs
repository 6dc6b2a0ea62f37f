//! Program - the effect algebra and its stack-safe evaluator.
//!
//! `Program<S, E, T>` is an immutable description of a computation against
//! a capability `S` that either fails with a domain error `E` or produces a
//! `T`. Construction is pure data assembly; nothing runs until
//! [`Program::eval`] interprets the description through one trampoline
//! loop.
//!
//! # Design Philosophy
//!
//! A program "describes" effects but doesn't "execute" them. Execution
//! happens only via `eval`, which should be called at the program's "edge"
//! (a `main` function, a request handler, a forked fiber).
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use effectus::effect::{Outcome, Program};
//!
//! let program: Program<(), String, i32> = Program::task(|| 6)
//!     .map(|x| x * 7)
//!     .flat_map(|x| Program::success(x));
//!
//! assert_eq!(program.eval(Arc::new(())), Outcome::success(42));
//! ```
//!
//! # Side Effect Deferral
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use effectus::effect::Program;
//!
//! let executed = Arc::new(AtomicBool::new(false));
//! let flag = Arc::clone(&executed);
//!
//! let program: Program<(), String, ()> = Program::task(move || {
//!     flag.store(true, Ordering::SeqCst);
//! });
//!
//! // Building the program ran nothing.
//! assert!(!executed.load(Ordering::SeqCst));
//!
//! program.eval(Arc::new(()));
//! assert!(executed.load(Ordering::SeqCst));
//! ```

use std::convert::Infallible;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::control::Trampoline;

use super::leaf::Leaf;
use super::outcome::Outcome;
use super::suspend::{CompletionSink, Signal, Slot, Uncaught};

#[cfg(feature = "fiber")]
use crate::control::Either;
#[cfg(feature = "fiber")]
use super::suspend::CancelToken;

// =============================================================================
// Bind Node Type Erasure
// =============================================================================

/// Internal trait erasing the intermediate types of a bind node.
///
/// A bind's current program may have any error/value types; erasing them
/// behind this trait lets every bind live in the same `Program` variant.
trait BindStep<S, E, T>: Send {
    /// Produces the trampoline steps for the bind: defer the current
    /// program, then defer whichever continuation its outcome selects.
    fn step(self: Box<Self>, state: Arc<S>) -> Trampoline<Outcome<E, T>>;
}

/// Wrapper hiding the erasure trait from the public enum.
#[doc(hidden)]
pub struct BindBox<S, E, T>(Box<dyn BindStep<S, E, T>>);

impl<S, E, T> BindBox<S, E, T> {
    fn new<B: BindStep<S, E, T> + 'static>(bind: B) -> Self {
        Self(Box::new(bind))
    }

    fn step(self, state: Arc<S>) -> Trampoline<Outcome<E, T>> {
        self.0.step(state)
    }
}

/// The universal continuation: current program plus one continuation per
/// outcome channel.
struct BindNode<S, E0, T0, E, T> {
    current: Program<S, E0, T0>,
    on_failure: Box<dyn FnOnce(E0) -> Program<S, E, T> + Send>,
    on_success: Box<dyn FnOnce(T0) -> Program<S, E, T> + Send>,
}

impl<S, E0, T0, E, T> BindStep<S, E, T> for BindNode<S, E0, T0, E, T>
where
    S: Send + Sync + 'static,
    E0: Send + 'static,
    T0: Send + 'static,
    E: Send + 'static,
    T: Send + 'static,
{
    fn step(self: Box<Self>, state: Arc<S>) -> Trampoline<Outcome<E, T>> {
        let BindNode {
            current,
            on_failure,
            on_success,
        } = *self;
        let continuation_state = Arc::clone(&state);

        // Defer twice: once for the current program, once for whichever
        // continuation its outcome selects. Both re-enter the evaluator
        // through the trampoline, so arbitrarily long chains (including
        // self-referential retry/repeat loops) run as a heap-driven loop.
        Trampoline::more(move || current.step(state)).flat_map(move |outcome| {
            let next = match outcome {
                Outcome::Success(value) => on_success(value),
                Outcome::Failure(error) => on_failure(error),
            };
            Trampoline::more(move || next.step(continuation_state))
        })
    }
}

// =============================================================================
// Program
// =============================================================================

/// An immutable description of an effectful computation.
///
/// # Type Parameters
///
/// - `S`: the capability state the program runs against, shared as
///   `Arc<S>`. The core adds no synchronization of its own; interior
///   mutability in `S` must be safe for whatever threads the caller forks
///   onto.
/// - `E`: the domain error type, carried in [`Outcome::Failure`].
/// - `T`: the result type.
///
/// # Failure channels
///
/// Domain errors (`E`) and uncontrolled failures (panics) are distinct:
/// retry/recover/fold observe only domain errors, while panics unwind out
/// of [`eval`](Program::eval) unless intercepted by
/// [`catch_all`](Program::catch_all). Neither converts into the other.
///
/// # Evaluation
///
/// `eval` is single-threaded and blocks at [`Suspend`](Program::Suspend)
/// nodes until their sink is completed. Concurrency is introduced only by
/// the explicit fork/race/parallel-zip combinators against a caller-owned
/// executor (`fiber` feature).
pub enum Program<S, E, T> {
    /// An already-known success.
    Success(T),
    /// An already-known domain failure.
    Failure(E),
    /// An asynchronous suspension point; the callback receives the state
    /// and a one-shot completion sink.
    Suspend(Box<dyn FnOnce(Arc<S>, CompletionSink<E, T>) + Send>),
    /// Intercepts uncontrolled failures raised while evaluating `current`;
    /// domain failures pass through untouched.
    Catch {
        /// The protected program.
        current: Box<Program<S, E, T>>,
        /// Builds the replacement program from the captured failure.
        recover: Box<dyn FnOnce(Uncaught) -> Program<S, E, T> + Send>,
    },
    /// The universal continuation: what runs next depends on the current
    /// program's outcome.
    Bind(BindBox<S, E, T>),
    /// A primitive operation supplied by an external capability,
    /// evaluated synchronously via [`Leaf::handle`].
    Leaf(Box<dyn Leaf<S, E, T>>),
}

impl<S, E, T> Program<S, E, T>
where
    S: Send + Sync + 'static,
    E: Send + 'static,
    T: Send + 'static,
{
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Lifts a value into a successful program.
    #[inline]
    pub fn success(value: T) -> Self {
        Self::Success(value)
    }

    /// Lifts a domain error into a failed program.
    #[inline]
    pub fn failure(error: E) -> Self {
        Self::Failure(error)
    }

    /// Defers an effectful thunk; it runs when the program is evaluated.
    ///
    /// A panic inside the thunk travels the uncontrolled channel: it
    /// unwinds out of `eval` unless a surrounding
    /// [`catch_all`](Program::catch_all) intercepts it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use effectus::effect::{Outcome, Program};
    ///
    /// let program: Program<(), String, i32> = Program::task(|| 41 + 1);
    /// assert_eq!(program.eval(Arc::new(())), Outcome::success(42));
    /// ```
    pub fn task<F>(action: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        Program::<S, E, ()>::Success(()).map(move |()| action())
    }

    /// Defers program *construction* until evaluation.
    ///
    /// The supplier runs inside the trampoline, so self-referential
    /// constructions (a retry loop re-building itself) stay stack-safe at
    /// any depth.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use effectus::effect::{Outcome, Program};
    ///
    /// fn count_down(n: u64) -> Program<(), String, u64> {
    ///     if n == 0 {
    ///         Program::success(0)
    ///     } else {
    ///         Program::defer(move || count_down(n - 1))
    ///     }
    /// }
    ///
    /// assert_eq!(count_down(100_000).eval(Arc::new(())), Outcome::success(0));
    /// ```
    pub fn defer<F>(supplier: F) -> Self
    where
        F: FnOnce() -> Self + Send + 'static,
    {
        Program::<S, E, ()>::Success(()).flat_map(move |()| supplier())
    }

    /// Creates a program that raises an uncontrolled failure when
    /// evaluated.
    ///
    /// The supplied value's `Display` rendering becomes the
    /// [`Uncaught`] message. Only [`catch_all`](Program::catch_all)
    /// observes it; domain-level combinators (`retry`, `recover`) do not.
    #[allow(clippy::missing_panics_doc)]
    pub fn raise<X, F>(supplier: F) -> Self
    where
        X: fmt::Display,
        F: FnOnce() -> X + Send + 'static,
    {
        Self::task(move || std::panic::panic_any(Uncaught::new(supplier().to_string())))
    }

    /// The asynchronous suspension primitive.
    ///
    /// At evaluation the callback receives the shared state and a one-shot
    /// [`CompletionSink`]; the evaluating thread then blocks until the
    /// sink is completed (by the callback itself or by machinery it
    /// arranged). A panic inside the callback propagates to `eval`'s
    /// caller.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use effectus::effect::{Outcome, Program};
    ///
    /// let program: Program<(), String, i32> = Program::suspend(|_state, sink| {
    ///     // Hand the sink to a worker, an I/O completion, a timer...
    ///     sink.succeed(42);
    /// });
    /// assert_eq!(program.eval(Arc::new(())), Outcome::success(42));
    /// ```
    pub fn suspend<F>(callback: F) -> Self
    where
        F: FnOnce(Arc<S>, CompletionSink<E, T>) + Send + 'static,
    {
        Self::Suspend(Box::new(callback))
    }

    /// Lifts a primitive capability operation into the algebra.
    ///
    /// See [`Leaf`] for the contract an external capability implements.
    pub fn leaf<L>(leaf: L) -> Self
    where
        L: Leaf<S, E, T> + 'static,
    {
        Self::Leaf(Box::new(leaf))
    }

    // =========================================================================
    // Universal Continuation
    // =========================================================================

    /// The universal bind: continues with one of two programs depending on
    /// this program's outcome. Failure continuation first, mirroring the
    /// algebra's `Bind(current, on_failure, on_success)` shape; every
    /// other sequential combinator is a specialization.
    pub fn redeem_with<E2, T2, FE, FT>(self, on_failure: FE, on_success: FT) -> Program<S, E2, T2>
    where
        E2: Send + 'static,
        T2: Send + 'static,
        FE: FnOnce(E) -> Program<S, E2, T2> + Send + 'static,
        FT: FnOnce(T) -> Program<S, E2, T2> + Send + 'static,
    {
        Program::Bind(BindBox::new(BindNode {
            current: self,
            on_failure: Box::new(on_failure),
            on_success: Box::new(on_success),
        }))
    }

    /// Collapses both channels with pure functions into a success.
    pub fn redeem<E2, T2, FE, FT>(self, on_failure: FE, on_success: FT) -> Program<S, E2, T2>
    where
        E2: Send + 'static,
        T2: Send + 'static,
        FE: FnOnce(E) -> T2 + Send + 'static,
        FT: FnOnce(T) -> T2 + Send + 'static,
    {
        self.redeem_with(
            move |error| Program::Success(on_failure(error)),
            move |value| Program::Success(on_success(value)),
        )
    }

    // =========================================================================
    // Success-Channel Combinators
    // =========================================================================

    /// Applies a function to the success value.
    pub fn map<T2, F>(self, function: F) -> Program<S, E, T2>
    where
        T2: Send + 'static,
        F: FnOnce(T) -> T2 + Send + 'static,
    {
        self.redeem_with(Program::Failure, move |value| {
            Program::Success(function(value))
        })
    }

    /// Chains a dependent program onto the success value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use effectus::effect::{Outcome, Program};
    ///
    /// let program: Program<(), String, i32> =
    ///     Program::success(10).flat_map(|x| Program::success(x * 2));
    /// assert_eq!(program.eval(Arc::new(())), Outcome::success(20));
    /// ```
    pub fn flat_map<T2, F>(self, function: F) -> Program<S, E, T2>
    where
        T2: Send + 'static,
        F: FnOnce(T) -> Program<S, E, T2> + Send + 'static,
    {
        self.redeem_with(Program::Failure, function)
    }

    /// Sequences another program after this one, discarding this one's
    /// value (but not its effects or failures).
    pub fn then<T2>(self, next: Program<S, E, T2>) -> Program<S, E, T2>
    where
        T2: Send + 'static,
    {
        self.flat_map(move |_| next)
    }

    /// Observes the success value without changing it.
    pub fn peek<F>(self, observer: F) -> Self
    where
        F: FnOnce(&T) + Send + 'static,
    {
        self.map(move |value| {
            observer(&value);
            value
        })
    }

    // =========================================================================
    // Failure-Channel Combinators
    // =========================================================================

    /// Applies a function to the domain error.
    pub fn map_error<E2, F>(self, function: F) -> Program<S, E2, T>
    where
        E2: Send + 'static,
        F: FnOnce(E) -> E2 + Send + 'static,
    {
        self.redeem_with(
            move |error| Program::Failure(function(error)),
            Program::Success,
        )
    }

    /// Chains a dependent program onto the domain error, switching to a
    /// new error type.
    pub fn flat_map_error<E2, F>(self, function: F) -> Program<S, E2, T>
    where
        E2: Send + 'static,
        F: FnOnce(E) -> Program<S, E2, T> + Send + 'static,
    {
        self.redeem_with(function, Program::Success)
    }

    /// Converts a domain failure into a success with a pure function.
    ///
    /// The result cannot fail intrinsically, so its error type is freely
    /// polymorphic.
    pub fn recover<E2, F>(self, function: F) -> Program<S, E2, T>
    where
        E2: Send + 'static,
        F: FnOnce(E) -> T + Send + 'static,
    {
        self.redeem_with(
            move |error| Program::Success(function(error)),
            Program::Success,
        )
    }

    /// Replaces a domain failure with a fallback program of the same type.
    pub fn recover_with<F>(self, function: F) -> Self
    where
        F: FnOnce(E) -> Self + Send + 'static,
    {
        self.redeem_with(function, Program::Success)
    }

    /// Observes the domain error without changing it.
    pub fn peek_error<F>(self, observer: F) -> Self
    where
        F: FnOnce(&E) + Send + 'static,
    {
        self.map_error(move |error| {
            observer(&error);
            error
        })
    }

    // =========================================================================
    // Uncontrolled-Failure Handling
    // =========================================================================

    /// Intercepts uncontrolled failures (panics) raised while evaluating
    /// this program.
    ///
    /// Domain failures pass through untouched; only the panic channel is
    /// redirected into `recover`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use effectus::effect::{Outcome, Program};
    ///
    /// let program: Program<(), String, i32> = Program::task(|| panic!("boom"))
    ///     .catch_all(|uncaught| Program::success(uncaught.message().len() as i32));
    /// assert_eq!(program.eval(Arc::new(())), Outcome::success(4));
    /// ```
    pub fn catch_all<F>(self, recover: F) -> Self
    where
        F: FnOnce(Uncaught) -> Self + Send + 'static,
    {
        Self::Catch {
            current: Box::new(self),
            recover: Box::new(recover),
        }
    }

    // =========================================================================
    // Retry & Repeat
    // =========================================================================

    /// Retries a failing program up to `attempts` additional times.
    ///
    /// A program is consumed by evaluation, so retrying needs a factory
    /// producing a fresh description per attempt. `attempts == 0` makes
    /// exactly one attempt; on a program failing every time, the factory
    /// is invoked exactly `attempts + 1` times and the final failure is
    /// returned. Only domain failures trigger a retry; panics unwind
    /// immediately.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use effectus::effect::{Outcome, Program};
    ///
    /// let calls = Arc::new(AtomicUsize::new(0));
    /// let counter = Arc::clone(&calls);
    ///
    /// let program: Program<(), String, i32> = Program::retry(
    ///     move || {
    ///         let counter = Arc::clone(&counter);
    ///         Program::defer(move || {
    ///             if counter.fetch_add(1, Ordering::SeqCst) < 2 {
    ///                 Program::failure("not yet".to_string())
    ///             } else {
    ///                 Program::success(42)
    ///             }
    ///         })
    ///     },
    ///     5,
    /// );
    ///
    /// assert_eq!(program.eval(Arc::new(())), Outcome::success(42));
    /// assert_eq!(calls.load(Ordering::SeqCst), 3);
    /// ```
    pub fn retry<F>(factory: F, attempts: usize) -> Self
    where
        F: Fn() -> Self + Send + 'static,
    {
        let attempt = factory();
        attempt.redeem_with(
            move |error| {
                if attempts == 0 {
                    Program::Failure(error)
                } else {
                    Program::defer(move || Self::retry(factory, attempts - 1))
                }
            },
            Program::Success,
        )
    }

    /// Like [`retry`](Program::retry), with a delay program evaluated
    /// between attempts.
    ///
    /// The delay is itself a program (built fresh per attempt), so it
    /// participates in suspension and cancellation like any other step
    /// instead of hard-blocking inside the retry loop. A failing delay
    /// aborts the retry with the delay's failure.
    pub fn retry_with_delay<F, D>(factory: F, attempts: usize, delay: D) -> Self
    where
        F: Fn() -> Self + Send + 'static,
        D: Fn() -> Program<S, E, ()> + Send + 'static,
    {
        let attempt = factory();
        attempt.redeem_with(
            move |error| {
                if attempts == 0 {
                    Program::Failure(error)
                } else {
                    delay().flat_map(move |()| {
                        Program::defer(move || Self::retry_with_delay(factory, attempts - 1, delay))
                    })
                }
            },
            Program::Success,
        )
    }

    /// Runs a program `times + 1` times regardless of outcome, yielding
    /// the final attempt's outcome.
    ///
    /// `times == 0` makes exactly one attempt. Unlike
    /// [`retry`](Program::retry), neither success nor failure stops the
    /// repetition early.
    pub fn repeat<F>(factory: F, times: usize) -> Self
    where
        F: Fn() -> Self + Send + Sync + 'static,
    {
        Self::repeat_shared(Arc::new(factory), times)
    }

    fn repeat_shared(factory: Arc<dyn Fn() -> Self + Send + Sync>, times: usize) -> Self {
        let attempt = factory();
        if times == 0 {
            return attempt;
        }
        let failure_factory = Arc::clone(&factory);
        attempt.redeem_with(
            move |_error| Program::defer(move || Self::repeat_shared(failure_factory, times - 1)),
            move |_value| Program::defer(move || Self::repeat_shared(factory, times - 1)),
        )
    }

    /// Like [`repeat`](Program::repeat), with a delay program evaluated
    /// between attempts. A failing delay aborts the repetition with the
    /// delay's failure.
    pub fn repeat_with_delay<F, D>(factory: F, times: usize, delay: D) -> Self
    where
        F: Fn() -> Self + Send + Sync + 'static,
        D: Fn() -> Program<S, E, ()> + Send + Sync + 'static,
    {
        Self::repeat_with_delay_shared(Arc::new(factory), times, Arc::new(delay))
    }

    fn repeat_with_delay_shared(
        factory: Arc<dyn Fn() -> Self + Send + Sync>,
        times: usize,
        delay: Arc<dyn Fn() -> Program<S, E, ()> + Send + Sync>,
    ) -> Self {
        let attempt = factory();
        if times == 0 {
            return attempt;
        }
        let failure_factory = Arc::clone(&factory);
        let failure_delay = Arc::clone(&delay);
        attempt.redeem_with(
            move |_error| {
                failure_delay().flat_map(move |()| {
                    Program::defer(move || {
                        Self::repeat_with_delay_shared(failure_factory, times - 1, failure_delay)
                    })
                })
            },
            move |_value| {
                delay().flat_map(move |()| {
                    Program::defer(move || Self::repeat_with_delay_shared(factory, times - 1, delay))
                })
            },
        )
    }

    // =========================================================================
    // Measurement
    // =========================================================================

    /// Measures wall-clock evaluation time, pairing it with the value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use effectus::effect::Program;
    ///
    /// let program: Program<(), String, (std::time::Duration, i32)> =
    ///     Program::success(42).timed();
    /// let (elapsed, value) = program.eval(Arc::new(())).success_value().unwrap();
    /// assert_eq!(value, 42);
    /// assert!(elapsed.as_secs() < 1);
    /// ```
    pub fn timed(self) -> Program<S, E, (Duration, T)> {
        Program::task(Instant::now)
            .flat_map(move |start| self.map(move |value| (start.elapsed(), value)))
    }

    // =========================================================================
    // Evaluation
    // =========================================================================

    /// Evaluates the description to a single outcome.
    ///
    /// Drives one trampoline loop on the calling thread: synchronous
    /// nodes execute immediately, suspension points block until completed.
    /// An unhandled domain failure is *returned* as
    /// [`Outcome::Failure`]; an unhandled uncontrolled failure
    /// propagates out of this call as a panic.
    ///
    /// # Panics
    ///
    /// Panics raised during evaluation (from `task` thunks, suspend
    /// callbacks, leaves, or [`raise`](Program::raise)) resurface here
    /// unless intercepted by [`catch_all`](Program::catch_all).
    pub fn eval(self, state: Arc<S>) -> Outcome<E, T> {
        self.step(state).run()
    }

    /// Evaluates with a cooperative cancellation token, checked between
    /// trampoline steps. Returns `None` if cancellation was observed
    /// before a final outcome was produced.
    #[cfg(feature = "fiber")]
    pub(crate) fn eval_cancellable(self, state: Arc<S>, token: &CancelToken) -> Option<Outcome<E, T>> {
        let mut current = self.step(state);

        loop {
            if token.is_cancelled() {
                return None;
            }
            match current.resume() {
                Either::Right(outcome) => return Some(outcome),
                Either::Left(thunk) => current = thunk(),
            }
        }
    }

    /// Produces the trampoline for one evaluation step, dispatching
    /// exhaustively on the variant.
    fn step(self, state: Arc<S>) -> Trampoline<Outcome<E, T>> {
        match self {
            Self::Success(value) => Trampoline::done(Outcome::Success(value)),
            Self::Failure(error) => Trampoline::done(Outcome::Failure(error)),
            Self::Suspend(callback) => {
                let slot = Arc::new(Slot::new());
                let sink = CompletionSink::new(Arc::clone(&slot));
                callback(state, sink);
                match slot.wait() {
                    Signal::Outcome(outcome) => Trampoline::done(outcome),
                    Signal::Raised(uncaught) => std::panic::panic_any(uncaught),
                }
            }
            Self::Catch { current, recover } => {
                let protected_state = Arc::clone(&state);
                match catch_unwind(AssertUnwindSafe(move || current.eval(protected_state))) {
                    Ok(outcome) => Trampoline::done(outcome),
                    Err(payload) => recover(Uncaught::from_payload(payload)).step(state),
                }
            }
            Self::Bind(bind) => bind.step(state),
            Self::Leaf(leaf) => Trampoline::done(leaf.handle(&state)),
        }
    }
}

// =============================================================================
// Timers
// =============================================================================

impl<S, E> Program<S, E, ()>
where
    S: Send + Sync + 'static,
    E: Send + 'static,
{
    /// A timer program completing after the given duration.
    ///
    /// The wait happens at a suspension point during evaluation, pinning
    /// the evaluating thread. Used as the race partner in
    /// [`timeout`](Program::timeout) and as a ready-made retry delay.
    pub fn sleep(duration: Duration) -> Self {
        Self::suspend(move |_state, sink| {
            std::thread::sleep(duration);
            sink.succeed(());
        })
    }
}

// =============================================================================
// Infallible Widening
// =============================================================================

impl<S, T> Program<S, Infallible, T>
where
    S: Send + Sync + 'static,
    T: Send + 'static,
{
    /// Widens a program that cannot fail intrinsically into any error
    /// context.
    ///
    /// This is genuine polymorphism, not a cast: the impossible failure
    /// branch is eliminated by matching on [`Infallible`]. Leaves without
    /// a failure mode declare `E = Infallible` and widen at the lift site,
    /// so one leaf serves every error-typed context.
    pub fn never_fails<E2>(self) -> Program<S, E2, T>
    where
        E2: Send + 'static,
    {
        self.redeem_with(|never| match never {}, Program::Success)
    }
}

// =============================================================================
// Debug Implementation
// =============================================================================

impl<S, E, T> fmt::Debug for Program<S, E, T>
where
    E: fmt::Debug,
    T: fmt::Debug,
{
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(value) => formatter.debug_tuple("Success").field(value).finish(),
            Self::Failure(error) => formatter.debug_tuple("Failure").field(error).finish(),
            Self::Suspend(_) => formatter.debug_tuple("Suspend").field(&"<callback>").finish(),
            Self::Catch { .. } => formatter.debug_tuple("Catch").field(&"<program>").finish(),
            Self::Bind(_) => formatter.debug_tuple("Bind").field(&"<continuation>").finish(),
            Self::Leaf(_) => formatter.debug_tuple("Leaf").field(&"<leaf>").finish(),
        }
    }
}

static_assertions::assert_impl_all!(Program<(), String, i32>: Send);

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn run<E, T>(program: Program<(), E, T>) -> Outcome<E, T>
    where
        E: Send + 'static,
        T: Send + 'static,
    {
        program.eval(Arc::new(()))
    }

    #[rstest]
    fn test_success_and_failure() {
        assert_eq!(run(Program::<(), String, i32>::success(1)), Outcome::success(1));
        assert_eq!(
            run(Program::<(), String, i32>::failure("e".to_string())),
            Outcome::failure("e".to_string())
        );
    }

    #[rstest]
    fn test_task_defers_execution() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let program: Program<(), String, usize> =
            Program::task(move || counter.fetch_add(1, Ordering::SeqCst));

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(run(program), Outcome::success(0));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    fn test_map_and_flat_map() {
        let program: Program<(), String, i32> = Program::success(10)
            .map(|x| x + 1)
            .flat_map(|x| Program::success(x * 2));
        assert_eq!(run(program), Outcome::success(22));
    }

    #[rstest]
    fn test_flat_map_short_circuits_on_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let program: Program<(), String, i32> = Program::failure("e".to_string())
            .flat_map(move |x: i32| {
                counter.fetch_add(1, Ordering::SeqCst);
                Program::success(x)
            });

        assert_eq!(run(program), Outcome::failure("e".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[rstest]
    fn test_map_error_and_recover() {
        let failed: Program<(), String, i32> = Program::failure("e".to_string());
        assert_eq!(
            run(failed.map_error(|e| format!("<{e}>"))),
            Outcome::failure("<e>".to_string())
        );

        let recovered: Program<(), String, i32> =
            Program::<(), String, i32>::failure("abc".to_string()).recover(|e| e.len() as i32);
        assert_eq!(run(recovered), Outcome::success(3));
    }

    #[rstest]
    fn test_recover_with_keeps_success_untouched() {
        let program: Program<(), String, i32> =
            Program::success(5).recover_with(|_| Program::success(0));
        assert_eq!(run(program), Outcome::success(5));
    }

    #[rstest]
    fn test_redeem_collapses_both_channels() {
        let succeeded: Program<(), String, i32> = Program::success(2);
        let failed: Program<(), String, i32> = Program::failure("e".to_string());

        assert_eq!(
            run(succeeded.redeem(|_| "failed".to_string(), |v| format!("value {v}"))),
            Outcome::<String, String>::success("value 2".to_string())
        );
        assert_eq!(
            run(failed.redeem(|_| "failed".to_string(), |v| format!("value {v}"))),
            Outcome::<String, String>::success("failed".to_string())
        );
    }

    #[rstest]
    fn test_then_discards_value_but_not_failure() {
        let program: Program<(), String, i32> = Program::success(1).then(Program::success(2));
        assert_eq!(run(program), Outcome::success(2));

        let failed: Program<(), String, i32> =
            Program::<(), String, i32>::failure("e".to_string()).then(Program::success(2));
        assert_eq!(run(failed), Outcome::failure("e".to_string()));
    }

    #[rstest]
    fn test_peek_observes_without_changing() {
        let seen = Arc::new(AtomicUsize::new(0));
        let observer = Arc::clone(&seen);

        let program: Program<(), String, usize> = Program::success(9_usize)
            .peek(move |value| observer.store(*value, Ordering::SeqCst));

        assert_eq!(run(program), Outcome::success(9));
        assert_eq!(seen.load(Ordering::SeqCst), 9);
    }

    #[rstest]
    fn test_catch_all_intercepts_panics_only() {
        let panicking: Program<(), String, i32> =
            Program::task(|| panic!("boom")).catch_all(|u| Program::success(u.message().len() as i32));
        assert_eq!(run(panicking), Outcome::success(4));

        let failing: Program<(), String, i32> =
            Program::failure("domain".to_string()).catch_all(|_| Program::success(0));
        assert_eq!(run(failing), Outcome::failure("domain".to_string()));
    }

    #[rstest]
    fn test_raise_travels_uncontrolled_channel() {
        let program: Program<(), String, i32> = Program::raise(|| "exploded")
            .catch_all(|uncaught| Program::success(uncaught.message().len() as i32));
        assert_eq!(run(program), Outcome::success(8));
    }

    #[rstest]
    fn test_suspend_completes_through_sink() {
        let program: Program<(), String, i32> = Program::suspend(|_state, sink| sink.succeed(7));
        assert_eq!(run(program), Outcome::success(7));

        let failing: Program<(), String, i32> =
            Program::suspend(|_state, sink| sink.fail("late".to_string()));
        assert_eq!(run(failing), Outcome::failure("late".to_string()));
    }

    #[rstest]
    fn test_suspend_completed_from_another_thread() {
        let program: Program<(), String, i32> = Program::suspend(|_state, sink| {
            std::thread::spawn(move || sink.succeed(42));
        });
        assert_eq!(run(program), Outcome::success(42));
    }

    #[rstest]
    fn test_leaf_dispatches_against_state() {
        struct Doubler(i32);

        impl Leaf<i32, String, i32> for Doubler {
            fn handle(self: Box<Self>, state: &i32) -> Outcome<String, i32> {
                Outcome::success(self.0 * state)
            }
        }

        let program: Program<i32, String, i32> = Program::leaf(Doubler(21));
        assert_eq!(program.eval(Arc::new(2)), Outcome::success(42));
    }

    #[rstest]
    fn test_never_fails_widens_error_type() {
        let infallible: Program<(), Infallible, i32> = Program::success(1);
        let widened: Program<(), String, i32> = infallible.never_fails();
        assert_eq!(run(widened), Outcome::success(1));
    }

    #[rstest]
    fn test_state_is_shared_with_leaves_and_suspends() {
        let program: Program<AtomicUsize, String, usize> = Program::suspend(|state: Arc<AtomicUsize>, sink| {
            state.store(5, Ordering::SeqCst);
            sink.succeed(state.load(Ordering::SeqCst));
        });
        assert_eq!(program.eval(Arc::new(AtomicUsize::new(0))), Outcome::success(5));
    }
}
