//! Fiber - a cancellable handle to an in-flight evaluation.
//!
//! [`Program::fork`] submits an evaluation to a caller-owned
//! [`Executor`] and yields a `Fiber` as soon as submission succeeds;
//! forking never waits for completion. The fiber exclusively owns the
//! pending result until [`join`](Fiber::join)ed or discarded.
//!
//! Cancellation is cooperative and best-effort: [`cancel`](Fiber::cancel)
//! sets a flag the running evaluation checks between trampoline steps. A
//! synchronous leaf in flight finishes its call, and a blocked suspension
//! wakes only when its sink fills — cancelled work may therefore linger in
//! the background after the flag is set.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use effectus::effect::{Executor, Outcome, Program};
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let executor: Arc<dyn Executor> = Arc::new(runtime);
//!
//! let program: Program<(), String, i32> = Program::task(|| 21)
//!     .fork(&executor)
//!     .flat_map(|fiber| fiber.join())
//!     .map(|x| x * 2);
//!
//! assert_eq!(program.eval(Arc::new(())), Outcome::success(42));
//! ```

use std::error::Error;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::control::Either;

use super::executor::Executor;
use super::outcome::Outcome;
use super::program::Program;
use super::sequence::ProgramZip;
use super::suspend::{CancelToken, CompletionSink, Uncaught};

// =============================================================================
// Fiber State
// =============================================================================

/// How a forked evaluation ended.
enum FiberResult<E, T> {
    /// The evaluation produced a domain outcome.
    Completed(Outcome<E, T>),
    /// The evaluation panicked; the payload is surfaced at join.
    Panicked(Uncaught),
    /// The evaluation observed its cancellation flag and stopped.
    Cancelled,
}

type Waiter<E, T> = Box<dyn FnOnce(FiberResult<E, T>) + Send>;

/// Either still running (with at most one registered waiter) or finished
/// (holding the result until someone consumes it).
enum FiberCell<E, T> {
    Running(Option<Waiter<E, T>>),
    Finished(Option<FiberResult<E, T>>),
}

struct FiberCore<E, T> {
    cell: Mutex<FiberCell<E, T>>,
    token: CancelToken,
}

impl<E, T> FiberCore<E, T>
where
    E: Send + 'static,
    T: Send + 'static,
{
    fn new() -> Self {
        Self {
            cell: Mutex::new(FiberCell::Running(None)),
            token: CancelToken::new(),
        }
    }

    /// Records the worker's result, handing it straight to a registered
    /// waiter if one is present. A second completion is ignored.
    fn complete(&self, result: FiberResult<E, T>) {
        let handoff = {
            let mut cell = self.cell.lock();
            match std::mem::replace(&mut *cell, FiberCell::Finished(None)) {
                FiberCell::Running(Some(waiter)) => Some((waiter, result)),
                FiberCell::Running(None) => {
                    *cell = FiberCell::Finished(Some(result));
                    None
                }
                FiberCell::Finished(stored) => {
                    *cell = FiberCell::Finished(stored);
                    None
                }
            }
        };

        // Invoke outside the lock; the waiter may run arbitrary code.
        if let Some((waiter, result)) = handoff {
            waiter(result);
        }
    }

    /// Registers the single consumer, invoking it immediately if the
    /// result is already in.
    fn register(&self, waiter: Waiter<E, T>) {
        let handoff = {
            let mut cell = self.cell.lock();
            match std::mem::replace(&mut *cell, FiberCell::Finished(None)) {
                FiberCell::Running(_) => {
                    *cell = FiberCell::Running(Some(waiter));
                    None
                }
                FiberCell::Finished(Some(result)) => Some((waiter, result)),
                // Slot already drained by an earlier consumer.
                FiberCell::Finished(None) => Some((waiter, FiberResult::Cancelled)),
            }
        };

        if let Some((waiter, result)) = handoff {
            waiter(result);
        }
    }

    fn is_completed(&self) -> bool {
        matches!(&*self.cell.lock(), FiberCell::Finished(_))
    }
}

/// Routes a fiber result into a suspension sink, tagging the value.
fn deliver<E, T, R, F>(sink: CompletionSink<E, R>, result: FiberResult<E, T>, tag: F)
where
    F: FnOnce(T) -> R,
{
    match result {
        FiberResult::Completed(outcome) => sink.complete(outcome.map(tag)),
        FiberResult::Panicked(uncaught) => sink.raise(uncaught),
        FiberResult::Cancelled => sink.raise(Uncaught::new("fiber cancelled")),
    }
}

// =============================================================================
// Fiber
// =============================================================================

/// A handle to one independently running evaluation.
///
/// The handle exclusively owns the pending result: [`join`](Fiber::join)
/// consumes the fiber and yields a program surfacing the outcome (or
/// re-raising a remote panic). [`cancel`](Fiber::cancel),
/// [`is_completed`](Fiber::is_completed), and
/// [`is_cancelled`](Fiber::is_cancelled) work by reference and never
/// block.
pub struct Fiber<E, T> {
    core: Arc<FiberCore<E, T>>,
}

impl<E, T> Fiber<E, T>
where
    E: Send + 'static,
    T: Send + 'static,
{
    /// Submits an evaluation to the executor, returning the handle once
    /// submission (not completion) succeeds.
    fn spawn<S>(program: Program<S, E, T>, state: Arc<S>, executor: &Arc<dyn Executor>) -> Self
    where
        S: Send + Sync + 'static,
    {
        let core = Arc::new(FiberCore::new());
        let worker_core = Arc::clone(&core);

        executor.execute(Box::new(move || {
            let token = worker_core.token.clone();
            let evaluated =
                catch_unwind(AssertUnwindSafe(|| program.eval_cancellable(state, &token)));
            let result = match evaluated {
                Ok(Some(outcome)) => FiberResult::Completed(outcome),
                Ok(None) => FiberResult::Cancelled,
                Err(payload) => FiberResult::Panicked(Uncaught::from_payload(payload)),
            };
            worker_core.complete(result);
        }));

        Self { core }
    }

    /// Converts the pending result into a suspending program.
    ///
    /// Joining a fiber that completed with a domain outcome surfaces that
    /// outcome; one that panicked re-raises the panic on the joining
    /// evaluation; one that was cancelled raises an uncontrolled
    /// "fiber cancelled" failure (observable via `catch_all`).
    pub fn join<S>(self) -> Program<S, E, T>
    where
        S: Send + Sync + 'static,
    {
        let core = self.core;
        Program::suspend(move |_state, sink| {
            core.register(Box::new(move |result| deliver(sink, result, |value| value)));
        })
    }

    /// Requests cancellation. Idempotent, best-effort: the running
    /// evaluation stops at its next trampoline step, not mid-leaf.
    pub fn cancel(&self) {
        self.core.token.cancel();
    }

    /// Returns `true` once the evaluation has finished (in any way).
    /// Non-blocking snapshot.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.core.is_completed()
    }

    /// Returns `true` once cancellation has been requested. Non-blocking
    /// snapshot; the evaluation itself may still be winding down.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.core.token.is_cancelled()
    }

    /// A shareable handle to this fiber's cooperative cancellation flag.
    ///
    /// Useful when the fiber is about to be consumed — by
    /// [`join`](Fiber::join) or a race — and the caller still wants to
    /// request or observe cancellation afterwards.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.core.token.clone()
    }
}

impl<E, T> fmt::Debug for Fiber<E, T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Fiber")
            .field("completed", &matches!(&*self.core.cell.lock(), FiberCell::Finished(_)))
            .field("cancelled", &self.core.token.is_cancelled())
            .finish()
    }
}

// =============================================================================
// Racing
// =============================================================================

/// Races two fibers: resolves with whichever completes first, tagged
/// `Left` for the first and `Right` for the second.
///
/// After the winning completion both fibers are cancelled unconditionally,
/// first then second, in that fixed order — the attempt on one side is
/// never skipped because of the other. The loser's eventual result is
/// discarded; a winner that failed (or panicked) propagates its failure as
/// the race's result.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use effectus::control::Either;
/// use effectus::effect::{Executor, Outcome, Program, either};
///
/// let runtime = tokio::runtime::Runtime::new().unwrap();
/// let executor: Arc<dyn Executor> = Arc::new(runtime);
///
/// let slow: Program<(), String, &str> =
///     Program::sleep(Duration::from_millis(200)).map(|()| "slow");
/// let fast: Program<(), String, &str> = Program::success("fast");
///
/// let race = slow.fork(&executor).flat_map(move |first| {
///     fast.fork(&executor).flat_map(move |second| either(first, second))
/// });
///
/// assert_eq!(
///     race.eval(Arc::new(())),
///     Outcome::success(Either::Right("fast")),
/// );
/// ```
pub fn either<S, E, A, B>(first: Fiber<E, A>, second: Fiber<E, B>) -> Program<S, E, Either<A, B>>
where
    S: Send + Sync + 'static,
    E: Send + 'static,
    A: Send + 'static,
    B: Send + 'static,
{
    Program::suspend(move |_state, sink| {
        let sink_cell = Arc::new(Mutex::new(Some(sink)));
        let first_core = Arc::clone(&first.core);
        let second_core = Arc::clone(&second.core);

        {
            let sink_cell = Arc::clone(&sink_cell);
            let first_core = Arc::clone(&first_core);
            let second_core = Arc::clone(&second_core);
            first.core.register(Box::new(move |result| {
                if let Some(sink) = sink_cell.lock().take() {
                    first_core.token.cancel();
                    second_core.token.cancel();
                    deliver(sink, result, Either::Left);
                }
            }));
        }

        second.core.register(Box::new(move |result| {
            if let Some(sink) = sink_cell.lock().take() {
                first_core.token.cancel();
                second_core.token.cancel();
                deliver(sink, result, Either::Right);
            }
        }));
    })
}

// =============================================================================
// Fork & Timeout
// =============================================================================

impl<S, E, T> Program<S, E, T>
where
    S: Send + Sync + 'static,
    E: Send + 'static,
    T: Send + 'static,
{
    /// Submits this program's evaluation to the executor.
    ///
    /// The returned program yields a [`Fiber`] as soon as submission
    /// succeeds; it never waits for the forked evaluation. Each running
    /// fiber pins one pool worker, including while blocked at suspension
    /// points.
    pub fn fork(self, executor: &Arc<dyn Executor>) -> Program<S, E, Fiber<E, T>> {
        let executor = Arc::clone(executor);
        Program::suspend(move |state, sink| {
            sink.succeed(Fiber::spawn(self, state, &executor));
        })
    }

    /// Races this program against a timer.
    ///
    /// If the timer wins, a [`TimeoutError`] is raised through the
    /// uncontrolled channel (observable via
    /// [`catch_all`](Program::catch_all)) instead of the protected
    /// program's eventual value. The losing evaluation is cancelled
    /// best-effort and may keep running in the background if its current
    /// step is not interruptible.
    pub fn timeout(self, duration: Duration, executor: &Arc<dyn Executor>) -> Self {
        let executor = Arc::clone(executor);
        self.fork(&executor).flat_map(move |protected| {
            Program::<S, E, ()>::sleep(duration)
                .fork(&executor)
                .flat_map(move |timer| {
                    either(protected, timer).flat_map(move |winner| match winner {
                        Either::Left(value) => Program::Success(value),
                        Either::Right(()) => Program::raise(move || TimeoutError { duration }),
                    })
                })
        })
    }
}

/// Raised through the uncontrolled channel when a timer beats the program
/// it guards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutError {
    /// The timeout duration that was exceeded.
    pub duration: Duration,
}

impl fmt::Display for TimeoutError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "operation timed out after {:?}", self.duration)
    }
}

impl Error for TimeoutError {}

// =============================================================================
// N-ary Fiber Zip
// =============================================================================

/// N-ary zip over already-forked fibers.
///
/// Implemented for tuples of `Fiber<E, _>` up to arity 9. Joins chain
/// dependent continuations, so every fiber must complete before the
/// finisher runs; the first failure encountered short-circuits the
/// combination but does **not** cancel sibling fibers — only the
/// dedicated [`either`] race cancels.
pub trait FiberZip<E> {
    /// The tuple of values produced when every fiber succeeds.
    type Values;

    /// Joins all fibers in order and combines their values.
    fn zip_with<S, R, F>(self, finisher: F) -> Program<S, E, R>
    where
        S: Send + Sync + 'static,
        R: Send + 'static,
        F: FnOnce(Self::Values) -> R + Send + 'static;
}

macro_rules! fiber_join_chain {
    ($finisher:ident, ($($acc:ident),*), ($fiber:ident, $value:ident)) => {
        $fiber.join().map(move |$value| $finisher(($($acc,)* $value,)))
    };
    ($finisher:ident, ($($acc:ident),*), ($fiber:ident, $value:ident), $($rest:tt),+) => {
        $fiber.join().flat_map(move |$value| {
            fiber_join_chain!($finisher, ($($acc,)* $value), $($rest),+)
        })
    };
}

macro_rules! fiber_zip_impl {
    ($(($type_param:ident, $fiber:ident, $value:ident)),+) => {
        impl<E, $($type_param),+> FiberZip<E> for ($(Fiber<E, $type_param>,)+)
        where
            E: Send + 'static,
            $($type_param: Send + 'static),+
        {
            type Values = ($($type_param,)+);

            fn zip_with<S, R, F>(self, finisher: F) -> Program<S, E, R>
            where
                S: Send + Sync + 'static,
                R: Send + 'static,
                F: FnOnce(Self::Values) -> R + Send + 'static,
            {
                let ($($fiber,)+) = self;
                fiber_join_chain!(finisher, (), $(($fiber, $value)),+)
            }
        }
    };
}

fiber_zip_impl!((A1, fiber1, value1), (A2, fiber2, value2));
fiber_zip_impl!((A1, fiber1, value1), (A2, fiber2, value2), (A3, fiber3, value3));
fiber_zip_impl!(
    (A1, fiber1, value1),
    (A2, fiber2, value2),
    (A3, fiber3, value3),
    (A4, fiber4, value4)
);
fiber_zip_impl!(
    (A1, fiber1, value1),
    (A2, fiber2, value2),
    (A3, fiber3, value3),
    (A4, fiber4, value4),
    (A5, fiber5, value5)
);
fiber_zip_impl!(
    (A1, fiber1, value1),
    (A2, fiber2, value2),
    (A3, fiber3, value3),
    (A4, fiber4, value4),
    (A5, fiber5, value5),
    (A6, fiber6, value6)
);
fiber_zip_impl!(
    (A1, fiber1, value1),
    (A2, fiber2, value2),
    (A3, fiber3, value3),
    (A4, fiber4, value4),
    (A5, fiber5, value5),
    (A6, fiber6, value6),
    (A7, fiber7, value7)
);
fiber_zip_impl!(
    (A1, fiber1, value1),
    (A2, fiber2, value2),
    (A3, fiber3, value3),
    (A4, fiber4, value4),
    (A5, fiber5, value5),
    (A6, fiber6, value6),
    (A7, fiber7, value7),
    (A8, fiber8, value8)
);
fiber_zip_impl!(
    (A1, fiber1, value1),
    (A2, fiber2, value2),
    (A3, fiber3, value3),
    (A4, fiber4, value4),
    (A5, fiber5, value5),
    (A6, fiber6, value6),
    (A7, fiber7, value7),
    (A8, fiber8, value8),
    (A9, fiber9, value9)
);

// =============================================================================
// N-ary Parallel Zip
// =============================================================================

/// N-ary parallel zip: fork every element, then fiber-zip the handles.
///
/// Same finisher contract as [`ProgramZip`], but branches run on the
/// executor and side-effect ordering across them is unspecified; only the
/// combination step given each outcome is deterministic. Defined purely as
/// fork-then-zip-then-join — parallel composition needs no separate
/// evaluator.
pub trait ParZip<S, E> {
    /// The tuple of success values produced when every branch succeeds.
    type Values;

    /// Forks all branches onto the executor, then joins them in order and
    /// combines their values.
    fn par_zip_with<R, F>(self, finisher: F, executor: &Arc<dyn Executor>) -> Program<S, E, R>
    where
        R: Send + 'static,
        F: FnOnce(Self::Values) -> R + Send + 'static;
}

macro_rules! par_zip_impl {
    ($(($type_param:ident, $program:ident)),+) => {
        impl<S, E, $($type_param),+> ParZip<S, E> for ($(Program<S, E, $type_param>,)+)
        where
            S: Send + Sync + 'static,
            E: Send + 'static,
            $($type_param: Send + 'static),+
        {
            type Values = ($($type_param,)+);

            fn par_zip_with<R, F>(
                self,
                finisher: F,
                executor: &Arc<dyn Executor>,
            ) -> Program<S, E, R>
            where
                R: Send + 'static,
                F: FnOnce(Self::Values) -> R + Send + 'static,
            {
                let ($($program,)+) = self;
                ($($program.fork(executor),)+)
                    .zip_with(|fibers| fibers)
                    .flat_map(move |fibers| fibers.zip_with(finisher))
            }
        }
    };
}

par_zip_impl!((A1, program1), (A2, program2));
par_zip_impl!((A1, program1), (A2, program2), (A3, program3));
par_zip_impl!((A1, program1), (A2, program2), (A3, program3), (A4, program4));
par_zip_impl!(
    (A1, program1),
    (A2, program2),
    (A3, program3),
    (A4, program4),
    (A5, program5)
);
par_zip_impl!(
    (A1, program1),
    (A2, program2),
    (A3, program3),
    (A4, program4),
    (A5, program5),
    (A6, program6)
);
par_zip_impl!(
    (A1, program1),
    (A2, program2),
    (A3, program3),
    (A4, program4),
    (A5, program5),
    (A6, program6),
    (A7, program7)
);
par_zip_impl!(
    (A1, program1),
    (A2, program2),
    (A3, program3),
    (A4, program4),
    (A5, program5),
    (A6, program6),
    (A7, program7),
    (A8, program8)
);
par_zip_impl!(
    (A1, program1),
    (A2, program2),
    (A3, program3),
    (A4, program4),
    (A5, program5),
    (A6, program6),
    (A7, program7),
    (A8, program8),
    (A9, program9)
);

// =============================================================================
// Fixed-Arity Convenience Wrappers
// =============================================================================

/// Forks and zips two programs with a two-argument finisher.
pub fn par_zip2<S, E, A, B, R, F>(
    first: Program<S, E, A>,
    second: Program<S, E, B>,
    finisher: F,
    executor: &Arc<dyn Executor>,
) -> Program<S, E, R>
where
    S: Send + Sync + 'static,
    E: Send + 'static,
    A: Send + 'static,
    B: Send + 'static,
    R: Send + 'static,
    F: FnOnce(A, B) -> R + Send + 'static,
{
    (first, second).par_zip_with(move |(a, b)| finisher(a, b), executor)
}

/// Forks and zips three programs with a three-argument finisher.
pub fn par_zip3<S, E, A, B, C, R, F>(
    first: Program<S, E, A>,
    second: Program<S, E, B>,
    third: Program<S, E, C>,
    finisher: F,
    executor: &Arc<dyn Executor>,
) -> Program<S, E, R>
where
    S: Send + Sync + 'static,
    E: Send + 'static,
    A: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
    R: Send + 'static,
    F: FnOnce(A, B, C) -> R + Send + 'static,
{
    (first, second, third).par_zip_with(move |(a, b, c)| finisher(a, b, c), executor)
}
