//! The leaf contract - the algebra's only extension point.
//!
//! A capability provider supplies a closed set of variant values, each
//! carrying the data for one primitive operation, and implements [`Leaf`]
//! for them with an exhaustive match. Factory functions then lift each
//! variant into [`Program`](super::Program) via
//! [`Program::leaf`](super::Program::leaf); leaves without an intrinsic
//! failure mode declare `E = Infallible` and widen at the lift site with
//! [`never_fails`](super::Program::never_fails), so one leaf value serves
//! any error-typed context.
//!
//! # Examples
//!
//! A counter capability with two primitive operations:
//!
//! ```rust
//! use std::convert::Infallible;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicI64, Ordering};
//! use effectus::effect::{Leaf, Outcome, Program};
//!
//! struct Counter {
//!     value: AtomicI64,
//! }
//!
//! enum CounterOp {
//!     Add(i64),
//!     Get,
//! }
//!
//! impl Leaf<Counter, Infallible, i64> for CounterOp {
//!     fn handle(self: Box<Self>, state: &Counter) -> Outcome<Infallible, i64> {
//!         match *self {
//!             CounterOp::Add(amount) => {
//!                 Outcome::success(state.value.fetch_add(amount, Ordering::SeqCst) + amount)
//!             }
//!             CounterOp::Get => Outcome::success(state.value.load(Ordering::SeqCst)),
//!         }
//!     }
//! }
//!
//! fn add<E: Send + 'static>(amount: i64) -> Program<Counter, E, i64> {
//!     Program::leaf(CounterOp::Add(amount)).never_fails()
//! }
//!
//! fn get<E: Send + 'static>() -> Program<Counter, E, i64> {
//!     Program::leaf(CounterOp::Get).never_fails()
//! }
//!
//! let program: Program<Counter, String, i64> = add(40).then(add(2)).then(get());
//! let state = Arc::new(Counter { value: AtomicI64::new(0) });
//! assert_eq!(program.eval(state), Outcome::success(42));
//! ```

use super::outcome::Outcome;

/// A primitive effect variant supplied by an external capability.
///
/// `handle` performs exactly one side-effecting call against the
/// capability state and reports the result as an outcome: a success or a
/// domain failure. Evaluation is synchronous and cannot be interrupted
/// mid-flight — cancellation, if any, is observed between steps by the
/// evaluator, never inside `handle`.
///
/// The capability type `S` should be the *minimal* interface the
/// operation needs ("can read a line", "can produce a random integer"),
/// keeping leaves reusable across larger state compositions.
pub trait Leaf<S, E, T>: Send {
    /// Executes the primitive operation against the capability state.
    fn handle(self: Box<Self>, state: &S) -> Outcome<E, T>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::Program;
    use rstest::rstest;
    use std::convert::Infallible;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Journal {
        entries: parking_lot::Mutex<Vec<String>>,
        reads: AtomicUsize,
    }

    enum JournalOp {
        Append(String),
        Count,
    }

    impl Leaf<Journal, String, usize> for JournalOp {
        fn handle(self: Box<Self>, state: &Journal) -> Outcome<String, usize> {
            match *self {
                JournalOp::Append(entry) => {
                    if entry.is_empty() {
                        return Outcome::failure("empty entry".to_string());
                    }
                    let mut entries = state.entries.lock();
                    entries.push(entry);
                    Outcome::success(entries.len())
                }
                JournalOp::Count => {
                    state.reads.fetch_add(1, Ordering::SeqCst);
                    Outcome::success(state.entries.lock().len())
                }
            }
        }
    }

    fn append(entry: &str) -> Program<Journal, String, usize> {
        Program::leaf(JournalOp::Append(entry.to_string()))
    }

    fn count() -> Program<Journal, String, usize> {
        Program::leaf(JournalOp::Count)
    }

    fn fresh_journal() -> Arc<Journal> {
        Arc::new(Journal {
            entries: parking_lot::Mutex::new(Vec::new()),
            reads: AtomicUsize::new(0),
        })
    }

    #[rstest]
    fn test_leaf_performs_one_call_against_state() {
        let state = fresh_journal();
        let program = append("first").then(append("second")).then(count());

        assert_eq!(program.eval(Arc::clone(&state)), Outcome::success(2));
        assert_eq!(state.reads.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    fn test_leaf_reports_domain_failures() {
        let state = fresh_journal();
        let program = append("").then(count());

        assert_eq!(
            program.eval(Arc::clone(&state)),
            Outcome::failure("empty entry".to_string())
        );
        // Short-circuited before the count leaf ran.
        assert_eq!(state.reads.load(Ordering::SeqCst), 0);
    }

    #[rstest]
    fn test_infallible_leaf_widens_into_any_error_context() {
        struct Ticks(AtomicUsize);
        struct Tick;

        impl Leaf<Ticks, Infallible, usize> for Tick {
            fn handle(self: Box<Self>, state: &Ticks) -> Outcome<Infallible, usize> {
                Outcome::success(state.0.fetch_add(1, Ordering::SeqCst))
            }
        }

        fn tick<E: Send + 'static>() -> Program<Ticks, E, usize> {
            Program::leaf(Tick).never_fails()
        }

        let as_string_errors: Program<Ticks, String, usize> = tick();
        let as_unit_errors: Program<Ticks, (), usize> = tick();

        let state = Arc::new(Ticks(AtomicUsize::new(0)));
        assert_eq!(as_string_errors.eval(Arc::clone(&state)), Outcome::success(0));
        assert_eq!(as_unit_errors.eval(state), Outcome::success(1));
    }
}
