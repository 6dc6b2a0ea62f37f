//! The effect system: describe computations as data, evaluate them later.
//!
//! The central type is [`Program`], an immutable description of a
//! computation over a capability type `S` that may fail with a domain error
//! `E` or produce a `T`. Building a program never executes anything;
//! [`Program::eval`] interprets the description through one stack-safe
//! trampoline loop.
//!
//! # Failure channels
//!
//! Two channels exist and never auto-convert into each other:
//!
//! 1. **Domain errors** (`E`) flow through [`Outcome::Failure`] and are
//!    observed by `retry`/`recover`/`fold`.
//! 2. **Uncontrolled failures** (panics) unwind out of `eval` unless
//!    intercepted by [`Program::catch_all`], which exposes them as
//!    [`Uncaught`] values.
//!
//! # Concurrency
//!
//! With the `fiber` feature, programs fork onto a caller-owned
//! [`Executor`]; see [`Fiber`] for join, cancellation, racing, and the
//! parallel zip family. The core never creates threads of its own.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use effectus::effect::{Outcome, Program};
//!
//! let program: Program<(), String, String> = Program::success(2)
//!     .flat_map(|n| {
//!         if n % 2 == 0 {
//!             Program::success(format!("{n} is even"))
//!         } else {
//!             Program::failure("odd".to_string())
//!         }
//!     });
//!
//! assert_eq!(
//!     program.eval(Arc::new(())),
//!     Outcome::success("2 is even".to_string()),
//! );
//! ```

// =============================================================================
// Outcome Value
// =============================================================================

mod outcome;

pub use outcome::{Outcome, OutcomeZip};

// =============================================================================
// Effect Algebra
// =============================================================================

mod program;

pub use program::Program;

// =============================================================================
// Suspension Machinery
// =============================================================================

mod suspend;

pub use suspend::{CancelToken, CompletionSink, Uncaught};

// =============================================================================
// Leaf Contract
// =============================================================================

mod leaf;

pub use leaf::Leaf;

// =============================================================================
// Sequencing Families
// =============================================================================

mod sequence;

pub use sequence::{ProgramZip, zip2, zip3};

// =============================================================================
// Validation (requires validation feature)
// =============================================================================

#[cfg(feature = "validation")]
mod validation;

#[cfg(feature = "validation")]
pub use validation::{Validation, ValidationErrors, Validator};

// =============================================================================
// Fibers & Executors (requires fiber feature)
// =============================================================================

#[cfg(feature = "fiber")]
mod executor;

#[cfg(feature = "fiber")]
pub use executor::Executor;

#[cfg(feature = "fiber")]
mod fiber;

#[cfg(feature = "fiber")]
pub use fiber::{Fiber, FiberZip, ParZip, TimeoutError, either, par_zip2, par_zip3};
