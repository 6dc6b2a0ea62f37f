//! # effectus
//!
//! A composable effect description and evaluation library for Rust.
//!
//! ## Overview
//!
//! Effectful computations — ones that may fail with a typed domain error,
//! suspend on asynchronous work, or run concurrently — are represented as
//! immutable data ([`Program`](effect::Program)) and only executed when
//! handed to a stack-safe, trampolined evaluator. It includes:
//!
//! - **Outcome**: a closed success/failure value with map/flat_map/fold
//! - **Trampoline**: stack-safe deferred computation driven by an explicit loop
//! - **Program**: the effect algebra — describe now, evaluate later
//! - **Fiber**: cancellable handles to forked evaluations, with race and
//!   parallel-zip combinators over a caller-owned thread pool
//! - **Validation**: accumulating, non-short-circuiting multi-error validation
//!
//! ## Feature Flags
//!
//! - `validation`: accumulating validation built atop the effect algebra
//! - `fiber`: fibers, fork/join, race, parallel zip, timeout
//! - `async`: `Executor` adapter for a tokio runtime handle
//! - `rayon`: `Executor` adapter for a rayon thread pool
//! - `serde`: serde derives for `Either` and `Outcome`
//! - `full`: enable everything
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use effectus::effect::{Outcome, Program};
//!
//! let program: Program<(), String, i32> = Program::success(20)
//!     .map(|x| x + 1)
//!     .flat_map(|x| Program::success(x * 2));
//!
//! // Nothing has run yet; evaluation produces the final outcome.
//! assert_eq!(program.eval(Arc::new(())), Outcome::success(42));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// Re-exports commonly used types and traits.
///
/// # Usage
///
/// ```rust
/// use effectus::prelude::*;
/// ```
pub mod prelude {

    pub use crate::control::*;

    pub use crate::effect::*;
}

pub mod control;

pub mod effect;
