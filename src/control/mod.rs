//! Control structures underpinning the effect system.
//!
//! - [`Either`]: a value that is one of two types (race results, and the
//!   resume type of [`Trampoline`])
//! - [`Trampoline`]: stack-safe deferred computation driven by an explicit
//!   loop instead of native recursion
//!
//! # Examples
//!
//! ```rust
//! use effectus::control::Trampoline;
//!
//! fn count_down(n: u64) -> Trampoline<u64> {
//!     if n == 0 {
//!         Trampoline::done(0)
//!     } else {
//!         Trampoline::more(move || count_down(n - 1))
//!     }
//! }
//!
//! // Would overflow the native stack as plain recursion.
//! assert_eq!(count_down(100_000).run(), 0);
//! ```

mod either;
mod trampoline;

pub use either::Either;
pub use trampoline::Trampoline;
