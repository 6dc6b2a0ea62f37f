//! Sequencing families: `pipe!`, `chain!`, and the n-ary zip.
//!
//! These combinators assemble multi-stage programs without changing their
//! evaluation model: everything here is strict, sequential, left-to-right
//! data construction over [`Program`]. The parallel counterparts live in
//! the fiber module.
//!
//! One generic tuple family replaces hand-written fixed-arity combinators:
//! [`ProgramZip`] is implemented for tuples of programs up to arity 9, and
//! [`zip2`]/[`zip3`] are thin convenience wrappers over it.

use super::program::Program;

/// Pipes a program through a series of dependent stages from left to right.
///
/// `pipe!(p, f, g)` is equivalent to `p.flat_map(f).flat_map(g)`: each
/// stage receives the prior stage's success value and returns the next
/// program. Failures short-circuit the rest of the pipeline.
///
/// # Syntax
///
/// - `pipe!(p)` - Returns `p` unchanged
/// - `pipe!(p, f)` - Returns `p.flat_map(f)`
/// - `pipe!(p, f, g, ...)` - Returns `p.flat_map(f).flat_map(g)...`
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use effectus::pipe;
/// use effectus::effect::{Outcome, Program};
///
/// let program: Program<(), String, i32> = pipe!(
///     Program::success(10),
///     |x| Program::success(x + 1),
///     |x| Program::success(x * 2),
/// );
/// assert_eq!(program.eval(Arc::new(())), Outcome::success(22));
/// ```
#[macro_export]
macro_rules! pipe {
    ($program:expr $(,)?) => { $program };
    ($program:expr, $stage:expr $(, $rest:expr)* $(,)?) => {
        $crate::pipe!($program.flat_map($stage) $(, $rest)*)
    };
}

/// Chains pure transformations over a program from left to right.
///
/// `chain!(p, f, g)` is equivalent to `p.map(f).map(g)`: each stage is a
/// plain function over the prior value, introducing no new effects.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use effectus::chain;
/// use effectus::effect::{Outcome, Program};
///
/// let program: Program<(), String, String> = chain!(
///     Program::success(41),
///     |x| x + 1,
///     |x| format!("got {x}"),
/// );
/// assert_eq!(
///     program.eval(Arc::new(())),
///     Outcome::success("got 42".to_string()),
/// );
/// ```
#[macro_export]
macro_rules! chain {
    ($program:expr $(,)?) => { $program };
    ($program:expr, $stage:expr $(, $rest:expr)* $(,)?) => {
        $crate::chain!($program.map($stage) $(, $rest)*)
    };
}

// =============================================================================
// N-ary Sequential Zip
// =============================================================================

/// N-ary sequential zip over independent programs.
///
/// Implemented for tuples of `Program<S, E, _>` up to arity 9. All
/// elements are evaluated against the same state, strictly left to right,
/// on the calling thread; the first failure short-circuits and later
/// elements are never evaluated (their side effects do not happen). The
/// finisher combines the success values once every element has produced
/// one.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use effectus::effect::{Outcome, Program, ProgramZip};
///
/// let combined: Program<(), String, i32> = (
///     Program::success(1),
///     Program::success(2),
///     Program::success(3),
/// )
///     .zip_with(|(a, b, c)| a + b + c);
/// assert_eq!(combined.eval(Arc::new(())), Outcome::success(6));
/// ```
pub trait ProgramZip<S, E> {
    /// The tuple of success values produced when every element succeeds.
    type Values;

    /// Evaluates all elements sequentially and combines their values with
    /// the finisher, short-circuiting left-to-right on the first failure.
    fn zip_with<R, F>(self, finisher: F) -> Program<S, E, R>
    where
        R: Send + 'static,
        F: FnOnce(Self::Values) -> R + Send + 'static;
}

macro_rules! zip_chain {
    ($finisher:ident, ($($acc:ident),*), ($program:ident, $value:ident)) => {
        $program.map(move |$value| $finisher(($($acc,)* $value,)))
    };
    ($finisher:ident, ($($acc:ident),*), ($program:ident, $value:ident), $($rest:tt),+) => {
        $program.flat_map(move |$value| zip_chain!($finisher, ($($acc,)* $value), $($rest),+))
    };
}

macro_rules! program_zip_impl {
    ($(($type_param:ident, $program:ident, $value:ident)),+) => {
        impl<S, E, $($type_param),+> ProgramZip<S, E> for ($(Program<S, E, $type_param>,)+)
        where
            S: Send + Sync + 'static,
            E: Send + 'static,
            $($type_param: Send + 'static),+
        {
            type Values = ($($type_param,)+);

            fn zip_with<R, F>(self, finisher: F) -> Program<S, E, R>
            where
                R: Send + 'static,
                F: FnOnce(Self::Values) -> R + Send + 'static,
            {
                let ($($program,)+) = self;
                zip_chain!(finisher, (), $(($program, $value)),+)
            }
        }
    };
}

program_zip_impl!((A1, program1, value1), (A2, program2, value2));
program_zip_impl!((A1, program1, value1), (A2, program2, value2), (A3, program3, value3));
program_zip_impl!(
    (A1, program1, value1),
    (A2, program2, value2),
    (A3, program3, value3),
    (A4, program4, value4)
);
program_zip_impl!(
    (A1, program1, value1),
    (A2, program2, value2),
    (A3, program3, value3),
    (A4, program4, value4),
    (A5, program5, value5)
);
program_zip_impl!(
    (A1, program1, value1),
    (A2, program2, value2),
    (A3, program3, value3),
    (A4, program4, value4),
    (A5, program5, value5),
    (A6, program6, value6)
);
program_zip_impl!(
    (A1, program1, value1),
    (A2, program2, value2),
    (A3, program3, value3),
    (A4, program4, value4),
    (A5, program5, value5),
    (A6, program6, value6),
    (A7, program7, value7)
);
program_zip_impl!(
    (A1, program1, value1),
    (A2, program2, value2),
    (A3, program3, value3),
    (A4, program4, value4),
    (A5, program5, value5),
    (A6, program6, value6),
    (A7, program7, value7),
    (A8, program8, value8)
);
program_zip_impl!(
    (A1, program1, value1),
    (A2, program2, value2),
    (A3, program3, value3),
    (A4, program4, value4),
    (A5, program5, value5),
    (A6, program6, value6),
    (A7, program7, value7),
    (A8, program8, value8),
    (A9, program9, value9)
);

// =============================================================================
// Fixed-Arity Convenience Wrappers
// =============================================================================

/// Zips two programs with a two-argument finisher.
///
/// Convenience wrapper over [`ProgramZip`] for the most common arity.
pub fn zip2<S, E, A, B, R, F>(
    first: Program<S, E, A>,
    second: Program<S, E, B>,
    finisher: F,
) -> Program<S, E, R>
where
    S: Send + Sync + 'static,
    E: Send + 'static,
    A: Send + 'static,
    B: Send + 'static,
    R: Send + 'static,
    F: FnOnce(A, B) -> R + Send + 'static,
{
    (first, second).zip_with(move |(a, b)| finisher(a, b))
}

/// Zips three programs with a three-argument finisher.
pub fn zip3<S, E, A, B, C, R, F>(
    first: Program<S, E, A>,
    second: Program<S, E, B>,
    third: Program<S, E, C>,
    finisher: F,
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
    (first, second, third).zip_with(move |(a, b, c)| finisher(a, b, c))
}
