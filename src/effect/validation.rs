//! Accumulating, non-short-circuiting validation atop the effect algebra.
//!
//! [`Validation`] is plain data: valid, or invalid with an ordered list of
//! errors — never thrown, never a domain failure. [`Validator`] wraps a
//! reusable function from a subject to a `Program` producing a validation,
//! so capability-backed checks (a uniqueness lookup, say) compose with
//! pure predicate checks under the same combinators.
//!
//! Three composition modes:
//!
//! - [`and`](Validator::and) stops at the first invalid result
//! - [`or`](Validator::or) stops at the first valid result
//! - [`combine`](Validator::combine) always evaluates both sides and
//!   merges their errors in declaration order
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use effectus::effect::Validator;
//!
//! let not_empty: Validator<(), String, String> = Validator::of(
//!     |name: &String| name.clone(),
//!     |name| !name.is_empty(),
//!     |_| "name must not be empty".to_string(),
//! );
//! let short_enough: Validator<(), String, String> = Validator::of(
//!     |name: &String| name.len(),
//!     |length| *length <= 8,
//!     |length| format!("name too long: {length} characters"),
//! );
//!
//! let validator = not_empty.combine(short_enough);
//! let validation = validator
//!     .apply(&"unreasonably-long".to_string())
//!     .eval(Arc::new(()))
//!     .into_success();
//!
//! assert_eq!(validation.errors(), ["name too long: 17 characters"]);
//! ```

use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use super::program::Program;

/// The error list carried by an invalid validation. Stays inline for up to
/// four errors.
pub type ValidationErrors<E> = SmallVec<[E; 4]>;

// =============================================================================
// Validation
// =============================================================================

/// The result of validating one subject: valid, or invalid with every
/// collected error in evaluation order.
///
/// Validation errors are a third channel, separate from both domain errors
/// and panics: represented purely as data, accumulated rather than
/// short-circuited, and never thrown.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Validation<E> {
    /// The subject passed.
    Valid,
    /// The subject failed with one or more errors, in evaluation order.
    Invalid(ValidationErrors<E>),
}

impl<E> Validation<E> {
    /// The valid result.
    #[inline]
    pub fn valid() -> Self {
        Self::Valid
    }

    /// An invalid result carrying a single error.
    pub fn invalid(error: E) -> Self {
        let mut errors = ValidationErrors::new();
        errors.push(error);
        Self::Invalid(errors)
    }

    /// Returns `true` if the subject passed.
    #[inline]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Returns `true` if any error was collected.
    #[inline]
    pub const fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }

    /// The collected errors; empty when valid.
    pub fn errors(&self) -> &[E] {
        match self {
            Self::Valid => &[],
            Self::Invalid(errors) => errors,
        }
    }

    /// Consumes the validation, yielding the collected errors.
    pub fn into_errors(self) -> ValidationErrors<E> {
        match self {
            Self::Valid => ValidationErrors::new(),
            Self::Invalid(errors) => errors,
        }
    }

    /// Merges two validations, preserving left-then-right error order.
    ///
    /// Valid merged with valid stays valid; any invalid side contributes
    /// all of its errors.
    pub fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Self::Valid, other) => other,
            (invalid, Self::Valid) => invalid,
            (Self::Invalid(mut left), Self::Invalid(right)) => {
                left.extend(right);
                Self::Invalid(left)
            }
        }
    }

    /// Combines any number of validations: valid iff all are valid, else
    /// invalid with every error in evaluation order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectus::effect::Validation;
    ///
    /// let combined = Validation::combine([
    ///     Validation::invalid("first"),
    ///     Validation::valid(),
    ///     Validation::invalid("third"),
    /// ]);
    /// assert_eq!(combined.errors(), ["first", "third"]);
    /// ```
    pub fn combine<I>(validations: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        validations
            .into_iter()
            .fold(Self::Valid, |accumulated, next| accumulated.merge(next))
    }
}

// =============================================================================
// Validator
// =============================================================================

/// A reusable validation rule: a function from a subject to a program
/// producing a [`Validation`].
///
/// The program's error channel is [`Infallible`] — validators report
/// through validation data, never through domain failures. Validators are
/// cheaply cloneable and applicable to any number of subjects.
pub struct Validator<S, T, E> {
    run: Arc<dyn Fn(&T) -> Program<S, Infallible, Validation<E>> + Send + Sync>,
}

impl<S, T, E> Clone for Validator<S, T, E> {
    fn clone(&self) -> Self {
        Self {
            run: Arc::clone(&self.run),
        }
    }
}

impl<S, T, E> fmt::Debug for Validator<S, T, E> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("Validator").finish_non_exhaustive()
    }
}

impl<S, T, E> Validator<S, T, E>
where
    S: Send + Sync + 'static,
    T: 'static,
    E: Send + 'static,
{
    /// Wraps an arbitrary rule function.
    ///
    /// Use this for capability-backed rules that need a leaf or
    /// suspension; pure predicate rules are simpler to build with
    /// [`of`](Validator::of).
    pub fn from_fn<F>(function: F) -> Self
    where
        F: Fn(&T) -> Program<S, Infallible, Validation<E>> + Send + Sync + 'static,
    {
        Self {
            run: Arc::new(function),
        }
    }

    /// Builds a predicate rule over an accessed projection of the subject.
    ///
    /// Valid when the predicate holds for the projection, otherwise
    /// invalid with `error_mapper(projection)`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use effectus::effect::Validator;
    ///
    /// let positive: Validator<(), i64, String> = Validator::of(
    ///     |amount: &i64| *amount,
    ///     |amount| *amount > 0,
    ///     |amount| format!("amount must be positive, got {amount}"),
    /// );
    ///
    /// let validation = positive.apply(&-3).eval(Arc::new(())).into_success();
    /// assert_eq!(validation.errors(), ["amount must be positive, got -3"]);
    /// ```
    pub fn of<P, A, Pred, M>(accessor: A, predicate: Pred, error_mapper: M) -> Self
    where
        P: Send + 'static,
        A: Fn(&T) -> P + Send + Sync + 'static,
        Pred: Fn(&P) -> bool + Send + Sync + 'static,
        M: Fn(P) -> E + Send + Sync + 'static,
    {
        Self::from_fn(move |subject| {
            let projection = accessor(subject);
            if predicate(&projection) {
                Program::success(Validation::valid())
            } else {
                Program::success(Validation::invalid(error_mapper(projection)))
            }
        })
    }

    /// Produces the validation program for one subject.
    pub fn apply(&self, subject: &T) -> Program<S, Infallible, Validation<E>> {
        (self.run)(subject)
    }

    /// Both rules must pass; evaluation stops at the first invalid result.
    pub fn and(self, other: Self) -> Self {
        Self::from_fn(move |subject| {
            let first = self.apply(subject);
            let second = other.apply(subject);
            first.flat_map(move |validation| {
                if validation.is_valid() {
                    second
                } else {
                    Program::success(validation)
                }
            })
        })
    }

    /// Either rule may pass; evaluation stops at the first valid result.
    /// When both fail, the second rule's errors are reported.
    pub fn or(self, other: Self) -> Self {
        Self::from_fn(move |subject| {
            let first = self.apply(subject);
            let second = other.apply(subject);
            first.flat_map(move |validation| {
                if validation.is_valid() {
                    Program::success(validation)
                } else {
                    second
                }
            })
        })
    }

    /// Always evaluates both rules and merges their errors in declaration
    /// order.
    pub fn combine(self, other: Self) -> Self {
        Self::from_fn(move |subject| {
            let first = self.apply(subject);
            let second = other.apply(subject);
            first.flat_map(move |first_validation| {
                second.map(move |second_validation| first_validation.merge(second_validation))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn run<E: Send + 'static>(program: Program<(), Infallible, Validation<E>>) -> Validation<E> {
        program.eval(Arc::new(())).into_success()
    }

    fn counting_rule(
        counter: &Arc<AtomicUsize>,
        verdict: Validation<String>,
    ) -> Validator<(), i32, String> {
        let counter = Arc::clone(counter);
        Validator::from_fn(move |_subject| {
            let counter = Arc::clone(&counter);
            let verdict = verdict.clone();
            Program::task(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                verdict
            })
        })
    }

    #[rstest]
    fn test_of_checks_predicate_on_projection() {
        let even: Validator<(), i32, String> = Validator::of(
            |subject: &i32| *subject,
            |value| value % 2 == 0,
            |value| format!("{value} is odd"),
        );

        assert!(run(even.apply(&4)).is_valid());
        assert_eq!(run(even.apply(&5)).errors(), ["5 is odd"]);
    }

    #[rstest]
    fn test_and_short_circuits_on_first_invalid() {
        let calls = Arc::new(AtomicUsize::new(0));
        let first = counting_rule(&calls, Validation::invalid("first".to_string()));
        let second = counting_rule(&calls, Validation::valid());

        let validation = run(first.and(second).apply(&0));

        assert_eq!(validation.errors(), ["first"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    fn test_or_short_circuits_on_first_valid() {
        let calls = Arc::new(AtomicUsize::new(0));
        let first = counting_rule(&calls, Validation::valid());
        let second = counting_rule(&calls, Validation::invalid("second".to_string()));

        let validation = run(first.or(second).apply(&0));

        assert!(validation.is_valid());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    fn test_or_reports_second_errors_when_both_fail() {
        let calls = Arc::new(AtomicUsize::new(0));
        let first = counting_rule(&calls, Validation::invalid("first".to_string()));
        let second = counting_rule(&calls, Validation::invalid("second".to_string()));

        let validation = run(first.or(second).apply(&0));

        assert_eq!(validation.errors(), ["second"]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[rstest]
    fn test_combine_evaluates_both_and_preserves_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let first = counting_rule(&calls, Validation::invalid("first".to_string()));
        let second = counting_rule(&calls, Validation::invalid("second".to_string()));

        let validation = run(first.combine(second).apply(&0));

        assert_eq!(validation.errors(), ["first", "second"]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[rstest]
    fn test_validation_combine_is_valid_iff_all_valid() {
        let all_valid: Validation<&str> =
            Validation::combine([Validation::valid(), Validation::valid()]);
        assert!(all_valid.is_valid());

        let mixed = Validation::combine([
            Validation::invalid("a"),
            Validation::valid(),
            Validation::invalid("b"),
        ]);
        assert_eq!(mixed.errors(), ["a", "b"]);
    }

    #[rstest]
    fn test_merge_preserves_order() {
        let merged = Validation::invalid("x").merge(Validation::invalid("y"));
        assert_eq!(merged.errors(), ["x", "y"]);
        assert_eq!(merged.into_errors().into_vec(), vec!["x", "y"]);
    }
}
