//! Outcome - the closed success/failure value produced by evaluation.
//!
//! `Outcome<E, T>` holds exactly one of a domain error `E` or a result `T`.
//! It is what [`Program::eval`](super::Program::eval) returns, and the value
//! continuations in the effect algebra dispatch on.
//!
//! # Examples
//!
//! ```rust
//! use effectus::effect::Outcome;
//!
//! let outcome: Outcome<String, i32> = Outcome::success(40).map(|n| n + 2);
//! assert_eq!(outcome, Outcome::success(42));
//!
//! let failed: Outcome<String, i32> = Outcome::failure("boom".to_string());
//! assert_eq!(failed.map(|n| n + 2), Outcome::failure("boom".to_string()));
//! ```

use std::convert::Infallible;

/// The result of evaluating a program: a success or a typed domain failure.
///
/// Exactly one case holds; there is no "both" or "neither". Values are
/// immutable once built and are transformed by `map`/`map_error`/
/// `flat_map`/`fold`.
///
/// # Laws
///
/// `Outcome` forms a monad in its success channel:
///
/// - **Left Identity**: `Outcome::success(a).flat_map(f) == f(a)`
/// - **Right Identity**: `m.flat_map(Outcome::success) == m`
/// - **Associativity**:
///   `m.flat_map(f).flat_map(g) == m.flat_map(|x| f(x).flat_map(g))`
///
/// # Examples
///
/// ```rust
/// use effectus::effect::Outcome;
///
/// let doubled: Outcome<String, i32> =
///     Outcome::success(21).flat_map(|n| Outcome::success(n * 2));
/// assert_eq!(doubled, Outcome::success(42));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Outcome<E, T> {
    /// The computation produced a value.
    Success(T),
    /// The computation failed with a domain error.
    Failure(E),
}

impl<E, T> Outcome<E, T> {
    /// Creates a successful outcome.
    #[inline]
    pub const fn success(value: T) -> Self {
        Self::Success(value)
    }

    /// Creates a failed outcome.
    #[inline]
    pub const fn failure(error: E) -> Self {
        Self::Failure(error)
    }

    /// Returns `true` if this is a `Success`.
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns `true` if this is a `Failure`.
    #[inline]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Applies a function to the success value, passing failures through.
    pub fn map<T2, F>(self, function: F) -> Outcome<E, T2>
    where
        F: FnOnce(T) -> T2,
    {
        match self {
            Self::Success(value) => Outcome::Success(function(value)),
            Self::Failure(error) => Outcome::Failure(error),
        }
    }

    /// Applies a function to the error, passing successes through.
    pub fn map_error<E2, F>(self, function: F) -> Outcome<E2, T>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            Self::Success(value) => Outcome::Success(value),
            Self::Failure(error) => Outcome::Failure(function(error)),
        }
    }

    /// Chains a dependent outcome onto the success value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectus::effect::Outcome;
    ///
    /// let parsed: Outcome<String, i32> = Outcome::success("42")
    ///     .flat_map(|text: &str| match text.parse() {
    ///         Ok(number) => Outcome::success(number),
    ///         Err(_) => Outcome::failure(format!("not a number: {text}")),
    ///     });
    /// assert_eq!(parsed, Outcome::success(42));
    /// ```
    pub fn flat_map<T2, F>(self, function: F) -> Outcome<E, T2>
    where
        F: FnOnce(T) -> Outcome<E, T2>,
    {
        match self {
            Self::Success(value) => function(value),
            Self::Failure(error) => Outcome::Failure(error),
        }
    }

    /// Collapses both cases into one result.
    ///
    /// The failure handler comes first, matching the algebra's
    /// failure-continuation-first convention.
    pub fn fold<R, FE, FT>(self, on_failure: FE, on_success: FT) -> R
    where
        FE: FnOnce(E) -> R,
        FT: FnOnce(T) -> R,
    {
        match self {
            Self::Success(value) => on_success(value),
            Self::Failure(error) => on_failure(error),
        }
    }

    /// Converts into `Option<T>`, discarding a failure.
    pub fn success_value(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) => None,
        }
    }

    /// Converts into `Option<E>`, discarding a success.
    pub fn failure_value(self) -> Option<E> {
        match self {
            Self::Success(_) => None,
            Self::Failure(error) => Some(error),
        }
    }
}

impl<T> Outcome<Infallible, T> {
    /// Extracts the value from an outcome that cannot have failed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::convert::Infallible;
    /// use effectus::effect::Outcome;
    ///
    /// let outcome: Outcome<Infallible, i32> = Outcome::success(5);
    /// assert_eq!(outcome.into_success(), 5);
    /// ```
    pub fn into_success(self) -> T {
        match self {
            Self::Success(value) => value,
            Self::Failure(never) => match never {},
        }
    }
}

// =============================================================================
// N-ary Zip
// =============================================================================

/// N-ary zip over independent outcomes.
///
/// Implemented for tuples of `Outcome<E, _>` up to arity 9. The finisher
/// runs only when every element is a `Success`; otherwise the first
/// `Failure`, scanning left to right, is returned and later elements are
/// not inspected.
///
/// # Examples
///
/// ```rust
/// use effectus::effect::{Outcome, OutcomeZip};
///
/// let combined: Outcome<String, i32> = (
///     Outcome::success(1),
///     Outcome::success(2),
///     Outcome::success(3),
/// )
///     .zip_with(|(a, b, c)| a + b + c);
/// assert_eq!(combined, Outcome::success(6));
///
/// let short_circuited: Outcome<&str, i32> = (
///     Outcome::failure("first"),
///     Outcome::failure("second"),
/// )
///     .zip_with(|(a, b): (i32, i32)| a + b);
/// assert_eq!(short_circuited, Outcome::failure("first"));
/// ```
pub trait OutcomeZip<E> {
    /// The tuple of success values produced when every element succeeds.
    type Values;

    /// Combines all outcomes with the finisher, short-circuiting
    /// left-to-right on the first failure.
    fn zip_with<R, F>(self, finisher: F) -> Outcome<E, R>
    where
        F: FnOnce(Self::Values) -> R;
}

macro_rules! outcome_zip_impl {
    ($(($type_param:ident, $value:ident)),+) => {
        impl<E, $($type_param),+> OutcomeZip<E> for ($(Outcome<E, $type_param>,)+) {
            type Values = ($($type_param,)+);

            fn zip_with<R, F>(self, finisher: F) -> Outcome<E, R>
            where
                F: FnOnce(Self::Values) -> R,
            {
                let ($($value,)+) = self;
                $(
                    let $value = match $value {
                        Outcome::Success(value) => value,
                        Outcome::Failure(error) => return Outcome::Failure(error),
                    };
                )+
                Outcome::Success(finisher(($($value,)+)))
            }
        }
    };
}

outcome_zip_impl!((A1, value1), (A2, value2));
outcome_zip_impl!((A1, value1), (A2, value2), (A3, value3));
outcome_zip_impl!((A1, value1), (A2, value2), (A3, value3), (A4, value4));
outcome_zip_impl!((A1, value1), (A2, value2), (A3, value3), (A4, value4), (A5, value5));
outcome_zip_impl!(
    (A1, value1),
    (A2, value2),
    (A3, value3),
    (A4, value4),
    (A5, value5),
    (A6, value6)
);
outcome_zip_impl!(
    (A1, value1),
    (A2, value2),
    (A3, value3),
    (A4, value4),
    (A5, value5),
    (A6, value6),
    (A7, value7)
);
outcome_zip_impl!(
    (A1, value1),
    (A2, value2),
    (A3, value3),
    (A4, value4),
    (A5, value5),
    (A6, value6),
    (A7, value7),
    (A8, value8)
);
outcome_zip_impl!(
    (A1, value1),
    (A2, value2),
    (A3, value3),
    (A4, value4),
    (A5, value5),
    (A6, value6),
    (A7, value7),
    (A8, value8),
    (A9, value9)
);

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_success_and_failure_construction() {
        let success: Outcome<String, i32> = Outcome::success(1);
        let failure: Outcome<String, i32> = Outcome::failure("e".to_string());

        assert!(success.is_success());
        assert!(!success.is_failure());
        assert!(failure.is_failure());
    }

    #[rstest]
    fn test_map_only_touches_success() {
        let success: Outcome<String, i32> = Outcome::success(20);
        assert_eq!(success.map(|n| n + 1), Outcome::success(21));

        let failure: Outcome<String, i32> = Outcome::failure("e".to_string());
        assert_eq!(failure.map(|n| n + 1), Outcome::failure("e".to_string()));
    }

    #[rstest]
    fn test_map_error_only_touches_failure() {
        let failure: Outcome<String, i32> = Outcome::failure("e".to_string());
        assert_eq!(
            failure.map_error(|e| format!("<{e}>")),
            Outcome::failure("<e>".to_string())
        );

        let success: Outcome<String, i32> = Outcome::success(1);
        assert_eq!(success.map_error(|e| format!("<{e}>")), Outcome::success(1));
    }

    #[rstest]
    fn test_flat_map_short_circuits_on_failure() {
        let failure: Outcome<&str, i32> = Outcome::failure("e");
        let chained = failure.flat_map(|n| Outcome::success(n * 2));
        assert_eq!(chained, Outcome::failure("e"));
    }

    #[rstest]
    fn test_fold() {
        let success: Outcome<&str, i32> = Outcome::success(10);
        assert_eq!(success.fold(|_| 0, |n| n), 10);

        let failure: Outcome<&str, i32> = Outcome::failure("e");
        assert_eq!(failure.fold(|e| e.len() as i32, |n| n), 1);
    }

    #[rstest]
    fn test_value_extraction() {
        let success: Outcome<&str, i32> = Outcome::success(10);
        assert_eq!(success.success_value(), Some(10));

        let failure: Outcome<&str, i32> = Outcome::failure("e");
        assert_eq!(failure.failure_value(), Some("e"));
    }

    #[rstest]
    fn test_zip_combines_all_successes() {
        let combined: Outcome<&str, i32> =
            (Outcome::success(1), Outcome::success(2), Outcome::success(3), Outcome::success(4))
                .zip_with(|(a, b, c, d)| a + b + c + d);
        assert_eq!(combined, Outcome::success(10));
    }

    #[rstest]
    fn test_zip_returns_first_failure() {
        let combined: Outcome<&str, i32> = (
            Outcome::success(1),
            Outcome::failure("second"),
            Outcome::failure("third"),
        )
            .zip_with(|(a, b, c): (i32, i32, i32)| a + b + c);
        assert_eq!(combined, Outcome::failure("second"));
    }
}
