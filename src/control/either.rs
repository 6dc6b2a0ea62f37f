//! Either type - a value that can be one of two types.
//!
//! `Either<L, R>` is the crate's disjoint-union value. It tags the result of
//! a fiber race (left winner vs right winner) and is the return type of
//! [`Trampoline::resume`](super::Trampoline::resume), where `Left` carries
//! the remaining work and `Right` the finished value.
//!
//! # Examples
//!
//! ```rust
//! use effectus::control::Either;
//!
//! let winner: Either<&str, i32> = Either::Right(42);
//!
//! let described = winner.fold(
//!     |label| format!("left: {label}"),
//!     |value| format!("right: {value}"),
//! );
//! assert_eq!(described, "right: 42");
//! ```

/// A value that is either `Left(L)` or `Right(R)`.
///
/// Unlike `Result`, neither side carries a judgement: both are ordinary
/// alternatives. Race combinators use `Left` for the first contestant and
/// `Right` for the second.
///
/// # Examples
///
/// ```rust
/// use effectus::control::Either;
///
/// let first: Either<i32, String> = Either::Left(1);
/// assert!(first.is_left());
/// assert_eq!(first.map_left(|n| n + 1), Either::Left(2));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Either<L, R> {
    /// The first alternative.
    Left(L),
    /// The second alternative.
    Right(R),
}

impl<L, R> Either<L, R> {
    /// Returns `true` if this is a `Left` value.
    #[inline]
    pub const fn is_left(&self) -> bool {
        matches!(self, Self::Left(_))
    }

    /// Returns `true` if this is a `Right` value.
    #[inline]
    pub const fn is_right(&self) -> bool {
        matches!(self, Self::Right(_))
    }

    /// Converts into `Option<L>`, discarding a `Right` value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectus::control::Either;
    ///
    /// let left: Either<i32, &str> = Either::Left(7);
    /// assert_eq!(left.left(), Some(7));
    ///
    /// let right: Either<i32, &str> = Either::Right("x");
    /// assert_eq!(right.left(), None);
    /// ```
    pub fn left(self) -> Option<L> {
        match self {
            Self::Left(value) => Some(value),
            Self::Right(_) => None,
        }
    }

    /// Converts into `Option<R>`, discarding a `Left` value.
    pub fn right(self) -> Option<R> {
        match self {
            Self::Left(_) => None,
            Self::Right(value) => Some(value),
        }
    }

    /// Applies a function to a `Left` value, leaving `Right` untouched.
    pub fn map_left<L2, F>(self, function: F) -> Either<L2, R>
    where
        F: FnOnce(L) -> L2,
    {
        match self {
            Self::Left(value) => Either::Left(function(value)),
            Self::Right(value) => Either::Right(value),
        }
    }

    /// Applies a function to a `Right` value, leaving `Left` untouched.
    pub fn map_right<R2, F>(self, function: F) -> Either<L, R2>
    where
        F: FnOnce(R) -> R2,
    {
        match self {
            Self::Left(value) => Either::Left(value),
            Self::Right(value) => Either::Right(function(value)),
        }
    }

    /// Collapses both cases into one result.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectus::control::Either;
    ///
    /// let value: Either<i32, i32> = Either::Left(2);
    /// assert_eq!(value.fold(|l| l * 10, |r| r), 20);
    /// ```
    pub fn fold<T, FL, FR>(self, on_left: FL, on_right: FR) -> T
    where
        FL: FnOnce(L) -> T,
        FR: FnOnce(R) -> T,
    {
        match self {
            Self::Left(value) => on_left(value),
            Self::Right(value) => on_right(value),
        }
    }

    /// Swaps the two sides.
    pub fn swap(self) -> Either<R, L> {
        match self {
            Self::Left(value) => Either::Right(value),
            Self::Right(value) => Either::Left(value),
        }
    }
}
