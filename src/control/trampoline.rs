//! Stack-safe deferred computation via trampolining.
//!
//! Rust does not guarantee tail-call optimization, so deeply recursive
//! evaluation overflows the native stack. `Trampoline<A>` encodes each
//! recursive step as data and interprets the structure in an explicit loop,
//! bounding composition depth by heap instead of stack. The effect
//! evaluator drives every program through this type.
//!
//! # Examples
//!
//! ```rust
//! use effectus::control::Trampoline;
//!
//! fn sum_to(n: u64, accumulator: u64) -> Trampoline<u64> {
//!     if n == 0 {
//!         Trampoline::done(accumulator)
//!     } else {
//!         Trampoline::more(move || sum_to(n - 1, accumulator + n))
//!     }
//! }
//!
//! assert_eq!(sum_to(100_000, 0).run(), 5_000_050_000);
//! ```

use super::either::Either;

/// Internal trait for type erasure in chained continuations.
///
/// Chaining stores a continuation whose intermediate type differs from the
/// final result type; erasing it behind this trait lets both live in the
/// same `Trampoline` variant.
trait ChainStep<A> {
    /// Executes one step of the chain, producing the next trampoline state.
    fn step(self: Box<Self>) -> Trampoline<A>;
}

/// Wrapper hiding the erasure trait from the public enum.
#[doc(hidden)]
pub struct ChainBox<A>(Box<dyn ChainStep<A>>);

impl<A> ChainBox<A> {
    fn new<C: ChainStep<A> + 'static>(chain: C) -> Self {
        Self(Box::new(chain))
    }

    fn step(self) -> Trampoline<A> {
        self.0.step()
    }
}

/// A potentially recursive computation producing an `A`, run iteratively.
///
/// # Invariant
///
/// [`run`](Trampoline::run) consumes `More` nodes in an explicit loop, never
/// via native recursion, so composition depth is bounded only by heap.
///
/// # Laws
///
/// `Trampoline` forms a monad:
///
/// - **Left Identity**: `Trampoline::done(a).flat_map(f).run() == f(a).run()`
/// - **Right Identity**: `m.flat_map(Trampoline::done).run() == m.run()`
/// - **Associativity**:
///   `m.flat_map(f).flat_map(g).run() == m.flat_map(|x| f(x).flat_map(g)).run()`
///
/// # Examples
///
/// ```rust
/// use effectus::control::Trampoline;
///
/// let result = Trampoline::more(|| Trampoline::done(21)).map(|x| x * 2);
/// assert_eq!(result.run(), 42);
/// ```
pub enum Trampoline<A> {
    /// The computation has finished with a value.
    Done(A),
    /// The computation needs another step; the thunk produces the next state.
    More(Box<dyn FnOnce() -> Trampoline<A> + 'static>),
    /// Internal chaining state for `flat_map` composition.
    #[doc(hidden)]
    Chain(ChainBox<A>),
}

impl<A> Trampoline<A> {
    /// Creates a finished trampoline holding the given value.
    #[inline]
    pub fn done(value: A) -> Self {
        Self::Done(value)
    }

    /// Creates a deferred trampoline continuing with the given thunk.
    ///
    /// The thunk is not evaluated until [`run`](Trampoline::run) or
    /// [`resume`](Trampoline::resume) reaches it.
    #[inline]
    pub fn more<F>(thunk: F) -> Self
    where
        F: FnOnce() -> Trampoline<A> + 'static,
    {
        Self::More(Box::new(thunk))
    }
}

impl<A: 'static> Trampoline<A> {
    /// Runs the trampoline to completion in constant stack space.
    pub fn run(self) -> A {
        let mut current = self;

        loop {
            match current {
                Self::Done(value) => return value,
                Self::More(thunk) => {
                    current = thunk();
                }
                Self::Chain(chain) => {
                    current = chain.step();
                }
            }
        }
    }

    /// Takes a single step, exposing either the remaining work or the value.
    ///
    /// Returns `Left(thunk)` when another step remains and `Right(value)`
    /// when the computation finished. Evaluators that interleave work with
    /// bookkeeping (a fiber checking its cancellation flag) drive this in
    /// their own loop instead of calling [`run`](Trampoline::run).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effectus::control::{Either, Trampoline};
    ///
    /// let mut current = Trampoline::more(|| Trampoline::done(7));
    /// loop {
    ///     match current.resume() {
    ///         Either::Left(thunk) => current = thunk(),
    ///         Either::Right(value) => {
    ///             assert_eq!(value, 7);
    ///             break;
    ///         }
    ///     }
    /// }
    /// ```
    pub fn resume(self) -> Either<Box<dyn FnOnce() -> Trampoline<A> + 'static>, A> {
        let mut current = self;

        loop {
            match current {
                Self::Done(value) => return Either::Right(value),
                Self::More(thunk) => return Either::Left(thunk),
                Self::Chain(chain) => {
                    current = chain.step();
                }
            }
        }
    }

    /// Applies a function to the final value.
    pub fn map<B, F>(self, function: F) -> Trampoline<B>
    where
        F: FnOnce(A) -> B + 'static,
        B: 'static,
    {
        self.flat_map(move |value| Trampoline::done(function(value)))
    }

    /// Chains a dependent trampoline onto the final value.
    ///
    /// This is monadic bind; the chain node keeps composition iterative even
    /// when binds nest arbitrarily deep.
    pub fn flat_map<B, F>(self, function: F) -> Trampoline<B>
    where
        F: FnOnce(A) -> Trampoline<B> + 'static,
        B: 'static,
    {
        Trampoline::Chain(ChainBox::new(ChainNode {
            trampoline: self,
            function,
        }))
    }
}

/// Chain node capturing the current state and the pending continuation.
struct ChainNode<A, B, F>
where
    F: FnOnce(A) -> Trampoline<B>,
{
    trampoline: Trampoline<A>,
    function: F,
}

impl<A: 'static, B: 'static, F> ChainStep<B> for ChainNode<A, B, F>
where
    F: FnOnce(A) -> Trampoline<B> + 'static,
{
    fn step(self: Box<Self>) -> Trampoline<B> {
        match self.trampoline {
            Trampoline::Done(value) => (self.function)(value),
            Trampoline::More(thunk) => {
                let function = self.function;
                Trampoline::more(move || thunk().flat_map(function))
            }
            Trampoline::Chain(inner) => {
                // Associativity: (m >>= f) >>= g == m >>= (\x -> f x >>= g)
                let function = self.function;
                inner.step().flat_map(function)
            }
        }
    }
}

impl<A: std::fmt::Debug> std::fmt::Debug for Trampoline<A> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Done(value) => formatter.debug_tuple("Done").field(value).finish(),
            Self::More(_) => formatter.debug_tuple("More").field(&"<thunk>").finish(),
            Self::Chain(_) => formatter.debug_tuple("Chain").field(&"<chain>").finish(),
        }
    }
}
