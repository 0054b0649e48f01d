//! Middleware chain contract.
//!
//! A middleware link sits between `send` and the reducer. It receives the
//! current snapshot and the action, may substitute either, and continues the
//! chain through [`Next::run`]. Links execute in registration order, each one
//! wrapping the rest of the chain; the last registered link is the one
//! closest to the reducer.
//!
//! # Call-once continuation
//!
//! [`Next`] is consumed by [`Next::run`], and [`Proceeded`] can only be
//! obtained from it. Because [`Middleware::handle`] must return a `Proceeded`,
//! every normal path through a link continues the chain exactly once. A link
//! that forgets to call `next` does not compile.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use statecraft_core::middleware::{Middleware, Next, Proceeded};
//! use statecraft_core::reducer::Reducer;
//! use statecraft_core::{Effects, SmallVec};
//!
//! #[derive(Clone, Debug, Default)]
//! struct Names(Vec<String>);
//!
//! #[derive(Clone, Debug)]
//! enum NameAction {
//!     Push(String),
//!     Reset,
//! }
//!
//! struct NameReducer;
//!
//! impl Reducer for NameReducer {
//!     type State = Names;
//!     type Action = NameAction;
//!     type Environment = ();
//!     type Error = std::convert::Infallible;
//!
//!     fn reduce(&self, state: &mut Names, action: NameAction, _env: &()) -> Result<Effects<NameAction>, Self::Error> {
//!         if let NameAction::Push(name) = action {
//!             state.0.push(name);
//!         }
//!         Ok(SmallVec::new())
//!     }
//! }
//!
//! /// Clears the list before the reducer sees a `Reset`.
//! struct ResetLink;
//!
//! impl Middleware<NameReducer> for ResetLink {
//!     fn handle(&self, state: Arc<Names>, action: NameAction, next: Next<'_, NameReducer>) -> Proceeded<NameReducer> {
//!         match action {
//!             NameAction::Reset => next.run(Arc::new(Names::default()), action),
//!             _ => next.run(state, action),
//!         }
//!     }
//! }
//! ```

use std::sync::Arc;

use crate::reducer::Reducer;
use crate::Effects;

/// Result of running the remainder of a chain: the reducer's verdict.
pub type Outcome<R> = Result<Effects<<R as Reducer>::Action>, <R as Reducer>::Error>;

/// The reduction a chain ends in.
///
/// Receives the (possibly substituted) snapshot and action that reached the
/// end of the chain.
pub type Terminal<'a, R> =
    dyn FnMut(Arc<<R as Reducer>::State>, <R as Reducer>::Action) -> Outcome<R> + 'a;

/// An interceptor in the dispatch pipeline.
///
/// Implementations must not block: long running work belongs in effects
/// returned by the reducer, not in the chain.
pub trait Middleware<R: Reducer>: Send + Sync {
    /// Inspect `action` and continue the chain through `next`.
    ///
    /// `state` is the snapshot the reducer would see if nothing were
    /// substituted. Pass a different snapshot to `next.run` to replace it.
    fn handle(&self, state: Arc<R::State>, action: R::Action, next: Next<'_, R>) -> Proceeded<R>;
}

/// Continuation capability handed to each link.
///
/// Holds the links that have not run yet and the terminal reduction.
pub struct Next<'a, R: Reducer> {
    rest: &'a [Arc<dyn Middleware<R>>],
    terminal: &'a mut Terminal<'a, R>,
}

impl<'a, R: Reducer> Next<'a, R> {
    /// Continue the chain with `state` and `action`.
    ///
    /// Consumes the capability; the returned [`Proceeded`] must be returned
    /// from [`Middleware::handle`].
    #[must_use]
    pub fn run(self, state: Arc<R::State>, action: R::Action) -> Proceeded<R> {
        match self.rest.split_first() {
            Some((link, rest)) => link.handle(
                state,
                action,
                Next {
                    rest,
                    terminal: self.terminal,
                },
            ),
            None => Proceeded {
                outcome: (self.terminal)(state, action),
            },
        }
    }

    /// Number of links still ahead of the reducer.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.rest.len()
    }
}

/// Proof that a link continued the chain, carrying the reducer's verdict.
///
/// Only [`Next::run`] constructs this type.
#[must_use = "a link must return the Proceeded it received from Next::run"]
pub struct Proceeded<R: Reducer> {
    outcome: Outcome<R>,
}

impl<R: Reducer> Proceeded<R> {
    /// Whether the reducer rejected the action
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        self.outcome.is_err()
    }

    /// The rejection, if the reducer rejected the action
    #[must_use]
    pub const fn rejection(&self) -> Option<&R::Error> {
        match &self.outcome {
            Ok(_) => None,
            Err(error) => Some(error),
        }
    }

    /// Take the reducer's verdict
    ///
    /// # Errors
    ///
    /// Returns the reducer's error when the action was rejected.
    pub fn into_outcome(self) -> Outcome<R> {
        self.outcome
    }
}

impl<R: Reducer> std::fmt::Debug for Proceeded<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proceeded")
            .field("rejected", &self.is_rejected())
            .finish_non_exhaustive()
    }
}

/// Run `action` through `links` in order, ending in `terminal`.
///
/// # Errors
///
/// Returns the reducer's error when the terminal reduction rejects the action.
pub fn dispatch_through<'a, R: Reducer>(
    links: &'a [Arc<dyn Middleware<R>>],
    state: Arc<R::State>,
    action: R::Action,
    terminal: &'a mut Terminal<'a, R>,
) -> Outcome<R> {
    Next {
        rest: links,
        terminal,
    }
    .run(state, action)
    .into_outcome()
}
