//! Selectors: pure derivations of a value from state.
//!
//! Any `Fn(&S) -> T` is a [`Selector`] when `T` can be compared and cloned,
//! so plain functions serve as named selectors:
//!
//! ```
//! use statecraft_core::selector::Selector;
//!
//! fn total(values: &Vec<u32>) -> u32 {
//!     values.iter().sum()
//! }
//!
//! assert_eq!(total.select(&vec![1, 2, 3]), 6);
//! ```
//!
//! [`Memoized`] caches a selector's output against the identity of the last
//! snapshot it saw, which is how stores decide whether to notify subscribers.

use std::sync::{Arc, Weak};

/// A pure projection of state.
///
/// Implementations must be referentially transparent: equal states yield
/// equal outputs.
pub trait Selector<S>: Send + Sync + 'static {
    /// The derived value
    type Output: Clone + PartialEq + Send + 'static;

    /// Derive the value from `state`
    fn select(&self, state: &S) -> Self::Output;
}

impl<S, T, F> Selector<S> for F
where
    F: Fn(&S) -> T + Send + Sync + 'static,
    T: Clone + PartialEq + Send + 'static,
{
    type Output = T;

    fn select(&self, state: &S) -> T {
        self(state)
    }
}

/// A selector together with its last output.
///
/// The cache key is the identity of the snapshot (`Arc` pointer). A weak
/// reference keeps the allocation reserved, so a new snapshot can never
/// alias a stale key.
pub struct Memoized<S, Sel: Selector<S>> {
    selector: Sel,
    last_state: Option<Weak<S>>,
    last_output: Option<Sel::Output>,
}

impl<S, Sel: Selector<S>> Memoized<S, Sel> {
    /// Wrap `selector` with an empty cache
    #[must_use]
    pub const fn new(selector: Sel) -> Self {
        Self {
            selector,
            last_state: None,
            last_output: None,
        }
    }

    /// Wrap `selector` and prime the cache with `state`
    #[must_use]
    pub fn primed(selector: Sel, state: &Arc<S>) -> Self {
        let mut memo = Self::new(selector);
        memo.select(state);
        memo
    }

    /// Output for `state`, recomputed only when `state` is a different snapshot
    pub fn select(&mut self, state: &Arc<S>) -> Sel::Output {
        if let (true, Some(output)) = (self.is_current(state), &self.last_output) {
            return output.clone();
        }
        let output = self.selector.select(state);
        self.last_state = Some(Arc::downgrade(state));
        self.last_output = Some(output.clone());
        output
    }

    /// Observe `state`, returning the new output only if it differs from the
    /// previous one
    pub fn refresh(&mut self, state: &Arc<S>) -> Option<&Sel::Output> {
        if self.is_current(state) {
            return None;
        }
        let output = self.selector.select(state);
        self.last_state = Some(Arc::downgrade(state));
        if self.last_output.as_ref() == Some(&output) {
            return None;
        }
        self.last_output = Some(output);
        self.last_output.as_ref()
    }

    /// The last computed output, if any
    #[must_use]
    pub const fn current(&self) -> Option<&Sel::Output> {
        self.last_output.as_ref()
    }

    fn is_current(&self, state: &Arc<S>) -> bool {
        self.last_state
            .as_ref()
            .is_some_and(|last| std::ptr::eq(last.as_ptr(), Arc::as_ptr(state)))
    }
}

impl<S, Sel: Selector<S>> std::fmt::Debug for Memoized<S, Sel>
where
    Sel::Output: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memoized")
            .field("last_output", &self.last_output)
            .finish_non_exhaustive()
    }
}
