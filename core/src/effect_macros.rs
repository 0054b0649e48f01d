//! Declarative macros for ergonomic effect construction
//!
//! These macros reduce boilerplate when a reducer returns effects, most
//! commonly a single async call whose result is fed back as an action.

/// Build an [`Effects`](crate::Effects) collection from a list of effects
///
/// `effects![]` yields an empty collection (no side effects).
///
/// # Example
///
/// ```rust
/// use statecraft_core::{effects, effect::Effect, Effects};
///
/// let none: Effects<u8> = effects![];
/// assert!(none.is_empty());
///
/// let one: Effects<u8> = effects![Effect::None];
/// assert_eq!(one.len(), 1);
/// ```
#[macro_export]
macro_rules! effects {
    () => {
        $crate::SmallVec::new()
    };
    ($($effect:expr),+ $(,)?) => {
        $crate::smallvec![$($effect),+]
    };
}

/// Create an `Effect::Future` from an async block
///
/// The block evaluates to `Option<Action>`; `Some` is fed back into the store.
///
/// # Example
///
/// ```rust,ignore
/// use statecraft_core::async_effect;
///
/// async_effect! {
///     match source.fetch_all_items().await {
///         Ok(items) => Some(TodoAction::FetchLoaded { ticket, items }),
///         Err(error) => Some(TodoAction::FetchFailed { ticket, error }),
///     }
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Delay` for scheduling delayed actions
///
/// # Example
///
/// ```rust,ignore
/// use statecraft_core::delay;
/// use std::time::Duration;
///
/// delay! {
///     duration: Duration::from_secs(5),
///     action: TodoAction::FetchAll
/// }
/// ```
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::effect::Effect;
    use crate::Effects;
    use std::time::Duration;

    #[derive(Clone, Debug)]
    enum TestAction {
        Loaded { value: i32 },
        Refresh,
    }

    #[test]
    fn test_async_effect_macro() {
        let effect = async_effect! {
            Some(TestAction::Loaded { value: 42 })
        };

        assert!(matches!(effect, Effect::Future(_)));
    }

    #[test]
    fn test_delay_macro() {
        let effect = delay! {
            duration: Duration::from_secs(30),
            action: TestAction::Refresh
        };

        assert!(matches!(effect, Effect::Delay { .. }));
    }

    #[test]
    fn test_effects_macro() {
        let empty: Effects<TestAction> = effects![];
        assert!(empty.is_empty());

        let two: Effects<TestAction> = effects![Effect::None, delay! {
            duration: Duration::from_millis(1),
            action: TestAction::Refresh
        }];
        assert_eq!(two.len(), 2);
    }

    #[tokio::test]
    async fn test_async_effect_resolves_to_action() {
        let Effect::Future(fut) = async_effect!(Some(TestAction::Loaded { value: 7 })) else {
            unreachable!("async_effect! always builds Effect::Future");
        };

        assert!(matches!(fut.await, Some(TestAction::Loaded { value: 7 })));
    }
}
