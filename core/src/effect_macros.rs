//! Declarative macros for ergonomic effect construction
//!
//! These macros reduce boilerplate when creating `Effect` variants that
//! wrap async blocks and streams.

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```rust,ignore
/// use authflow_core::async_effect;
///
/// async_effect! {
///     let user = provider.signin(&credentials).await.ok()?;
///     Some(AuthAction::LoggedIn { user })
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

/// Create an `Effect::Stream` from any `Stream` of actions
///
/// # Example
///
/// ```rust,ignore
/// use authflow_core::stream_effect;
///
/// stream_effect!(futures::stream::iter(vec![Action::First, Action::Second]))
/// ```
#[macro_export]
macro_rules! stream_effect {
    ($stream:expr) => {
        $crate::effect::Effect::Stream(::std::boxed::Box::pin($stream))
    };
}
