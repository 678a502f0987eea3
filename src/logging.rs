//! Logging shims. Each macro names the component it reports for and forwards to `log`
//! under the `stacklist::<component>` target when the `logging` feature is enabled.
//! Without the feature the calls compile to nothing.

#![allow(unused_macros)]

macro_rules! debug {
    ($component:ident, $($arg:tt)+) => (
        #[cfg(feature = "logging")]
        log::debug!(target: concat!("stacklist::", stringify!($component)), $($arg)+);
    )
}

macro_rules! trace {
    ($component:ident, $($arg:tt)+) => (
        #[cfg(feature = "logging")]
        log::trace!(target: concat!("stacklist::", stringify!($component)), $($arg)+);
    )
}
