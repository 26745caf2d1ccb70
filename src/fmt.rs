//! Internal logging shims.
//!
//! Forwards to `defmt` when `defmt-0-3` is enabled, otherwise to `log` when
//! `log` is enabled. With neither, the arguments are still evaluated by
//! reference so call sites compile identically and stay warning-free.
//!
//! Only `{}` placeholders with primitive arguments are used, which both
//! backends accept.

#![allow(unused_macros)]

#[cfg(feature = "defmt-0-3")]
macro_rules! trace {
    ($s:literal $(, $x:expr)* $(,)?) => { ::defmt::trace!($s $(, $x)*) };
}
#[cfg(all(feature = "log", not(feature = "defmt-0-3")))]
macro_rules! trace {
    ($s:literal $(, $x:expr)* $(,)?) => { ::log::trace!($s $(, $x)*) };
}
#[cfg(not(any(feature = "log", feature = "defmt-0-3")))]
macro_rules! trace {
    ($s:literal $(, $x:expr)* $(,)?) => {{ let _ = ($( &$x, )*); }};
}

#[cfg(feature = "defmt-0-3")]
macro_rules! debug {
    ($s:literal $(, $x:expr)* $(,)?) => { ::defmt::debug!($s $(, $x)*) };
}
#[cfg(all(feature = "log", not(feature = "defmt-0-3")))]
macro_rules! debug {
    ($s:literal $(, $x:expr)* $(,)?) => { ::log::debug!($s $(, $x)*) };
}
#[cfg(not(any(feature = "log", feature = "defmt-0-3")))]
macro_rules! debug {
    ($s:literal $(, $x:expr)* $(,)?) => {{ let _ = ($( &$x, )*); }};
}

#[cfg(feature = "defmt-0-3")]
macro_rules! warn {
    ($s:literal $(, $x:expr)* $(,)?) => { ::defmt::warn!($s $(, $x)*) };
}
#[cfg(all(feature = "log", not(feature = "defmt-0-3")))]
macro_rules! warn {
    ($s:literal $(, $x:expr)* $(,)?) => { ::log::warn!($s $(, $x)*) };
}
#[cfg(not(any(feature = "log", feature = "defmt-0-3")))]
macro_rules! warn {
    ($s:literal $(, $x:expr)* $(,)?) => {{ let _ = ($( &$x, )*); }};
}
