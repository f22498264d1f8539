//! Crate-internal logging macros
//!
//! With the `defmt` feature the defmt macros are re-exported as-is (firmware
//! builds, RTT transport). Otherwise the macros forward to the `log` facade so
//! host builds and unit tests can plug in any logger, or none at all.
//!
//! Format strings must stay within the subset both backends accept: `{}`,
//! `{:?}` and `{:x}` placeholders only.

#![allow(unused_macros)]

#[allow(unused_imports)]
#[cfg(feature = "defmt")]
pub(crate) use defmt::{debug, error, info, trace, warn};

#[cfg(not(feature = "defmt"))]
macro_rules! trace {
    ($($arg:tt)+) => (::log::trace!(target: "fluid_bridge", $($arg)+))
}

#[cfg(not(feature = "defmt"))]
macro_rules! debug {
    ($($arg:tt)+) => (::log::debug!(target: "fluid_bridge", $($arg)+))
}

#[cfg(not(feature = "defmt"))]
macro_rules! info {
    ($($arg:tt)+) => (::log::info!(target: "fluid_bridge", $($arg)+))
}

// `warn` clashes with the built-in lint attribute, so define under another
// name and rename on export.
#[cfg(not(feature = "defmt"))]
macro_rules! warning {
    ($($arg:tt)+) => (::log::warn!(target: "fluid_bridge", $($arg)+))
}

#[cfg(not(feature = "defmt"))]
macro_rules! error {
    ($($arg:tt)+) => (::log::error!(target: "fluid_bridge", $($arg)+))
}

#[allow(unused_imports)]
#[cfg(not(feature = "defmt"))]
pub(crate) use {debug, error, info, trace, warning as warn};
