//! Logging shims
//!
//! Library code logs through these macros. Embedded builds forward to
//! defmt; host builds compile them away so tests need no global logger.

#[cfg(feature = "embedded")]
macro_rules! log_info {
    ($($arg:tt)*) => { defmt::info!($($arg)*) };
}

#[cfg(feature = "embedded")]
macro_rules! log_debug {
    ($($arg:tt)*) => { defmt::debug!($($arg)*) };
}

#[cfg(feature = "embedded")]
macro_rules! log_warn {
    ($($arg:tt)*) => { defmt::warn!($($arg)*) };
}

#[cfg(not(feature = "embedded"))]
macro_rules! log_info {
    ($($arg:tt)*) => {{}};
}

#[cfg(not(feature = "embedded"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {{}};
}

#[cfg(not(feature = "embedded"))]
macro_rules! log_warn {
    ($($arg:tt)*) => {{}};
}
