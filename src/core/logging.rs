//! Diagnostic logging macros
//!
//! `log_info!` and friends go to `defmt` on the target, to stdout in unit
//! tests and nowhere otherwise. Arguments are still type checked in the
//! silent build so a variable used only for logging does not warn.
//!
//! These are developer diagnostics. Operator messages go through
//! [`log_router`](crate::core::log_router), which writes text lines to the
//! radio or console link.

#[doc(hidden)]
#[macro_export]
macro_rules! __daq_log {
    ($level:ident, $tag:literal, $($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::$level!($($arg)*);

        #[cfg(all(not(feature = "defmt"), test))]
        println!(concat!("[", $tag, "] {}"), format!($($arg)*));

        #[cfg(all(not(feature = "defmt"), not(test)))]
        let _ = format_args!($($arg)*);
    }};
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => { $crate::__daq_log!(info, "INFO", $($arg)*) };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => { $crate::__daq_log!(warn, "WARN", $($arg)*) };
}

/// Bus faults and scheduling failures that lose data
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => { $crate::__daq_log!(error, "ERROR", $($arg)*) };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => { $crate::__daq_log!(debug, "DEBUG", $($arg)*) };
}

#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => { $crate::__daq_log!(trace, "TRACE", $($arg)*) };
}
