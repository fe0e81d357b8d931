// Logging goes through the `log` crate when the `log` feature is enabled.
// Without it the arguments are still type checked but nothing is formatted.

macro_rules! trace {
    ($($arg:tt)+) => {
        #[cfg(feature = "log")]
        ::log::trace!($($arg)+);
        #[cfg(not(feature = "log"))]
        let _ = format_args!($($arg)+);
    };
}

macro_rules! debug {
    ($($arg:tt)+) => {
        #[cfg(feature = "log")]
        ::log::debug!($($arg)+);
        #[cfg(not(feature = "log"))]
        let _ = format_args!($($arg)+);
    };
}
