#![allow(unused_macros)]

// All records go to the "dumbptr" target.
macro_rules! log_record {
    ($level:ident, $($arg:tt)+) => (
        #[cfg(feature = "logging")]
        log::$level!(target: "dumbptr", $($arg)+);
    )
}

macro_rules! debug {
    ($($arg:tt)+) => (
        log_record!(debug, $($arg)+);
    )
}

macro_rules! trace {
    ($($arg:tt)+) => (
        log_record!(trace, $($arg)+);
    )
}
