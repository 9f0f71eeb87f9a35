// Log macros that forward to `log` on hosts and `defmt` on targets.
//
// Arguments must stay within what both backends can format: integers,
// floats, bools and `&str`, with plain `{}` placeholders. With no backend
// the arguments are still evaluated as a tuple so they never go unused.

#[cfg(feature = "log")]
macro_rules! node_error {
    ($($arg:tt)*) => { log::error!($($arg)*) };
}

#[cfg(all(feature = "defmt", not(feature = "log")))]
macro_rules! node_error {
    ($($arg:tt)*) => { defmt::error!($($arg)*) };
}

#[cfg(not(any(feature = "log", feature = "defmt")))]
macro_rules! node_error {
    ($($arg:tt)*) => {{ let _ = ($($arg)*,); }};
}

#[cfg(feature = "log")]
macro_rules! node_warn {
    ($($arg:tt)*) => { log::warn!($($arg)*) };
}

#[cfg(all(feature = "defmt", not(feature = "log")))]
macro_rules! node_warn {
    ($($arg:tt)*) => { defmt::warn!($($arg)*) };
}

#[cfg(not(any(feature = "log", feature = "defmt")))]
macro_rules! node_warn {
    ($($arg:tt)*) => {{ let _ = ($($arg)*,); }};
}

#[cfg(feature = "log")]
macro_rules! node_info {
    ($($arg:tt)*) => { log::info!($($arg)*) };
}

#[cfg(all(feature = "defmt", not(feature = "log")))]
macro_rules! node_info {
    ($($arg:tt)*) => { defmt::info!($($arg)*) };
}

#[cfg(not(any(feature = "log", feature = "defmt")))]
macro_rules! node_info {
    ($($arg:tt)*) => {{ let _ = ($($arg)*,); }};
}

#[cfg(feature = "log")]
macro_rules! node_debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

#[cfg(all(feature = "defmt", not(feature = "log")))]
macro_rules! node_debug {
    ($($arg:tt)*) => { defmt::debug!($($arg)*) };
}

#[cfg(not(any(feature = "log", feature = "defmt")))]
macro_rules! node_debug {
    ($($arg:tt)*) => {{ let _ = ($($arg)*,); }};
}
