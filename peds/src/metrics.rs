//! Counters for map rehashes and trie growth. They are recorded through the
//! `metrics` crate when the `metrics` feature is enabled, and compile to
//! nothing otherwise.

#[cfg(feature = "metrics")]
macro_rules! increment {
    ( $counter:literal ) => {
        ::metrics::counter!($counter).increment(1)
    };
}

#[cfg(not(feature = "metrics"))]
macro_rules! increment {
    ( $counter:literal ) => {};
}

pub(crate) use increment;
