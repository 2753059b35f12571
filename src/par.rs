//! Per-element fan-out, serial or on the rayon pool.
//!
//! Every per-element stage is a pure function of that element and read-only
//! maps, so results are written to independent slots and collected into a
//! `BTreeMap`. Output order never depends on scheduling.

use std::collections::BTreeMap;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Evaluate `f` for each key and keep the `Some` results, keyed by input.
pub(crate) fn map_keys<K, V, F>(keys: &[K], f: F) -> BTreeMap<K, V>
where
    K: Ord + Copy + Send + Sync,
    V: Send,
    F: Fn(K) -> Option<V> + Send + Sync,
{
    #[cfg(feature = "rayon")]
    {
        keys.par_iter()
            .filter_map(|&k| f(k).map(|v| (k, v)))
            .collect::<Vec<_>>()
            .into_iter()
            .collect()
    }
    #[cfg(not(feature = "rayon"))]
    {
        keys.iter().filter_map(|&k| f(k).map(|v| (k, v))).collect()
    }
}

/// Map a slice in order, in parallel when the `rayon` feature is on.
pub(crate) fn map_slice<T, U, F>(items: &[T], f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Send + Sync,
{
    #[cfg(feature = "rayon")]
    {
        items.par_iter().map(f).collect()
    }
    #[cfg(not(feature = "rayon"))]
    {
        items.iter().map(f).collect()
    }
}
