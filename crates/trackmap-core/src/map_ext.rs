//! Lookup-with-fallback helpers for keyed collections.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};

/// Read a map entry or fall back to a caller-supplied value.
///
/// # Example
///
/// ```ignore
/// use std::collections::HashMap;
/// use trackmap_core::GetOrDefault;
///
/// let limits: HashMap<&str, u64> = HashMap::from([("page_size", 50)]);
/// assert_eq!(limits.get_or("page_size", 20), 50);
/// assert_eq!(limits.get_or("max_pages", 10), 10);
/// assert_eq!(limits.get_or_default_value("max_pages"), 0);
/// ```
pub trait GetOrDefault<K: ?Sized, V> {
    /// Clone of the stored value, or `fallback` when the key is absent.
    fn get_or(&self, key: &K, fallback: V) -> V;

    /// Clone of the stored value, or `V::default()` when the key is absent.
    fn get_or_default_value(&self, key: &K) -> V
    where
        V: Default,
    {
        self.get_or(key, V::default())
    }
}

impl<Q, K, V, S> GetOrDefault<Q, V> for HashMap<K, V, S>
where
    Q: Hash + Eq + ?Sized,
    K: Hash + Eq + Borrow<Q>,
    V: Clone,
    S: BuildHasher,
{
    fn get_or(&self, key: &Q, fallback: V) -> V {
        self.get(key).cloned().unwrap_or(fallback)
    }
}

impl<Q, K, V> GetOrDefault<Q, V> for BTreeMap<K, V>
where
    Q: Ord + ?Sized,
    K: Ord + Borrow<Q>,
    V: Clone,
{
    fn get_or(&self, key: &Q, fallback: V) -> V {
        self.get(key).cloned().unwrap_or(fallback)
    }
}
