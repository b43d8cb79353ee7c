/// Fast, non-cryptographic hash map, used wherever keys come from our own
/// process rather than untrusted input (host ids, code addresses).
pub type FastHashMap<K, V> = rustc_hash::FxHashMap<K, V>;
