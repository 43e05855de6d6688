use core::hash::BuildHasher;

/// Hashing policy for table keys.
///
/// Implementations must be pure: the same key bytes always produce the same
/// hash, with no side effects. The table stores the full hash in its bucket
/// index and re-uses it during rehashing, so the policy is only consulted
/// once per operation.
///
/// Any closure with the signature `Fn(&[u8]) -> u64` is a valid policy:
///
/// ```rust
/// # use probe_hash::ProbeMap;
/// # use probe_hash::{BytewiseEq, DropRelease};
/// let mut map = ProbeMap::with_policies(
///     16,
///     0.75,
///     |key: &[u8]| key.iter().fold(0xcbf2_9ce4_8422_2325u64, |h, &b| {
///         (h ^ u64::from(b)).wrapping_mul(0x100_0000_01b3)
///     }),
///     BytewiseEq,
///     DropRelease,
/// );
/// map.insert(b"fnv", 1u32).unwrap();
/// assert_eq!(map.get(b"fnv"), Some(&1));
/// ```
pub trait KeyHasher {
    /// Hashes the full contents of `key`.
    fn hash_key(&self, key: &[u8]) -> u64;
}

impl<F> KeyHasher for F
where
    F: Fn(&[u8]) -> u64,
{
    #[inline]
    fn hash_key(&self, key: &[u8]) -> u64 {
        self(key)
    }
}

/// Key equality policy.
///
/// The table checks stored key lengths before consulting this policy, so
/// `probe` and `stored` are always the same length. Implementations must be
/// pure and deterministic; an equality policy that disagrees with the hashing
/// policy (equal keys hashing differently) will make keys unfindable.
pub trait KeyEq {
    /// Returns `true` if the probed key equals the stored key.
    fn eq_keys(&self, probe: &[u8], stored: &[u8]) -> bool;
}

impl<F> KeyEq for F
where
    F: Fn(&[u8], &[u8]) -> bool,
{
    #[inline]
    fn eq_keys(&self, probe: &[u8], stored: &[u8]) -> bool {
        self(probe, stored)
    }
}

/// Release policy for values still present when the table is dropped.
///
/// Values removed through [`ProbeMap::remove`](crate::ProbeMap::remove) are
/// returned to the caller and never pass through this policy; it only runs
/// over the values that remain in the table at teardown.
pub trait Release<V> {
    /// Releases one value.
    fn release(&mut self, value: V);
}

impl<V, F> Release<V> for F
where
    F: FnMut(V),
{
    #[inline]
    fn release(&mut self, value: V) {
        self(value)
    }
}

/// The default hashing policy: the djb2 multiplicative string hash.
///
/// Starts from the seed constant 5381 and folds each key byte with
/// `hash = hash * 33 + byte`. Deterministic across runs and platforms, which
/// makes it handy for reproducing probe layouts, but it is not resistant to
/// crafted collisions; use [`FoldState`](crate::FoldState) or your own policy
/// for untrusted keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct Djb2;

impl KeyHasher for Djb2 {
    #[inline]
    fn hash_key(&self, key: &[u8]) -> u64 {
        let mut hash: u64 = 5381;
        for &byte in key {
            hash = (hash << 5).wrapping_add(hash).wrapping_add(u64::from(byte));
        }
        hash
    }
}

/// The default equality policy: bytewise comparison of the two key slices.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytewiseEq;

impl KeyEq for BytewiseEq {
    #[inline]
    fn eq_keys(&self, probe: &[u8], stored: &[u8]) -> bool {
        probe == stored
    }
}

/// The default release policy: values are simply dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct DropRelease;

impl<V> Release<V> for DropRelease {
    #[inline]
    fn release(&mut self, value: V) {
        drop(value);
    }
}

/// Adapter that turns any [`BuildHasher`] into a [`KeyHasher`] policy.
///
/// This is the bridge to the wider hashing ecosystem: anything that plugs
/// into `std::collections::HashMap` plugs in here as well.
///
/// ```rust
/// # use core::hash::BuildHasher;
/// # use probe_hash::{BuildHasherPolicy, BytewiseEq, DropRelease, ProbeMap};
/// # use siphasher::sip::SipHasher;
/// struct SipState;
///
/// impl BuildHasher for SipState {
///     type Hasher = SipHasher;
///
///     fn build_hasher(&self) -> Self::Hasher {
///         SipHasher::new_with_keys(1, 2)
///     }
/// }
///
/// let mut map = ProbeMap::with_policies(
///     16,
///     0.75,
///     BuildHasherPolicy(SipState),
///     BytewiseEq,
///     DropRelease,
/// );
/// map.insert(b"key", ()).unwrap();
/// assert!(map.contains_key(b"key"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildHasherPolicy<S>(pub S);

impl<S> KeyHasher for BuildHasherPolicy<S>
where
    S: BuildHasher,
{
    #[inline]
    fn hash_key(&self, key: &[u8]) -> u64 {
        self.0.hash_one(key)
    }
}

/// A hashing policy backed by `foldhash`'s fixed-seed fast hasher.
///
/// Considerably faster than [`Djb2`] on longer keys and with much better
/// distribution. The seed is fixed, so hashes are stable within a build;
/// use [`FoldState::with_seed`] to vary the seed per table.
#[cfg(feature = "foldhash")]
pub type FoldState = BuildHasherPolicy<foldhash::fast::FixedState>;

#[cfg(feature = "foldhash")]
impl FoldState {
    /// Creates the policy with the default fixed seed.
    pub fn fixed() -> Self {
        BuildHasherPolicy(foldhash::fast::FixedState::default())
    }

    /// Creates the policy with an explicit seed.
    pub fn with_seed(seed: u64) -> Self {
        BuildHasherPolicy(foldhash::fast::FixedState::with_seed(seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn djb2_known_vectors() {
        // hash("") is the bare seed; each byte folds in as hash * 33 + byte.
        assert_eq!(Djb2.hash_key(b""), 5381);
        assert_eq!(Djb2.hash_key(b"a"), 5381 * 33 + 97);
        assert_eq!(Djb2.hash_key(b"ab"), (5381 * 33 + 97) * 33 + 98);
    }

    #[test]
    fn djb2_is_length_bounded() {
        // Interior NUL bytes participate in the hash rather than ending it.
        assert_ne!(Djb2.hash_key(b"a\0b"), Djb2.hash_key(b"a"));
        assert_ne!(Djb2.hash_key(b"a\0"), Djb2.hash_key(b"a"));
    }

    #[test]
    fn bytewise_eq_compares_contents() {
        assert!(BytewiseEq.eq_keys(b"same", b"same"));
        assert!(!BytewiseEq.eq_keys(b"left", b"righ"));
    }

    #[test]
    fn closures_satisfy_the_policy_traits() {
        fn hash_with(h: &impl KeyHasher, key: &[u8]) -> u64 {
            h.hash_key(key)
        }

        let constant = |_key: &[u8]| 7u64;
        assert_eq!(hash_with(&constant, b"anything"), 7);

        let eq = |a: &[u8], b: &[u8]| a.eq_ignore_ascii_case(b);
        assert!(eq.eq_keys(b"Key", b"kEY"));
    }

    #[cfg(feature = "foldhash")]
    #[test]
    fn foldhash_policy_is_deterministic_per_seed() {
        let a = FoldState::with_seed(42);
        let b = FoldState::with_seed(42);
        assert_eq!(a.hash_key(b"key"), b.hash_key(b"key"));

        let c = FoldState::with_seed(43);
        assert_ne!(a.hash_key(b"key"), c.hash_key(b"key"));
    }
}
