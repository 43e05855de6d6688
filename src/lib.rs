#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// Injectable policies: hashing, key equality, and value release.
///
/// This module provides the three capability traits a
/// [`ProbeMap`](crate::ProbeMap) is parameterized over, their built-in
/// defaults, and adapters for plugging in closures or any `BuildHasher` from
/// the ecosystem.
pub mod policy;

pub mod probe_map;

pub use policy::BuildHasherPolicy;
pub use policy::BytewiseEq;
pub use policy::Djb2;
pub use policy::DropRelease;
#[cfg(feature = "foldhash")]
pub use policy::FoldState;
pub use policy::KeyEq;
pub use policy::KeyHasher;
pub use policy::Release;
pub use probe_map::InsertError;
pub use probe_map::MAX_KEY_LEN;
pub use probe_map::ProbeMap;
