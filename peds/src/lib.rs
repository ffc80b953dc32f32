//! Persistent (immutable) collections with structural sharing.
//!
//! [`Vector`] is a persistent vector (also known as a "bitmapped vector trie")
//! with cheap clones, an uncommitted tail for amortized constant-time appends
//! and copy-on-write updates. [`Slice`] is a window over a [`Vector`] that
//! reuses its storage. [`Map`] is a hash map stored as a [`Vector`] of
//! buckets, and [`Set`] is a [`Map`] without values.
//!
//! Every "mutating" operation takes `&self` and returns a new version. The
//! receiver keeps observing its old contents, and the two versions share all
//! the nodes that the operation didn't touch. Nodes are reference counted
//! with [`std::sync::Arc`], so any version can be read from several threads
//! at once without locking.
//!
//! ```rust
//! use peds::Vector;
//!
//! let v1: Vector<u32> = (0..100).collect();
//! let v2 = v1.set(10, 1000).unwrap();
//! assert_eq!(v1.get(10), Ok(&10));
//! assert_eq!(v2.get(10), Ok(&1000));
//! ```

// Not yet implemented (do we need them?)
// - removal from the middle of a vector
// - concatenation of two vectors that shares both tries

pub mod config;
pub mod error;
pub mod hash;
pub mod map;
mod metrics;
pub mod set;
pub mod slice;
mod trie;
pub mod vector;

pub use config::{Config, ConfigError};
pub use error::{Error, Result};
pub use map::Map;
pub use set::Set;
pub use slice::Slice;
pub use vector::Vector;
