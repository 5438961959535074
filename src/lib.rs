//! ClaimChain: per-user, append-only, authenticated key-value stores with
//! capability-based read access.
//!
//! Each owner maintains a hash chain of signed blocks. Every block commits
//! to a verifiable map of encrypted entries: claims stored under labels,
//! and capabilities that let specific readers locate and decrypt specific
//! claims. A reader holding only the chain head can deterministically find
//! their entries, decrypt them, and verify that the owner committed to
//! exactly one value per label.

pub mod chain;
pub mod core;
pub mod crypto;
pub mod encodings;
pub mod error;
pub mod params;
pub mod sign;
pub mod state;
pub mod storage;
pub mod tree;
pub mod view;
pub mod vrf;
pub mod zk;

pub use chain::{Block, Chain};
pub use crypto::Hash;
pub use error::Error;
pub use params::{Keypair, LocalParams, PublicParams};
pub use state::{Metadata, Payload, PROTOCOL_VERSION, State};
pub use storage::{MemStore, ObjectStore, RedbStore};
pub use tree::{Tree, check_evidence};
pub use view::View;
pub use vrf::{VrfContainer, compute_vrf, verify_vrf};
