/// Signature store: SHA-256 digest to threat label.
///
/// # Concurrency
///
/// The map itself is immutable once published. Updates build a fresh map
/// off to the side and swap the `Arc` under a write lock held only for the
/// pointer store, so a reader sees either the whole old map or the whole new
/// one. Scans take a [`SignatureSnapshot`] when they start and keep using it
/// even if an update lands mid-scan.
pub mod builtin;

use crate::hasher::ContentHash;
use compact_str::CompactString;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

pub use builtin::BUILTIN_SIGNATURES;

type SignatureMap = HashMap<ContentHash, CompactString>;

/// Shared, cheaply cloneable handle to the process-wide signature database.
#[derive(Clone, Default)]
pub struct SignatureStore {
    current: Arc<RwLock<Arc<SignatureMap>>>,
    /// Serialises writers so two concurrent updates cannot drop each other's
    /// entries.
    update_lock: Arc<Mutex<()>>,
}

/// An immutable view of the store at one instant.
#[derive(Clone)]
pub struct SignatureSnapshot(Arc<SignatureMap>);

/// Outcome of a bulk operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateSummary {
    pub accepted: usize,
    /// Entries whose key was not a 64-digit hex SHA-256.
    pub rejected: usize,
}

impl SignatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with [`BUILTIN_SIGNATURES`].
    pub fn with_builtin_signatures() -> Self {
        let store = Self::new();
        store.bulk_update(BUILTIN_SIGNATURES.iter().copied());
        store
    }

    pub fn lookup(&self, hash: &ContentHash) -> Option<CompactString> {
        self.current.read().get(hash).cloned()
    }

    pub fn snapshot(&self) -> SignatureSnapshot {
        SignatureSnapshot(Arc::clone(&self.current.read()))
    }

    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add or overwrite entries, keeping everything already present.
    pub fn bulk_update<I, K, L>(&self, entries: I) -> UpdateSummary
    where
        I: IntoIterator<Item = (K, L)>,
        K: AsRef<str>,
        L: AsRef<str>,
    {
        let _guard = self.update_lock.lock();
        let mut next: SignatureMap = (**self.current.read()).clone();
        let summary = insert_all(&mut next, entries);
        *self.current.write() = Arc::new(next);
        info!(
            accepted = summary.accepted,
            rejected = summary.rejected,
            "Signature database updated"
        );
        summary
    }

    /// Replace the whole database.
    pub fn replace_all<I, K, L>(&self, entries: I) -> UpdateSummary
    where
        I: IntoIterator<Item = (K, L)>,
        K: AsRef<str>,
        L: AsRef<str>,
    {
        let _guard = self.update_lock.lock();
        let mut next = SignatureMap::new();
        let summary = insert_all(&mut next, entries);
        *self.current.write() = Arc::new(next);
        info!(
            accepted = summary.accepted,
            rejected = summary.rejected,
            "Signature database replaced"
        );
        summary
    }
}

impl SignatureSnapshot {
    pub fn lookup(&self, hash: &ContentHash) -> Option<&CompactString> {
        self.0.get(hash)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn insert_all<I, K, L>(map: &mut SignatureMap, entries: I) -> UpdateSummary
where
    I: IntoIterator<Item = (K, L)>,
    K: AsRef<str>,
    L: AsRef<str>,
{
    let mut summary = UpdateSummary::default();
    for (key, label) in entries {
        match key.as_ref().parse::<ContentHash>() {
            Ok(hash) => {
                map.insert(hash, CompactString::new(label.as_ref().trim()));
                summary.accepted += 1;
            }
            Err(e) => {
                warn!("Ignoring signature {:?}: not a SHA-256 digest ({e})", key.as_ref());
                summary.rejected += 1;
            }
        }
    }
    summary
}
