use std::sync::{Arc, Mutex};

use crate::snapshot::{BuildError, Snapshot, SnapshotBuilder, SnapshotKey};
use crate::{geometry::Rect, provider::Timestep};

/// How an `invalidate` call resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A fresh snapshot was built and committed.
    Committed,
    /// An equivalent commit for the same key already landed; no rebuild.
    Coalesced,
    /// The build finished after a newer request superseded its key; the
    /// result was dropped and the newer snapshot remains current.
    StaleDiscarded,
}

#[derive(Debug)]
struct Slot {
    snapshot: Option<Arc<Snapshot>>,
    /// Total commits so far; lets a queued caller see whether a commit
    /// landed after it registered its request.
    commit_count: u64,
}

#[derive(Debug, Clone, Copy)]
struct LatestRequest {
    seq: u64,
    key: Option<SnapshotKey>,
}

/// Single-slot snapshot cache.
///
/// Builds are serialized: at most one is in flight, and concurrent
/// `invalidate` callers queue on the build lock. Commits are last-build-wins
/// with an explicit discard of superseded results, so a slow build for an old
/// key can never overwrite the snapshot of a newer request. Readers never
/// block on a build: the slot lock is held only to swap or clone the `Arc`.
pub struct SnapshotCache {
    builder: SnapshotBuilder,
    slot: Mutex<Slot>,
    build_lock: Mutex<()>,
    latest: Mutex<LatestRequest>,
}

impl SnapshotCache {
    pub fn new(builder: SnapshotBuilder) -> Self {
        Self {
            builder,
            slot: Mutex::new(Slot {
                snapshot: None,
                commit_count: 0,
            }),
            build_lock: Mutex::new(()),
            latest: Mutex::new(LatestRequest { seq: 0, key: None }),
        }
    }

    pub fn builder(&self) -> &SnapshotBuilder {
        &self.builder
    }

    /// The most recently committed complete snapshot, or `None` before the
    /// first successful build. Never blocks on an in-flight `invalidate`.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        match self.slot.lock() {
            Ok(slot) => slot.snapshot.clone(),
            Err(poisoned) => poisoned.into_inner().snapshot.clone(),
        }
    }

    /// Key of the committed snapshot. Callers compare this against the key
    /// they requested to detect staleness.
    pub fn committed_key(&self) -> Option<SnapshotKey> {
        self.current().map(|snapshot| snapshot.key())
    }

    /// Rebuilds the snapshot for `(time, rect)` and commits it on success.
    ///
    /// On build failure the previously committed snapshot stays current and
    /// the error is returned. A result whose key was superseded while the
    /// build ran is silently dropped (`StaleDiscarded`), and a commit that
    /// already covers this exact key is not repeated (`Coalesced`).
    pub fn invalidate(&self, time: Timestep, rect: Rect) -> Result<CommitOutcome, BuildError> {
        let key = SnapshotKey::new(time, rect);
        let (seq, seen_commits) = self.register_request(key);

        let _build = match self.build_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        // A caller that queued behind an identical in-flight request observes
        // the commit that landed while it waited instead of rebuilding.
        if self.commit_landed_for(key, seen_commits) {
            tracing::debug!(time, ?rect, "invalidate coalesced into prior commit");
            return Ok(CommitOutcome::Coalesced);
        }

        let snapshot = match self.builder.build(time, rect) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(time, ?rect, error = %err, "snapshot build failed; keeping previous snapshot");
                return Err(err);
            }
        };

        if self.superseded(key, seq) {
            tracing::debug!(time, ?rect, "snapshot superseded during build; discarding");
            return Ok(CommitOutcome::StaleDiscarded);
        }

        self.commit(snapshot);
        tracing::debug!(time, ?rect, "snapshot committed");
        Ok(CommitOutcome::Committed)
    }

    /// Registers `(time, rect)` as the latest requested key. Returns the
    /// request sequence number and the commit count seen at registration.
    fn register_request(&self, key: SnapshotKey) -> (u64, u64) {
        let commit_count = match self.slot.lock() {
            Ok(slot) => slot.commit_count,
            Err(poisoned) => poisoned.into_inner().commit_count,
        };
        let mut latest = match self.latest.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        latest.seq += 1;
        latest.key = Some(key);
        (latest.seq, commit_count)
    }

    /// True once a commit for exactly `key` landed after the caller
    /// registered (i.e. the in-flight build it queued behind covered it).
    fn commit_landed_for(&self, key: SnapshotKey, seen_commits: u64) -> bool {
        let slot = match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.commit_count > seen_commits
            && slot
                .snapshot
                .as_ref()
                .is_some_and(|snapshot| snapshot.key() == key)
    }

    /// True when a request for a different key was registered after `seq`;
    /// the finished build is stale and must not be committed.
    fn superseded(&self, key: SnapshotKey, seq: u64) -> bool {
        let latest = match self.latest.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        latest.seq > seq && latest.key != Some(key)
    }

    fn commit(&self, snapshot: Snapshot) {
        let mut slot = match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.snapshot = Some(Arc::new(snapshot));
        slot.commit_count += 1;
    }
}
