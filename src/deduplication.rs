// 🔍 Deduplication Engine - Detect double-submitted transactions
// Group by business key, then chain transactions that land within 60s of each other

use crate::error::Result;
use crate::transaction::Transaction;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Maximum gap between consecutive cluster members (inclusive)
pub const DUPLICATE_WINDOW_MS: i64 = 60_000;

/// Group count below which the parallel detector stays sequential
pub const DEFAULT_PARALLEL_MIN_GROUPS: usize = 64;

// ============================================================================
// BUSINESS KEY
// ============================================================================

/// Exact-equality wrapper for an `f64` amount
///
/// `-0.0` and `0.0` map to the same key; every other value is compared by its
/// bit pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AmountKey(u64);

impl AmountKey {
    pub fn new(amount: f64) -> Self {
        if amount == 0.0 {
            AmountKey(0.0_f64.to_bits())
        } else {
            AmountKey(amount.to_bits())
        }
    }

    pub fn value(self) -> f64 {
        f64::from_bits(self.0)
    }
}

/// The fields two transactions must share to be duplicate candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusinessKey<'a> {
    pub source_account: Option<&'a str>,
    pub target_account: Option<&'a str>,
    pub amount: Option<AmountKey>,
    pub category: Option<&'a str>,
}

/// Derive the business key of a transaction
pub fn business_key(tx: &Transaction) -> BusinessKey<'_> {
    BusinessKey {
        source_account: tx.source_account.as_deref(),
        target_account: tx.target_account.as_deref(),
        amount: tx.amount.map(AmountKey::new),
        category: tx.category.as_deref(),
    }
}

impl Transaction {
    pub fn business_key(&self) -> BusinessKey<'_> {
        business_key(self)
    }
}

// ============================================================================
// TIMED TRANSACTIONS & GROUPS
// ============================================================================

/// A transaction paired with its resolved instant and input position
#[derive(Debug, Clone, Copy)]
pub struct TimedTransaction<'a> {
    /// Position in the caller's batch
    pub index: usize,
    pub instant: DateTime<Utc>,
    pub transaction: &'a Transaction,
}

impl TimedTransaction<'_> {
    pub fn millis(&self) -> i64 {
        self.instant.timestamp_millis()
    }
}

/// Resolve every transaction's time up front
///
/// Fails on the first unparseable time in input order.
pub fn resolve_times(transactions: &[Transaction]) -> Result<Vec<TimedTransaction<'_>>> {
    let mut timed = Vec::with_capacity(transactions.len());

    for (index, transaction) in transactions.iter().enumerate() {
        let instant = match transaction.instant() {
            Ok(instant) => instant,
            Err(err) => {
                warn!(
                    id = %transaction.id,
                    time = %transaction.time,
                    "unparseable transaction time"
                );
                return Err(err);
            }
        };
        timed.push(TimedTransaction {
            index,
            instant,
            transaction,
        });
    }

    Ok(timed)
}

/// Transactions sharing one business key, in input order
#[derive(Debug, Clone)]
pub struct TransactionGroup<'a> {
    pub key: BusinessKey<'a>,
    pub members: Vec<TimedTransaction<'a>>,
}

/// Partition transactions by business key
///
/// Members keep their relative input order; groups come back in the order
/// their key first appears.
pub fn group_by_key<'a>(transactions: &[TimedTransaction<'a>]) -> Vec<TransactionGroup<'a>> {
    let mut slots: HashMap<BusinessKey<'a>, usize> = HashMap::new();
    let mut groups: Vec<TransactionGroup<'a>> = Vec::new();

    for timed in transactions {
        let key = business_key(timed.transaction);
        let slot = *slots.entry(key).or_insert_with(|| {
            groups.push(TransactionGroup {
                key,
                members: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].members.push(*timed);
    }

    groups
}

/// Copy of `members` ordered by ascending time, ties kept in input order
pub fn sort_by_time<'a>(members: &[TimedTransaction<'a>]) -> Vec<TimedTransaction<'a>> {
    let mut sorted = members.to_vec();
    sorted.sort_by_key(|timed| timed.instant);
    sorted
}

// ============================================================================
// DUPLICATE CLUSTER
// ============================================================================

/// Two or more same-key transactions, each within 60s of the previous one
///
/// Members are in sweep order, so the first member is the earliest. The total
/// span may exceed the window because each hop is measured from the previous
/// member, not from the first.
#[derive(Debug, Clone)]
pub struct DuplicateCluster<'a> {
    members: Vec<TimedTransaction<'a>>,
}

impl<'a> DuplicateCluster<'a> {
    fn from_members(members: Vec<TimedTransaction<'a>>) -> Self {
        debug_assert!(members.len() >= 2);
        DuplicateCluster { members }
    }

    pub fn members(&self) -> &[TimedTransaction<'a>] {
        &self.members
    }

    /// The clustered transactions, earliest first
    pub fn transactions(&self) -> Vec<&'a Transaction> {
        self.members.iter().map(|m| m.transaction).collect()
    }

    pub fn ids(&self) -> Vec<&'a str> {
        self.members.iter().map(|m| m.transaction.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false: a cluster holds at least two members
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Time of the first member
    pub fn anchor_time(&self) -> DateTime<Utc> {
        self.members[0].instant
    }

    /// Time of the most recent member
    pub fn last_time(&self) -> DateTime<Utc> {
        self.members[self.members.len() - 1].instant
    }

    pub fn member_times(&self) -> Vec<DateTime<Utc>> {
        self.members.iter().map(|m| m.instant).collect()
    }

    /// Milliseconds between first and last member
    pub fn span_ms(&self) -> i64 {
        (self.last_time() - self.anchor_time()).num_milliseconds()
    }

    /// The submission the others are presumed to repeat
    pub fn original(&self) -> &'a Transaction {
        self.members[0].transaction
    }

    /// Every member after the first
    pub fn retries(&self) -> Vec<&'a Transaction> {
        self.members[1..].iter().map(|m| m.transaction).collect()
    }

    /// SHA-256 over the member ids, stable across runs for the same cluster
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for member in &self.members {
            hasher.update(member.transaction.id.as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }
}

impl Serialize for DuplicateCluster<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("DuplicateCluster", 4)?;
        state.serialize_field("fingerprint", &self.fingerprint())?;
        state.serialize_field("anchorTime", &self.anchor_time())?;
        state.serialize_field("spanMs", &self.span_ms())?;
        state.serialize_field("members", &self.transactions())?;
        state.end()
    }
}

// ============================================================================
// CLUSTERING
// ============================================================================

/// Sweep a time-sorted group and chain near-simultaneous transactions
///
/// Open clusters are indexed by the time of their latest member. When a pair
/// `(a, b)` is within the window and a cluster ends at `a`, the cluster is
/// extended with `b` and re-indexed under `b`'s time; otherwise `[a, b]` opens
/// a new cluster.
pub fn build_clusters<'a>(sorted: &[TimedTransaction<'a>]) -> Vec<DuplicateCluster<'a>> {
    let mut open: HashMap<i64, usize> = HashMap::new();
    let mut arena: Vec<Vec<TimedTransaction<'a>>> = Vec::new();

    for pair in sorted.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if b.millis() - a.millis() > DUPLICATE_WINDOW_MS {
            continue;
        }

        match open.remove(&a.millis()) {
            Some(slot) => {
                arena[slot].push(b);
                open.insert(b.millis(), slot);
            }
            None => {
                open.insert(b.millis(), arena.len());
                arena.push(vec![a, b]);
            }
        }
    }

    arena.into_iter().map(DuplicateCluster::from_members).collect()
}

/// Flatten per-group clusters and order them by anchor time
///
/// The sort is stable, so equal anchors keep group order.
pub fn assemble_clusters<'a>(
    per_group: Vec<Vec<DuplicateCluster<'a>>>,
) -> Vec<DuplicateCluster<'a>> {
    let mut clusters: Vec<DuplicateCluster<'a>> = per_group.into_iter().flatten().collect();
    clusters.sort_by_key(|cluster| cluster.anchor_time());
    clusters
}

// ============================================================================
// DETECTION REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionSummary {
    pub transactions_scanned: usize,
    pub groups: usize,
    pub clusters: usize,
    /// Transactions that belong to some cluster
    pub flagged_transactions: usize,
    /// Flagged transactions that are not the first of their cluster
    pub suppressible_transactions: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetectionReport<'a> {
    pub summary: DetectionSummary,
    pub clusters: Vec<DuplicateCluster<'a>>,
}

// ============================================================================
// DUPLICATE DETECTOR
// ============================================================================

pub struct DuplicateDetector {
    /// Cluster groups on the rayon pool
    pub parallel: bool,

    /// Minimum group count before `parallel` takes effect (default: 64)
    pub parallel_min_groups: usize,
}

impl DuplicateDetector {
    /// Sequential detector
    pub fn new() -> Self {
        DuplicateDetector {
            parallel: false,
            parallel_min_groups: DEFAULT_PARALLEL_MIN_GROUPS,
        }
    }

    /// Detector that clusters groups in parallel for large batches
    pub fn parallel() -> Self {
        DuplicateDetector {
            parallel: true,
            ..Self::new()
        }
    }

    /// Find duplicate clusters, ordered by anchor time
    pub fn detect<'a>(&self, transactions: &'a [Transaction]) -> Result<Vec<DuplicateCluster<'a>>> {
        self.run(transactions).map(|(_, clusters)| clusters)
    }

    /// Detect and summarize in one pass
    pub fn report<'a>(&self, transactions: &'a [Transaction]) -> Result<DetectionReport<'a>> {
        let (groups, clusters) = self.run(transactions)?;

        let flagged_transactions: usize = clusters.iter().map(DuplicateCluster::len).sum();
        let summary = DetectionSummary {
            transactions_scanned: transactions.len(),
            groups,
            clusters: clusters.len(),
            flagged_transactions,
            suppressible_transactions: flagged_transactions - clusters.len(),
        };

        Ok(DetectionReport { summary, clusters })
    }

    /// The batch in input order with every cluster's retries removed
    pub fn suppress<'a>(&self, transactions: &'a [Transaction]) -> Result<Vec<&'a Transaction>> {
        let (_, clusters) = self.run(transactions)?;

        let retries: HashSet<usize> = clusters
            .iter()
            .flat_map(|cluster| cluster.members()[1..].iter().map(|m| m.index))
            .collect();

        Ok(transactions
            .iter()
            .enumerate()
            .filter(|(index, _)| !retries.contains(index))
            .map(|(_, tx)| tx)
            .collect())
    }

    fn run<'a>(
        &self,
        transactions: &'a [Transaction],
    ) -> Result<(usize, Vec<DuplicateCluster<'a>>)> {
        let timed = resolve_times(transactions)?;
        let groups = group_by_key(&timed);

        let use_pool = self.parallel && groups.len() >= self.parallel_min_groups;
        let per_group: Vec<Vec<DuplicateCluster<'a>>> = if use_pool {
            groups
                .par_iter()
                .map(|group| build_clusters(&sort_by_time(&group.members)))
                .collect()
        } else {
            groups
                .iter()
                .map(|group| build_clusters(&sort_by_time(&group.members)))
                .collect()
        };

        let clusters = assemble_clusters(per_group);
        debug!(
            transactions = transactions.len(),
            groups = groups.len(),
            clusters = clusters.len(),
            parallel = use_pool,
            "duplicate detection finished"
        );

        Ok((groups.len(), clusters))
    }
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Find duplicate clusters in a batch with the default detector
pub fn detect_duplicates(transactions: &[Transaction]) -> Result<Vec<DuplicateCluster<'_>>> {
    DuplicateDetector::new().detect(transactions)
}

/// Drop every cluster's retries from the batch, keeping input order
pub fn suppress_duplicates(transactions: &[Transaction]) -> Result<Vec<&Transaction>> {
    DuplicateDetector::new().suppress(transactions)
}

// ============================================================================
// TESTS
// ============================================================================
