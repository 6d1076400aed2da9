//! Fractional order keys for drag-and-drop reordering.
//!
//! Every orderable record carries a decimal key; records are displayed by key
//! **descending** (the largest key comes first). Moving a record only rewrites
//! that record's key: it is placed halfway between its new neighbors. When
//! repeated halving squeezes two neighbors closer than
//! [`REBALANCE_THRESHOLD`], the whole collection is respaced by
//! [`rebalance_all`].
//!
//! Everything here is a pure function over caller-owned data. Records are
//! accessed through the [`Orderable`] trait so the engine never depends on the
//! task model.
//!
//! Malformed keys never produce errors: [`parse_order_key_or_zero`] turns
//! absent, empty, non-numeric and non-finite text into `0`.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};

/// Default spacing between freshly assigned keys.
pub const INITIAL_GAP: f64 = 1000.0;

/// Floor for keys produced by halving at the bottom of the list.
pub const MIN_GAP: f64 = 0.01;

/// Adjacent keys closer than this trigger a rebalance.
pub const REBALANCE_THRESHOLD: f64 = 0.001;

// ─────────────────────────────────────────────────────────────────────────────
// OrderKey
// ─────────────────────────────────────────────────────────────────────────────

/// A numeric order key.
///
/// Always finite. Persisted as its [`Display`](fmt::Display) form, which is the
/// shortest decimal that round-trips (`1000`, `1500.5`), so repeated
/// read/write cycles never drift.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct OrderKey(f64);

impl OrderKey {
    /// The key every unparseable or missing value collapses to.
    pub const ZERO: Self = Self(0.0);

    /// Wrap a raw value. Non-finite values become [`OrderKey::ZERO`].
    pub fn new(value: f64) -> Self {
        if value.is_finite() {
            // `+ 0.0` folds negative zero so it never prints as "-0".
            Self(value + 0.0)
        } else {
            Self::ZERO
        }
    }

    /// The underlying number.
    pub fn value(self) -> f64 {
        self.0
    }

    /// Whether the key is zero (treated as "no key" by neighbor placement).
    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }

    /// Total ordering on keys. Keys are always finite, so this agrees with `<`.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl From<f64> for OrderKey {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parse a persisted key, coercing anything unusable to zero.
///
/// Absent, empty, non-numeric, `NaN` and infinite inputs all yield
/// [`OrderKey::ZERO`]. Surrounding whitespace is ignored.
pub fn parse_order_key_or_zero(text: Option<&str>) -> OrderKey {
    text.map(str::trim)
        .and_then(|t| t.parse::<f64>().ok())
        .map_or(OrderKey::ZERO, OrderKey::new)
}

// ─────────────────────────────────────────────────────────────────────────────
// Orderable
// ─────────────────────────────────────────────────────────────────────────────

/// Access to the ordering fields of a caller-owned record.
pub trait Orderable {
    /// The record's key, or `None` when it has never been assigned one.
    fn order_key(&self) -> Option<OrderKey>;

    /// Overwrite the record's key.
    fn set_order_key(&mut self, key: OrderKey);

    /// Creation time, used to break ties between equal keys.
    fn created_at(&self) -> Option<DateTime<Utc>>;
}

impl<T: Orderable + ?Sized> Orderable for &mut T {
    fn order_key(&self) -> Option<OrderKey> {
        (**self).order_key()
    }

    fn set_order_key(&mut self, key: OrderKey) {
        (**self).set_order_key(key);
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        (**self).created_at()
    }
}

fn key_or_zero<T: Orderable + ?Sized>(record: &T) -> OrderKey {
    record.order_key().unwrap_or(OrderKey::ZERO)
}

// ─────────────────────────────────────────────────────────────────────────────
// Key allocation
// ─────────────────────────────────────────────────────────────────────────────

/// Key for a brand-new record, placing it above everything that exists.
///
/// Returns [`INITIAL_GAP`] for an empty collection, otherwise the largest
/// existing key plus [`INITIAL_GAP`].
pub fn compute_initial_key<I>(existing: I) -> OrderKey
where
    I: IntoIterator<Item = OrderKey>,
{
    let highest = existing
        .into_iter()
        .max_by(OrderKey::total_cmp)
        .map_or(0.0, OrderKey::value);
    OrderKey::new(highest + INITIAL_GAP)
}

/// Which branch of neighbor placement produced a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlacementKind {
    /// No predecessor: the record becomes the first element.
    Top,
    /// No successor: the record becomes the last element.
    Bottom,
    /// Midpoint of two well-ordered neighbors.
    Between,
    /// Neighbors arrived with `before <= after`. The key is a fallback and the
    /// collection's keys are likely corrupt.
    Inverted,
}

/// A computed key together with how it was derived.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// The new key.
    pub key: OrderKey,
    /// The placement branch taken.
    pub kind: PlacementKind,
}

/// Compute a key between two neighbors and report which case applied.
///
/// `before` is the key of the record that will precede the target position
/// (numerically larger), `after` the key of the record that will follow it.
/// A zero key is treated the same as an absent one.
pub fn place_between(before: Option<OrderKey>, after: Option<OrderKey>) -> Placement {
    let before = before.unwrap_or(OrderKey::ZERO);
    let after = after.unwrap_or(OrderKey::ZERO);

    if before.is_zero() {
        return Placement {
            key: OrderKey::new(before.value().max(after.value()) + INITIAL_GAP),
            kind: PlacementKind::Top,
        };
    }

    if after.is_zero() {
        return Placement {
            key: OrderKey::new((before.value() / 2.0).max(MIN_GAP)),
            kind: PlacementKind::Bottom,
        };
    }

    if before > after {
        Placement {
            key: OrderKey::new((before.value() + after.value()) / 2.0),
            kind: PlacementKind::Between,
        }
    } else {
        Placement {
            key: OrderKey::new(before.value() + INITIAL_GAP),
            kind: PlacementKind::Inverted,
        }
    }
}

/// Compute a key between two neighbors. See [`place_between`].
pub fn compute_key_between(before: Option<OrderKey>, after: Option<OrderKey>) -> OrderKey {
    place_between(before, after).key
}

// ─────────────────────────────────────────────────────────────────────────────
// Collection-level operations
// ─────────────────────────────────────────────────────────────────────────────

/// Whether any two adjacent records sit closer than [`REBALANCE_THRESHOLD`].
///
/// The sequence is expected in display order. Gaps are compared by magnitude,
/// so the check gives the same answer for ascending input.
pub fn should_rebalance<T: Orderable>(ordered: &[T]) -> bool {
    ordered.windows(2).any(|pair| {
        let gap = key_or_zero(&pair[1]).value() - key_or_zero(&pair[0]).value();
        gap.abs() < REBALANCE_THRESHOLD
    })
}

/// The key the record at `index` receives when `len` records are respaced.
pub fn rebalanced_key(index: usize, len: usize) -> OrderKey {
    #[allow(clippy::cast_precision_loss)]
    let rank = (len - index) as f64;
    OrderKey::new(rank * INITIAL_GAP)
}

/// Respace every key uniformly, keeping the given order.
///
/// The first record receives the largest key (`len * INITIAL_GAP`) and the
/// last receives [`INITIAL_GAP`], so every adjacent gap becomes exactly
/// [`INITIAL_GAP`].
pub fn rebalance_all<T: Orderable>(ordered: &mut [T]) {
    let len = ordered.len();
    for (index, record) in ordered.iter_mut().enumerate() {
        record.set_order_key(rebalanced_key(index, len));
    }
}

/// Display-order comparison: key descending, then newest creation first.
pub fn compare_descending<T: Orderable + ?Sized>(a: &T, b: &T) -> Ordering {
    key_or_zero(b)
        .total_cmp(&key_or_zero(a))
        .then_with(|| b.created_at().cmp(&a.created_at()))
}

/// Sort records into display order.
///
/// Stable: records with equal keys and equal creation times keep their input
/// order. Missing keys count as zero and missing timestamps sort as oldest.
pub fn sort_by_key_descending<T: Orderable>(records: &mut [T]) {
    records.sort_by(|a, b| compare_descending(a, b));
}

/// Give every key-less record a key above all existing ones.
///
/// Keys are handed out in iteration order, starting at the largest existing
/// key plus [`INITIAL_GAP`] and growing by [`INITIAL_GAP`] per record.
/// Returns the number of records that were assigned a key; zero means
/// nothing changed.
pub fn normalize_missing_keys<'a, T, I>(records: I) -> usize
where
    T: Orderable + 'a,
    I: IntoIterator<Item = &'a mut T>,
{
    let mut records: Vec<&mut T> = records.into_iter().collect();

    let highest = records
        .iter()
        .filter_map(|r| r.order_key())
        .max_by(OrderKey::total_cmp);
    let mut next = highest.map_or(INITIAL_GAP, |k| k.value() + INITIAL_GAP);

    let mut assigned = 0;
    for record in &mut records {
        if record.order_key().is_none() {
            record.set_order_key(OrderKey::new(next));
            next += INITIAL_GAP;
            assigned += 1;
        }
    }
    assigned
}
