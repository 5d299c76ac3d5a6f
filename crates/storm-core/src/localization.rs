use std::cmp::Ordering;
use std::collections::BTreeSet;

/// One detected emitter on the up-sampled grid.
///
/// Ordering is `(y, x)` lexicographically, and equality — therefore set
/// deduplication — is on that same `(y, x)` pair alone, matching the
/// original `Coord`'s `operator<` (`y` compared first, then `x`, with no
/// `value` term at all). Two candidates landing on the same pixel collapse
/// to whichever was inserted first, regardless of their refined `value`,
/// exactly as `std::set<Coord<T>>` does.
#[derive(Clone, Copy, Debug)]
pub struct Localization {
    pub x: u32,
    pub y: u32,
    pub value: f32,
    pub asymmetry: f32,
}

impl Localization {
    pub fn new(x: u32, y: u32, value: f32) -> Self {
        Self {
            x,
            y,
            value,
            asymmetry: 1.0,
        }
    }
}

impl PartialEq for Localization {
    fn eq(&self, other: &Self) -> bool {
        self.y == other.y && self.x == other.x
    }
}
impl Eq for Localization {}

impl PartialOrd for Localization {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Localization {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.y.cmp(&other.y) {
            Ordering::Equal => self.x.cmp(&other.x),
            ord => ord,
        }
    }
}

/// The set of Localizations found in a single frame.
///
/// A `BTreeSet` ordered per [`Localization::cmp`] and deduplicated per
/// [`Localization::eq`] absorbs the duplicate candidates produced by
/// overlapping ROIs exactly as the original's `std::set<Coord<T>>` does.
#[derive(Clone, Debug, Default)]
pub struct FrameLocalizationSet {
    inner: BTreeSet<Localization>,
}

impl FrameLocalizationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a candidate, returning `false` if a localization at the same
    /// `(y, x)` was already present — the earlier insertion's `value` is
    /// kept, regardless of what this one's `value` would have been.
    pub fn insert(&mut self, loc: Localization) -> bool {
        self.inner.insert(loc)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Localization> {
        self.inner.iter()
    }

    pub fn into_iter(self) -> impl Iterator<Item = Localization> {
        self.inner.into_iter()
    }

    /// Replace every member, typically after the asymmetry pass recomputes
    /// each localization's `asymmetry` field (the original reconstructs the
    /// whole set the same way in `determineAsymmetry`).
    pub fn replace_all(&mut self, updated: impl IntoIterator<Item = Localization>) {
        self.inner = updated.into_iter().collect();
    }
}

impl<'a> IntoIterator for &'a FrameLocalizationSet {
    type Item = &'a Localization;
    type IntoIter = std::collections::btree_set::Iter<'a, Localization>;
    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

/// Per-frame localization sets, indexed by frame number; `catalogue.len()`
/// always equals the stack's frame count, even for frames outside the
/// requested `--frames` range (those entries stay empty).
#[derive(Clone, Debug, Default)]
pub struct Catalogue {
    frames: Vec<FrameLocalizationSet>,
}

impl Catalogue {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            frames: (0..n).map(|_| FrameLocalizationSet::new()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, frame: usize) -> Option<&FrameLocalizationSet> {
        self.frames.get(frame)
    }

    pub fn set(&mut self, frame: usize, set: FrameLocalizationSet) {
        self.frames[frame] = set;
    }

    pub fn total_localizations(&self) -> usize {
        self.frames.iter().map(FrameLocalizationSet::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &FrameLocalizationSet)> {
        self.frames.iter().enumerate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_rois_deduplicate_by_identity() {
        let mut set = FrameLocalizationSet::new();
        assert!(set.insert(Localization::new(124, 124, 500.0)));
        assert!(!set.insert(Localization::new(124, 124, 500.0)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn dedup_key_ignores_value_like_the_original_coord_ordering() {
        // Two refined candidates at the same (y, x) collapse to one even when
        // their interpolated `value` differs — matching `std::set<Coord<T>>`,
        // which never compares `value` at all.
        let mut set = FrameLocalizationSet::new();
        assert!(set.insert(Localization::new(40, 12, 500.0)));
        assert!(!set.insert(Localization::new(40, 12, 612.7)));
        assert_eq!(set.len(), 1);
        let loc = set.iter().next().unwrap();
        assert_eq!(loc.value, 500.0, "first insertion's value must survive");
    }

    #[test]
    fn ordering_is_row_major() {
        let mut set = FrameLocalizationSet::new();
        set.insert(Localization::new(5, 1, 1.0));
        set.insert(Localization::new(1, 0, 1.0));
        set.insert(Localization::new(2, 0, 1.0));
        let xs: Vec<u32> = set.iter().map(|l| l.x).collect();
        assert_eq!(xs, vec![1, 2, 5]);
    }
}
