use std::{
    cmp::Ordering,
    collections::BTreeMap,
    ops::Bound::{Excluded, Included, Unbounded},
};

use nalgebra::RealField;

/// Timestamp key, totally ordered because non-finite timestamps are rejected on insertion.
#[derive(Debug, Clone)]
struct Stamp<T>(T);

impl<T: PartialOrd> PartialEq for Stamp<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: PartialOrd> Eq for Stamp<T> {}

impl<T: PartialOrd> PartialOrd for Stamp<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: PartialOrd> Ord for Stamp<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
    }
}

/// Samples of a single stream ordered by timestamp.
///
/// ```text
/// ├──●────●────●────●────●──>> timestamp
///    ╰────┬────╯    │    │
///   discard_up_to   │    last
///                 first_after
/// ```
///
/// Keys are unique, adding at an existing timestamp replaces the value.
/// The capacity hint is only reported, nothing is ever evicted.
#[derive(Debug, Clone)]
pub struct MeasurementBuffer<T, V> {
    entries: BTreeMap<Stamp<T>, V>,
    capacity_hint: usize,
}

impl<T: RealField, V> Default for MeasurementBuffer<T, V> {
    fn default() -> Self {
        Self::with_capacity_hint(usize::MAX)
    }
}

impl<T, V> MeasurementBuffer<T, V>
where
    T: RealField,
{
    pub fn with_capacity_hint(capacity_hint: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            capacity_hint,
        }
    }

    /// Insert `value` at `timestamp`, returning the value it replaced.
    ///
    /// # Panics
    /// If `timestamp` is not finite.
    pub fn add(&mut self, timestamp: T, value: V) -> Option<V> {
        assert!(
            timestamp.is_finite(),
            "measurement timestamp must be finite, got {timestamp:?}"
        );
        let replaced = self.entries.insert(Stamp(timestamp), value);
        if replaced.is_none() && self.len() == self.capacity_hint.saturating_add(1) {
            log::debug!(
                "measurement buffer grew past its capacity hint of {}",
                self.capacity_hint
            );
        }
        replaced
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn capacity_hint(&self) -> usize {
        self.capacity_hint
    }

    #[inline]
    pub fn exceeds_capacity_hint(&self) -> bool {
        self.len() > self.capacity_hint
    }

    /// The most recent entry.
    #[inline]
    pub fn last(&self) -> Option<(&T, &V)> {
        self.entries
            .last_key_value()
            .map(|(Stamp(timestamp), value)| (timestamp, value))
    }

    #[inline]
    pub fn last_timestamp(&self) -> Option<T> {
        self.last().map(|(timestamp, _)| timestamp.clone())
    }

    #[inline]
    pub fn last_value(&self) -> Option<&V> {
        self.last().map(|(_, value)| value)
    }

    /// The earliest entry strictly after `timestamp`.
    pub fn first_after(&self, timestamp: &T) -> Option<(&T, &V)> {
        self.entries
            .range((Excluded(Stamp(timestamp.clone())), Unbounded))
            .next()
            .map(|(Stamp(timestamp), value)| (timestamp, value))
    }

    /// The earliest entry at or after `timestamp`.
    pub fn first_from(&self, timestamp: &T) -> Option<(&T, &V)> {
        self.entries
            .range((Included(Stamp(timestamp.clone())), Unbounded))
            .next()
            .map(|(Stamp(timestamp), value)| (timestamp, value))
    }

    /// Remove every entry at or before `timestamp`.
    pub fn discard_up_to(&mut self, timestamp: &T) {
        let key = Stamp(timestamp.clone());
        let mut kept = self.entries.split_off(&key);
        kept.remove(&key);
        self.entries = kept;
    }

    /// Entries in ascending timestamp order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&T, &V)> + ExactSizeIterator {
        self.entries
            .iter()
            .map(|(Stamp(timestamp), value)| (timestamp, value))
    }
}

impl<T: RealField, V> Extend<(T, V)> for MeasurementBuffer<T, V> {
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = (T, V)>,
    {
        iter.into_iter().for_each(|(timestamp, value)| {
            self.add(timestamp, value);
        });
    }
}

impl<T: RealField, V> FromIterator<(T, V)> for MeasurementBuffer<T, V> {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (T, V)>,
    {
        let mut buffer = Self::default();
        buffer.extend(iter);
        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestT = f64;

    fn buffer_of(timestamps: &[TestT]) -> MeasurementBuffer<TestT, usize> {
        timestamps.iter().copied().zip(0..).collect()
    }

    #[test]
    fn test_add_overwrites_equal_timestamp() {
        let mut buffer = MeasurementBuffer::with_capacity_hint(3);
        assert_eq!(buffer.add(1.0, 'a'), None);
        assert_eq!(buffer.add(1.0, 'b'), Some('a'));
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.last(), Some((&1.0, &'b')));
    }

    #[test]
    fn test_ordered_regardless_of_insertion() {
        let buffer = buffer_of(&[0.3, 0.1, 0.2]);
        let timestamps: Vec<_> = buffer.iter().map(|(t, _)| *t).collect();
        assert_eq!(timestamps, [0.1, 0.2, 0.3]);
        assert_eq!(buffer.last_timestamp(), Some(0.3));
        assert_eq!(buffer.last_value(), Some(&0));
    }

    #[test]
    fn test_first_after() {
        let buffer = buffer_of(&[0.1, 0.2, 0.3]);
        assert_eq!(buffer.first_after(&0.0), Some((&0.1, &0)));
        assert_eq!(buffer.first_after(&0.1), Some((&0.2, &1)));
        assert_eq!(buffer.first_after(&0.15), Some((&0.2, &1)));
        assert_eq!(buffer.first_after(&0.3), None);
        assert_eq!(buffer.first_from(&0.2), Some((&0.2, &1)));
        assert_eq!(buffer.first_from(&0.31), None);

        let empty = MeasurementBuffer::<TestT, ()>::default();
        assert_eq!(empty.first_after(&0.0), None);
        assert!(empty.last().is_none());
    }

    #[test]
    fn test_discard_up_to() {
        let mut buffer = buffer_of(&[0.1, 0.2, 0.3, 0.4]);

        buffer.discard_up_to(&0.2);
        let rest: Vec<_> = buffer.iter().map(|(t, v)| (*t, *v)).collect();
        assert_eq!(rest, [(0.3, 2), (0.4, 3)]);

        buffer.discard_up_to(&0.35);
        assert_eq!(buffer.len(), 1);

        buffer.discard_up_to(&1.0);
        assert!(buffer.is_empty());
        assert_eq!(buffer.len(), 0);
    }

    #[test]
    fn test_capacity_hint_is_advisory() {
        let mut buffer = MeasurementBuffer::with_capacity_hint(2);
        buffer.extend([(0.1, ()), (0.2, ()), (0.3, ())]);
        assert_eq!(buffer.len(), 3);
        assert!(buffer.exceeds_capacity_hint());
    }

    #[test]
    #[should_panic]
    fn test_non_finite_timestamp_panics() {
        let mut buffer = MeasurementBuffer::<TestT, ()>::default();
        buffer.add(TestT::NAN, ());
    }
}
