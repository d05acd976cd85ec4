use std::collections::VecDeque;

use crate::types::TemperatureReading;

const PREALLOCATED_READINGS: usize = 64;

/// Capped FIFO of readings in insertion order. Once full, each push drops the
/// oldest entry. Storage grows with use, up to the cap.
#[derive(Debug, Clone)]
pub struct TemperatureHistory {
    readings: VecDeque<TemperatureReading>,
    capacity: usize,
}

impl TemperatureHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            readings: VecDeque::with_capacity(capacity.min(PREALLOCATED_READINGS)),
            capacity,
        }
    }

    pub fn push(&mut self, reading: TemperatureReading) {
        self.readings.push_back(reading);
        if self.readings.len() > self.capacity {
            self.readings.pop_front();
        }
    }

    pub fn latest(&self) -> Option<&TemperatureReading> {
        self.readings.back()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn snapshot(&self) -> Vec<TemperatureReading> {
        self.readings.iter().copied().collect()
    }

    /// Readings stamped at or after `cutoff`, order preserved.
    pub fn since(&self, cutoff: f64) -> Vec<TemperatureReading> {
        self.readings
            .iter()
            .filter(|reading| reading.timestamp >= cutoff)
            .copied()
            .collect()
    }

    /// Mean of consecutive differences over the readings since `cutoff`, or
    /// `0.0` with fewer than two of them.
    pub fn mean_change_since(&self, cutoff: f64) -> f64 {
        mean_change(&self.since(cutoff))
    }
}

pub fn mean_change(readings: &[TemperatureReading]) -> f64 {
    if readings.len() < 2 {
        return 0.0;
    }

    let total: f64 = readings
        .windows(2)
        .map(|pair| pair[1].value - pair[0].value)
        .sum();
    total / (readings.len() - 1) as f64
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn reading(value: f64, timestamp: f64) -> TemperatureReading {
        TemperatureReading { value, timestamp }
    }

    fn values(readings: &[TemperatureReading]) -> Vec<f64> {
        readings.iter().map(|r| r.value).collect()
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut history = TemperatureHistory::new(3);
        for (i, value) in [20.0, 22.0, 21.0, 23.0].into_iter().enumerate() {
            history.push(reading(value, i as f64));
            assert!(history.len() <= history.capacity());
        }

        assert_eq!(values(&history.snapshot()), vec![22.0, 21.0, 23.0]);
        assert_eq!(history.latest(), Some(&reading(23.0, 3.0)));
    }

    #[test]
    fn huge_capacity_grows_lazily() {
        let mut history = TemperatureHistory::new(usize::MAX / 2);
        assert!(history.is_empty());

        history.push(reading(20.0, 0.0));
        assert!(!history.is_empty());
        assert_eq!(history.len(), 1);
        assert_eq!(history.capacity(), usize::MAX / 2);
    }

    #[test]
    fn since_filters_without_reordering() {
        let mut history = TemperatureHistory::new(10);
        history.push(reading(20.0, 100.0));
        history.push(reading(22.0, 400.0));
        history.push(reading(21.0, 500.0));
        // Out-of-order timestamp stays where it was inserted.
        history.push(reading(18.0, 50.0));
        history.push(reading(23.0, 600.0));

        assert_eq!(values(&history.since(400.0)), vec![22.0, 21.0, 23.0]);
        assert_eq!(history.len(), 5);
    }

    #[test]
    fn mean_change_of_consecutive_differences() {
        let readings = [
            reading(20.0, 0.0),
            reading(22.0, 1.0),
            reading(21.0, 2.0),
            reading(23.0, 3.0),
        ];
        assert_eq!(mean_change(&readings), 1.0);
        assert_eq!(mean_change(&readings[..1]), 0.0);
        assert_eq!(mean_change(&[]), 0.0);
    }

    #[test]
    fn mean_change_since_ignores_stale_readings() {
        let mut history = TemperatureHistory::new(10);
        history.push(reading(10.0, 0.0));
        history.push(reading(20.0, 200.0));
        history.push(reading(22.0, 210.0));

        assert_eq!(history.mean_change_since(150.0), 2.0);
        assert_eq!(history.mean_change_since(205.0), 0.0);
    }
}
