//! Statistics accumulators used by resources.
//!
//! - [`DataSeries`] summarizes a stream of (optionally weighted) samples.
//! - [`TimeSeries`] summarizes a piecewise-constant signal, weighting every value by the time it was held.
//! - [`Population`] tracks the number of items present in some place (a resource, a queue) over time together
//!   with the time each item spent there.

use serde::Serialize;

/// Histogram with equally sized buckets plus underflow and overflow buckets.
#[derive(Clone, Debug, Serialize)]
pub struct Histogram {
    lower: f64,
    upper: f64,
    bucket_size: f64,
    buckets: Vec<u64>,
}

impl Histogram {
    fn new(lower: f64, upper: f64, nbuckets: usize) -> Self {
        Self {
            lower,
            upper,
            bucket_size: (upper - lower) / nbuckets as f64,
            // buckets[0] is the underflow bucket, the last one is the overflow bucket
            buckets: vec![0; nbuckets + 2],
        }
    }

    fn record(&mut self, value: f64) {
        let last = self.buckets.len() - 1;
        let index = if value < self.lower {
            0
        } else if value >= self.upper {
            last
        } else {
            (((value - self.lower) / self.bucket_size) as usize + 1).min(last - 1)
        };
        self.buckets[index] += 1;
    }

    fn reset(&mut self) {
        self.buckets.iter_mut().for_each(|count| *count = 0);
    }

    /// Returns bucket counts: underflow bucket, regular buckets, overflow bucket.
    pub fn buckets(&self) -> &[u64] {
        &self.buckets
    }

    /// Returns the lower bound of the regular buckets.
    pub fn lower(&self) -> f64 {
        self.lower
    }

    /// Returns the upper bound of the regular buckets.
    pub fn upper(&self) -> f64 {
        self.upper
    }
}

/// Summary of a stream of weighted samples.
///
/// Mean and variance are maintained incrementally using Welford's method generalized to weighted samples.
#[derive(Clone, Debug, Serialize)]
pub struct DataSeries {
    count: u64,
    weight: f64,
    mean: f64,
    q: f64,
    min: f64,
    max: f64,
    sum: f64,
    histogram: Option<Histogram>,
}

impl DataSeries {
    /// Creates an empty series.
    pub fn new() -> Self {
        Self {
            count: 0,
            weight: 0.,
            mean: 0.,
            q: 0.,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sum: 0.,
            histogram: None,
        }
    }

    /// Clears all samples. The histogram layout is kept.
    pub fn reset(&mut self) {
        self.count = 0;
        self.weight = 0.;
        self.mean = 0.;
        self.q = 0.;
        self.min = f64::INFINITY;
        self.max = f64::NEG_INFINITY;
        self.sum = 0.;
        if let Some(histogram) = self.histogram.as_mut() {
            histogram.reset();
        }
    }

    /// Enables a histogram of recorded values with `nbuckets` buckets spanning `[lower, upper)`.
    pub fn set_histogram(&mut self, lower: f64, upper: f64, nbuckets: usize) {
        self.histogram = Some(Histogram::new(lower, upper, nbuckets));
    }

    /// Returns the histogram, if enabled.
    pub fn histogram(&self) -> Option<&Histogram> {
        self.histogram.as_ref()
    }

    /// Records a sample with unit weight.
    pub fn record(&mut self, value: f64) {
        self.record_weighted(value, 1.);
    }

    /// Records a sample with the given weight.
    pub fn record_weighted(&mut self, value: f64, weight: f64) {
        if value > self.max {
            self.max = value;
        }
        if value < self.min {
            self.min = value;
        }
        self.sum += value;
        self.count += 1;
        if let Some(histogram) = self.histogram.as_mut() {
            histogram.record(value);
        }

        if self.count == 1 {
            self.mean = value;
            self.weight = weight;
            self.q = 0.;
        } else {
            let total = self.weight + weight;
            if total == 0. {
                return;
            }
            let mean = self.mean + (weight / total) * (value - self.mean);
            self.q += weight * (value - self.mean) * (value - mean);
            self.mean = mean;
            self.weight = total;
        }
    }

    /// Returns the number of recorded samples.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Returns the smallest recorded value (`+inf` if empty).
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Returns the largest recorded value (`-inf` if empty).
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Returns `max - min`.
    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    /// Returns the plain (unweighted) sum of recorded values.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Returns the weighted sum of recorded values.
    pub fn sum_weighted(&self) -> f64 {
        self.mean * self.weight
    }

    /// Returns the weighted mean.
    pub fn average(&self) -> f64 {
        self.mean
    }

    /// Returns the weighted population variance.
    pub fn variance(&self) -> f64 {
        if self.weight == 0. {
            return 0.;
        }
        self.q / self.weight
    }

    /// Returns the weighted standard deviation.
    pub fn deviation(&self) -> f64 {
        self.variance().sqrt()
    }
}

impl Default for DataSeries {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of a piecewise-constant signal over simulated time.
#[derive(Clone, Debug, Serialize)]
pub struct TimeSeries {
    last: Option<(f64, f64)>,
    data: DataSeries,
}

impl TimeSeries {
    /// Creates an empty series.
    pub fn new() -> Self {
        Self {
            last: None,
            data: DataSeries::new(),
        }
    }

    /// Clears all samples.
    pub fn reset(&mut self) {
        self.last = None;
        self.data.reset();
    }

    /// Enables a histogram of the signal values, see [`DataSeries::set_histogram`].
    pub fn set_histogram(&mut self, lower: f64, upper: f64, nbuckets: usize) {
        self.data.set_histogram(lower, upper, nbuckets);
    }

    /// Records that the signal changed to `value` at `timestamp`.
    ///
    /// The previous value is accounted with weight equal to the time it was held.
    pub fn record(&mut self, value: f64, timestamp: f64) {
        if let Some((last_value, last_timestamp)) = self.last {
            self.data.record_weighted(last_value, timestamp - last_timestamp);
        }
        self.last = Some((value, timestamp));
    }

    /// Closes the current interval at `timestamp`. Further records start a new interval.
    pub fn finalize(&mut self, timestamp: f64) {
        if let Some((last_value, last_timestamp)) = self.last.take() {
            self.data.record_weighted(last_value, timestamp - last_timestamp);
        }
    }

    /// Returns the underlying summary of time-weighted values.
    pub fn data(&self) -> &DataSeries {
        &self.data
    }

    /// Returns the number of closed intervals.
    pub fn count(&self) -> u64 {
        self.data.count()
    }

    /// Returns the smallest held value.
    pub fn min(&self) -> f64 {
        self.data.min()
    }

    /// Returns the largest held value.
    pub fn max(&self) -> f64 {
        self.data.max()
    }

    /// Returns `max - min`.
    pub fn range(&self) -> f64 {
        self.data.range()
    }

    /// Returns the time integral of the signal.
    pub fn sum(&self) -> f64 {
        self.data.sum_weighted()
    }

    /// Returns the time-weighted mean.
    pub fn average(&self) -> f64 {
        self.data.average()
    }

    /// Returns the time-weighted variance.
    pub fn variance(&self) -> f64 {
        self.data.variance()
    }

    /// Returns the time-weighted standard deviation.
    pub fn deviation(&self) -> f64 {
        self.data.deviation()
    }
}

impl Default for TimeSeries {
    fn default() -> Self {
        Self::new()
    }
}

/// Population of a place over time.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Population {
    population: u64,
    size_series: TimeSeries,
    duration_series: DataSeries,
}

impl Population {
    /// Creates an empty population.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all statistics.
    pub fn reset(&mut self) {
        self.population = 0;
        self.size_series.reset();
        self.duration_series.reset();
    }

    /// Records an arrival at `timestamp`.
    pub fn enter(&mut self, timestamp: f64) {
        self.population += 1;
        self.size_series.record(self.population as f64, timestamp);
    }

    /// Records a departure at `left_at` of an item which arrived at `arrived_at`.
    pub fn leave(&mut self, arrived_at: f64, left_at: f64) {
        self.population = self.population.saturating_sub(1);
        self.size_series.record(self.population as f64, left_at);
        self.duration_series.record(left_at - arrived_at);
    }

    /// Returns the current population.
    pub fn current(&self) -> u64 {
        self.population
    }

    /// Returns statistics of the population size over time.
    pub fn size_series(&self) -> &TimeSeries {
        &self.size_series
    }

    /// Returns statistics of the time spent by departed items.
    pub fn duration_series(&self) -> &DataSeries {
        &self.duration_series
    }

    /// Closes the open size interval at `timestamp`.
    pub fn finalize(&mut self, timestamp: f64) {
        self.size_series.finalize(timestamp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_data_series_unweighted() {
        let mut series = DataSeries::new();
        for value in [2., 4., 4., 4., 5., 5., 7., 9.] {
            series.record(value);
        }
        assert_eq!(series.count(), 8);
        assert_close(series.average(), 5.);
        assert_close(series.variance(), 4.);
        assert_close(series.deviation(), 2.);
        assert_close(series.sum(), 40.);
        assert_close(series.min(), 2.);
        assert_close(series.max(), 9.);
        assert_close(series.range(), 7.);
    }

    #[test]
    fn test_data_series_weighted() {
        let mut series = DataSeries::new();
        series.record_weighted(1., 3.);
        series.record_weighted(5., 1.);
        // mean = (1*3 + 5*1) / 4
        assert_close(series.average(), 2.);
        assert_close(series.sum_weighted(), 8.);
        // variance = (3*(1-2)^2 + 1*(5-2)^2) / 4
        assert_close(series.variance(), 3.);
    }

    #[test]
    fn test_data_series_reset() {
        let mut series = DataSeries::new();
        series.record(10.);
        series.reset();
        assert_eq!(series.count(), 0);
        assert_eq!(series.max(), f64::NEG_INFINITY);
        assert_eq!(series.variance(), 0.);
    }

    #[test]
    fn test_histogram() {
        let mut series = DataSeries::new();
        series.set_histogram(0., 10., 5);
        for value in [-1., 0., 1.9, 2., 9.99, 10., 42.] {
            series.record(value);
        }
        let histogram = series.histogram().unwrap();
        assert_eq!(histogram.buckets(), &[1, 2, 1, 0, 0, 1, 2]);
    }

    #[test]
    fn test_time_series() {
        let mut series = TimeSeries::new();
        series.record(1., 0.);
        series.record(3., 2.);
        series.record(0., 3.);
        series.finalize(5.);
        // 1 for 2 time units, 3 for 1 unit, 0 for 2 units
        assert_eq!(series.count(), 3);
        assert_close(series.sum(), 5.);
        assert_close(series.average(), 1.);
        assert_close(series.max(), 3.);
    }

    #[test]
    fn test_population() {
        let mut population = Population::new();
        population.enter(0.);
        population.enter(1.);
        assert_eq!(population.current(), 2);
        population.leave(0., 4.);
        population.leave(1., 4.);
        population.finalize(6.);
        assert_eq!(population.current(), 0);
        // size: 1 on [0,1), 2 on [1,4), 0 on [4,6)
        assert_close(population.size_series().sum(), 7.);
        assert_close(population.size_series().average(), 7. / 6.);
        assert_close(population.duration_series().average(), 3.5);
        assert_eq!(population.duration_series().count(), 2);
    }
}
