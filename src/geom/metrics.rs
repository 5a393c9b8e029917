//! Opt-in timing hooks for the surface pipeline.
//!
//! Timing is only collected when the `eds_metrics` feature is enabled and the
//! target is not WASM (`std::time::Instant` is unavailable there). Otherwise
//! every call is a no-op and [`SurfaceMetrics::end`] returns `None`.
//!
//! ```ignore
//! use eds_engine::geom::{SurfaceMetrics, TimingBucket};
//!
//! let mut metrics = SurfaceMetrics::default();
//! metrics.begin();
//! let grid = metrics.time(TimingBucket::Sampling, || sample_xy_grid(&domain, resolution))?;
//! if let Some(report) = metrics.end() {
//!     println!("sampling: {} ns", report.sampling_ns);
//! }
//! ```

use serde::Serialize;

/// Pipeline stages that are timed separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimingBucket {
    /// Building the (x, y) grid.
    Sampling,
    /// Evaluating the equation at every grid point.
    Evaluation,
    /// Centering the grid and appending base points.
    Normalization,
    /// Section sketches for the loft.
    Sections,
    /// Rail sketches between sections.
    Rails,
    /// Loft features and the final stitch.
    Lofts,
    /// Timeline grouping.
    Timeline,
}

/// Cumulative nanoseconds per [`TimingBucket`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SurfaceTimingReport {
    pub sampling_ns: u64,
    pub evaluation_ns: u64,
    pub normalization_ns: u64,
    pub sections_ns: u64,
    pub rails_ns: u64,
    pub lofts_ns: u64,
    pub timeline_ns: u64,
}

impl SurfaceTimingReport {
    /// Returns the total time across all buckets in nanoseconds.
    #[must_use]
    pub fn total_ns(&self) -> u64 {
        self.sampling_ns
            .saturating_add(self.evaluation_ns)
            .saturating_add(self.normalization_ns)
            .saturating_add(self.sections_ns)
            .saturating_add(self.rails_ns)
            .saturating_add(self.lofts_ns)
            .saturating_add(self.timeline_ns)
    }

    #[must_use]
    pub fn total_ms(&self) -> f64 {
        self.total_ns() as f64 / 1_000_000.0
    }

    /// Adds the elapsed nanoseconds to one bucket.
    pub fn add(&mut self, bucket: TimingBucket, nanos: u64) {
        let slot = match bucket {
            TimingBucket::Sampling => &mut self.sampling_ns,
            TimingBucket::Evaluation => &mut self.evaluation_ns,
            TimingBucket::Normalization => &mut self.normalization_ns,
            TimingBucket::Sections => &mut self.sections_ns,
            TimingBucket::Rails => &mut self.rails_ns,
            TimingBucket::Lofts => &mut self.lofts_ns,
            TimingBucket::Timeline => &mut self.timeline_ns,
        };
        *slot = slot.saturating_add(nanos);
    }
}

/// Accumulator for pipeline timings.
///
/// Call [`begin`](Self::begin) to reset, wrap stages with [`time`](Self::time)
/// and read the result with [`end`](Self::end).
#[derive(Debug, Default)]
pub struct SurfaceMetrics {
    #[cfg(all(feature = "eds_metrics", not(target_arch = "wasm32")))]
    report: SurfaceTimingReport,
}

impl SurfaceMetrics {
    pub fn begin(&mut self) {
        #[cfg(all(feature = "eds_metrics", not(target_arch = "wasm32")))]
        {
            self.report = SurfaceTimingReport::default();
        }
    }

    /// Returns the accumulated report, or `None` if metrics are disabled.
    #[must_use]
    pub fn end(&self) -> Option<SurfaceTimingReport> {
        #[cfg(all(feature = "eds_metrics", not(target_arch = "wasm32")))]
        {
            Some(self.report.clone())
        }
        #[cfg(not(all(feature = "eds_metrics", not(target_arch = "wasm32"))))]
        {
            None
        }
    }

    /// Times `f` and accumulates the elapsed time in `bucket`.
    pub fn time<R>(&mut self, bucket: TimingBucket, f: impl FnOnce() -> R) -> R {
        #[cfg(all(feature = "eds_metrics", not(target_arch = "wasm32")))]
        {
            let start = std::time::Instant::now();
            let result = f();
            // Cap at u64::MAX to prevent overflow
            let nanos = start.elapsed().as_nanos().min(u128::from(u64::MAX)) as u64;
            self.report.add(bucket, nanos);
            result
        }

        #[cfg(not(all(feature = "eds_metrics", not(target_arch = "wasm32"))))]
        {
            let _ = bucket;
            f()
        }
    }
}
