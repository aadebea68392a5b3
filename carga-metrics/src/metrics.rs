use hdrhistogram::Histogram;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum MetricKind {
    Counter,
    Gauge,
    Rate,
    /// Duration samples, summarized as percentiles.
    Trend,
}

#[derive(Debug, Clone)]
pub struct MetricSeriesSummary {
    pub name: String,
    pub kind: MetricKind,
    pub tags: Vec<(String, String)>,
    pub values: MetricValue,
}

#[derive(Debug, Clone)]
pub enum MetricValue {
    Counter(u64),
    Gauge(i64),
    Rate {
        total: u64,
        hits: u64,
        rate: Option<f64>,
    },
    Trend(HistogramSummary),
}

/// Trend statistics. All durations are milliseconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistogramSummary {
    pub count: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub stdev: Option<f64>,
    pub med: Option<f64>,
    pub p90: Option<f64>,
    pub p95: Option<f64>,
    pub p99: Option<f64>,
}

const MICROS_PER_MS: f64 = 1_000.0;

pub(crate) fn new_trend_histogram() -> Histogram<u64> {
    // Microsecond resolution, one hour before auto-resize kicks in.
    match Histogram::<u64>::new_with_bounds(1, 3_600_000_000, 3) {
        Ok(mut h) => {
            h.auto(true);
            h
        }
        Err(err) => panic!("invalid histogram bounds: {err}"),
    }
}

/// Percentile `p` in `0.0..=100.0` of a microsecond histogram, in milliseconds.
pub fn percentile_ms(h: &Histogram<u64>, p: f64) -> Option<f64> {
    if h.is_empty() {
        return None;
    }
    Some(h.value_at_percentile(p.clamp(0.0, 100.0)) as f64 / MICROS_PER_MS)
}

pub fn summarize_histogram(h: &Histogram<u64>) -> HistogramSummary {
    if h.is_empty() {
        return HistogramSummary::default();
    }

    HistogramSummary {
        count: h.len(),
        min: Some(h.min() as f64 / MICROS_PER_MS),
        max: Some(h.max() as f64 / MICROS_PER_MS),
        mean: Some(h.mean() / MICROS_PER_MS),
        stdev: Some(h.stdev() / MICROS_PER_MS),
        med: percentile_ms(h, 50.0),
        p90: percentile_ms(h, 90.0),
        p95: percentile_ms(h, 95.0),
        p99: percentile_ms(h, 99.0),
    }
}

#[derive(Debug, Default)]
pub struct Rate {
    pub total: AtomicU64,
    pub hits: AtomicU64,
}

impl Rate {
    pub fn snapshot(&self) -> (u64, u64) {
        (
            self.total.load(Ordering::Relaxed),
            self.hits.load(Ordering::Relaxed),
        )
    }
}

#[derive(Debug)]
pub(crate) enum MetricStorage {
    Counter(Arc<AtomicU64>),
    Gauge(Arc<AtomicI64>),
    Rate(Arc<Rate>),
    Trend(Arc<Mutex<Histogram<u64>>>),
}

impl MetricStorage {
    pub(crate) fn new(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Counter => Self::Counter(Arc::default()),
            MetricKind::Gauge => Self::Gauge(Arc::default()),
            MetricKind::Rate => Self::Rate(Arc::default()),
            MetricKind::Trend => Self::Trend(Arc::new(Mutex::new(new_trend_histogram()))),
        }
    }

    pub(crate) fn handle(&self) -> MetricHandle {
        match self {
            Self::Counter(a) => MetricHandle::Counter(a.clone()),
            Self::Gauge(a) => MetricHandle::Gauge(a.clone()),
            Self::Rate(a) => MetricHandle::Rate(a.clone()),
            Self::Trend(a) => MetricHandle::Trend(a.clone()),
        }
    }

    pub(crate) fn value(&self) -> MetricValue {
        match self {
            Self::Counter(c) => MetricValue::Counter(c.load(Ordering::Relaxed)),
            Self::Gauge(g) => MetricValue::Gauge(g.load(Ordering::Relaxed)),
            Self::Rate(r) => {
                let (total, hits) = r.snapshot();
                let rate = (total > 0).then(|| hits as f64 / total as f64);
                MetricValue::Rate { total, hits, rate }
            }
            Self::Trend(h) => MetricValue::Trend(summarize_histogram(&h.lock())),
        }
    }
}

/// Write handle for one series. Operations that do not match the kind are no-ops.
#[derive(Debug, Clone)]
pub enum MetricHandle {
    Counter(Arc<AtomicU64>),
    Gauge(Arc<AtomicI64>),
    Rate(Arc<Rate>),
    Trend(Arc<Mutex<Histogram<u64>>>),
}

impl MetricHandle {
    #[inline]
    pub fn increment(&self, value: u64) {
        if let Self::Counter(c) = self {
            c.fetch_add(value, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn set_gauge(&self, value: i64) {
        if let Self::Gauge(g) = self {
            g.store(value, Ordering::Relaxed);
        }
    }

    /// Adds `delta` and returns the new value (0 for non-gauges).
    #[inline]
    pub fn add_gauge(&self, delta: i64) -> i64 {
        match self {
            Self::Gauge(g) => g.fetch_add(delta, Ordering::Relaxed).saturating_add(delta),
            _ => 0,
        }
    }

    #[inline]
    pub fn max_gauge(&self, value: i64) {
        if let Self::Gauge(g) = self {
            g.fetch_max(value, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn add_rate(&self, hit: bool) {
        if let Self::Rate(r) = self {
            r.total.fetch_add(1, Ordering::Relaxed);
            if hit {
                r.hits.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    #[inline]
    pub fn record_duration(&self, d: Duration) {
        let micros = u64::try_from(d.as_micros()).unwrap_or(u64::MAX);
        self.record_micros(micros);
    }

    #[inline]
    pub fn record_micros(&self, micros: u64) {
        if let Self::Trend(h) = self {
            // Zero is below the lowest trackable value.
            h.lock().saturating_record(micros.max(1));
        }
    }

    pub fn counter_value(&self) -> u64 {
        match self {
            Self::Counter(c) => c.load(Ordering::Relaxed),
            _ => 0,
        }
    }

    pub fn gauge_value(&self) -> i64 {
        match self {
            Self::Gauge(g) => g.load(Ordering::Relaxed),
            _ => 0,
        }
    }

    /// `(total, hits)`.
    pub fn rate_value(&self) -> (u64, u64) {
        match self {
            Self::Rate(r) => r.snapshot(),
            _ => (0, 0),
        }
    }

    pub fn trend_summary(&self) -> Option<HistogramSummary> {
        match self {
            Self::Trend(h) => Some(summarize_histogram(&h.lock())),
            _ => None,
        }
    }
}
