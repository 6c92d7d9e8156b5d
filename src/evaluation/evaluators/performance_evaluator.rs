use crate::evaluation::Measurement;
use std::collections::HashMap;

/// Accumulates labeled predictions and reports aggregated metrics.
///
/// A `PerformanceEvaluator` consumes a ground-truth class together with the
/// model's per-class scores and exposes the metrics via [`performance`](Self::performance).
pub trait PerformanceEvaluator {
    /// Clears accumulated results.
    fn reset(&mut self);

    /// Feeds one labeled row and its class votes (one score per class).
    ///
    /// Rows whose votes are unusable are skipped.
    fn add_result(&mut self, true_class: usize, class_votes: &[f64]);

    fn performance(&self) -> Vec<Measurement>;
}

pub trait PerformanceEvaluatorExt {
    /// Returns (name, Some(value)|None) for each requested metric, preserving order.
    fn metrics<'a, I>(&self, names: I) -> Vec<(String, Option<f64>)>
    where
        I: IntoIterator<Item = &'a str>;

    fn metric(&self, name: &str) -> Option<f64> {
        self.metrics([name]).into_iter().next().and_then(|(_, v)| v)
    }
}

impl<T: PerformanceEvaluator + ?Sized> PerformanceEvaluatorExt for T {
    fn metrics<'a, I>(&self, names: I) -> Vec<(String, Option<f64>)>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let ms = self.performance();
        let map: HashMap<_, _> = ms.into_iter().map(|m| (m.name, m.value)).collect();
        names
            .into_iter()
            .map(|n| (n.to_string(), map.get(n).copied()))
            .collect()
    }
}
