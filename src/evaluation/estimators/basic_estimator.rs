use crate::evaluation::estimators::Estimator;

/// Running mean that also tracks spread and extremes.
///
/// `NaN` inputs are skipped, so per-class indicators can be fed unconditionally.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicEstimator {
    len: f64,
    sum: f64,
    sum_sq: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl BasicEstimator {
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0.0
    }

    /// Population standard deviation of the values seen so far.
    pub fn std_dev(&self) -> f64 {
        if self.len == 0.0 {
            return f64::NAN;
        }
        let mean = self.sum / self.len;
        libm::sqrt((self.sum_sq / self.len - mean * mean).max(0.0))
    }

    pub fn min(&self) -> f64 {
        self.min.unwrap_or(f64::NAN)
    }

    pub fn max(&self) -> f64 {
        self.max.unwrap_or(f64::NAN)
    }
}

impl FromIterator<f64> for BasicEstimator {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut est = Self::default();
        for v in iter {
            est.add(v);
        }
        est
    }
}

impl Estimator for BasicEstimator {
    #[inline]
    fn add(&mut self, v: f64) {
        if v.is_nan() {
            return;
        }
        self.len += 1.0;
        self.sum += v;
        self.sum_sq += v * v;
        self.min = Some(self.min.map_or(v, |m| m.min(v)));
        self.max = Some(self.max.map_or(v, |m| m.max(v)));
    }

    #[inline]
    fn estimation(&self) -> f64 {
        if self.len > 0.0 {
            self.sum / self.len
        } else {
            f64::NAN
        }
    }
}
