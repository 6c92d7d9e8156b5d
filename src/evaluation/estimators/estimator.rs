/// Incremental scalar estimator.
///
/// Implementations accept values one at a time via [`add`](Estimator::add) and
/// expose the current estimate via [`estimation`](Estimator::estimation).
pub trait Estimator {
    fn add(&mut self, v: f64);

    fn estimation(&self) -> f64;
}
