//! Defines an `Estimator`, which is used to estimate parameters of a `Ctbn` from trajectories.

use crate::trajectory::Trajectory;
use crate::util::Result;

mod mle;
mod stats;

pub use self::mle::{ctbn_from_data, fit_parameters, CimEstimator, ModelEstimator};
pub use self::stats::{compute_cim_from_stats, Stats};


/// A trait that represents the ability to estimate the parameters of some model (be it a `Ctbn`
/// or just a local `Cim`).
pub trait Estimator<T> {

    /// Estimate the value of the parameters from the given trajectories
    fn estimate(&mut self, trajectory: &Trajectory) -> Result<T>;

}
