//! Structure learning: conditional independence tests between the variables of a `Ctbn` and a
//! constraint-based search that uses them to recover the arcs.

use crate::util::Result;

mod independence;
mod learner;

pub use self::independence::{
    null_state_to_state_transition_hypothesis_chi2,
    null_time_to_transition_hypothesis_f,
    FChi2Test,
    Oracle
};
pub use self::learner::Learner;


/// The outcome of a statistical hypothesis test
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Reject,
    FailToReject
}


/// A test of ```X ⟂ Y | U``` over the variables of a `Ctbn`
pub trait IndepTest {

    /// Whether `x` is independent of `y` given `u`
    ///
    /// # Errors
    /// * `CtbnError::NotFound` if one of the variables is unknown
    fn test_indep(&mut self, x: &str, y: &str, u: &[&str]) -> Result<bool>;

}
