//! Defines the `Sampler` trait - an object that can randomly sample trajectories from a `Ctbn`.

use crate::trajectory::Event;
use crate::util::Result;

use indexmap::IndexMap;
use rand::Rng;

pub mod forward;

pub use self::forward::ForwardSampler;


/// One sampled trajectory together with the time spent by each variable in each of its states
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {

    /// For every variable, in node order, the time spent in each state
    pub time_in_state: IndexMap<String, Vec<f64>>,

    /// The chronological events of the trajectory
    pub events: Vec<Event>

}


pub trait Sampler {

    /// Draw one trajectory, starting from a fresh random state.
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Sample>;

}
