//! Exact inference by amalgamation of every `Cim` of the network into the intensity matrix of
//! the joint process.

use crate::cim::Cim;
use crate::factor::Factor;
use crate::model::Ctbn;
use crate::util::{CtbnError, Result};
use crate::variable::DiscreteVariable;
use super::CtbnInference;

use log::debug;
use nalgebra::DMatrix;
use ndarray::Array2;


/// The elapsed time used by `make_inference`
pub const DEFAULT_ELAPSED_TIME: f64 = 5000.0;


/// Computes the distribution of the network at some time, starting from a uniform distribution
/// over the joint state space. The cost grows with the product of every domain size.
pub struct ExactAmalgamationInference<'a> {

    model: &'a Ctbn,

    /// The joint distribution over the to-state of every variable, once inference is made
    joint: Option<Factor>

}


impl<'a> ExactAmalgamationInference<'a> {

    pub fn new(model: &'a Ctbn) -> Self {
        ExactAmalgamationInference { model, joint: None }
    }

    /// The intensity matrix of the joint process
    pub fn amalgamated(&self) -> Result<Cim> {
        let mut joint = Cim::new();
        for node in self.model.nodes() {
            joint = joint.amalgamate(self.model.cim(node)?)?;
        }
        Ok(joint)
    }

    /// Compute the joint distribution after `elapsed` time units.
    ///
    /// # Errors
    /// * `CtbnError::InvalidArgument` if the network is empty
    /// * `CtbnError::Numerical` if the matrix exponential is not finite
    pub fn make_inference_at(&mut self, elapsed: f64) -> Result<()> {
        if self.model.is_empty() {
            return Err(CtbnError::InvalidArgument(String::from("cannot make inference on an empty network")));
        }

        debug!("amalgamating {} conditional intensity matrices", self.model.size());
        let mut joint = self.amalgamated()?;

        //////
        // transition probabilities: expm(t * Q)
        let q = joint.to_matrix()?;
        let n = q.nrows();
        debug!("exponentiating a {}x{} intensity matrix at t = {}", n, n, elapsed);

        let transitions = DMatrix::from_fn(n, n, |r, c| q[[r, c]] * elapsed).exp();
        if transitions.iter().any(|v| ! v.is_finite()) {
            return Err(CtbnError::Numerical(format!("matrix exponential at t = {} is not finite", elapsed)));
        }

        joint.from_matrix(&Array2::from_shape_fn((n, n), |(r, c)| transitions[(r, c)]))?;

        //////
        // uniform prior over the from-states, then marginalize them out
        let from: Vec<DiscreteVariable> = joint.variables()
                                               .iter()
                                               .filter(|v| Cim::is_from(v.name()))
                                               .cloned()
                                               .collect();
        let size: usize = from.iter().map(|v| v.cardinality()).product();
        let names: Vec<String> = from.iter().map(|v| v.name().to_string()).collect();
        let names: Vec<&str> = names.iter().map(|s| s.as_str()).collect();

        let prior = Factor::from_elem(from, 1.0 / size as f64)?;
        let dist = joint.factor().product(&prior)?.sum_out(&names)?;

        debug!("exact inference done");
        self.joint = Some(dist);
        Ok(())
    }

    /// The joint distribution over the to-states, once inference is made
    pub fn joint(&self) -> Option<&Factor> {
        self.joint.as_ref()
    }

}


impl<'a> CtbnInference for ExactAmalgamationInference<'a> {

    fn make_inference(&mut self) -> Result<()> {
        self.make_inference_at(DEFAULT_ELAPSED_TIME)
    }

    fn posterior(&self, name: &str) -> Result<Factor> {
        let joint = self.joint
                        .as_ref()
                        .ok_or_else(|| CtbnError::UndefinedState(String::from("no inference was made")))?;
        self.model.variable(name)?;

        let to = Cim::var_j(name);
        let mut marginal = joint.sum_in(&[to.as_str()])?;
        marginal.rename(&to, name)?;
        Ok(marginal)
    }

}
