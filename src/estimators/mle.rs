//! Defines `Estimator`s that use Maximum Likelihood Estimation to estimate the rates of a `Ctbn`
//! given trajectories.

use crate::cim::Cim;
use crate::model::Ctbn;
use crate::trajectory::Trajectory;
use crate::util::Result;
use crate::variable::DiscreteVariable;
use super::{compute_cim_from_stats, Estimator, Stats};

use log::debug;


/// A Maximum Likelihood `Estimator` for the `Cim` of a single variable given its current parents.
///
/// The rate of ```s -> s'``` is the number of such transitions divided by the time spent in
/// ```s```, for every instantiation of the parents.
pub struct CimEstimator<'a> {

    /// The model holding the variable and its parents
    model: &'a Ctbn,

    /// The name of the estimated variable
    name: String

}


impl<'a> CimEstimator<'a> {

    /// # Errors
    /// * `CtbnError::NotFound` if the variable is not in `model`
    pub fn new(model: &'a Ctbn, name: &str) -> Result<Self> {
        model.variable(name)?;
        Ok(CimEstimator { model, name: String::from(name) })
    }

}


impl<'a> Estimator<Cim> for CimEstimator<'a> {

    fn estimate(&mut self, trajectory: &Trajectory) -> Result<Cim> {
        let parents = self.model.parent_names(self.name.as_str())?;
        let parents: Vec<&str> = parents.iter().map(|p| p.as_str()).collect();

        let stats = Stats::compute(trajectory, self.model, &self.name, &parents)?;
        compute_cim_from_stats(&self.name, &stats.mx, &stats.tx)
    }

}


/// A Maximum Likelihood estimator for a `Ctbn`
///
/// The likelihood decomposes over the variables, so the `ModelEstimator` is really just a
/// 'bag-o-`CimEstimator`s'. The estimated `Ctbn` has the structure of the original one.
pub struct ModelEstimator<'a> {

    /// The model for which to estimate the parameters
    model: &'a Ctbn

}


impl<'a> ModelEstimator<'a> {

    pub fn new(model: &'a Ctbn) -> Self {
        ModelEstimator { model }
    }

}


impl<'a> Estimator<Ctbn> for ModelEstimator<'a> {

    fn estimate(&mut self, trajectory: &Trajectory) -> Result<Ctbn> {
        let mut fitted = self.model.clone();

        for name in self.model.names() {
            let cim = CimEstimator::new(self.model, name)?.estimate(trajectory)?;
            fitted.cim_mut(name)?.fill_from(&cim.to_vec())?;
        }

        Ok(fitted)
    }

}


/// Replace the rates of `model` by their estimation from `trajectory`
pub fn fit_parameters(model: &mut Ctbn, trajectory: &Trajectory) -> Result<()> {
    debug!("fitting {} conditional intensity matrices on {} trajectories", model.size(), trajectory.len());
    let fitted = ModelEstimator::new(model).estimate(trajectory)?;
    *model = fitted;
    Ok(())
}


/// A `Ctbn` without arcs holding one variable per name observed in `trajectory`, in sorted
/// order. The labels of a variable are its sorted observed labels.
pub fn ctbn_from_data(trajectory: &Trajectory) -> Result<Ctbn> {
    let mut model = Ctbn::new();

    for name in trajectory.variable_names() {
        let labels = trajectory.labels(&name);
        let labels: Vec<&str> = labels.iter().map(|l| l.as_str()).collect();
        model.add(DiscreteVariable::new(&name, &labels)?)?;
    }

    Ok(model)
}


#[cfg(test)]
mod tests {

    use super::*;
    use crate::config::SamplingConfig;
    use crate::init::Initialization;
    use crate::inference::ForwardSamplingInference;
    use crate::model::CtbnBuilder;
    use crate::trajectory::Event;
    use crate::variable::Instantiation;

    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn chain() -> Ctbn {
        CtbnBuilder::new()
            .with_variable(DiscreteVariable::binary("A").unwrap())
            .with_variable(DiscreteVariable::range("B", 3).unwrap())
            .with_arc("A", "B")
            .with_cim("A", Initialization::Matrix(array![[-1., 1.], [2., -2.]]))
            .with_cim("B", Initialization::Random(0.5, 3.))
            .build_using(&mut StdRng::seed_from_u64(8))
            .unwrap()
    }

    #[test]
    fn single_variable() {
        let mut traj = Trajectory::new();
        traj.insert(0, vec![
            Event::new(0., "A", "0"), Event::new(0., "B", "0"),
            Event::new(2., "A", "1"),
            Event::new(3., "A", "0"),
            Event::new(4., "A", "0"), Event::new(4., "B", "0")
        ]);

        let model = chain();
        let cim = CimEstimator::new(&model, "A").unwrap().estimate(&traj).unwrap();
        // one 0 -> 1 over 3 time units in 0, one 1 -> 0 over 1 time unit in 1
        let expected = vec![-1. / 3., 1. / 3., 1., -1.];
        for (e, a) in expected.iter().zip(cim.to_vec()) {
            assert!((e - a).abs() < 1e-12);
        }

        match CimEstimator::new(&model, "Z") {
            Err(e) => assert!(e.is_not_found()),
            Ok(_) => panic!("unknown variable accepted")
        };
    }

    #[test]
    fn fit_sampled() {
        let model = chain();
        let config = SamplingConfig { time_horizon: 2000., burn_in: 10, ..SamplingConfig::default() };
        let engine = ForwardSamplingInference::new(&model, config).unwrap();
        let traj = engine.sample_trajectory(20, &mut StdRng::seed_from_u64(99)).unwrap();

        let mut fitted = model.clone();
        Initialization::Zero.build(fitted.cim_mut("A").unwrap()).unwrap();
        fit_parameters(&mut fitted, &traj).unwrap();

        assert_eq!(fitted.arcs(), model.arcs());
        let a = fitted.cim("A").unwrap();
        let mut state = Instantiation::new();
        state.set("A", 0);
        assert!((a.exit_rate(&state).unwrap() - 1.).abs() < 0.1);
        state.set("A", 1);
        assert!((a.exit_rate(&state).unwrap() - 2.).abs() < 0.2);

        let b = fitted.cim("B").unwrap();
        b.validate(1e-9).unwrap();
        for (e, a) in model.cim("B").unwrap().to_vec().iter().zip(b.to_vec()) {
            assert!((e - a).abs() < 0.25 * e.abs().max(1.));
        }
    }

    #[test]
    fn skeleton_from_data() {
        let mut traj = Trajectory::new();
        traj.insert(0, vec![
            Event::new(0., "Y", "b"), Event::new(0., "X", "1"),
            Event::new(1., "Y", "a"),
            Event::new(3., "Y", "a"), Event::new(3., "X", "1")
        ]);
        traj.insert(1, vec![Event::new(0., "X", "0"), Event::new(2., "X", "0")]);

        let model = ctbn_from_data(&traj).unwrap();
        assert_eq!(model.names(), vec!["X", "Y"]);
        assert_eq!(model.labels("X").unwrap(), &["0", "1"]);
        assert_eq!(model.labels("Y").unwrap(), &["a", "b"]);
        assert!(model.arcs().is_empty());
    }

}
