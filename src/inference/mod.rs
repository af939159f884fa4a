//! Defines the interface to inference engines

use crate::factor::Factor;
use crate::util::{CtbnError, Result};
use crate::variable::Instantiation;

mod exact;
mod forward;

pub use self::exact::{ExactAmalgamationInference, DEFAULT_ELAPSED_TIME};
pub use self::forward::ForwardSamplingInference;


/// A `CtbnInference` engine computes the marginal distribution of each variable of a `Ctbn`.
///
/// Engines are stateful: `posterior` answers from the last `make_inference` and fails until one
/// was made.
pub trait CtbnInference {

    /// Run the inference
    fn make_inference(&mut self) -> Result<()>;

    /// The marginal distribution of the variable `name`
    ///
    /// # Errors
    /// * `CtbnError::UndefinedState` before any inference
    /// * `CtbnError::NotFound` if the variable is not in the network
    fn posterior(&self, name: &str) -> Result<Factor>;

    /// Condition the next inferences on some evidence
    fn set_evidence(&mut self, _evidence: &Instantiation) -> Result<()> {
        Err(CtbnError::NotImplemented("inference with evidence"))
    }

}


#[cfg(test)]
/// Tests for the inference engines in this module. Tests are hoisted here to avoid duplication.
/// Any tests specific to the inference engine are held within that submodule's tests module.
mod tests {

    use super::*;
    use crate::config::SamplingConfig;
    use crate::init::Initialization;
    use crate::model::{Ctbn, CtbnBuilder};
    use crate::variable::DiscreteVariable;

    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// A -> B where A flips at rate 1 and B is pushed towards the state of A
    fn build_chain() -> Ctbn {
        CtbnBuilder::new()
            .with_variable(DiscreteVariable::binary("A").unwrap())
            .with_variable(DiscreteVariable::binary("B").unwrap())
            .with_arc("A", "B")
            .with_cim("A", Initialization::Matrix(array![[-1., 1.], [1., -1.]]))
            // (B#i, B#j, A): B moves to 1 at rate 4 when A = 1, back to 0 at rate 4 when A = 0
            .with_cim("B", Initialization::Values(&[0., 0., 0.5, 4., 4., 0.5, 0., 0.]))
            .build()
            .unwrap()
    }

    fn build_triangle() -> Ctbn {
        CtbnBuilder::new()
            .with_variable(DiscreteVariable::binary("A").unwrap())
            .with_variable(DiscreteVariable::range("B", 3).unwrap())
            .with_variable(DiscreteVariable::binary("C").unwrap())
            .with_arc("A", "B")
            .with_arc("B", "C")
            .with_arc("C", "A")
            .with_cim("A", Initialization::Random(0.5, 3.))
            .with_cim("B", Initialization::Random(0.5, 3.))
            .with_cim("C", Initialization::Random(0.5, 3.))
            .build_using(&mut StdRng::seed_from_u64(17))
            .unwrap()
    }

    fn l1(a: &Factor, b: &Factor) -> f64 {
        a.to_vec().iter().zip(b.to_vec()).map(|(x, y)| (x - y).abs()).sum()
    }

    #[test]
    fn exact_normalization() {
        let model = build_triangle();
        let mut engine = ExactAmalgamationInference::new(&model);

        for &t in [0.01, 0.5, 3., DEFAULT_ELAPSED_TIME].iter() {
            engine.make_inference_at(t).unwrap();
            for name in model.names() {
                let p = engine.posterior(name).unwrap();
                assert_eq!(p.names(), vec![name]);
                assert!((p.sum() - 1.).abs() < 1e-9);
                assert!(p.to_vec().iter().all(|&v| v >= -1e-12));
            }
        }
    }

    #[test]
    fn exact_two_states() {
        // rates 1 (0 -> 1) and 3 (1 -> 0), uniform start:
        // P(X = 0, t) = 3/4 - 1/4 exp(-4t)
        let model = CtbnBuilder::new()
                        .with_variable(DiscreteVariable::binary("X").unwrap())
                        .with_cim("X", Initialization::Matrix(array![[-1., 1.], [3., -3.]]))
                        .build()
                        .unwrap();

        let mut engine = ExactAmalgamationInference::new(&model);
        engine.make_inference_at(0.5).unwrap();

        let p = engine.posterior("X").unwrap().to_vec();
        let expected = 0.75 - 0.25 * (-2f64).exp();
        assert!((p[0] - expected).abs() < 1e-9);
        assert!((p[1] - (1. - expected)).abs() < 1e-9);

        engine.make_inference().unwrap();
        let p = engine.posterior("X").unwrap().to_vec();
        assert!((p[0] - 0.75).abs() < 1e-9);
    }

    #[test]
    fn exact_errors() {
        let model = build_chain();
        let mut engine = ExactAmalgamationInference::new(&model);

        match engine.posterior("A").unwrap_err() {
            CtbnError::UndefinedState(_) => (),
            e => panic!("incorrect error {:?}", e)
        };

        engine.make_inference().unwrap();
        assert!(engine.posterior("Z").unwrap_err().is_not_found());

        match engine.set_evidence(&Instantiation::new()).unwrap_err() {
            CtbnError::NotImplemented(_) => (),
            e => panic!("incorrect error {:?}", e)
        };

        let empty = Ctbn::new();
        let mut engine = ExactAmalgamationInference::new(&empty);
        assert!(engine.make_inference().unwrap_err().is_invalid_argument());
    }

    #[test]
    fn forward_errors() {
        let model = build_chain();
        let mut engine = ForwardSamplingInference::new(&model, SamplingConfig::default()).unwrap();

        match engine.posterior("A").unwrap_err() {
            CtbnError::UndefinedState(_) => (),
            e => panic!("incorrect error {:?}", e)
        };

        let mut rng = StdRng::seed_from_u64(0);
        assert!(engine.average_inference(0, &mut rng).unwrap_err().is_invalid_argument());
        assert!(engine.make_parallel_inference(0).unwrap_err().is_invalid_argument());

        match engine.set_evidence(&Instantiation::new()).unwrap_err() {
            CtbnError::NotImplemented(_) => (),
            e => panic!("incorrect error {:?}", e)
        };

        let bad = SamplingConfig { time_horizon: 0., ..SamplingConfig::default() };
        assert!(ForwardSamplingInference::new(&model, bad).is_err());
    }

    #[test]
    fn forward_single_sample() {
        let model = build_chain();
        let config = SamplingConfig { time_horizon: 100., seed: Some(9), ..SamplingConfig::default() };
        let mut engine = ForwardSamplingInference::new(&model, config).unwrap();

        engine.make_inference().unwrap();
        let p = engine.posterior("B").unwrap();
        assert!((p.sum() - 1.).abs() < 1e-9);
        assert!(engine.posterior("Z").unwrap_err().is_not_found());

        // seeded engines are reproducible
        let first = engine.posterior("A").unwrap();
        engine.make_inference().unwrap();
        assert_eq!(engine.posterior("A").unwrap(), first);
    }

    #[test]
    fn parallel_inference_is_reproducible() {
        let model = build_chain();
        let config = SamplingConfig { time_horizon: 50., seed: Some(4), workers: Some(2), ..SamplingConfig::default() };
        let mut engine = ForwardSamplingInference::new(&model, config).unwrap();

        engine.make_parallel_inference(8).unwrap();
        let parallel = engine.posterior("B").unwrap();

        engine.make_parallel_inference(8).unwrap();
        let again = engine.posterior("B").unwrap();
        assert!(l1(&parallel, &again) < 1e-12);

        let mut rng = StdRng::seed_from_u64(4);
        engine.average_inference(8, &mut rng).unwrap();
        assert!((engine.posterior("B").unwrap().sum() - 1.).abs() < 1e-9);
    }

    #[test]
    fn forward_converges_to_exact() {
        let model = build_chain();

        let mut exact = ExactAmalgamationInference::new(&model);
        exact.make_inference_at(5000.).unwrap();

        let config = SamplingConfig { time_horizon: 5000., burn_in: 100, seed: Some(2024), workers: None };
        let mut sampling = ForwardSamplingInference::new(&model, config).unwrap();
        sampling.make_parallel_inference(200).unwrap();

        for name in ["A", "B"] {
            let e = exact.posterior(name).unwrap();
            let s = sampling.posterior(name).unwrap();
            assert!(l1(&e, &s) < 0.05, "{}: exact {:?} sampled {:?}", name, e.to_vec(), s.to_vec());
        }
    }

    #[test]
    fn averaged_samples_converge_to_exact() {
        let model = build_chain();

        let mut exact = ExactAmalgamationInference::new(&model);
        exact.make_inference_at(5000.).unwrap();

        let config = SamplingConfig { time_horizon: 5000., burn_in: 100, ..SamplingConfig::default() };
        let mut sampling = ForwardSamplingInference::new(&model, config).unwrap();
        sampling.average_inference(200, &mut StdRng::seed_from_u64(31)).unwrap();

        for name in ["A", "B"] {
            let e = exact.posterior(name).unwrap();
            let s = sampling.posterior(name).unwrap();
            assert!(l1(&e, &s) < 0.05, "{}: exact {:?} averaged {:?}", name, e.to_vec(), s.to_vec());
        }
    }

    #[test]
    fn trajectories() {
        let model = build_chain();
        let config = SamplingConfig { time_horizon: 10., ..SamplingConfig::default() };
        let engine = ForwardSamplingInference::new(&model, config).unwrap();

        let mut rng = StdRng::seed_from_u64(12);
        let traj = engine.sample_trajectory(3, &mut rng).unwrap();
        assert_eq!(traj.len(), 3);
        assert_eq!(traj.variable_names(), vec!["A", "B"]);

        for (_, events) in traj.iter() {
            let closing: Vec<_> = events.iter().filter(|e| e.time == 10.).collect();
            assert_eq!(closing.len(), 2);
        }

        let path = std::env::temp_dir().join(format!("ctbn-inference-{}.csv", std::process::id()));
        engine.write_trajectory_csv(&path, 2, &mut rng).unwrap();
        let read = crate::trajectory::read_trajectory_csv(&path).unwrap();
        assert_eq!(read.len(), 2);
        std::fs::remove_file(&path).unwrap();
    }

}
