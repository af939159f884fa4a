//! Provides an example of how to use ctbn to learn a Continuous-Time Bayesian Network from
//! trajectories.

use ctbn as c;
use c::config::{SamplingConfig, TestConfig};
use c::estimators::ctbn_from_data;
use c::inference::ForwardSamplingInference;
use c::init::Initialization;
use c::learning::{FChi2Test, Learner};
use ndarray::array;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() -> c::Result<()> {

    ////////////////////////////////////////////////////////////////////////////
    // Step 1:  Build the true model
    let truth = c::CtbnBuilder::new()
        .with_variable(c::DiscreteVariable::binary("A")?)
        .with_variable(c::DiscreteVariable::range("B", 3)?)
        .with_variable(c::DiscreteVariable::binary("C")?)
        .with_arc("A", "B")
        .with_arc("B", "C")
        .with_cim("A", Initialization::Matrix(array![[-1., 1.], [2., -2.]]))
        .with_cim("B", Initialization::Random(0.2, 5.))
        .with_cim("C", Initialization::Random(0.2, 5.))
        .build_using(&mut StdRng::seed_from_u64(11))?;

    ////////////////////////////////////////////////////////////////////////////
    // Step 2:  Sample trajectories from the truth and save them
    let config = SamplingConfig { time_horizon: 500., burn_in: 100, ..SamplingConfig::default() };
    let engine = ForwardSamplingInference::new(&truth, config)?;
    let trajectory = engine.sample_trajectory(20, &mut StdRng::seed_from_u64(12))?;

    let path = std::env::temp_dir().join("ctbn-estimation.csv");
    trajectory.write_csv(&path)?;
    let trajectory = c::trajectory::read_trajectory_csv(&path)?;

    ////////////////////////////////////////////////////////////////////////////
    // Step 3:  Learn the structure with the F and chi-square tests
    //
    // Note:    the learner only sees the variables observed in the data
    let skeleton = ctbn_from_data(&trajectory)?;
    let test = FChi2Test::new(&trajectory, &skeleton, TestConfig::default())?;
    let mut learner = Learner::new(test);
    let learned = learner.learn_ctbn(&skeleton, &trajectory)?;

    ////////////////////////////////////////////////////////////////////////////
    // Step 4:  Compare with the truth
    for name in truth.names() {
        println!("{}", name);
        println!("  true parents:    {:?}", truth.parent_names(name)?);
        println!("  learned parents: {:?}", learned.parent_names(name)?);
    }

    println!("A (true):      {:?}", truth.cim("A")?.to_vec());
    println!("A (estimated): {:?}", learned.cim("A")?.to_vec());

    std::fs::remove_file(&path)?;
    Ok(())
}
