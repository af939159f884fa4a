//! Provides an example of how to use ctbn to perform inference on a Continuous-Time Bayesian
//! Network, comparing the exact engine with forward sampling.

use ctbn as c;
use c::config::{GeneratorConfig, SamplingConfig};
use c::inference::{CtbnInference, ExactAmalgamationInference, ForwardSamplingInference};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() -> c::Result<()> {

    /////////////////////////////////////////////////////
    // Step 1: Build a random model
    let config = GeneratorConfig { variables: 3, max_parents: 2, modalities: 3, rate_range: (0.5, 5.) };
    let model = c::generator::random_ctbn(&config, &mut StdRng::seed_from_u64(2024))?;
    for (tail, head) in model.arcs() {
        println!("{} -> {}", model.name(tail)?, model.name(head)?);
    }

    /////////////////////////////////////////////////////
    // Step 2: Build the inference engines
    let mut exact = ExactAmalgamationInference::new(&model);

    let horizon = 1000.;
    let sampling = SamplingConfig { time_horizon: horizon, burn_in: 100, seed: Some(7), workers: None };
    let mut forward = ForwardSamplingInference::new(&model, sampling)?;

    /////////////////////////////////////////////////////
    // Step 3: Make inference over the same horizon
    //
    // Note: exact inference amalgamates every CIM and exponentiates the joint
    //       intensity matrix, the sampler averages 50 trajectories on a thread pool
    exact.make_inference_at(horizon)?;
    forward.make_parallel_inference(50)?;

    /////////////////////////////////////////////////////
    // Step 4: Compare the posteriors
    for name in model.names() {
        println!("{}", name);
        println!("  exact:    {:?}", exact.posterior(name)?.to_vec());
        println!("  sampling: {:?}", forward.posterior(name)?.to_vec());
    }

    Ok(())
}
