//! Approximate inference from the time spent in each state by sampled trajectories.

use crate::config::SamplingConfig;
use crate::factor::Factor;
use crate::model::Ctbn;
use crate::samplers::{ForwardSampler, Sample, Sampler};
use crate::trajectory::Trajectory;
use crate::util::{CtbnError, Result};
use super::CtbnInference;

use indexmap::IndexMap;
use log::debug;
use ndarray::{Array, IxDyn};
use rand::rngs::StdRng;
use rand::{thread_rng, Rng, SeedableRng};
use rayon::prelude::*;

use std::path::Path;


/// Estimates the posterior of every variable as the fraction of time it spends in each state.
pub struct ForwardSamplingInference<'a> {

    model: &'a Ctbn,

    config: SamplingConfig,

    /// The accumulated time in each state, per variable
    accumulators: Option<IndexMap<String, Vec<f64>>>

}


impl<'a> ForwardSamplingInference<'a> {

    pub fn new(model: &'a Ctbn, config: SamplingConfig) -> Result<Self> {
        config.validate()?;
        Ok(ForwardSamplingInference { model, config, accumulators: None })
    }

    pub fn config(&self) -> &SamplingConfig {
        &self.config
    }

    fn sampler(&self) -> ForwardSampler<'a> {
        ForwardSampler::new(self.model, self.config.clone())
    }

    /// Draw one trajectory from a fresh random state
    pub fn make_sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Sample> {
        self.sampler().sample(rng)
    }

    /// Infer the posteriors from a single trajectory
    pub fn make_inference_using<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        let sample = self.make_sample(rng)?;
        self.accumulators = Some(sample.time_in_state);
        Ok(())
    }

    /// Infer the posteriors from `n` independent trajectories drawn one after the other
    ///
    /// # Errors
    /// * `CtbnError::InvalidArgument` if `n == 0`
    pub fn average_inference<R: Rng + ?Sized>(&mut self, n: usize, rng: &mut R) -> Result<()> {
        if n == 0 {
            return Err(CtbnError::InvalidArgument(String::from("at least one trajectory is needed")));
        }

        let sampler = self.sampler();
        let mut total: Option<IndexMap<String, Vec<f64>>> = None;
        for _ in 0..n {
            let sample = sampler.sample(rng)?;
            total = Some(accumulate(total, sample.time_in_state));
        }

        self.accumulators = total;
        Ok(())
    }

    /// Infer the posteriors from `n` independent trajectories drawn on a worker pool. Task `i`
    /// draws from a random source seeded with ```seed + i```.
    ///
    /// # Errors
    /// * `CtbnError::InvalidArgument` if `n == 0` or the pool cannot be built
    pub fn make_parallel_inference(&mut self, n: usize) -> Result<()> {
        if n == 0 {
            return Err(CtbnError::InvalidArgument(String::from("at least one trajectory is needed")));
        }

        let base = self.config.seed.unwrap_or_else(|| thread_rng().gen());
        let pool = rayon::ThreadPoolBuilder::new()
                       .num_threads(self.config.workers.unwrap_or(0))
                       .build()
                       .map_err(|e| CtbnError::InvalidArgument(e.to_string()))?;

        debug!("sampling {} trajectories in parallel from seed {}", n, base);
        let sampler = self.sampler();
        let samples: Vec<Sample> = pool.install(|| {
            (0..n).into_par_iter()
                  .map(|i| {
                      let mut rng = StdRng::seed_from_u64(base.wrapping_add(i as u64));
                      sampler.sample(&mut rng)
                  })
                  .collect::<Result<Vec<Sample>>>()
        })?;
        debug!("{} trajectories sampled", samples.len());

        self.accumulators = samples.into_iter().fold(None, |acc, s| Some(accumulate(acc, s.time_in_state)));
        Ok(())
    }

    /// Draw `n` trajectories with sample ids ```0..n```
    pub fn sample_trajectory<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Trajectory> {
        let sampler = self.sampler();
        let mut traj = Trajectory::new();
        for id in 0..n {
            traj.insert(id, sampler.sample(rng)?.events);
        }
        Ok(traj)
    }

    /// Draw `n` trajectories and write them as CSV
    pub fn write_trajectory_csv<P, R>(&self, path: P, n: usize, rng: &mut R) -> Result<()>
        where P: AsRef<Path>, R: Rng + ?Sized
    {
        self.sample_trajectory(n, rng)?.write_csv(path)
    }

}


/// Add the accumulators of one trajectory to a running total
fn accumulate(total: Option<IndexMap<String, Vec<f64>>>, sample: IndexMap<String, Vec<f64>>) -> IndexMap<String, Vec<f64>> {
    match total {
        None => sample,
        Some(mut total) => {
            for (name, acc) in sample {
                let entry = total.entry(name).or_insert_with(|| vec![0.0; acc.len()]);
                for (t, a) in entry.iter_mut().zip(acc) {
                    *t += a;
                }
            }
            total
        }
    }
}


impl<'a> CtbnInference for ForwardSamplingInference<'a> {

    /// Infer the posteriors from one trajectory, seeded by the configuration when it has a seed
    fn make_inference(&mut self) -> Result<()> {
        match self.config.seed {
            Some(seed) => self.make_inference_using(&mut StdRng::seed_from_u64(seed)),
            None => self.make_inference_using(&mut thread_rng())
        }
    }

    fn posterior(&self, name: &str) -> Result<Factor> {
        let accumulators = self.accumulators
                               .as_ref()
                               .ok_or_else(|| CtbnError::UndefinedState(String::from("no trajectory was sampled")))?;
        let var = self.model.variable(name)?;

        let times = accumulators
                        .get(name)
                        .ok_or_else(|| CtbnError::NotFound(format!("no time recorded for {}", name)))?;
        let table = Array::from_shape_vec(IxDyn(&[times.len()]), times.clone())
                        .map_err(|e| CtbnError::InvalidArgument(e.to_string()))?;

        Factor::new(vec![var.clone()], table)?.normalize()
    }

}
