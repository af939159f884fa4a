//! Defines a forward sampler for `Ctbn`s
//!
//! Every variable carries an exponential clock whose rate is its exit rate in the current joint
//! state. The earliest clock fires, its variable jumps to a state drawn proportionally to the
//! transition rates, and every clock is redrawn.

use crate::config::SamplingConfig;
use crate::graph::NodeId;
use crate::model::Ctbn;
use crate::trajectory::Event;
use crate::util::{CtbnError, Result};
use crate::variable::{DiscreteVariable, Instantiation};
use super::{Sample, Sampler};

use indexmap::IndexMap;
use log::trace;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use rand_distr::Exp;


/// A stateless forward `Sampler` for `Ctbn`s
pub struct ForwardSampler<'a> {

    /// The `Ctbn` to sample
    model: &'a Ctbn,

    config: SamplingConfig

}


impl<'a> ForwardSampler<'a> {

    pub fn new(model: &'a Ctbn, config: SamplingConfig) -> Self {
        ForwardSampler { model, config }
    }

    pub fn config(&self) -> &SamplingConfig {
        &self.config
    }

    /// Draw the waiting time of every clock and return the earliest one, or `None` when no
    /// variable can leave its state
    fn next_transition<R: Rng + ?Sized>(&self, state: &Instantiation, rng: &mut R) -> Result<Option<(NodeId, f64)>> {
        let mut best: Option<(NodeId, f64)> = None;

        for node in self.model.nodes() {
            let rate = self.model.cim(node)?.exit_rate(state)?;
            if rate <= 0.0 {
                continue;
            }

            let clock = Exp::new(rate).map_err(|e| CtbnError::Numerical(e.to_string()))?;
            let t = clock.sample(rng);

            // strictly smaller: the first node wins ties
            if best.map_or(true, |(_, b)| t < b) {
                best = Some((node, t));
            }
        }

        Ok(best)
    }

    /// Draw the state `node` jumps to
    fn destination<R: Rng + ?Sized>(&self, node: NodeId, state: &Instantiation, rng: &mut R) -> Result<usize> {
        let rates = self.model.cim(node)?.transition_rates(state)?;
        let dist = WeightedIndex::new(&rates).map_err(|e| CtbnError::Numerical(e.to_string()))?;
        Ok(dist.sample(rng))
    }

    /// Move `node` to a new state and return its variable and the new state
    fn jump<R: Rng + ?Sized>(&self, node: NodeId, state: &mut Instantiation, rng: &mut R) -> Result<(&'a DiscreteVariable, usize)> {
        let to = self.destination(node, state, rng)?;
        let var = self.model.variable(node)?;
        state.set(var.name(), to);
        Ok((var, to))
    }

}


fn label(var: &DiscreteVariable, idx: usize) -> Result<&str> {
    var.label(idx)
       .ok_or_else(|| CtbnError::InvalidArgument(format!("state {} out of range for variable {}", idx, var.name())))
}


impl<'a> Sampler for ForwardSampler<'a> {

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Sample> {
        let horizon = self.config.time_horizon;
        let variables = self.model.variables();

        //////
        // Init: uniform initial state, empty accumulators
        let mut state = Instantiation::new();
        let mut time_in_state = IndexMap::new();
        for var in variables.iter() {
            state.set(var.name(), rng.gen_range(0..var.cardinality()));
            time_in_state.insert(var.name().to_string(), vec![0.0; var.cardinality()]);
        }

        //////
        // Burn-in: transitions that are not recorded
        for _ in 0..self.config.burn_in {
            match self.next_transition(&state, rng)? {
                Some((node, _)) => {
                    self.jump(node, &mut state, rng)?;
                },
                None => break
            }
        }

        let mut events = Vec::new();
        for var in variables.iter() {
            let idx = state.get(var.name()).unwrap_or(0);
            events.push(Event::new(0.0, var.name(), label(var, idx)?));
        }

        //////
        // Sampling
        let mut elapsed = 0.0;
        while elapsed < horizon {
            let (dt, node) = match self.next_transition(&state, rng)? {
                Some((node, dt)) if elapsed + dt < horizon => (dt, Some(node)),
                // nothing can move or the next jump is past the horizon
                _ => (horizon - elapsed, None)
            };

            for (name, acc) in time_in_state.iter_mut() {
                if let Some(s) = state.get(name) {
                    acc[s] += dt;
                }
            }
            elapsed += dt;

            if let Some(node) = node {
                let (var, to) = self.jump(node, &mut state, rng)?;
                trace!("t = {}: {} -> {}", elapsed, var.name(), to);
                events.push(Event::new(elapsed, var.name(), label(var, to)?));
            }
        }

        for var in variables.iter() {
            let idx = state.get(var.name()).unwrap_or(0);
            events.push(Event::new(horizon, var.name(), label(var, idx)?));
        }

        Ok(Sample { time_in_state, events })
    }

}
