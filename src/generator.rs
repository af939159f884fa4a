//! Random generation of `Ctbn`s, to produce test networks and trajectories.

use crate::config::GeneratorConfig;
use crate::init::Initialization;
use crate::model::Ctbn;
use crate::util::Result;
use crate::variable::DiscreteVariable;

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;


/// A random `Ctbn` with `config.variables` variables named ```V0, V1, ...```
///
/// Every variable has `config.modalities` states and up to `config.max_parents` parents, picked
/// uniformly among the other variables. Cycles are allowed. Every off-diagonal rate is drawn
/// uniformly in `config.rate_range`.
///
/// # Errors
/// * `CtbnError::InvalidArgument` for an invalid configuration
pub fn random_ctbn<R: Rng + ?Sized>(config: &GeneratorConfig, rng: &mut R) -> Result<Ctbn> {
    config.validate()?;

    let mut model = Ctbn::new();
    for i in 0..config.variables {
        model.add(DiscreteVariable::range(&format!("V{}", i), config.modalities)?)?;
    }

    let nodes = model.nodes();
    for &head in nodes.iter() {
        let others: Vec<_> = nodes.iter().copied().filter(|&n| n != head).collect();
        let k = rng.gen_range(0..=config.max_parents.min(others.len()));
        for &tail in others.choose_multiple(rng, k) {
            model.add_arc(tail, head)?;
        }
    }

    let (low, high) = config.rate_range;
    for &node in nodes.iter() {
        Initialization::Random(low, high).build_using(model.cim_mut(node)?, rng)?;
    }

    debug!("generated a network of {} variables and {} arcs", model.size(), model.arcs().len());
    Ok(model)
}
