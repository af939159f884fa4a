//! Constraint-based structure learning.

use crate::estimators::fit_parameters;
use crate::init::Initialization;
use crate::model::Ctbn;
use crate::trajectory::Trajectory;
use crate::util::Result;
use super::IndepTest;

use itertools::Itertools;
use log::{debug, info};


/// Learns the parents of every variable with an independence test.
///
/// Every other variable starts as a candidate parent of `X`. For conditioning sets of size
/// 0, 1, ..., a candidate `Y` is dropped as soon as some subset `U` of the remaining candidates
/// makes `X` independent of `Y` given `U`. The candidates left when no larger subset exists are
/// the parents of `X`.
pub struct Learner<T: IndepTest> {
    test: T
}


impl<T: IndepTest> Learner<T> {

    pub fn new(test: T) -> Self {
        Learner { test }
    }

    pub fn test(&self) -> &T {
        &self.test
    }

    /// The parents of `x` among `candidates`
    pub fn learn_parents(&mut self, x: &str, candidates: &[&str]) -> Result<Vec<String>> {
        let mut parents: Vec<&str> = candidates.iter().copied().filter(|&c| c != x).collect();

        let mut size = 0;
        while size < parents.len() {
            for y in parents.clone() {
                let rest: Vec<&str> = parents.iter().copied().filter(|&p| p != y).collect();

                for u in rest.into_iter().combinations(size) {
                    if self.test.test_indep(x, y, &u)? {
                        debug!("{} independent of {} given {:?}", x, y, u);
                        parents.retain(|&p| p != y);
                        break;
                    }
                }
            }
            size += 1;
        }

        Ok(parents.into_iter().map(String::from).collect())
    }

    /// A copy of `template` whose arcs are replaced by the learned ones. The rates of the
    /// conditional intensity matrices are not estimated and are all left at zero.
    pub fn learn_structure(&mut self, template: &Ctbn) -> Result<Ctbn> {
        let mut model = template.clone();
        for (tail, head) in template.arcs() {
            model.erase_arc(tail, head)?;
        }
        for node in model.nodes() {
            Initialization::Zero.build(model.cim_mut(node)?)?;
        }

        let names = template.names();
        for &x in names.iter() {
            for parent in self.learn_parents(x, &names)? {
                model.add_arc(parent.as_str(), x)?;
            }
        }

        info!("learned {} arcs over {} variables", model.arcs().len(), model.size());
        for x in model.names() {
            info!("{} <- {:?}", x, model.parent_names(x)?);
        }

        Ok(model)
    }

    /// Learn the structure, then estimate the rates from `trajectory`
    pub fn learn_ctbn(&mut self, template: &Ctbn, trajectory: &Trajectory) -> Result<Ctbn> {
        let mut model = self.learn_structure(template)?;
        fit_parameters(&mut model, trajectory)?;
        Ok(model)
    }

}
