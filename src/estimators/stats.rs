//! Sufficient statistics of a variable over a set of trajectories: the time spent in each state
//! and the number of transitions between states, conditioned on other variables.

use crate::cim::Cim;
use crate::factor::Factor;
use crate::model::Ctbn;
use crate::trajectory::Trajectory;
use crate::util::{CtbnError, Result};
use crate::variable::{DiscreteVariable, Instantiation};

use log::{debug, warn};


/// The statistics of a variable `X`.
///
/// Every table is averaged over the trajectories: it holds the expected time or count of one
/// trajectory, not the total.
#[derive(Clone, Debug, PartialEq)]
pub struct Stats {

    /// The time spent by `X` in each state, over ```[X#i] + U```
    pub tx: Factor,

    /// The number of transitions of `X`, over ```[X#i, X#j] + U```
    pub mx: Factor,

    /// The time spent by `X` in each state, over ```[X#i] + U + [Y]```
    pub txy: Option<Factor>,

    /// The number of transitions of `X`, over ```[X#i, X#j] + U + [Y]```
    pub mxy: Option<Factor>

}


impl Stats {

    /// Compute the statistics of `x` given the conditioning variables `u`
    ///
    /// # Errors
    /// * `CtbnError::NotFound` for a variable outside `model` or an unknown label
    /// * `CtbnError::InvalidArgument` for an empty trajectory set
    pub fn compute(traj: &Trajectory, model: &Ctbn, x: &str, u: &[&str]) -> Result<Stats> {
        let x = model.variable(x)?;
        let u = u.iter().map(|n| model.variable(*n).map(|v| v.clone())).collect::<Result<Vec<_>>>()?;
        scan(traj, x, &u, None)
    }

    /// Compute the statistics of `x` given `u`, and given `u` and `y`
    pub fn compute_for_tests(traj: &Trajectory, model: &Ctbn, x: &str, y: &str, u: &[&str]) -> Result<Stats> {
        if u.contains(&y) || x == y {
            return Err(CtbnError::InvalidArgument(format!("{} cannot be both tested and conditioned on", y)));
        }

        let x = model.variable(x)?;
        let y = model.variable(y)?;
        let u = u.iter().map(|n| model.variable(*n).map(|v| v.clone())).collect::<Result<Vec<_>>>()?;
        scan(traj, x, &u, Some(y))
    }

}


/// The single chronological pass over every trajectory
fn scan(traj: &Trajectory, x: &DiscreteVariable, u: &[DiscreteVariable], y: Option<&DiscreteVariable>) -> Result<Stats> {
    if traj.is_empty() {
        return Err(CtbnError::InvalidArgument(String::from("no trajectory to compute statistics from")));
    }

    let xi = Cim::var_i(x.name());
    let xj = Cim::var_j(x.name());

    let mut t_scope = vec![x.renamed(&xi)];
    t_scope.extend(u.iter().cloned());
    let mut m_scope = vec![x.renamed(&xi), x.renamed(&xj)];
    m_scope.extend(u.iter().cloned());

    let mut tx = Factor::zeros(t_scope.clone())?;
    let mut mx = Factor::zeros(m_scope.clone())?;
    let mut xy = match y {
        Some(y) => {
            t_scope.push(y.clone());
            m_scope.push(y.clone());
            Some((Factor::zeros(t_scope)?, Factor::zeros(m_scope)?))
        },
        None => None
    };

    let mut involved: Vec<&DiscreteVariable> = vec![x];
    involved.extend(u.iter());
    involved.extend(y);

    for (_, events) in traj.iter() {
        let mut current = Instantiation::new();
        let mut last: Option<f64> = None;

        for event in events {
            let var = match involved.iter().find(|v| v.name() == event.variable) {
                Some(v) => v,
                None => continue
            };
            let to = var.index(&event.state)?;
            let known = involved.iter().all(|v| current.contains(v.name()));

            //////
            // credit the time since the previous event
            if let (Some(t0), true) = (last, known) {
                let dt = event.time - t0;
                if dt > 0.0 {
                    let cell = state_cell(&current, x.name(), &xi);
                    tx.set(&cell, tx.get(&cell)? + dt)?;
                    if let Some((txy, _)) = xy.as_mut() {
                        txy.set(&cell, txy.get(&cell)? + dt)?;
                    }
                }
            }
            last = Some(event.time);

            //////
            // count the transition
            if var.name() == x.name() && known {
                if let Some(from) = current.get(x.name()) {
                    if from != to {
                        let mut cell = state_cell(&current, x.name(), &xi);
                        cell.set(&xj, to);
                        mx.set(&cell, mx.get(&cell)? + 1.0)?;
                        if let Some((_, mxy)) = xy.as_mut() {
                            mxy.set(&cell, mxy.get(&cell)? + 1.0)?;
                        }
                    }
                }
            }

            current.set(var.name(), to);
        }
    }

    let n = traj.len() as f64;
    debug!("statistics of {} over {} trajectories", x.name(), traj.len());

    Ok(Stats {
        tx: tx.scale(1.0 / n),
        mx: mx.scale(1.0 / n),
        txy: xy.as_ref().map(|(t, _)| t.scale(1.0 / n)),
        mxy: xy.as_ref().map(|(_, m)| m.scale(1.0 / n))
    })
}


/// The current state with the from-state of `x` set
fn state_cell(current: &Instantiation, x: &str, xi: &str) -> Instantiation {
    let mut cell = current.clone();
    if let Some(s) = current.get(x) {
        cell.set(xi, s);
    }
    cell
}


/// Rebuild the `Cim` of `x` from its statistics: the rate ```s -> s'``` is ```M[s, s'] / T[s]```.
///
/// A from-state that was never visited (```T[s] == 0```) keeps a row of zeros.
///
/// # Args
/// * `x`: the name of the variable
/// * `m`: the transition counts, over ```[x#i, x#j] + U```
/// * `t`: the time spent in each state, over ```[x#i] + U```
pub fn compute_cim_from_stats(x: &str, m: &Factor, t: &Factor) -> Result<Cim> {
    let xi = Cim::var_i(x);
    let xj = Cim::var_j(x);
    if ! (m.contains(&xi) && m.contains(&xj) && t.contains(&xi)) {
        return Err(CtbnError::InvalidArgument(format!("the statistics are not those of {}", x)));
    }

    for row in t.instantiations() {
        if t.get(&row)? == 0.0 {
            warn!("{} never spent time in the row {:?}, its rates are left at zero", x, row);
        }
    }

    let mut cim = Cim::from_factor(Factor::zeros(m.scope().to_vec())?);
    for cell in m.instantiations() {
        if cell.get(&xi) == cell.get(&xj) {
            continue;
        }

        let time = t.get(&cell)?;
        if time > 0.0 {
            cim.set(&cell, m.get(&cell)? / time)?;
        }
    }

    cim.set_diagonal()?;
    Ok(cim)
}
