//! Independence tests between the variables of a `Ctbn`.
//!
//! `FChi2Test` compares the dynamics of `X` given `U` with its dynamics given `U` and `Y`: an F
//! test on the holding times and, for non-binary `X`, a chi-square test on the destinations of
//! the transitions. `Oracle` answers from a known structure.

use crate::cim::Cim;
use crate::config::TestConfig;
use crate::estimators::{compute_cim_from_stats, Stats};
use crate::factor::Factor;
use crate::model::Ctbn;
use crate::trajectory::Trajectory;
use crate::util::{CtbnError, Result};
use crate::variable::Instantiation;
use super::{Decision, IndepTest};

use log::debug;
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor};

use std::collections::BTreeSet;


/// Answers from the arcs of a reference model: `x` depends on `y` iff `y` is a parent of `x`
pub struct Oracle<'a> {
    model: &'a Ctbn
}


impl<'a> Oracle<'a> {

    pub fn new(model: &'a Ctbn) -> Self {
        Oracle { model }
    }

}


impl<'a> IndepTest for Oracle<'a> {

    fn test_indep(&mut self, x: &str, y: &str, _u: &[&str]) -> Result<bool> {
        Ok(! self.model.exists_arc(y, x)?)
    }

}


type StatsKey = (String, String, BTreeSet<String>);


/// The F and chi-square tests over a set of trajectories
pub struct FChi2Test<'a> {

    trajectory: &'a Trajectory,

    /// Holds the variables and their labels
    model: &'a Ctbn,

    config: TestConfig,

    /// The statistics of the last tested triple
    cache: Option<(StatsKey, Stats)>,

    /// Number of chi-square tests run so far
    chi2: usize

}


impl<'a> FChi2Test<'a> {

    /// # Errors
    /// * `CtbnError::InvalidArgument` for a significance level outside ```(0, 1)```
    pub fn new(trajectory: &'a Trajectory, model: &'a Ctbn, config: TestConfig) -> Result<Self> {
        config.validate()?;
        Ok(FChi2Test { trajectory, model, config, cache: None, chi2: 0 })
    }

    pub fn config(&self) -> &TestConfig {
        &self.config
    }

    /// How many times the chi-square test was evaluated
    pub fn chi2_evaluations(&self) -> usize {
        self.chi2
    }

    /// The statistics of `x` given `u`, and given `u` and `y`. Only the last triple is kept.
    pub fn compute_stats(&mut self, x: &str, y: &str, u: &[&str]) -> Result<&Stats> {
        let key: StatsKey = (String::from(x), String::from(y), u.iter().map(|n| n.to_string()).collect());

        let hit = matches!(&self.cache, Some((k, _)) if *k == key);
        if ! hit {
            let stats = Stats::compute_for_tests(self.trajectory, self.model, x, y, u)?;
            self.cache = Some((key, stats));
        }

        match &self.cache {
            Some((_, stats)) => Ok(stats),
            None => Err(CtbnError::UndefinedState(String::from("no statistics were computed")))
        }
    }

}


impl<'a> IndepTest for FChi2Test<'a> {

    fn test_indep(&mut self, x: &str, y: &str, u: &[&str]) -> Result<bool> {
        let alpha = self.config.alpha;
        let binary = self.model.variable(x)?.cardinality() < 3;

        let stats = self.compute_stats(x, y, u)?;
        if null_time_to_transition_hypothesis_f(x, stats, alpha)? == Decision::Reject {
            debug!("{} depends on {} given {:?} (holding times)", x, y, u);
            return Ok(false);
        }

        if binary {
            return Ok(true);
        }

        let decision = null_state_to_state_transition_hypothesis_chi2(x, stats, alpha)?;
        self.chi2 += 1;
        if decision == Decision::Reject {
            debug!("{} depends on {} given {:?} (destinations)", x, y, u);
            return Ok(false);
        }

        Ok(true)
    }

}


/// The tables conditioned on `Y`
fn conditioned(stats: &Stats) -> Result<(&Factor, &Factor)> {
    match (&stats.txy, &stats.mxy) {
        (Some(txy), Some(mxy)) => Ok((txy, mxy)),
        _ => Err(CtbnError::InvalidArgument(String::from("the statistics are not conditioned on a tested variable")))
    }
}


/// The transitions out of the from-state of `row`, summed over the destinations
fn exits(m: &Factor, row: &Instantiation, xi: &str, xj: &str) -> Result<f64> {
    let i = row.get(xi).ok_or_else(|| CtbnError::IncompleteInstantiation(vec![String::from(xi)]))?;
    let card = m.variable(xj).map(|v| v.cardinality()).unwrap_or(0);

    let mut cell = row.clone();
    let mut total = 0.0;
    for j in (0..card).filter(|&j| j != i) {
        cell.set(xj, j);
        total += m.get(&cell)?;
    }
    Ok(total)
}


/// Test whether the time `x` waits before leaving a state changes once `y` is known.
///
/// For every instantiation of ```(U, Y, X#i)```, ```F = Qx / Qxy``` is the ratio of the exit
/// rates estimated without and with `y`. The degrees of freedom are the numbers of exits
/// observed without and with `y`, which need not be integers.
///
/// # Errors
/// * `CtbnError::Numerical` when a row has no exit, as the F distribution is then undefined
pub fn null_time_to_transition_hypothesis_f(x: &str, stats: &Stats, alpha: f64) -> Result<Decision> {
    let (txy, mxy) = conditioned(stats)?;
    let qx = compute_cim_from_stats(x, &stats.mx, &stats.tx)?;
    let qxy = compute_cim_from_stats(x, mxy, txy)?;

    let xi = Cim::var_i(x);
    let xj = Cim::var_j(x);

    for row in txy.instantiations() {
        let i = row.get(&xi).unwrap_or(0);
        let mut diag = row.clone();
        diag.set(&xj, i);

        let f = qx.get(&diag)? / qxy.get(&diag)?;
        let r_x = exits(&stats.mx, &row, &xi, &xj)?;
        let r_xy = exits(mxy, &row, &xi, &xj)?;

        let dist = FisherSnedecor::new(r_x, r_xy)
                       .map_err(|e| CtbnError::Numerical(format!("F({}, {}): {}", r_x, r_xy, e)))?;
        let low = dist.inverse_cdf(alpha / 2.0);
        let high = dist.inverse_cdf(1.0 - alpha / 2.0);

        if f < low || f > high {
            debug!("F = {} outside [{}, {}] at {:?}", f, low, high, row);
            return Ok(Decision::Reject);
        }
    }

    Ok(Decision::FailToReject)
}


/// Test whether the destination of the transitions of `x` changes once `y` is known.
///
/// For every instantiation of ```(U, Y, X#i)```,
/// ```T = Σ_{j≠i} (K Mxy - L Mx)² / (Mxy + Mx)``` with ```K = √(r2/r1)``` and ```L = √(r1/r2)```,
/// where ```r1``` and ```r2``` count the exits of the row with and without `y`.
/// Destinations never reached contribute nothing. The largest `T` is compared to the chi-square
/// quantile with ```|dom X| - 1``` degrees of freedom; undefined statistics never reject.
pub fn null_state_to_state_transition_hypothesis_chi2(x: &str, stats: &Stats, alpha: f64) -> Result<Decision> {
    let (txy, mxy) = conditioned(stats)?;

    let xi = Cim::var_i(x);
    let xj = Cim::var_j(x);
    let card = mxy.variable(&xj)
                  .map(|v| v.cardinality())
                  .ok_or_else(|| CtbnError::InvalidArgument(format!("the statistics are not those of {}", x)))?;

    let mut highest = f64::NEG_INFINITY;
    for row in txy.instantiations() {
        let i = row.get(&xi).unwrap_or(0);
        let r1 = exits(mxy, &row, &xi, &xj)?;
        let r2 = exits(&stats.mx, &row, &xi, &xj)?;
        let k = (r2 / r1).sqrt();
        let l = (r1 / r2).sqrt();

        let mut cell = row.clone();
        let mut t = 0.0;
        for j in (0..card).filter(|&j| j != i) {
            cell.set(&xj, j);
            let (m, m_y) = (stats.mx.get(&cell)?, mxy.get(&cell)?);
            if m + m_y > 0.0 {
                t += (k * m_y - l * m).powi(2) / (m + m_y);
            }
        }

        highest = highest.max(t);
    }

    let dist = ChiSquared::new((card - 1) as f64)
                   .map_err(|e| CtbnError::Numerical(format!("chi2({}): {}", card - 1, e)))?;
    let critical = dist.inverse_cdf(1.0 - alpha);

    if highest > critical {
        debug!("chi2 = {} above {}", highest, critical);
        Ok(Decision::Reject)
    } else {
        Ok(Decision::FailToReject)
    }
}
