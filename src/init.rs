//! Module containing initialization routines for the parameters of a CIM.

use crate::cim::Cim;
use crate::util::{CtbnError, Result};

use ndarray::{Array1, Array2};
use ndarray_rand::RandomExt;
use rand::distributions::Uniform;
use rand::{thread_rng, Rng};


/// Defines possible ways to initialize the rates of a `Cim`. Every scheme writes the
/// off-diagonal cells and then sets each diagonal cell to the negated sum of its row.
#[derive(Clone, Debug)]
pub enum Initialization<'a> {

    /// Every cell is zero: no transition ever happens
    Zero,

    /// Every transition has the same rate
    Uniform(f64),

    /// Every off-diagonal rate is drawn independently and uniformly in ```[low, high)```
    Random(f64, f64),

    /// The full table, row-major in the current dimension order of the `Cim`
    Values(&'a [f64]),

    /// A square intensity matrix over the states of the variable, used for every instantiation
    /// of the parents
    Matrix(Array2<f64>)

}


impl<'a> Initialization<'a> {

    /// Initialize `cim` according to ```self```, drawing random rates from the thread RNG
    pub fn build(self, cim: &mut Cim) -> Result<()> {
        self.build_using(cim, &mut thread_rng())
    }

    /// Initialize `cim` according to ```self```
    ///
    /// # Args
    /// * `cim`: the `Cim` to overwrite. Its dimensions are left untouched.
    /// * `rng`: the source of randomness for `Initialization::Random`
    ///
    /// # Errors
    /// * `CtbnError::InvalidArgument` for negative rates, an empty range, a table of the wrong
    ///   size or a matrix of the wrong shape
    pub fn build_using<R: Rng + ?Sized>(self, cim: &mut Cim, rng: &mut R) -> Result<()> {
        match self {
            Initialization::Zero => {
                cim.fill_with(0.0);
                return Ok(());
            },
            Initialization::Uniform(rate) => {
                if ! (rate >= 0.0 && rate.is_finite()) {
                    return Err(CtbnError::InvalidArgument(format!("invalid rate {}", rate)));
                }
                cim.fill_with(rate);
            },
            Initialization::Random(low, high) => {
                if ! (low >= 0.0 && low < high && high.is_finite()) {
                    return Err(CtbnError::InvalidArgument(format!("invalid rate range [{}, {})", low, high)));
                }
                let n = cim.factor().len();
                let rates = Array1::random_using(n, Uniform::new(low, high), rng);
                cim.fill_from(&rates.to_vec())?;
            },
            Initialization::Values(values) => {
                cim.fill_from(values)?;
            },
            Initialization::Matrix(matrix) => {
                fill_from_matrix(cim, &matrix)?;
            }
        }

        cim.set_diagonal()?;
        cim.validate(1e-9)
    }

}


/// Copy the cells of an intensity matrix into every parent instantiation of `cim`
fn fill_from_matrix(cim: &mut Cim, matrix: &Array2<f64>) -> Result<()> {
    let base = match cim.bases().iter().next() {
        Some(b) if cim.bases().len() == 1 => b.clone(),
        _ => return Err(CtbnError::InvalidArgument(String::from("a matrix initializes a single variable"))),
    };

    let (from, to) = (Cim::var_i(&base), Cim::var_j(&base));
    let n = cim.find_var(&from).map_or(0, |v| v.cardinality());
    if matrix.shape() != [n, n] {
        return Err(CtbnError::InvalidArgument(
            format!("expected a {}x{} matrix, got {:?}", n, n, matrix.shape())
        ));
    }

    let cells: Vec<_> = cim.factor().instantiations().collect();
    for inst in cells {
        let (i, j) = (inst.get(&from).unwrap_or(0), inst.get(&to).unwrap_or(0));
        cim.set(&inst, matrix[[i, j]])?;
    }

    Ok(())
}
