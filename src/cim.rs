//! Definition of the conditional intensity matrix
//!
//! A `Cim` is a `Factor` over the pair `X#i` (state before a transition) and `X#j` (state
//! after it) of one or more base variables, plus zero or more parent variables. For a fixed
//! parent instantiation and a fixed from-state, the off-diagonal cells are the transition rates
//! and the diagonal cell is the negated sum of the row.

use crate::factor::Factor;
use crate::util::{CtbnError, Result};
use crate::variable::{all_instantiations, DiscreteVariable, Instantiation};

use ndarray::Array2;

use std::collections::BTreeSet;
use std::ops::Mul;


/// The delimiter between a variable name and its from/to suffix
pub const DELIMITER: char = '#';


/// A conditional intensity matrix
#[derive(Clone, Debug, PartialEq)]
pub struct Cim {

    /// The table of rates
    factor: Factor,

    /// The radicals of the from/to dimensions
    bases: BTreeSet<String>,

    /// The names of the parent dimensions
    parents: BTreeSet<String>

}


impl Default for Cim {

    fn default() -> Self {
        Cim::new()
    }

}


impl Cim {

    /// An empty `Cim`, with no dimension at all
    pub fn new() -> Self {
        Cim { factor: Factor::scalar(0.0), bases: BTreeSet::new(), parents: BTreeSet::new() }
    }

    /// A zero-filled `Cim` over `var#i` and `var#j`
    pub fn for_variable(var: &DiscreteVariable) -> Result<Self> {
        let scope = vec![var.renamed(&Cim::var_i(var.name())), var.renamed(&Cim::var_j(var.name()))];
        Ok(Cim::from_factor(Factor::zeros(scope)?))
    }

    /// Wrap an existing table. Dimensions named `X#i`/`X#j` are from/to dimensions, every other
    /// dimension is a parent.
    pub fn from_factor(factor: Factor) -> Self {
        let mut cim = Cim { factor, bases: BTreeSet::new(), parents: BTreeSet::new() };
        cim.refresh();
        cim
    }

    fn refresh(&mut self) {
        self.bases.clear();
        self.parents.clear();

        for name in self.factor.names() {
            if Cim::is_parent(name) {
                self.parents.insert(name.to_string());
            } else {
                self.bases.insert(Cim::var_radical(name).to_string());
            }
        }
    }

    /// The from-state name of `name`
    pub fn var_i(name: &str) -> String {
        format!("{}{}i", name, DELIMITER)
    }

    /// The to-state name of `name`
    pub fn var_j(name: &str) -> String {
        format!("{}{}j", name, DELIMITER)
    }

    /// The name without its from/to suffix
    pub fn var_radical(name: &str) -> &str {
        if Cim::is_parent(name) {
            name
        } else {
            &name[..name.len() - 2]
        }
    }

    pub fn is_from(name: &str) -> bool {
        let mut chars = name.chars().rev();
        chars.next() == Some('i') && chars.next() == Some(DELIMITER)
    }

    pub fn is_to(name: &str) -> bool {
        let mut chars = name.chars().rev();
        chars.next() == Some('j') && chars.next() == Some(DELIMITER)
    }

    /// A name is a parent name when it carries neither the from nor the to suffix
    pub fn is_parent(name: &str) -> bool {
        ! (Cim::is_from(name) || Cim::is_to(name))
    }

    pub fn nbr_dim(&self) -> usize {
        self.factor.nbr_dim()
    }

    pub fn is_empty(&self) -> bool {
        self.nbr_dim() == 0
    }

    pub fn variables(&self) -> &[DiscreteVariable] {
        self.factor.scope()
    }

    pub fn var_names(&self) -> Vec<&str> {
        self.factor.names()
    }

    /// The radicals of the from/to dimensions
    pub fn bases(&self) -> &BTreeSet<String> {
        &self.bases
    }

    /// The names of the parent dimensions
    pub fn parents(&self) -> &BTreeSet<String> {
        &self.parents
    }

    pub fn find_var(&self, name: &str) -> Option<&DiscreteVariable> {
        self.factor.variable(name)
    }

    /// An intensity matrix is a `Cim` without parents
    pub fn is_im(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn factor(&self) -> &Factor {
        &self.factor
    }

    pub fn get(&self, inst: &Instantiation) -> Result<f64> {
        self.factor.get(inst)
    }

    pub fn set(&mut self, inst: &Instantiation, value: f64) -> Result<()> {
        self.factor.set(inst, value)
    }

    pub fn fill_with(&mut self, value: f64) {
        self.factor.fill_with(value);
    }

    /// Overwrite the table with row-major values, in the current dimension order
    pub fn fill_from(&mut self, values: &[f64]) -> Result<()> {
        self.factor.fill_from(values)
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.factor.to_vec()
    }

    /// Add a parent dimension
    ///
    /// # Errors
    /// * `CtbnError::InvalidArgument` if the name is a from/to name or is already a dimension
    pub fn add(&mut self, var: DiscreteVariable) -> Result<()> {
        if ! Cim::is_parent(var.name()) {
            return Err(CtbnError::InvalidArgument(format!("{} is not a parent name", var.name())));
        }

        self.factor.add(var)?;
        self.refresh();
        Ok(())
    }

    /// Remove a parent dimension
    ///
    /// # Errors
    /// * `CtbnError::InvalidArgument` if the name is a from/to name
    /// * `CtbnError::NotFound` if the name is not a dimension
    pub fn remove(&mut self, name: &str) -> Result<()> {
        if ! Cim::is_parent(name) {
            return Err(CtbnError::InvalidArgument(format!("{} is not a parent name", name)));
        }

        self.factor.remove(name)?;
        self.refresh();
        Ok(())
    }

    /// The `Cim` restricted by a partial instantiation
    pub fn extract(&self, ctx: &Instantiation) -> Result<Cim> {
        Ok(Cim::from_factor(self.factor.extract(ctx)?))
    }

    /// `true` when no base variable changes state in `inst`
    fn stays(&self, inst: &Instantiation) -> bool {
        self.bases.iter().all(|b| inst.get(&Cim::var_i(b)) == inst.get(&Cim::var_j(b)))
    }

    /// The instantiation of the diagonal cell of the row `row`
    fn diagonal_of(&self, row: &Instantiation) -> Instantiation {
        let mut diag = row.clone();
        for b in self.bases.iter() {
            if let Some(v) = row.get(&Cim::var_i(b)) {
                diag.set(&Cim::var_j(b), v);
            }
        }
        diag
    }

    /// The row dimensions (parents and from-states) and the column dimensions (to-states)
    fn split(&self) -> (Vec<DiscreteVariable>, Vec<DiscreteVariable>) {
        self.variables().iter().cloned().partition(|v| ! Cim::is_to(v.name()))
    }

    /// Sum of the off-diagonal cells of a row
    fn row_rate(&self, row: &Instantiation, columns: &[DiscreteVariable]) -> Result<f64> {
        let mut total = 0.0;
        for col in all_instantiations(columns) {
            let mut cell = row.clone();
            cell.update(&col);
            if ! self.stays(&cell) {
                total += self.get(&cell)?;
            }
        }
        Ok(total)
    }

    /// Rewrite every diagonal cell as the negated sum of the off-diagonal cells of its row
    pub fn set_diagonal(&mut self) -> Result<()> {
        let (rows, columns) = self.split();

        for row in all_instantiations(&rows) {
            let total = self.row_rate(&row, &columns)?;
            let diag = self.diagonal_of(&row);
            self.set(&diag, -total)?;
        }

        Ok(())
    }

    /// Check the generator convention: off-diagonal rates are non-negative and every row sums to
    /// zero within `tol`.
    ///
    /// # Errors
    /// * `CtbnError::InvalidArgument` describing the first offending row
    pub fn validate(&self, tol: f64) -> Result<()> {
        let (rows, columns) = self.split();

        for row in all_instantiations(&rows) {
            let mut sum = 0.0;
            for col in all_instantiations(&columns) {
                let mut cell = row.clone();
                cell.update(&col);
                let value = self.get(&cell)?;

                if ! self.stays(&cell) && value < 0.0 {
                    return Err(CtbnError::InvalidArgument(format!("negative rate {} at {:?}", value, cell)));
                }
                sum += value;
            }

            if sum.abs() > tol {
                return Err(CtbnError::InvalidArgument(format!("row {:?} sums to {}", row, sum)));
            }
        }

        Ok(())
    }

    /// Compose this `Cim` with `other` into the `Cim` of the joint process.
    ///
    /// An operand without dimensions is the identity. Parents of one operand that are bases of
    /// the other become couplings and take their value from the from-state of that base; the
    /// other parents are kept as parents of the result.
    ///
    /// # Errors
    /// * `CtbnError::InvalidArgument` if both operands share a base, or a shared parent has two
    ///   different domains
    pub fn amalgamate(&self, other: &Cim) -> Result<Cim> {
        if self.nbr_dim() == 0 {
            return Ok(other.clone());
        }
        if other.nbr_dim() == 0 {
            return Ok(self.clone());
        }

        if let Some(b) = self.bases.intersection(&other.bases).next() {
            return Err(CtbnError::InvalidArgument(format!("both operands own the variable {}", b)));
        }

        let p_y_in_x: Vec<&String> = self.parents.iter().filter(|p| other.bases.contains(*p)).collect();
        let p_x_in_y: Vec<&String> = other.parents.iter().filter(|p| self.bases.contains(*p)).collect();

        //////
        // Scope: the from/to pairs of both operands, then the external parents
        let mut scope: Vec<DiscreteVariable> = Vec::new();
        for v in self.variables().iter().chain(other.variables().iter()) {
            if ! Cim::is_parent(v.name()) {
                scope.push(v.clone());
            }
        }

        for v in self.variables().iter().chain(other.variables().iter()) {
            let coupled = self.bases.contains(v.name()) || other.bases.contains(v.name());
            if Cim::is_parent(v.name()) && ! coupled && ! scope.iter().any(|s| s.name() == v.name()) {
                scope.push(v.clone());
            }
        }

        let mut result = Factor::zeros(scope)?;

        //////
        // Cells
        for inst in result.instantiations() {
            let mut ix = inst.clone();
            for p in p_y_in_x.iter() {
                if let Some(v) = inst.get(&Cim::var_i(p)) {
                    ix.set(p, v);
                }
            }

            let mut iy = inst.clone();
            for p in p_x_in_y.iter() {
                if let Some(v) = inst.get(&Cim::var_i(p)) {
                    iy.set(p, v);
                }
            }

            let value = match (self.stays(&ix), other.stays(&iy)) {
                (true, true) => self.get(&ix)? + other.get(&iy)?,
                (false, true) => self.get(&ix)?,
                (true, false) => other.get(&iy)?,
                (false, false) => 0.0
            };

            result.set(&inst, value)?;
        }

        Ok(Cim::from_factor(result))
    }

    /// The from-state and to-state variables, ordered by sorted radical
    fn sorted_pairs(&self) -> Result<(Vec<DiscreteVariable>, Vec<DiscreteVariable>)> {
        let mut from = Vec::with_capacity(self.bases.len());
        let mut to = Vec::with_capacity(self.bases.len());

        // BTreeSet iterates in lexicographic order
        for b in self.bases.iter() {
            let vi = self.find_var(&Cim::var_i(b))
                         .ok_or_else(|| CtbnError::InvalidArgument(format!("{} has no from-state dimension", b)))?;
            let vj = self.find_var(&Cim::var_j(b))
                         .ok_or_else(|| CtbnError::InvalidArgument(format!("{} has no to-state dimension", b)))?;
            from.push(vi.clone());
            to.push(vj.clone());
        }

        Ok((from, to))
    }

    /// The square matrix of an intensity matrix. Rows are indexed by the joint from-state and
    /// columns by the joint to-state, both in sorted name order, the last name changing fastest.
    ///
    /// # Errors
    /// * `CtbnError::InvalidArgument` if the `Cim` has parents
    pub fn to_matrix(&self) -> Result<Array2<f64>> {
        if ! self.is_im() {
            return Err(CtbnError::InvalidArgument(String::from("only an intensity matrix has a matrix form")));
        }

        let (from, to) = self.sorted_pairs()?;
        let n: usize = from.iter().map(|v| v.cardinality()).product();

        let mut matrix = Array2::zeros((n, n));
        for (r, row) in all_instantiations(&from).enumerate() {
            for (c, col) in all_instantiations(&to).enumerate() {
                let mut cell = row.clone();
                cell.update(&col);
                matrix[[r, c]] = self.get(&cell)?;
            }
        }

        Ok(matrix)
    }

    /// Overwrite this intensity matrix with the cells of `matrix`, in the layout of `to_matrix`.
    ///
    /// # Errors
    /// * `CtbnError::InvalidArgument` if the `Cim` has parents or the matrix has the wrong shape
    pub fn from_matrix(&mut self, matrix: &Array2<f64>) -> Result<()> {
        if ! self.is_im() {
            return Err(CtbnError::InvalidArgument(String::from("only an intensity matrix has a matrix form")));
        }

        let (from, to) = self.sorted_pairs()?;
        let n: usize = from.iter().map(|v| v.cardinality()).product();

        if matrix.shape() != [n, n] {
            return Err(CtbnError::InvalidArgument(
                format!("expected a {}x{} matrix, got {:?}", n, n, matrix.shape())
            ));
        }

        for (r, row) in all_instantiations(&from).enumerate() {
            for (c, col) in all_instantiations(&to).enumerate() {
                let mut cell = row.clone();
                cell.update(&col);
                self.set(&cell, matrix[[r, c]])?;
            }
        }

        Ok(())
    }

    /// The cell instantiation for the current `state` of the bases and parents, with every
    /// base staying in its state
    fn state_cell(&self, state: &Instantiation) -> Result<Instantiation> {
        let mut cell = state.restrict(self.parents.iter().map(|p| p.as_str()));
        let mut missing = Vec::new();

        for b in self.bases.iter() {
            match state.get(b) {
                Some(v) => {
                    cell.set(&Cim::var_i(b), v);
                    cell.set(&Cim::var_j(b), v);
                },
                None => missing.push(b.clone())
            }
        }

        missing.extend(self.parents.iter().filter(|p| ! state.contains(p)).cloned());
        if ! missing.is_empty() {
            return Err(CtbnError::IncompleteInstantiation(missing));
        }

        Ok(cell)
    }

    /// The total exit rate out of the current state.
    ///
    /// # Args
    /// * `state`: the current state of the bases and parents, by plain variable name
    pub fn exit_rate(&self, state: &Instantiation) -> Result<f64> {
        Ok(-self.get(&self.state_cell(state)?)?)
    }

    /// The rates from the current state to every state of the single base of this `Cim`. The
    /// entry of the current state is zero.
    ///
    /// # Errors
    /// * `CtbnError::InvalidArgument` if the `Cim` does not have exactly one base
    pub fn transition_rates(&self, state: &Instantiation) -> Result<Vec<f64>> {
        let base = match self.bases.iter().next() {
            Some(b) if self.bases.len() == 1 => b,
            _ => return Err(CtbnError::InvalidArgument(String::from("transition rates need exactly one base"))),
        };

        let mut cell = self.state_cell(state)?;
        let to = Cim::var_j(base);
        let current = cell.get(&to).unwrap_or(0);
        let card = self.find_var(&to).map(|v| v.cardinality()).unwrap_or(0);

        let mut rates = Vec::with_capacity(card);
        for s in 0..card {
            if s == current {
                rates.push(0.0);
            } else {
                cell.set(&to, s);
                rates.push(self.get(&cell)?);
            }
        }

        Ok(rates)
    }

}


impl<'a> Mul for &'a Cim {

    type Output = Result<Cim>;

    fn mul(self, rhs: &'a Cim) -> Result<Cim> {
        self.amalgamate(rhs)
    }

}


#[cfg(test)]
mod tests {

    use super::*;
    use ndarray::array;
    use proptest::prelude::*;

    fn im(name: &str, n: usize, rates: &[f64]) -> Cim {
        let var = DiscreteVariable::range(name, n).unwrap();
        let mut cim = Cim::for_variable(&var).unwrap();
        cim.fill_from(rates).unwrap();
        cim.set_diagonal().unwrap();
        cim
    }

    /// B (binary) conditioned on A (binary); `rates` are [b0->b1, b1->b0] for a = 0 then a = 1
    fn conditioned(rates: &[f64; 4]) -> Cim {
        let b = DiscreteVariable::binary("B").unwrap();
        let mut cim = Cim::for_variable(&b).unwrap();
        cim.add(DiscreteVariable::binary("A").unwrap()).unwrap();

        for (a, (up, down)) in [(0, (rates[0], rates[1])), (1, (rates[2], rates[3]))] {
            let mut inst = Instantiation::new();
            inst.set("A", a);
            inst.set("B#i", 0);
            inst.set("B#j", 1);
            cim.set(&inst, up).unwrap();
            inst.set("B#i", 1);
            inst.set("B#j", 0);
            cim.set(&inst, down).unwrap();
        }

        cim.set_diagonal().unwrap();
        cim
    }

    #[test]
    fn naming() {
        assert_eq!(Cim::var_i("A"), "A#i");
        assert_eq!(Cim::var_j("A"), "A#j");
        assert_eq!(Cim::var_radical("A#i"), "A");
        assert_eq!(Cim::var_radical("A"), "A");
        assert!(Cim::is_from("A#i") && ! Cim::is_to("A#i"));
        assert!(Cim::is_to("A#j") && ! Cim::is_parent("A#j"));
        assert!(Cim::is_parent("A") && Cim::is_parent("A#k") && Cim::is_parent("i"));
    }

    #[test]
    fn structure() {
        let mut cim = Cim::for_variable(&DiscreteVariable::range("X", 3).unwrap()).unwrap();
        assert_eq!(cim.nbr_dim(), 2);
        assert!(cim.is_im());
        assert_eq!(cim.bases().iter().collect::<Vec<_>>(), vec!["X"]);

        cim.add(DiscreteVariable::binary("U").unwrap()).unwrap();
        assert!(! cim.is_im());
        assert!(cim.parents().contains("U"));
        assert_eq!(cim.var_names(), vec!["X#i", "X#j", "U"]);

        assert!(cim.add(DiscreteVariable::binary("Y#i").unwrap()).unwrap_err().is_invalid_argument());
        assert!(cim.remove("X#j").unwrap_err().is_invalid_argument());
        assert!(cim.remove("Z").unwrap_err().is_not_found());

        cim.remove("U").unwrap();
        assert!(cim.is_im());
        assert!(cim.find_var("U").is_none());
    }

    #[test]
    fn diagonal_and_validation() {
        let cim = im("X", 3, &[0., 1., 2., 3., 0., 4., 5., 6., 0.]);
        assert_eq!(cim.to_vec(), vec![-3., 1., 2., 3., -7., 4., 5., 6., -11.]);
        cim.validate(1e-9).unwrap();

        let mut state = Instantiation::new();
        state.set("X", 1);
        assert_eq!(cim.exit_rate(&state).unwrap(), 7.);
        assert_eq!(cim.transition_rates(&state).unwrap(), vec![3., 0., 4.]);

        let mut bad = cim.clone();
        bad.fill_from(&[1., -1., 0., 0., 0., 0., 0., 0., 0.]).unwrap();
        assert!(bad.validate(1e-9).unwrap_err().is_invalid_argument());
        bad.fill_from(&[0., 1., 0., 0., 0., 0., 0., 0., 0.]).unwrap();
        assert!(bad.validate(1e-9).is_err());

        assert!(cim.exit_rate(&Instantiation::new()).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn extract() {
        let cim = conditioned(&[1., 2., 3., 4.]);
        let mut ctx = Instantiation::new();
        ctx.set("A", 1);

        let sub = cim.extract(&ctx).unwrap();
        assert!(sub.is_im());
        assert_eq!(sub.to_vec(), vec![-3., 3., 4., -4.]);
    }

    #[test]
    fn identity() {
        let a = im("A", 2, &[0., 1., 2., 0.]);
        let empty = Cim::new();

        assert_eq!(a.amalgamate(&empty).unwrap(), a);
        assert_eq!(empty.amalgamate(&a).unwrap(), a);
        assert!(empty.amalgamate(&empty).unwrap().is_empty());
        assert_eq!((&a * &empty).unwrap(), a);
    }

    #[test]
    fn shared_base() {
        let a = im("A", 2, &[0., 1., 2., 0.]);
        assert!(a.amalgamate(&a).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn coupled_amalgamation() {
        let a = im("A", 2, &[0., 1., 1., 0.]);
        let b = conditioned(&[5., 6., 7., 8.]);

        let ab = a.amalgamate(&b).unwrap();
        assert!(ab.is_im());
        assert_eq!(ab.bases().len(), 2);

        let m = ab.to_matrix().unwrap();
        // rows and columns are (A, B) with B fastest
        let expected = array![
            [-6., 5., 1., 0.],
            [6., -7., 0., 1.],
            [1., 0., -8., 7.],
            [0., 1., 8., -9.]
        ];
        assert_eq!(m, expected);
    }

    #[test]
    fn external_parents() {
        // X | U and Y | U, V share the external parent U
        let mut x = Cim::for_variable(&DiscreteVariable::binary("X").unwrap()).unwrap();
        x.add(DiscreteVariable::binary("U").unwrap()).unwrap();
        let mut y = Cim::for_variable(&DiscreteVariable::binary("Y").unwrap()).unwrap();
        y.add(DiscreteVariable::binary("U").unwrap()).unwrap();
        y.add(DiscreteVariable::binary("V").unwrap()).unwrap();

        let xy = x.amalgamate(&y).unwrap();
        assert_eq!(xy.var_names(), vec!["X#i", "X#j", "Y#i", "Y#j", "U", "V"]);
        assert_eq!(xy.parents().len(), 2);
        assert!(xy.to_matrix().unwrap_err().is_invalid_argument());
    }

    #[test]
    fn matrix_round_trip() {
        let cim = im("X", 3, &[0., 1., 2., 3., 0., 4., 5., 6., 0.]);
        let m = cim.to_matrix().unwrap();
        assert_eq!(m, array![[-3., 1., 2.], [3., -7., 4.], [5., 6., -11.]]);

        let mut copy = cim.clone();
        copy.fill_with(0.);
        copy.from_matrix(&m).unwrap();
        assert_eq!(copy, cim);

        assert!(copy.from_matrix(&Array2::zeros((2, 2))).unwrap_err().is_invalid_argument());
        let parented = conditioned(&[1., 1., 1., 1.]);
        assert!(parented.clone().from_matrix(&Array2::zeros((2, 2))).unwrap_err().is_invalid_argument());
    }

    proptest! {

        #[test]
        fn amalgamation_is_commutative(a in prop::collection::vec(0.1f64..10.0, 6), b in prop::collection::vec(0.1f64..10.0, 4)) {
            let x = im("X", 3, &[0., a[0], a[1], a[2], 0., a[3], a[4], a[5], 0.]);
            let mut y = Cim::for_variable(&DiscreteVariable::binary("Y").unwrap()).unwrap();
            y.add(DiscreteVariable::range("X", 3).unwrap()).unwrap();
            y.fill_from(&(0..12).map(|k| b[k % 4]).collect::<Vec<_>>()).unwrap();
            y.set_diagonal().unwrap();

            let xy = x.amalgamate(&y).unwrap();
            let yx = y.amalgamate(&x).unwrap();
            prop_assert_eq!(xy.nbr_dim(), yx.nbr_dim());
            for inst in xy.factor().instantiations() {
                prop_assert!((xy.get(&inst).unwrap() - yx.get(&inst).unwrap()).abs() < 1e-12);
            }
        }

        #[test]
        fn amalgamated_rows_sum_to_zero(a in prop::collection::vec(0.0f64..10.0, 2), b in prop::collection::vec(0.0f64..10.0, 4)) {
            let x = im("A", 2, &[0., a[0], a[1], 0.]);
            let y = conditioned(&[b[0], b[1], b[2], b[3]]);

            let m = x.amalgamate(&y).unwrap().to_matrix().unwrap();
            for row in m.rows() {
                prop_assert!(row.sum().abs() < 1e-9);
            }
        }

    }

}
