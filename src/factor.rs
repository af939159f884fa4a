//! Definition of the factor module
//!
//! A `Factor` is a multi-dimensional table of real values indexed by the states of a list of
//! named `DiscreteVariable`s. It is the storage behind conditional intensity matrices, the
//! sufficient statistics of trajectories and the posteriors of the inference engines.

use crate::util::{CtbnError, Result};
use crate::variable::{all_instantiations, DiscreteVariable, Instantiation, Instantiations};

use itertools::Itertools;
use ndarray::{ArrayD, Axis, IxDyn};


/// Alias f64 ndarray::ArrayD as Table
pub type Table = ArrayD<f64>;


/// A table over a scope of variables. Axis `k` of the table is indexed by the states of
/// `scope[k]`; the table is addressed by variable name, never by axis position.
#[derive(Clone, Debug, PartialEq)]
pub struct Factor {

    /// The scope of the `Factor`
    scope: Vec<DiscreteVariable>,

    /// The values of the `Factor` table.
    table: Table

}


impl Factor {

    /// Create a new `Factor`
    ///
    /// # Errors
    /// * `CtbnError::InvalidArgument` if the scope does not match the dimensions of the table or
    ///   if a variable name appears twice in the scope
    pub fn new(scope: Vec<DiscreteVariable>, table: Table) -> Result<Self> {
        if scope.len() != table.ndim() {
            return Err(CtbnError::InvalidArgument(
                String::from("Cardinality of scope must match number of table dimensions")
            ));
        }

        for (v, t) in scope.iter().map(|v| v.cardinality()).zip(table.shape().iter()) {
            if v != *t {
                return Err(CtbnError::InvalidArgument(String::from("Dimensions do not match")));
            }
        }

        check_unique(&scope)?;

        Ok(Factor { scope, table })
    }

    /// A `Factor` with an empty scope holding a single value
    pub fn scalar(value: f64) -> Self {
        Factor { scope: Vec::new(), table: Table::from_elem(IxDyn(&[]), value) }
    }

    /// A `Factor` over `scope` with every cell set to `value`
    pub fn from_elem(scope: Vec<DiscreteVariable>, value: f64) -> Result<Self> {
        check_unique(&scope)?;
        let shape: Vec<usize> = scope.iter().map(|v| v.cardinality()).collect();

        Ok(Factor { scope, table: Table::from_elem(IxDyn(&shape), value) })
    }

    /// A `Factor` over `scope` filled with zeros
    pub fn zeros(scope: Vec<DiscreteVariable>) -> Result<Self> {
        Factor::from_elem(scope, 0.0)
    }

    /// Retrieve the scope of the `Factor`.
    pub fn scope(&self) -> &[DiscreteVariable] {
        &self.scope
    }

    /// The names of the variables in the scope, in axis order
    pub fn names(&self) -> Vec<&str> {
        self.scope.iter().map(|v| v.name()).collect()
    }

    /// The number of dimensions of the table
    pub fn nbr_dim(&self) -> usize {
        self.scope.len()
    }

    /// The number of cells of the table
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scope.is_empty()
    }

    /// The axis of the variable called `name`
    pub fn position(&self, name: &str) -> Option<usize> {
        self.scope.iter().position(|v| v.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// The variable of the scope called `name`
    pub fn variable(&self, name: &str) -> Option<&DiscreteVariable> {
        self.scope.iter().find(|v| v.name() == name)
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Iterate over every instantiation of the scope, in the order of `to_vec`
    pub fn instantiations(&self) -> Instantiations {
        all_instantiations(&self.scope)
    }

    /// Compute the table index of an instantiation. Names outside the scope are ignored.
    fn index_of(&self, inst: &Instantiation) -> Result<Vec<usize>> {
        let mut idx = Vec::with_capacity(self.scope.len());
        let mut missing = Vec::new();

        for v in self.scope.iter() {
            match inst.get(v.name()) {
                Some(i) if i < v.cardinality() => idx.push(i),
                Some(i) => {
                    return Err(CtbnError::InvalidArgument(
                        format!("state {} out of range for variable {}", i, v.name())
                    ));
                },
                None => missing.push(v.name().to_string())
            }
        }

        if ! missing.is_empty() {
            return Err(CtbnError::IncompleteInstantiation(missing));
        }

        Ok(idx)
    }

    /// Retrieve the value for a complete instantiation over the scope of this `Factor`
    ///
    /// # Args
    /// * `inst`: a full instantiation of the scope. It may constrain other variables too.
    ///
    /// # Errors
    /// * `CtbnError::IncompleteInstantiation` if a variable of the scope is unconstrained
    /// * `CtbnError::InvalidArgument` if a state is out of range
    pub fn get(&self, inst: &Instantiation) -> Result<f64> {
        let idx = self.index_of(inst)?;
        Ok(self.table[IxDyn(&idx)])
    }

    /// Overwrite the value for a complete instantiation over the scope of this `Factor`
    pub fn set(&mut self, inst: &Instantiation, value: f64) -> Result<()> {
        let idx = self.index_of(inst)?;
        self.table[IxDyn(&idx)] = value;
        Ok(())
    }

    /// Add a dimension for `var` as the last axis. The existing values are replicated along the
    /// new axis.
    ///
    /// # Errors
    /// * `CtbnError::InvalidArgument` if a variable with the same name is already in the scope
    pub fn add(&mut self, var: DiscreteVariable) -> Result<()> {
        if self.contains(var.name()) {
            return Err(CtbnError::InvalidArgument(format!("{} is already in the scope", var.name())));
        }

        let ndim = self.table.ndim();
        let mut shape = self.table.shape().to_vec();
        shape.push(var.cardinality());

        let table = self.table
                        .view()
                        .insert_axis(Axis(ndim))
                        .broadcast(IxDyn(&shape))
                        .ok_or_else(|| CtbnError::InvalidArgument(String::from("cannot broadcast table")))?
                        .to_owned();

        self.table = table;
        self.scope.push(var);
        Ok(())
    }

    /// Remove the dimension of the variable called `name`, keeping the slice at its first state.
    ///
    /// # Errors
    /// * `CtbnError::NotFound` if the variable is not in the scope
    pub fn remove(&mut self, name: &str) -> Result<()> {
        let pos = self.position(name)
                      .ok_or_else(|| CtbnError::NotFound(format!("{} in the scope of the table", name)))?;

        self.table = self.table.index_axis(Axis(pos), 0).to_owned();
        self.scope.remove(pos);
        Ok(())
    }

    /// Extract the sub-table given by a partial instantiation. The constrained variables leave
    /// the scope; names outside the scope are ignored.
    pub fn extract(&self, partial: &Instantiation) -> Result<Factor> {
        let mut view = self.table.view();
        let mut scope = Vec::new();

        // walk the axes backwards so that removing one does not shift the others
        for (axis, var) in self.scope.iter().enumerate().rev() {
            match partial.get(var.name()) {
                Some(i) if i >= var.cardinality() => {
                    return Err(CtbnError::InvalidArgument(
                        format!("state {} out of range for variable {}", i, var.name())
                    ));
                },
                Some(i) => view = view.index_axis_move(Axis(axis), i),
                None => scope.push(var.clone())
            }
        }

        scope.reverse();
        Ok(Factor { scope, table: view.to_owned() })
    }

    /// The union of both scopes: this scope first, then the new variables of `other`
    fn union_scope(&self, other: &Factor) -> Result<Vec<DiscreteVariable>> {
        let mut scope = self.scope.clone();

        for v in other.scope.iter() {
            match self.variable(v.name()) {
                Some(mine) if mine != v => {
                    return Err(CtbnError::InvalidArgument(
                        format!("variable {} has two different domains", v.name())
                    ));
                },
                Some(_) => (),
                None => scope.push(v.clone())
            }
        }

        Ok(scope)
    }

    /// Combine two `Factor`s cell by cell over the union of their scopes
    fn combine<F>(&self, other: &Factor, op: F) -> Result<Factor>
        where F: Fn(f64, f64) -> Result<f64>
    {
        let scope = self.union_scope(other)?;
        let shape: Vec<usize> = scope.iter().map(|v| v.cardinality()).collect();

        let mut values = Vec::with_capacity(shape.iter().product());
        for inst in all_instantiations(&scope) {
            values.push(op(self.get(&inst)?, other.get(&inst)?)?);
        }

        let table = Table::from_shape_vec(IxDyn(&shape), values)
                        .map_err(|e| CtbnError::InvalidArgument(e.to_string()))?;
        Factor::new(scope, table)
    }

    /// Elementwise product over the union of the scopes
    pub fn product(&self, other: &Factor) -> Result<Factor> {
        self.combine(other, |a, b| Ok(a * b))
    }

    /// Elementwise sum over the union of the scopes
    pub fn add_factor(&self, other: &Factor) -> Result<Factor> {
        self.combine(other, |a, b| Ok(a + b))
    }

    /// Elementwise difference over the union of the scopes
    pub fn subtract(&self, other: &Factor) -> Result<Factor> {
        self.combine(other, |a, b| Ok(a - b))
    }

    /// Elementwise quotient over the union of the scopes.
    ///
    /// # Notes
    /// In the context of this operation, 0/0 is defined as 0. However, X/0, where X != 0, is still
    /// undefined.
    ///
    /// # Errors
    /// * `CtbnError::Numerical` if a non-zero value is divided by zero
    pub fn divide(&self, other: &Factor) -> Result<Factor> {
        self.combine(other, |a, b| {
            if b == 0.0 {
                if a == 0.0 {
                    Ok(0.0)
                } else {
                    Err(CtbnError::Numerical(String::from("division by zero")))
                }
            } else {
                Ok(a / b)
            }
        })
    }

    /// Multiply every cell by `k`
    pub fn scale(&self, k: f64) -> Factor {
        self.map(|v| v * k)
    }

    /// Apply `f` to every cell
    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Factor {
        Factor { scope: self.scope.clone(), table: self.table.mapv(f) }
    }

    /// Sum the table over the given variables, removing them from the scope
    ///
    /// # Errors
    /// * `CtbnError::NotFound` if one of the names is not in the scope
    pub fn sum_out(&self, names: &[&str]) -> Result<Factor> {
        let mut result = self.clone();

        for name in names {
            let pos = result.position(name)
                            .ok_or_else(|| CtbnError::NotFound(format!("{} in the scope of the table", name)))?;
            result.table = result.table.sum_axis(Axis(pos));
            result.scope.remove(pos);
        }

        Ok(result)
    }

    /// Sum the table over every variable except the given ones
    pub fn sum_in(&self, names: &[&str]) -> Result<Factor> {
        if let Some(name) = names.iter().find(|n| ! self.contains(n)) {
            return Err(CtbnError::NotFound(format!("{} in the scope of the table", name)));
        }

        let others: Vec<&str> = self.names().into_iter().filter(|n| ! names.contains(n)).collect();
        self.sum_out(&others)
    }

    /// Marginalize the `Factor` over the given variable
    pub fn marginalize(&self, name: &str) -> Result<Factor> {
        self.sum_out(&[name])
    }

    /// The sum of all cells
    pub fn sum(&self) -> f64 {
        self.table.sum()
    }

    /// The largest cell (negative infinity for an empty table)
    pub fn max(&self) -> f64 {
        self.table.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
    }

    /// A copy of this `Factor` whose cells sum to one
    ///
    /// # Errors
    /// * `CtbnError::Numerical` if the cells sum to zero
    pub fn normalize(&self) -> Result<Factor> {
        let z = self.sum();
        if z == 0.0 || ! z.is_finite() {
            return Err(CtbnError::Numerical(format!("cannot normalize a table summing to {}", z)));
        }

        Ok(self.scale(1.0 / z))
    }

    pub fn fill_with(&mut self, value: f64) {
        self.table.fill(value);
    }

    /// Overwrite the table with row-major `values` (the last variable changes fastest)
    ///
    /// # Errors
    /// * `CtbnError::InvalidArgument` if the number of values does not match the table size
    pub fn fill_from(&mut self, values: &[f64]) -> Result<()> {
        if values.len() != self.table.len() {
            return Err(CtbnError::InvalidArgument(
                format!("expected {} values, got {}", self.table.len(), values.len())
            ));
        }

        let shape = self.table.shape().to_vec();
        self.table = Table::from_shape_vec(IxDyn(&shape), values.to_vec())
                         .map_err(|e| CtbnError::InvalidArgument(e.to_string()))?;
        Ok(())
    }

    /// The row-major values of the table
    pub fn to_vec(&self) -> Vec<f64> {
        self.table.iter().cloned().collect()
    }

    /// Rename the variable `old` of the scope
    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        if self.contains(new) {
            return Err(CtbnError::InvalidArgument(format!("{} is already in the scope", new)));
        }

        let pos = self.position(old)
                      .ok_or_else(|| CtbnError::NotFound(format!("{} in the scope of the table", old)))?;
        self.scope[pos] = self.scope[pos].renamed(new);
        Ok(())
    }

}


fn check_unique(scope: &[DiscreteVariable]) -> Result<()> {
    if scope.iter().map(|v| v.name()).unique().count() != scope.len() {
        return Err(CtbnError::InvalidArgument(String::from("A variable appears twice in the scope")));
    }
    Ok(())
}


// Unit tests
#[cfg(test)]
mod tests {

    use super::*;
    use itertools::iproduct;
    use ndarray::array;

    fn var(name: &str, n: usize) -> DiscreteVariable {
        DiscreteVariable::range(name, n).unwrap()
    }

    fn inst(values: &[(&str, usize)]) -> Instantiation {
        let mut i = Instantiation::new();
        for &(n, v) in values {
            i.set(n, v);
        }
        i
    }

    #[test]
    fn table_factor() {
        let vars = vec![var("A", 2), var("B", 5), var("C", 3)];
        let mut table = Table::ones(IxDyn(&[2, 5, 3]));
        table[IxDyn(&[1, 1, 1])] = 5.;

        let f = Factor::new(vars, table).unwrap();

        for (x, y, z) in iproduct!(0..2, 0..5, 0..3) {
            let val = f.get(&inst(&[("A", x), ("B", y), ("C", z)])).unwrap();
            if x == 1 && y == 1 && z == 1 {
                assert_eq!(5., val);
            } else {
                assert_eq!(1., val);
            }
        }
    }

    #[test]
    fn table_factor_errs() {
        // mismatched number of dimensions
        let f = Factor::new(vec![var("A", 2), var("B", 2)], Table::ones(IxDyn(&[2, 2, 2])));
        assert!(f.unwrap_err().is_invalid_argument());

        // wrong cardinality
        let f = Factor::new(vec![var("A", 2), var("B", 2)], Table::ones(IxDyn(&[2, 3])));
        assert!(f.unwrap_err().is_invalid_argument());

        // duplicated variable
        let f = Factor::new(vec![var("A", 2), var("A", 2)], Table::ones(IxDyn(&[2, 2])));
        assert!(f.unwrap_err().is_invalid_argument());
    }

    #[test]
    fn value() {
        let f = Factor::new(vec![var("A", 2), var("B", 2)], array![[0., 1.], [2., 3.]].into_dyn()).unwrap();

        // out of scope values are ignored
        assert_eq!(2., f.get(&inst(&[("A", 1), ("B", 0), ("Z", 1)])).unwrap());

        // incomplete instantiation
        match f.get(&inst(&[("A", 0), ("Z", 0)])).unwrap_err() {
            CtbnError::IncompleteInstantiation(names) => assert_eq!(names, vec![String::from("B")]),
            _ => panic!("incorrect error")
        };

        // out of range
        assert!(f.get(&inst(&[("A", 2), ("B", 0)])).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn add_and_remove() {
        let mut f = Factor::new(vec![var("A", 2)], array![0.25, 0.75].into_dyn()).unwrap();
        f.add(var("B", 3)).unwrap();
        assert_eq!(f.names(), vec!["A", "B"]);
        assert_eq!(f.to_vec(), vec![0.25, 0.25, 0.25, 0.75, 0.75, 0.75]);
        assert!(f.add(var("B", 3)).unwrap_err().is_invalid_argument());

        f.set(&inst(&[("A", 0), ("B", 2)]), 9.).unwrap();
        f.remove("B").unwrap();
        assert_eq!(f.to_vec(), vec![0.25, 0.75]);
        assert!(f.remove("B").unwrap_err().is_not_found());

        let mut s = Factor::scalar(2.);
        s.add(var("A", 2)).unwrap();
        assert_eq!(s.to_vec(), vec![2., 2.]);
    }

    #[test]
    /// Example taken from Koller & Friedman Figure 4.3
    fn product() {
        let tbl1 = array![[0.5, 0.8], [0.1, 0.], [0.3, 0.9]].into_dyn();
        let phi1 = Factor::new(vec![var("A", 3), var("B", 2)], tbl1).unwrap();

        let tbl2 = array![[0.5, 0.7], [0.1, 0.2]].into_dyn();
        let phi2 = Factor::new(vec![var("B", 2), var("C", 2)], tbl2).unwrap();

        let phi = phi1.product(&phi2).unwrap();
        assert_eq!(phi.names(), vec!["A", "B", "C"]);

        let expected = vec![0.25, 0.35, 0.08, 0.16, 0.05, 0.07, 0., 0., 0.15, 0.21, 0.09, 0.18];
        for (e, a) in expected.iter().zip(phi.to_vec()) {
            assert!((e - a).abs() < 1e-12);
        }
    }

    #[test]
    fn domain_conflict() {
        let phi1 = Factor::zeros(vec![var("A", 3)]).unwrap();
        let phi2 = Factor::zeros(vec![var("A", 2)]).unwrap();
        assert!(phi1.product(&phi2).unwrap_err().is_invalid_argument());
    }

    #[test]
    /// Example taken from Koller & Friedman Figure 4.3
    fn divide() {
        let tbl1 = array![[0.5, 0.2], [0., 0.], [0.3, 0.45]].into_dyn();
        let phi1 = Factor::new(vec![var("A", 3), var("B", 2)], tbl1).unwrap();

        let phi2 = Factor::new(vec![var("A", 3)], array![0.8, 0., 0.6].into_dyn()).unwrap();

        let phi = phi1.divide(&phi2).unwrap();
        let expected = vec![0.625, 0.25, 0., 0., 0.5, 0.75];
        for (e, a) in expected.iter().zip(phi.to_vec()) {
            assert!((e - a).abs() < 1e-12);
        }

        let zeros = Factor::zeros(vec![var("A", 3)]).unwrap();
        match phi1.divide(&zeros).unwrap_err() {
            CtbnError::Numerical(_) => (),
            _ => panic!("incorrect error")
        };
    }

    #[test]
    /// Example taken from Koller & Friedman Figure 4.5
    fn extract() {
        let table = Table::from_shape_vec(
            IxDyn(&[3, 2, 2]),
            vec![0.25, 0.35, 0.08, 0.16, 0.05, 0.07, 0., 0., 0.15, 0.21, 0.09, 0.18]
        ).unwrap();
        let phi = Factor::new(vec![var("A", 3), var("B", 2), var("C", 2)], table).unwrap();

        let reduced = phi.extract(&inst(&[("C", 0)])).unwrap();
        assert_eq!(reduced.names(), vec!["A", "B"]);
        assert_eq!(reduced.to_vec(), vec![0.25, 0.08, 0.05, 0., 0.15, 0.09]);

        let reduced = phi.extract(&inst(&[("C", 0), ("A", 2)])).unwrap();
        assert_eq!(reduced.names(), vec!["B"]);
        assert_eq!(reduced.to_vec(), vec![0.15, 0.09]);

        let same = phi.extract(&inst(&[("Z", 1)])).unwrap();
        assert_eq!(same, phi);

        let full = phi.extract(&inst(&[("A", 0), ("B", 0), ("C", 1)])).unwrap();
        assert_eq!(full.nbr_dim(), 0);
        assert_eq!(full.sum(), 0.35);
    }

    #[test]
    /// Example taken from Koller & Friedman Figure 9.7
    fn marginalize() {
        let table = Table::from_shape_vec(
            IxDyn(&[3, 2, 2]),
            vec![0.25, 0.35, 0.08, 0.16, 0.05, 0.07, 0., 0., 0.15, 0.21, 0.09, 0.18]
        ).unwrap();
        let phi = Factor::new(vec![var("A", 3), var("B", 2), var("C", 2)], table).unwrap();

        let marginalized = phi.marginalize("B").unwrap();
        assert_eq!(marginalized.names(), vec!["A", "C"]);
        let expected = vec![0.33, 0.51, 0.05, 0.07, 0.24, 0.39];
        for (e, a) in expected.iter().zip(marginalized.to_vec()) {
            assert!((e - a).abs() < 1e-12);
        }

        let a = phi.sum_in(&["A"]).unwrap();
        assert_eq!(a.names(), vec!["A"]);
        let expected = vec![0.84, 0.12, 0.63];
        for (e, v) in expected.iter().zip(a.to_vec()) {
            assert!((e - v).abs() < 1e-12);
        }

        assert!(phi.sum_out(&["Z"]).unwrap_err().is_not_found());
        assert!(phi.sum_in(&["Z"]).unwrap_err().is_not_found());
    }

    #[test]
    fn normalize_and_fill() {
        let mut f = Factor::zeros(vec![var("A", 2), var("B", 2)]).unwrap();
        assert!(f.normalize().is_err());

        f.fill_from(&[1., 2., 3., 4.]).unwrap();
        assert_eq!(f.get(&inst(&[("A", 1), ("B", 0)])).unwrap(), 3.);
        assert!(f.fill_from(&[1., 2.]).unwrap_err().is_invalid_argument());

        let n = f.normalize().unwrap();
        assert!((n.sum() - 1.).abs() < 1e-12);
        assert!((n.max() - 0.4).abs() < 1e-12);

        f.rename("B", "C").unwrap();
        assert_eq!(f.names(), vec!["A", "C"]);
        assert!(f.rename("Z", "Y").unwrap_err().is_not_found());
        assert!(f.rename("A", "C").unwrap_err().is_invalid_argument());
    }

}
