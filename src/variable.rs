//! Definition of the variable module
//!
//! A `DiscreteVariable` is a named random variable over a finite set of labeled states. An
//! `Instantiation` is a (possibly partial) assignment of state indices to variable names.

use crate::util::{CtbnError, Result};

use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use std::fmt;


/// A random variable with a finite, labeled domain.
///
/// Two `DiscreteVariable`s are equal when they share both their name and their labels.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscreteVariable {

    /// The name of the `DiscreteVariable`
    name: String,

    /// The labels of the states, in index order
    labels: Vec<String>

}


impl DiscreteVariable {

    /// Construct a new `DiscreteVariable`
    ///
    /// # Errors
    /// * `CtbnError::InvalidArgument` if the name is empty, there are no labels, a label is
    ///   duplicated or empty, or the name or a label is not trimmed or holds one of the
    ///   reserved characters ```{}[]|```
    pub fn new(name: &str, labels: &[&str]) -> Result<Self> {
        Self::from_labels(name, labels.iter().map(|s| s.to_string()).collect())
    }

    fn from_labels(name: &str, labels: Vec<String>) -> Result<Self> {
        if name.is_empty() {
            return Err(CtbnError::InvalidArgument(String::from("a variable name may not be empty")));
        }

        if labels.is_empty() {
            return Err(CtbnError::InvalidArgument(format!("variable {} has an empty domain", name)));
        }

        if labels.iter().unique().count() != labels.len() {
            return Err(CtbnError::InvalidArgument(format!("variable {} has duplicated labels", name)));
        }

        if let Some(bad) = std::iter::once(name).chain(labels.iter().map(String::as_str)).find(|s| !is_plain(s)) {
            return Err(CtbnError::InvalidArgument(format!("variable {} has the unrepresentable name or label '{}'", name, bad)));
        }

        Ok(DiscreteVariable { name: String::from(name), labels })
    }

    /// Construct a `DiscreteVariable` with the labels `0..n-1`
    pub fn range(name: &str, n: usize) -> Result<Self> {
        Self::from_labels(name, (0..n).map(|i| i.to_string()).collect())
    }

    /// Construct a binary `DiscreteVariable` with the labels `0` and `1`
    pub fn binary(name: &str) -> Result<Self> {
        Self::range(name, 2)
    }

    /// Parse a variable from its fast specification.
    ///
    /// Accepted forms are `A` (binary), `A[n]` (labels `0..n-1`), `A[a,b]` (integer labels
    /// `a..=b`) and `A{x|y|z}` (explicit labels).
    pub fn from_fast_spec(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        let invalid = || CtbnError::InvalidArgument(format!("invalid variable specification '{}'", spec));

        if let Some(open) = spec.find('{') {
            let body = spec[open + 1..].strip_suffix('}').ok_or_else(invalid)?;
            let labels: Vec<String> = body.split('|').map(|s| s.trim().to_string()).collect();
            if labels.iter().any(|l| l.is_empty()) {
                return Err(invalid());
            }
            Self::from_labels(spec[..open].trim(), labels)
        } else if let Some(open) = spec.find('[') {
            let body = spec[open + 1..].strip_suffix(']').ok_or_else(invalid)?;
            let name = spec[..open].trim();
            let bounds: Vec<&str> = body.split(',').map(|s| s.trim()).collect();

            match bounds.as_slice() {
                [n] => {
                    let n: usize = n.parse().map_err(|_| invalid())?;
                    Self::range(name, n)
                },
                [lo, hi] => {
                    let lo: i64 = lo.parse().map_err(|_| invalid())?;
                    let hi: i64 = hi.parse().map_err(|_| invalid())?;
                    if hi < lo {
                        return Err(invalid());
                    }
                    Self::from_labels(name, (lo..=hi).map(|i| i.to_string()).collect())
                },
                _ => Err(invalid())
            }
        } else {
            Self::binary(spec)
        }
    }

    /// The fast specification of this variable, always in the explicit `A{x|y}` form so that
    /// `from_fast_spec(to_fast_spec())` reproduces the variable exactly.
    pub fn to_fast_spec(&self) -> String {
        format!("{}{{{}}}", self.name, self.labels.join("|"))
    }

    /// Get the name of the `DiscreteVariable`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the labels of the `DiscreteVariable`
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Get the label of the state at `idx`
    pub fn label(&self, idx: usize) -> Option<&str> {
        self.labels.get(idx).map(|s| s.as_str())
    }

    /// Get the index of the state named `label`
    ///
    /// # Errors
    /// * `CtbnError::NotFound` if the label is not in the domain
    pub fn index(&self, label: &str) -> Result<usize> {
        self.labels
            .iter()
            .position(|l| l == label)
            .ok_or_else(|| CtbnError::NotFound(format!("label '{}' in variable {}", label, self.name)))
    }

    /// The number of states
    pub fn cardinality(&self) -> usize {
        self.labels.len()
    }

    /// A copy of this variable under another name
    pub fn renamed(&self, name: &str) -> Self {
        DiscreteVariable { name: String::from(name), labels: self.labels.clone() }
    }

}


// Names and labels must survive a trip through the fast specification.
fn is_plain(s: &str) -> bool {
    !s.is_empty() && s.trim() == s && !s.contains(|c| RESERVED.contains(&c))
}

const RESERVED: [char; 5] = ['{', '}', '[', ']', '|'];


impl fmt::Display for DiscreteVariable {

    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_fast_spec())
    }

}


/// A sparse mapping from variable names to state indices.
///
/// A name that is absent is unconstrained; a name that is present is constrained to the given
/// state. Equality does not depend on insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Instantiation {

    values: IndexMap<String, usize>

}


impl Instantiation {

    pub fn new() -> Self {
        Instantiation { values: IndexMap::new() }
    }

    /// Constrain `name` to the state `idx`, overwriting any previous value
    pub fn set(&mut self, name: &str, idx: usize) {
        if let Some(v) = self.values.get_mut(name) {
            *v = idx;
        } else {
            self.values.insert(String::from(name), idx);
        }
    }

    /// The state of `name`, if constrained
    pub fn get(&self, name: &str) -> Option<usize> {
        self.values.get(name).cloned()
    }

    /// Remove the constraint on `name`
    pub fn unset(&mut self, name: &str) -> Option<usize> {
        self.values.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.values.iter().map(|(k, &v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|k| k.as_str())
    }

    /// Copy every constraint of `other` into this instantiation
    pub fn update(&mut self, other: &Instantiation) {
        for (name, idx) in other.iter() {
            self.set(name, idx);
        }
    }

    /// Keep only the constraints on the given names
    pub fn restrict<'a, I>(&self, names: I) -> Instantiation
        where I: IntoIterator<Item = &'a str>
    {
        let mut inst = Instantiation::new();
        for name in names {
            if let Some(v) = self.get(name) {
                inst.set(name, v);
            }
        }
        inst
    }

}


/// Iterator over every joint instantiation of a list of variables.
///
/// Instantiations are produced in row-major order: the last variable changes fastest.
pub struct Instantiations {

    /// the names and cardinalities of the variables
    vars: Vec<(String, usize)>,

    /// the next odometer value, `None` when exhausted
    current: Option<Vec<usize>>

}


impl Iterator for Instantiations {

    type Item = Instantiation;

    fn next(&mut self) -> Option<Instantiation> {
        let current = self.current.take()?;

        let mut inst = Instantiation::new();
        for ((name, _), &idx) in self.vars.iter().zip(current.iter()) {
            inst.set(name, idx);
        }

        // advance the odometer
        let mut next = current;
        let mut pos = self.vars.len();
        while pos > 0 {
            pos -= 1;
            next[pos] += 1;
            if next[pos] < self.vars[pos].1 {
                self.current = Some(next);
                break;
            }
            next[pos] = 0;
        }

        Some(inst)
    }

}


/// Enumerate all the joint instantiations of the given variables.
///
/// An empty scope has exactly one (empty) instantiation.
pub fn all_instantiations(vars: &[DiscreteVariable]) -> Instantiations {
    let vars: Vec<(String, usize)> = vars.iter().map(|v| (v.name().to_string(), v.cardinality())).collect();
    let current = if vars.iter().any(|&(_, c)| c == 0) {
        None
    } else {
        Some(vec![0; vars.len()])
    };

    Instantiations { vars, current }
}
