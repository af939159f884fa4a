//! Defines a `Ctbn`, a continuous-time Bayesian network: a directed graph of discrete variables
//! where each variable evolves as a Markov jump process whose rates depend on the current states
//! of its parents.

use crate::cim::Cim;
use crate::graph::{DiGraph, NodeId};
use crate::init::Initialization;
use crate::util::{CtbnError, Result};
use crate::variable::{DiscreteVariable, Instantiation};

use bidir_map::BidirMap;
use indexmap::IndexMap;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};

use std::fmt;


/// Represents a continuous-time Bayesian network.
///
/// # Representation
/// Every node owns a `DiscreteVariable` and its `Cim`. An arc ```U -> X``` exists in the graph if
/// and only if ```U``` is a parent dimension of the `Cim` of ```X```; `add_arc` and `erase_arc`
/// keep both views in agreement.
pub struct Ctbn {

    /// The dependency graph
    graph: DiGraph,

    /// The variable of each node, in insertion order
    variables: IndexMap<NodeId, DiscreteVariable>,

    /// The conditional intensity matrix of each node
    cims: IndexMap<NodeId, Cim>,

    /// The names of each node. This is a two way lookup ```(NodeId->Name)``` and
    /// ```(Name->NodeId)```
    names: BidirMap<NodeId, String>

}


/// Anything that designates a node of a `Ctbn`: its id or its name.
pub trait NodeKey {

    /// Resolve the key to a node id of `model`
    ///
    /// # Errors
    /// * `CtbnError::NotFound` if the node does not exist
    fn node_id(&self, model: &Ctbn) -> Result<NodeId>;

}


impl NodeKey for NodeId {

    fn node_id(&self, model: &Ctbn) -> Result<NodeId> {
        if model.variables.contains_key(self) {
            Ok(*self)
        } else {
            Err(CtbnError::NotFound(format!("node {}", self)))
        }
    }

}


impl NodeKey for str {

    fn node_id(&self, model: &Ctbn) -> Result<NodeId> {
        model.names
             .get_by_second(&String::from(self))
             .cloned()
             .ok_or_else(|| CtbnError::NotFound(format!("variable {}", self)))
    }

}


impl NodeKey for String {

    fn node_id(&self, model: &Ctbn) -> Result<NodeId> {
        self.as_str().node_id(model)
    }

}


impl<'a, T: NodeKey + ?Sized> NodeKey for &'a T {

    fn node_id(&self, model: &Ctbn) -> Result<NodeId> {
        (**self).node_id(model)
    }

}


/// The persisted form of a `Ctbn`
///
/// * `nodes`: the fast specification of every variable, in node order
/// * `parents`: for every variable, the names of its parents in the dimension order of its `Cim`
/// * `cim`: for every variable, the row-major values of its `Cim`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CtbnState {

    pub nodes: Vec<String>,

    pub parents: IndexMap<String, Vec<String>>,

    pub cim: IndexMap<String, Vec<f64>>

}


impl Default for Ctbn {

    fn default() -> Self {
        Ctbn::new()
    }

}


impl Ctbn {

    /// An empty `Ctbn`
    pub fn new() -> Self {
        Ctbn {
            graph: DiGraph::new(),
            variables: IndexMap::new(),
            cims: IndexMap::new(),
            names: BidirMap::new()
        }
    }

    /// Add a variable to the network, with a zero `Cim` and no parents.
    ///
    /// # Errors
    /// * `CtbnError::InvalidArgument` if the name is empty, already used, or shaped like a
    ///   from/to name
    pub fn add(&mut self, var: DiscreteVariable) -> Result<NodeId> {
        let name = var.name().to_string();

        if name.is_empty() || ! Cim::is_parent(&name) {
            return Err(CtbnError::InvalidArgument(format!("'{}' is not a valid variable name", name)));
        }

        if self.names.get_by_second(&name).is_some() {
            return Err(CtbnError::InvalidArgument(format!("the name {} is already used", name)));
        }

        let cim = Cim::for_variable(&var)?;
        let id = self.graph.add_node();

        self.variables.insert(id, var);
        self.cims.insert(id, cim);
        self.names.insert(id, name);

        Ok(id)
    }

    /// Add the arc ```tail -> head```: `tail` becomes a parent dimension of the `Cim` of `head`.
    /// Adding an existing arc does nothing.
    ///
    /// # Errors
    /// * `CtbnError::NotFound` if one of the ends does not exist
    /// * `CtbnError::InvalidArgument` for a self-loop
    pub fn add_arc<T: NodeKey, H: NodeKey>(&mut self, tail: T, head: H) -> Result<()> {
        let tail = tail.node_id(self)?;
        let head = head.node_id(self)?;

        if self.graph.exists_arc(tail, head) {
            return Ok(());
        }

        self.graph.add_arc(tail, head)?;

        let var = self.variable(tail)?.clone();
        let added = match self.cims.get_mut(&head) {
            Some(cim) => cim.add(var),
            None => Err(CtbnError::NotFound(format!("node {}", head)))
        };

        if let Err(e) = added {
            self.graph.erase_arc(tail, head)?;
            return Err(e);
        }

        Ok(())
    }

    /// Remove the arc ```tail -> head``` and the parent dimension it stands for.
    ///
    /// # Errors
    /// * `CtbnError::NotFound` if one of the ends does not exist
    /// * `CtbnError::InvalidArgument` if `tail` is not a parent of `head`
    pub fn erase_arc<T: NodeKey, H: NodeKey>(&mut self, tail: T, head: H) -> Result<()> {
        let tail = tail.node_id(self)?;
        let head = head.node_id(self)?;
        let name = self.name(tail)?.to_string();

        let cim = self.cim_mut(head)?;
        if ! cim.parents().contains(&name) {
            return Err(CtbnError::InvalidArgument(format!("{} is not a parent of node {}", name, head)));
        }

        cim.remove(&name)?;
        self.graph.erase_arc(tail, head)
    }

    /// The id of a node
    pub fn node<K: NodeKey>(&self, key: K) -> Result<NodeId> {
        key.node_id(self)
    }

    /// The name of a node
    pub fn name<K: NodeKey>(&self, key: K) -> Result<&str> {
        let id = key.node_id(self)?;
        self.names
            .get_by_first(&id)
            .map(|n| n.as_str())
            .ok_or_else(|| CtbnError::NotFound(format!("node {}", id)))
    }

    pub fn variable<K: NodeKey>(&self, key: K) -> Result<&DiscreteVariable> {
        let id = key.node_id(self)?;
        self.variables.get(&id).ok_or_else(|| CtbnError::NotFound(format!("node {}", id)))
    }

    pub fn cim<K: NodeKey>(&self, key: K) -> Result<&Cim> {
        let id = key.node_id(self)?;
        self.cims.get(&id).ok_or_else(|| CtbnError::NotFound(format!("node {}", id)))
    }

    /// A mutable view of the `Cim` of a node. The parent dimensions must be changed through
    /// `add_arc` and `erase_arc` only.
    pub fn cim_mut<K: NodeKey>(&mut self, key: K) -> Result<&mut Cim> {
        let id = key.node_id(self)?;
        self.cims.get_mut(&id).ok_or_else(|| CtbnError::NotFound(format!("node {}", id)))
    }

    pub fn labels<K: NodeKey>(&self, key: K) -> Result<&[String]> {
        Ok(self.variable(key)?.labels())
    }

    pub fn parents<K: NodeKey>(&self, key: K) -> Result<Vec<NodeId>> {
        self.graph.parents(key.node_id(self)?)
    }

    pub fn children<K: NodeKey>(&self, key: K) -> Result<Vec<NodeId>> {
        self.graph.children(key.node_id(self)?)
    }

    /// The names of the parents of a node, in the dimension order of its `Cim`
    pub fn parent_names<K: NodeKey>(&self, key: K) -> Result<Vec<String>> {
        Ok(self.cim(key)?
               .variables()
               .iter()
               .map(|v| v.name())
               .filter(|n| Cim::is_parent(n))
               .map(String::from)
               .collect())
    }

    /// The node ids, in insertion order
    pub fn nodes(&self) -> Vec<NodeId> {
        self.variables.keys().cloned().collect()
    }

    /// The node names, in insertion order
    pub fn names(&self) -> Vec<&str> {
        self.variables.values().map(|v| v.name()).collect()
    }

    /// The node variables, in insertion order
    pub fn variables(&self) -> Vec<&DiscreteVariable> {
        self.variables.values().collect()
    }

    pub fn arcs(&self) -> Vec<(NodeId, NodeId)> {
        self.graph.arcs()
    }

    pub fn exists_arc<T: NodeKey, H: NodeKey>(&self, tail: T, head: H) -> Result<bool> {
        Ok(self.graph.exists_arc(tail.node_id(self)?, head.node_id(self)?))
    }

    /// The number of nodes
    pub fn size(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// An instantiation of every node variable, all in their first state
    pub fn complete_instantiation(&self) -> Instantiation {
        let mut inst = Instantiation::new();
        for v in self.variables.values() {
            inst.set(v.name(), 0);
        }
        inst
    }

    /// An instantiation of every node variable and of its from/to pair, all in their first state
    pub fn full_instantiation(&self) -> Instantiation {
        let mut inst = self.complete_instantiation();
        for v in self.variables.values() {
            inst.set(&Cim::var_i(v.name()), 0);
            inst.set(&Cim::var_j(v.name()), 0);
        }
        inst
    }

    /// The persisted form of this `Ctbn`
    pub fn state(&self) -> CtbnState {
        let mut parents = IndexMap::new();
        let mut cim = IndexMap::new();

        for (id, var) in self.variables.iter() {
            if let Some(c) = self.cims.get(id) {
                let ps = c.variables()
                          .iter()
                          .map(|v| v.name())
                          .filter(|n| Cim::is_parent(n))
                          .map(String::from)
                          .collect();
                parents.insert(var.name().to_string(), ps);
                cim.insert(var.name().to_string(), c.to_vec());
            }
        }

        CtbnState {
            nodes: self.variables.values().map(|v| v.to_fast_spec()).collect(),
            parents,
            cim
        }
    }

    /// Rebuild a `Ctbn` from its persisted form. Nodes are added in the stored order, then the
    /// arcs of every node are replayed in the stored order, then the `Cim`s are filled.
    pub fn from_state(state: &CtbnState) -> Result<Self> {
        let mut model = Ctbn::new();

        for spec in state.nodes.iter() {
            model.add(DiscreteVariable::from_fast_spec(spec)?)?;
        }

        for (head, parents) in state.parents.iter() {
            for tail in parents {
                model.add_arc(tail.as_str(), head.as_str())?;
            }
        }

        for (name, values) in state.cim.iter() {
            model.cim_mut(name.as_str())?.fill_from(values)?;
        }

        Ok(model)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.state())?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let state: CtbnState = serde_json::from_str(json)?;
        Ctbn::from_state(&state)
    }

}


impl Clone for Ctbn {

    fn clone(&self) -> Self {
        let mut names = BidirMap::new();
        for (id, var) in self.variables.iter() {
            names.insert(*id, var.name().to_string());
        }

        Ctbn {
            graph: self.graph.clone(),
            variables: self.variables.clone(),
            cims: self.cims.clone(),
            names
        }
    }

}


impl fmt::Debug for Ctbn {

    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Ctbn")
         .field("variables", &self.variables)
         .field("arcs", &self.graph.arcs())
         .field("cims", &self.cims)
         .finish()
    }

}


/// An implementation of the [builder pattern] for creating a `Ctbn`.
///
/// The first error raised while building is kept and returned by `build`. The `Cim`
/// initializations are applied once every arc is in place.
///
/// [builder pattern]: https://en.wikipedia.org/wiki/Builder_pattern
pub struct CtbnBuilder<'a> {

    /// The network being built
    model: Ctbn,

    /// The pending initializations, by variable name
    inits: Vec<(String, Initialization<'a>)>,

    /// The error state of the builder
    err: Option<CtbnError>

}


impl<'a> Default for CtbnBuilder<'a> {

    fn default() -> Self {
        CtbnBuilder::new()
    }

}


impl<'a> CtbnBuilder<'a> {

    /// Construct a new `CtbnBuilder` representing an empty `Ctbn`
    pub fn new() -> Self {
        CtbnBuilder { model: Ctbn::new(), inits: Vec::new(), err: None }
    }

    /// Add a variable to the `Ctbn`
    pub fn with_variable(mut self, var: DiscreteVariable) -> Self {
        if self.err.is_none() {
            if let Err(e) = self.model.add(var) {
                self.err = Some(e);
            }
        }
        self
    }

    /// Add the arc ```tail -> head```. Both variables must already be in the `Ctbn`.
    pub fn with_arc(mut self, tail: &str, head: &str) -> Self {
        if self.err.is_none() {
            if let Err(e) = self.model.add_arc(tail, head) {
                self.err = Some(e);
            }
        }
        self
    }

    /// Initialize the `Cim` of `name`
    pub fn with_cim(mut self, name: &str, init: Initialization<'a>) -> Self {
        self.inits.push((String::from(name), init));
        self
    }

    /// Complete building the model, drawing random rates from the thread RNG.
    ///
    /// # Postcondition
    /// This call consumes the `CtbnBuilder`
    pub fn build(self) -> Result<Ctbn> {
        self.build_using(&mut thread_rng())
    }

    /// Complete building the model
    pub fn build_using<R: Rng + ?Sized>(self, rng: &mut R) -> Result<Ctbn> {
        if let Some(e) = self.err {
            return Err(e);
        }

        let mut model = self.model;
        for (name, init) in self.inits {
            init.build_using(model.cim_mut(name.as_str())?, rng)?;
        }

        Ok(model)
    }

}
