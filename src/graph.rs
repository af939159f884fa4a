//! A directed graph over integer node ids.
//!
//! Cycles are allowed: the dependency graph of a continuous-time network may contain loops.

use crate::util::{CtbnError, Result};

use indexmap::{IndexMap, IndexSet};


/// The identifier of a node. Ids are never reused, even after the node is gone.
pub type NodeId = usize;


/// A directed graph. The parents and children of a node are kept in insertion order.
#[derive(Clone, Debug, Default)]
pub struct DiGraph {

    /// The parents of each node
    parents: IndexMap<NodeId, IndexSet<NodeId>>,

    /// The children of each node
    children: IndexMap<NodeId, IndexSet<NodeId>>,

    /// The next id to hand out
    next_id: NodeId

}


impl DiGraph {

    pub fn new() -> Self {
        DiGraph::default()
    }

    /// Add a node and return its id
    pub fn add_node(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        self.parents.insert(id, IndexSet::new());
        self.children.insert(id, IndexSet::new());
        id
    }

    pub fn exists_node(&self, id: NodeId) -> bool {
        self.parents.contains_key(&id)
    }

    fn check_node(&self, id: NodeId) -> Result<()> {
        if self.exists_node(id) {
            Ok(())
        } else {
            Err(CtbnError::NotFound(format!("node {}", id)))
        }
    }

    /// Add the arc `tail -> head`. Adding an existing arc does nothing.
    ///
    /// # Errors
    /// * `CtbnError::NotFound` if one of the ends is not a node
    /// * `CtbnError::InvalidArgument` if `tail == head`
    pub fn add_arc(&mut self, tail: NodeId, head: NodeId) -> Result<()> {
        self.check_node(tail)?;
        self.check_node(head)?;

        if tail == head {
            return Err(CtbnError::InvalidArgument(format!("self-loop on node {}", tail)));
        }

        if let Some(p) = self.parents.get_mut(&head) {
            p.insert(tail);
        }
        if let Some(c) = self.children.get_mut(&tail) {
            c.insert(head);
        }

        Ok(())
    }

    /// Remove the arc `tail -> head`
    ///
    /// # Errors
    /// * `CtbnError::NotFound` if the arc does not exist
    pub fn erase_arc(&mut self, tail: NodeId, head: NodeId) -> Result<()> {
        if ! self.exists_arc(tail, head) {
            return Err(CtbnError::NotFound(format!("arc {} -> {}", tail, head)));
        }

        if let Some(p) = self.parents.get_mut(&head) {
            p.shift_remove(&tail);
        }
        if let Some(c) = self.children.get_mut(&tail) {
            c.shift_remove(&head);
        }

        Ok(())
    }

    pub fn exists_arc(&self, tail: NodeId, head: NodeId) -> bool {
        self.parents.get(&head).map_or(false, |p| p.contains(&tail))
    }

    /// The parents of `id`, in the order the arcs were added
    pub fn parents(&self, id: NodeId) -> Result<Vec<NodeId>> {
        self.parents
            .get(&id)
            .map(|p| p.iter().cloned().collect())
            .ok_or_else(|| CtbnError::NotFound(format!("node {}", id)))
    }

    /// The children of `id`, in the order the arcs were added
    pub fn children(&self, id: NodeId) -> Result<Vec<NodeId>> {
        self.children
            .get(&id)
            .map(|c| c.iter().cloned().collect())
            .ok_or_else(|| CtbnError::NotFound(format!("node {}", id)))
    }

    /// The nodes, in insertion order
    pub fn nodes(&self) -> Vec<NodeId> {
        self.parents.keys().cloned().collect()
    }

    /// Every arc as `(tail, head)`, grouped by head
    pub fn arcs(&self) -> Vec<(NodeId, NodeId)> {
        self.parents
            .iter()
            .flat_map(|(&head, ps)| ps.iter().map(move |&tail| (tail, head)))
            .collect()
    }

    /// The number of nodes
    pub fn size(&self) -> usize {
        self.parents.len()
    }

    pub fn size_arcs(&self) -> usize {
        self.parents.values().map(|p| p.len()).sum()
    }

}
