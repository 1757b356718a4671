//! # Search Tree
//!
//! The tree is an arena: nodes live in one `Vec` and refer to each other by
//! [`NodeId`]. Children are owned through the parent's edge list; the parent
//! link is a plain index, read only for the exploration term and for the
//! backpropagation walk.
//!
//! Edge lists keep insertion order, which makes PUCT tie-breaking deterministic:
//! the first child with the maximal score wins.

use std::collections::VecDeque;

use crate::policy::ActionProb;
use crate::Action;

/// Index of a node inside its [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Statistics for one node of the search tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    parent: Option<NodeId>,
    children: Vec<(Action, NodeId)>,
    n_visits: u32,
    q: f32,
    p: f32,
    virtual_loss: u32,
}

impl TreeNode {
    fn new(parent: Option<NodeId>, prior: f32) -> Self {
        Self {
            parent,
            children: Vec::new(),
            n_visits: 0,
            q: 0.0,
            p: prior,
            virtual_loss: 0,
        }
    }

    pub fn visits(&self) -> u32 {
        self.n_visits
    }

    /// Running mean of every value this node was updated with.
    pub fn q(&self) -> f32 {
        self.q
    }

    pub fn prior(&self) -> f32 {
        self.p
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// `(action, child)` edges in expansion order.
    pub fn children(&self) -> &[(Action, NodeId)] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Folds one more value into the running mean.
    pub fn update(&mut self, value: f32) {
        self.q += (value - self.q) / (self.n_visits + 1) as f32;
        self.n_visits += 1;
    }

    /// PUCT score: `Q + c·P·sqrt(parent_visits) / (1 + n)`.
    ///
    /// Pending virtual losses count as visits that returned -1.
    pub fn puct_value(&self, c_puct: f32, parent_visits: u32) -> f32 {
        let visits = self.n_visits + self.virtual_loss;
        let q = if self.virtual_loss == 0 || visits == 0 {
            self.q
        } else {
            (self.q * self.n_visits as f32 - self.virtual_loss as f32) / visits as f32
        };
        let u = c_puct * self.p * (parent_visits as f32).sqrt() / (1 + visits) as f32;
        q + u
    }
}

/// Arena-backed search tree.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<TreeNode>,
    root: NodeId,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// A tree holding a single root with prior 1.
    pub fn new() -> Self {
        Self {
            nodes: vec![TreeNode::new(None, 1.0)],
            root: NodeId(0),
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.index()]
    }

    #[inline]
    fn get_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self.nodes[id.index()]
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Child reached from `node` by `action`, if it was expanded.
    pub fn child(&self, node: NodeId, action: Action) -> Option<NodeId> {
        self.get(node)
            .children
            .iter()
            .find(|(a, _)| *a == action)
            .map(|(_, id)| *id)
    }

    /// Adds one child per prior whose action is not already a child.
    pub fn expand(&mut self, node: NodeId, priors: &[ActionProb]) {
        for prior in priors {
            if self.child(node, prior.action).is_some() {
                continue;
            }
            let id = NodeId(self.nodes.len() as u32);
            self.nodes.push(TreeNode::new(Some(node), prior.prob));
            self.get_mut(node).children.push((prior.action, id));
        }
    }

    /// The child maximizing the PUCT score, first maximum on ties.
    pub fn select(&self, node: NodeId, c_puct: f32) -> Option<(Action, NodeId)> {
        let parent = self.get(node);
        let parent_visits = parent.n_visits + parent.virtual_loss;
        let mut best = None;
        let mut best_value = f32::NEG_INFINITY;
        for &(action, child) in &parent.children {
            let value = self.get(child).puct_value(c_puct, parent_visits);
            if best.is_none() || value > best_value {
                best = Some((action, child));
                best_value = value;
            }
        }
        best
    }

    pub fn update(&mut self, node: NodeId, value: f32) {
        self.get_mut(node).update(value);
    }

    /// Updates `node` with `value`, then every ancestor with the sign flipped
    /// once per level.
    pub fn update_recursive(&mut self, node: NodeId, value: f32) {
        let mut current = Some(node);
        let mut value = value;
        while let Some(id) = current {
            let node = self.get_mut(id);
            node.update(value);
            value = -value;
            current = node.parent;
        }
    }

    /// Marks `node` and its ancestors as crossed by an in-flight playout.
    pub fn add_virtual_loss(&mut self, node: NodeId, amount: u32) {
        let mut current = Some(node);
        while let Some(id) = current {
            let node = self.get_mut(id);
            node.virtual_loss += amount;
            current = node.parent;
        }
    }

    /// Undoes [`Tree::add_virtual_loss`] for the same node and amount.
    pub fn revert_virtual_loss(&mut self, node: NodeId, amount: u32) {
        let mut current = Some(node);
        while let Some(id) = current {
            let node = self.get_mut(id);
            node.virtual_loss = node.virtual_loss.saturating_sub(amount);
            current = node.parent;
        }
    }

    /// Makes the root's child for `action` the new root, dropping every other
    /// subtree. Returns false, and resets to a fresh root, when that child
    /// does not exist.
    pub fn promote(&mut self, action: Action) -> bool {
        let Some(new_root) = self.child(self.root, action) else {
            self.reset();
            return false;
        };

        // Copy the surviving subtree breadth-first into a fresh arena.
        let mut old = std::mem::take(&mut self.nodes);
        let mut nodes: Vec<TreeNode> = Vec::new();
        let mut queue: VecDeque<(NodeId, Option<(NodeId, Action)>)> = VecDeque::new();
        queue.push_back((new_root, None));

        while let Some((old_id, link)) = queue.pop_front() {
            let id = NodeId(nodes.len() as u32);
            let source = &mut old[old_id.index()];
            let kids = std::mem::take(&mut source.children);
            nodes.push(TreeNode {
                parent: link.map(|(parent, _)| parent),
                children: Vec::with_capacity(kids.len()),
                n_visits: source.n_visits,
                q: source.q,
                p: source.p,
                virtual_loss: 0,
            });
            if let Some((parent, edge)) = link {
                nodes[parent.index()].children.push((edge, id));
            }
            for (edge, kid) in kids {
                queue.push_back((kid, Some((id, edge))));
            }
        }

        self.nodes = nodes;
        self.root = NodeId(0);
        true
    }

    /// Discards the whole tree and starts from a fresh root with prior 1.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.nodes.push(TreeNode::new(None, 1.0));
        self.root = NodeId(0);
    }
}
