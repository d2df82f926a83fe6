//! Requirement Trees
//!
//! Framework hierarchies are built once at catalog load into an arena:
//! each node owns the indices of its children, leaves are collected in
//! declaration order, and ids resolve through a single hash lookup.
//! Nothing re-derives parentage from dotted strings at query time.

use grc_common::{GrcError, GrcResult, RequirementId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Requirement as declared in a catalog feed (nested form)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementDef {
    pub id: RequirementId,
    pub title: String,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub children: Vec<RequirementDef>,
}

fn default_required() -> bool {
    true
}

/// Node of a requirement tree
#[derive(Debug, Clone)]
pub struct RequirementNode {
    pub id: RequirementId,
    pub title: String,
    /// Nesting depth, roots are level 1
    pub level: usize,
    /// Required vs. addressable
    pub required: bool,
    /// Grouping node created only because a descendant referenced its path
    pub implicit: bool,
    parent: Option<usize>,
    children: Vec<usize>,
}

impl RequirementNode {
    /// Leaves are the only assessable requirements
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Explicit requirement hierarchy for one framework
#[derive(Debug, Clone, Default)]
pub struct RequirementTree {
    nodes: Vec<RequirementNode>,
    roots: Vec<usize>,
    index: HashMap<RequirementId, usize>,
    leaves: Vec<usize>,
}

impl RequirementTree {
    /// Build from a nested feed.
    ///
    /// Every child's dotted parent path must equal its enclosing node's id.
    pub fn from_nodes(defs: Vec<RequirementDef>) -> GrcResult<Self> {
        let mut tree = Self::default();
        for def in defs {
            tree.insert_nested(def, None)?;
        }
        tree.collect_leaves();
        Ok(tree)
    }

    /// Build from a flat list of `(id, title, required)` in declaration order.
    ///
    /// Missing ancestors are created as implicit grouping nodes.
    pub fn from_paths<I, S>(defs: I) -> GrcResult<Self>
    where
        I: IntoIterator<Item = (S, S, bool)>,
        S: Into<String>,
    {
        let mut tree = Self::default();
        for (id, title, required) in defs {
            let id = RequirementId::new(id);
            let title = title.into();

            if let Some(&existing) = tree.index.get(&id) {
                let node = &mut tree.nodes[existing];
                if !node.implicit {
                    return Err(GrcError::InvalidCatalog(format!("duplicate requirement {}", id)));
                }
                node.title = title;
                node.required = required;
                node.implicit = false;
                continue;
            }

            let parent = match id.parent() {
                Some(parent_id) => Some(tree.ensure_path(parent_id)),
                None => None,
            };
            tree.push_node(id, title, required, false, parent);
        }
        tree.collect_leaves();
        Ok(tree)
    }

    fn insert_nested(&mut self, def: RequirementDef, parent: Option<usize>) -> GrcResult<usize> {
        if self.index.contains_key(&def.id) {
            return Err(GrcError::InvalidCatalog(format!("duplicate requirement {}", def.id)));
        }
        if let Some(parent_idx) = parent {
            let expected = &self.nodes[parent_idx].id;
            if def.id.parent().as_ref() != Some(expected) {
                return Err(GrcError::InvalidCatalog(format!(
                    "requirement {} is nested under {} but its path names a different parent",
                    def.id, expected
                )));
            }
        }

        let idx = self.push_node(def.id, def.title, def.required, false, parent);
        for child in def.children {
            self.insert_nested(child, Some(idx))?;
        }
        Ok(idx)
    }

    /// Index of the node at `id`, creating it and its ancestors if missing
    fn ensure_path(&mut self, id: RequirementId) -> usize {
        if let Some(&idx) = self.index.get(&id) {
            return idx;
        }
        let parent = match id.parent() {
            Some(parent_id) => Some(self.ensure_path(parent_id)),
            None => None,
        };
        let title = id.to_string();
        self.push_node(id, title, true, true, parent)
    }

    fn push_node(
        &mut self,
        id: RequirementId,
        title: String,
        required: bool,
        implicit: bool,
        parent: Option<usize>,
    ) -> usize {
        let idx = self.nodes.len();
        let level = parent.map_or(1, |p| self.nodes[p].level + 1);
        self.index.insert(id.clone(), idx);
        self.nodes.push(RequirementNode {
            id,
            title,
            level,
            required,
            implicit,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(p) => self.nodes[p].children.push(idx),
            None => self.roots.push(idx),
        }
        idx
    }

    fn collect_leaves(&mut self) {
        let mut leaves = Vec::new();
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if node.is_leaf() {
                leaves.push(idx);
            } else {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        self.leaves = leaves;
    }

    /// Node by id
    pub fn get(&self, id: &str) -> Option<&RequirementNode> {
        self.index.get(id).map(|&idx| &self.nodes[idx])
    }

    /// Leaf by id (`None` for grouping nodes and unknown ids)
    pub fn leaf(&self, id: &str) -> Option<&RequirementNode> {
        self.get(id).filter(|node| node.is_leaf())
    }

    /// Whether `id` names an assessable leaf
    pub fn is_leaf(&self, id: &str) -> bool {
        self.leaf(id).is_some()
    }

    /// Leaves in declaration order (depth-first)
    pub fn leaves(&self) -> impl Iterator<Item = &RequirementNode> + '_ {
        self.leaves.iter().map(move |&idx| &self.nodes[idx])
    }

    /// Leaf ids in declaration order
    pub fn leaf_ids(&self) -> Vec<RequirementId> {
        self.leaves().map(|node| node.id.clone()).collect()
    }

    /// Number of leaves
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Total number of nodes, implicit ones included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root nodes in declaration order
    pub fn roots(&self) -> impl Iterator<Item = &RequirementNode> + '_ {
        self.roots.iter().map(move |&idx| &self.nodes[idx])
    }

    /// Parent node
    pub fn parent(&self, id: &str) -> Option<&RequirementNode> {
        self.get(id)
            .and_then(|node| node.parent)
            .map(|idx| &self.nodes[idx])
    }

    /// Direct children
    pub fn children(&self, id: &str) -> Vec<&RequirementNode> {
        self.get(id)
            .map(|node| node.children.iter().map(|&idx| &self.nodes[idx]).collect())
            .unwrap_or_default()
    }

    /// Ancestors of `id`, root first
    pub fn ancestors(&self, id: &str) -> Vec<&RequirementNode> {
        let mut chain = Vec::new();
        let mut current = self.index.get(id).and_then(|&idx| self.nodes[idx].parent);
        while let Some(idx) = current {
            chain.push(&self.nodes[idx]);
            current = self.nodes[idx].parent;
        }
        chain.reverse();
        chain
    }

    /// Leaves under `id` in declaration order (the node itself if it is a leaf)
    pub fn descendant_leaves(&self, id: &str) -> Vec<&RequirementNode> {
        let Some(&start) = self.index.get(id) else {
            return Vec::new();
        };
        let mut found = Vec::new();
        let mut stack = vec![start];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if node.is_leaf() {
                found.push(node);
            } else {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        found
    }
}
