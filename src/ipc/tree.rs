//! Snapshot types for the window manager's workspaces, outputs and layout tree.

use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl From<swayipc_async::Rect> for Rect {
    fn from(rect: swayipc_async::Rect) -> Self {
        Self {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkspaceInfo {
    pub name: String,
    pub focused: bool,
    pub rect: Rect,
}

impl From<swayipc_async::Workspace> for WorkspaceInfo {
    fn from(ws: swayipc_async::Workspace) -> Self {
        Self {
            name: ws.name,
            focused: ws.focused,
            rect: ws.rect.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputInfo {
    pub name: String,
    pub active: bool,
    pub rect: Rect,
}

/// Output holding the scratchpad workspace
pub const PSEUDO_OUTPUT: &str = "__i3";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    Root,
    Output,
    Workspace,
    Con,
    FloatingCon,
    Other,
}

impl From<swayipc_async::NodeType> for NodeKind {
    fn from(kind: swayipc_async::NodeType) -> Self {
        use swayipc_async::NodeType;

        match kind {
            NodeType::Root => NodeKind::Root,
            NodeType::Output => NodeKind::Output,
            NodeType::Workspace => NodeKind::Workspace,
            NodeType::Con => NodeKind::Con,
            NodeType::FloatingCon => NodeKind::FloatingCon,
            _ => NodeKind::Other,
        }
    }
}

/// A container in the layout tree. Tiling children come before floating ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    pub id: i64,
    pub kind: NodeKind,
    pub name: Option<String>,
    pub marks: Vec<String>,
    pub rect: Rect,
    pub children: Vec<TreeNode>,
}

impl From<swayipc_async::Node> for TreeNode {
    fn from(node: swayipc_async::Node) -> Self {
        let children = node
            .nodes
            .into_iter()
            .chain(node.floating_nodes)
            .map(TreeNode::from)
            .collect();

        Self {
            id: node.id,
            kind: node.node_type.into(),
            name: node.name,
            marks: node.marks,
            rect: node.rect.into(),
            children,
        }
    }
}

impl TreeNode {
    /// Depth-first, pre-order search starting with `self`
    pub fn find<F>(&self, predicate: F) -> Option<&TreeNode>
    where
        F: Fn(&TreeNode) -> bool + Copy,
    {
        if predicate(self) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(predicate))
    }

    pub fn contains(&self, id: i64) -> bool {
        self.find(|node| node.id == id).is_some()
    }

    pub fn workspaces(&self) -> Vec<&TreeNode> {
        let mut found = Vec::new();
        self.collect_workspaces(&mut found);
        found
    }

    fn collect_workspaces<'a>(&'a self, found: &mut Vec<&'a TreeNode>) {
        if self.kind == NodeKind::Workspace {
            found.push(self);
        }
        for child in &self.children {
            child.collect_workspaces(found);
        }
    }

    /// The workspace node whose subtree holds the node `id`
    pub fn workspace_of(&self, id: i64) -> Option<&TreeNode> {
        self.workspaces().into_iter().find(|ws| ws.contains(id))
    }

    /// Real outputs in the tree. i3 and Sway put the scratchpad on a pseudo
    /// output named `__i3`, which is skipped.
    ///
    /// GET_OUTPUTS replies differ between i3 and Sway, the tree does not.
    pub fn outputs(&self) -> Vec<OutputInfo> {
        let mut found = Vec::new();
        self.collect_outputs(&mut found);
        found
    }

    fn collect_outputs(&self, found: &mut Vec<OutputInfo>) {
        if self.kind == NodeKind::Output {
            if let Some(name) = self.name.as_deref().filter(|n| *n != PSEUDO_OUTPUT) {
                found.push(OutputInfo {
                    name: name.to_string(),
                    active: true,
                    rect: self.rect,
                });
            }
            return;
        }
        for child in &self.children {
            child.collect_outputs(found);
        }
    }

    pub fn has_mark_matching(&self, pattern: &Regex) -> bool {
        self.marks.iter().any(|mark| pattern.is_match(mark))
    }

    pub fn find_marked(&self, pattern: &Regex) -> Option<&TreeNode> {
        self.find(|node| node.has_mark_matching(pattern))
    }
}
