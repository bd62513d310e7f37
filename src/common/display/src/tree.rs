//! Tree display utilities for query plans.

use std::fmt;

/// A node in a display tree.
pub trait TreeNode {
    /// Get the display name of this node.
    fn name(&self) -> &str;

    /// Get child nodes.
    fn children(&self) -> Vec<&dyn TreeNode>;

    /// Get additional details to display.
    fn details(&self) -> Option<String> {
        None
    }
}

/// Owned tree node, for callers whose labels are computed on the fly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayNode {
    /// Node label.
    pub name: String,
    /// Parenthesized details printed after the label.
    pub details: Option<String>,
    /// Child nodes in display order.
    pub children: Vec<DisplayNode>,
}

impl DisplayNode {
    /// Create a leaf node.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            details: None,
            children: Vec::new(),
        }
    }

    /// Attach details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Append a child.
    pub fn with_child(mut self, child: DisplayNode) -> Self {
        self.children.push(child);
        self
    }
}

impl TreeNode for DisplayNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn children(&self) -> Vec<&dyn TreeNode> {
        self.children.iter().map(|c| c as &dyn TreeNode).collect()
    }

    fn details(&self) -> Option<String> {
        self.details.clone()
    }
}

/// Helper for displaying tree structures.
pub struct DisplayTree<'a> {
    root: &'a dyn TreeNode,
}

impl<'a> DisplayTree<'a> {
    /// Create a new display tree.
    pub fn new(root: &'a dyn TreeNode) -> Self {
        Self { root }
    }

    fn write_label(f: &mut fmt::Formatter<'_>, node: &dyn TreeNode) -> fmt::Result {
        write!(f, "{}", node.name())?;
        if let Some(details) = node.details() {
            write!(f, " ({details})")?;
        }
        writeln!(f)
    }

    fn fmt_node(
        f: &mut fmt::Formatter<'_>,
        node: &dyn TreeNode,
        prefix: &str,
        is_last: bool,
    ) -> fmt::Result {
        let connector = if is_last { "└─ " } else { "├─ " };
        write!(f, "{prefix}{connector}")?;
        Self::write_label(f, node)?;

        let children = node.children();
        let child_prefix = format!("{prefix}{}", if is_last { "   " } else { "│  " });

        for (i, child) in children.iter().enumerate() {
            Self::fmt_node(f, *child, &child_prefix, i == children.len() - 1)?;
        }

        Ok(())
    }
}

impl fmt::Display for DisplayTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Self::write_label(f, self.root)?;

        let children = self.root.children();
        for (i, child) in children.iter().enumerate() {
            Self::fmt_node(f, *child, "", i == children.len() - 1)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_tree() {
        let tree = DisplayNode::new("Filter")
            .with_details("$0 > 5")
            .with_child(DisplayNode::new("Scan").with_details("orders"));

        let output = DisplayTree::new(&tree).to_string();
        assert_eq!(output, "Filter ($0 > 5)\n└─ Scan (orders)\n");
    }

    #[test]
    fn test_display_tree_siblings() {
        let tree = DisplayNode::new("Union")
            .with_child(DisplayNode::new("Left").with_child(DisplayNode::new("Leaf")))
            .with_child(DisplayNode::new("Right"));

        let output = DisplayTree::new(&tree).to_string();
        assert_eq!(output, "Union\n├─ Left\n│  └─ Leaf\n└─ Right\n");
    }
}
