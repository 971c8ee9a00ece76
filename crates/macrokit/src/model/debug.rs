//! Text rendering of a tree for debug logs.
//!
//! ```
//! use macrokit::model::{ItemDto, Tree, TreeDebug, TreeFormatOptions};
//!
//! let tree = Tree::new("t", "Demo");
//! tree.add_item(ItemDto::group("Login"), None, -1).unwrap();
//!
//! let text = TreeDebug::with_options(TreeFormatOptions::minimal()).format(&tree.to_dict());
//! assert!(text.contains("Login"));
//! ```

use std::fmt::{self, Write};

use super::action::NodeType;
use super::data::TreeData;
use super::id::ItemId;

/// Style of tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// One dash per level, no branch lines.
    Compact,
}

/// Configuration for tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    pub style: TreeStyle,
    /// Whether to append item ids.
    pub show_ids: bool,
    /// Whether to append node types and actions.
    pub show_types: bool,
    /// Maximum depth to render (None for unlimited).
    pub max_depth: Option<usize>,
    /// Indent size for each level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: true,
            show_types: true,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Names only.
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            show_types: false,
            ..Default::default()
        }
    }
}

/// Renders tree snapshots as indented text.
#[derive(Debug, Clone, Default)]
pub struct TreeDebug {
    options: TreeFormatOptions,
}

impl TreeDebug {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Renders the whole snapshot, headed by the tree's name and size.
    pub fn format(&self, data: &TreeData) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "{} ({} items):", data.name, data.item_count());
        let top = data.get(&data.root_id).map(|root| root.children_ids()).unwrap_or_default();
        if top.is_empty() {
            output.push_str("  (empty)\n");
        }
        let count = top.len();
        for (i, id) in top.iter().enumerate() {
            self.format_into(data, id, 1, i + 1 == count, &mut output);
        }
        output
    }

    /// Renders the subtree rooted at `id`.
    pub fn format_subtree(&self, data: &TreeData, id: &ItemId) -> String {
        let mut output = String::new();
        self.format_into(data, id, 0, true, &mut output);
        output
    }

    fn format_into(&self, data: &TreeData, id: &ItemId, depth: usize, is_last: bool, output: &mut String) {
        if self.options.max_depth.is_some_and(|max| depth > max) {
            return;
        }
        let Some(item) = data.get(id) else {
            return;
        };

        output.push_str(&self.build_prefix(depth, is_last));
        output.push_str(if item.name().is_empty() { "(unnamed)" } else { item.name() });

        if self.options.show_ids {
            let _ = write!(output, " [{id}]");
        }
        if self.options.show_types {
            match (item.node_type(), item.domain().action) {
                (Some(NodeType::Instruction), Some(action)) => {
                    let _ = write!(output, " (instruction: {action:?})");
                }
                (Some(NodeType::Instruction), None) => output.push_str(" (instruction)"),
                (Some(NodeType::Group), _) => output.push_str(" (group)"),
                (None, _) => {}
            }
        }
        if !item.is_visible() {
            output.push_str(" <hidden>");
        }
        output.push('\n');

        let count = item.children_ids().len();
        for (i, child) in item.children_ids().iter().enumerate() {
            self.format_into(data, child, depth + 1, i + 1 == count, output);
        }
    }

    fn build_prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }

        let (branch, corner, last) = match self.options.style {
            TreeStyle::Ascii => ("|", "+-- ", "`-- "),
            TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500} ", "\u{2514}\u{2500}\u{2500} "),
            TreeStyle::Compact => ("", "- ", "- "),
        };

        let mut prefix = String::new();
        for _ in 0..(depth - 1) {
            prefix.push_str(branch);
            prefix.extend(std::iter::repeat_n(' ', self.options.indent_size));
        }
        prefix.push_str(if is_last { last } else { corner });
        prefix
    }
}

/// Displays a snapshot with default options.
pub struct DisplayTree<'a>(pub &'a TreeData);

impl fmt::Display for DisplayTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&TreeDebug::new().format(self.0))
    }
}
