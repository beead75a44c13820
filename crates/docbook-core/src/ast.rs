//! The source document tree handed to the converter.

use std::fmt;

use serde::Serialize;

/// One node of the parsed source document.
///
/// The tree is owned top-down and rooted at a single [`NodeKind::Document`].
#[derive(Clone, Debug, PartialEq)]
pub struct SourceNode {
    pub kind: NodeKind,
    pub children: Vec<SourceNode>,
}

impl SourceNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    pub fn with_children(kind: NodeKind, children: Vec<SourceNode>) -> Self {
        Self { kind, children }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::new(NodeKind::Text {
            content: content.into(),
        })
    }

    /// Concatenated text of every `Text` descendant, in document order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// True for a `Text` node holding only whitespace.
    pub fn is_blank_text(&self) -> bool {
        match &self.kind {
            NodeKind::Text { content } => content.trim().is_empty(),
            _ => false,
        }
    }

    pub(crate) fn first_child_of(&self, pred: impl Fn(&NodeKind) -> bool) -> Option<usize> {
        self.children.iter().position(|child| pred(&child.kind))
    }
}

fn collect_text(node: &SourceNode, out: &mut String) {
    if let NodeKind::Text { content } = &node.kind {
        out.push_str(content);
    }
    for child in &node.children {
        collect_text(child, out);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Document,
    Section {
        level: u8,
        id: Option<String>,
    },
    /// A titled block set apart from the running text; converted like a section.
    Topic {
        id: Option<String>,
    },
    Title,
    Subtitle,
    Paragraph,
    List {
        ordered: bool,
    },
    ListItem,
    DefinitionList,
    DefinitionItem,
    Term,
    Definition,
    Table,
    TableRow {
        header: bool,
    },
    TableCell,
    Literal {
        kind: LiteralKind,
        language: Option<String>,
    },
    BlockQuote,
    Admonition {
        kind: String,
    },
    /// `change` is one of `versionadded`, `versionchanged`, `deprecated`, `versionremoved`.
    VersionModified {
        change: String,
        version: String,
    },
    Glossary {
        id: Option<String>,
    },
    GlossaryEntry {
        id: Option<String>,
    },
    FieldList,
    Field {
        name: String,
    },
    Emphasis,
    Strong,
    InlineLiteral,
    Subscript,
    Superscript,
    TitleReference,
    Reference {
        target: String,
    },
    /// A use of a glossary term; `target` names the entry.
    TermReference {
        target: String,
    },
    Anchor {
        id: String,
    },
    Image {
        uri: String,
        alt: Option<String>,
        align: Option<String>,
        scale: Option<String>,
    },
    Figure,
    Caption,
    Comment,
    Text {
        content: String,
    },
    /// A node kind the converter has no mapping for; `name` is the kind as the host spelled it.
    Unknown {
        name: String,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LiteralKind {
    /// Source code; becomes `programlisting`.
    Code,
    /// Line-preserving prose (line blocks, addresses); becomes `literallayout`.
    Lines,
}

/// Where a node kind may appear in the source tree.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Placement {
    Block,
    Inline,
    Any,
}

impl NodeKind {
    pub fn name(&self) -> &str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Section { .. } => "section",
            NodeKind::Topic { .. } => "topic",
            NodeKind::Title => "title",
            NodeKind::Subtitle => "subtitle",
            NodeKind::Paragraph => "paragraph",
            NodeKind::List { .. } => "list",
            NodeKind::ListItem => "list_item",
            NodeKind::DefinitionList => "definition_list",
            NodeKind::DefinitionItem => "definition_item",
            NodeKind::Term => "term",
            NodeKind::Definition => "definition",
            NodeKind::Table => "table",
            NodeKind::TableRow { .. } => "table_row",
            NodeKind::TableCell => "table_cell",
            NodeKind::Literal { .. } => "literal",
            NodeKind::BlockQuote => "block_quote",
            NodeKind::Admonition { .. } => "admonition",
            NodeKind::VersionModified { .. } => "version_modified",
            NodeKind::Glossary { .. } => "glossary",
            NodeKind::GlossaryEntry { .. } => "glossary_entry",
            NodeKind::FieldList => "field_list",
            NodeKind::Field { .. } => "field",
            NodeKind::Emphasis => "emphasis",
            NodeKind::Strong => "strong",
            NodeKind::InlineLiteral => "inline_literal",
            NodeKind::Subscript => "subscript",
            NodeKind::Superscript => "superscript",
            NodeKind::TitleReference => "title_reference",
            NodeKind::Reference { .. } => "reference",
            NodeKind::TermReference { .. } => "term_reference",
            NodeKind::Anchor { .. } => "anchor",
            NodeKind::Image { .. } => "image",
            NodeKind::Figure => "figure",
            NodeKind::Caption => "caption",
            NodeKind::Comment => "comment",
            NodeKind::Text { .. } => "text",
            NodeKind::Unknown { name } => name,
        }
    }

    pub fn placement(&self) -> Placement {
        match self {
            NodeKind::Text { .. }
            | NodeKind::Emphasis
            | NodeKind::Strong
            | NodeKind::InlineLiteral
            | NodeKind::Subscript
            | NodeKind::Superscript
            | NodeKind::TitleReference
            | NodeKind::Reference { .. }
            | NodeKind::TermReference { .. } => Placement::Inline,
            NodeKind::Anchor { .. }
            | NodeKind::Image { .. }
            | NodeKind::Comment
            | NodeKind::Unknown { .. } => Placement::Any,
            _ => Placement::Block,
        }
    }

    pub fn is_inline(&self) -> bool {
        self.placement() == Placement::Inline
    }
}

/// Child indices leading from the Document node to a node.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize)]
#[serde(transparent)]
pub struct NodePath(pub Vec<usize>);

impl NodePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn child(&self, index: usize) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        Self(path)
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for index in &self.0 {
            write!(f, "/{}", index)?;
        }
        Ok(())
    }
}

/// For an Anchor at `index`, returns the Section or Topic sibling it names, if
/// the anchor sits directly before one that has no id of its own.
pub(crate) fn promoted_section(siblings: &[SourceNode], index: usize) -> Option<&SourceNode> {
    if !matches!(siblings.get(index)?.kind, NodeKind::Anchor { .. }) {
        return None;
    }
    let next = siblings.get(index + 1)?;
    match &next.kind {
        NodeKind::Section { id: None, .. } | NodeKind::Topic { id: None } => Some(next),
        _ => None,
    }
}

/// Index of a field list that opens a section body, ahead of any content other
/// than its title, subtitle and comments. Its fields become section metadata.
pub(crate) fn leading_field_list(children: &[SourceNode]) -> Option<usize> {
    for (index, child) in children.iter().enumerate() {
        match child.kind {
            NodeKind::FieldList => return Some(index),
            NodeKind::Title | NodeKind::Subtitle | NodeKind::Comment => {}
            _ if child.is_blank_text() => {}
            _ => return None,
        }
    }
    None
}
