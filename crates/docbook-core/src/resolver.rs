//! Anchor bookkeeping for one conversion: the table that maps anchor ids to
//! their definitions, and the pass that fills it before any element is built.

use std::collections::HashMap;

use thiserror::Error;

use crate::ast::{
    LiteralKind, NodeKind, NodePath, Placement, SourceNode, leading_field_list, promoted_section,
};
use crate::diagnostic::{Diagnostic, RelatedDiagnostic, W_ANCHOR_DUP};
use crate::error::StructureError;
use crate::label::{is_external_target, normalize_id};

/// Deepest source nesting accepted before conversion gives up.
pub const MAX_NESTING: usize = 256;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReferenceEntry {
    pub anchor_id: String,
    pub resolved_label: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ResolvedTarget {
    /// The target names an anchor of this document.
    CrossReference { id: String, label: Option<String> },
    /// The target is a URI pointing outside the document.
    External { uri: String },
    /// Nothing matched; the caller falls back to a raw `link`.
    Unresolved { raw: String },
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("anchor `{id}` is already defined at {previous}")]
pub struct DuplicateAnchorError {
    pub id: String,
    pub previous: NodePath,
}

#[derive(Clone, Debug)]
struct Registration {
    entry: ReferenceEntry,
    path: NodePath,
}

/// Anchor ids known to one conversion pass.
#[derive(Clone, Debug, Default)]
pub struct ReferenceTable {
    anchors: HashMap<String, Registration>,
    normalized: HashMap<String, String>,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `id` as defined at `path`. A second registration replaces the
    /// first and reports where the earlier one lived.
    pub fn register_anchor(
        &mut self,
        id: &str,
        label: Option<String>,
        path: NodePath,
    ) -> Result<(), DuplicateAnchorError> {
        let registration = Registration {
            entry: ReferenceEntry {
                anchor_id: id.to_string(),
                resolved_label: label,
            },
            path,
        };
        self.normalized.insert(normalize_id(id), id.to_string());
        match self.anchors.insert(id.to_string(), registration) {
            Some(previous) => Err(DuplicateAnchorError {
                id: id.to_string(),
                previous: previous.path,
            }),
            None => Ok(()),
        }
    }

    pub fn resolve_reference(&self, target: &str) -> ResolvedTarget {
        if let Some(entry) = self.lookup(target) {
            return ResolvedTarget::CrossReference {
                id: entry.anchor_id.clone(),
                label: entry.resolved_label.clone(),
            };
        }
        if is_external_target(target) {
            return ResolvedTarget::External {
                uri: target.trim().to_string(),
            };
        }
        ResolvedTarget::Unresolved {
            raw: target.to_string(),
        }
    }

    fn lookup(&self, target: &str) -> Option<&ReferenceEntry> {
        self.anchors
            .get(target)
            .or_else(|| {
                target
                    .strip_prefix('#')
                    .and_then(|stripped| self.anchors.get(stripped))
            })
            .or_else(|| {
                self.normalized
                    .get(&normalize_id(target))
                    .and_then(|id| self.anchors.get(id))
            })
            .map(|registration| &registration.entry)
    }

    pub fn get(&self, id: &str) -> Option<&ReferenceEntry> {
        self.anchors.get(id).map(|registration| &registration.entry)
    }

    /// True when the definition at `path` is the one that carries `id` in the output.
    pub fn owns(&self, id: &str, path: &NodePath) -> bool {
        self.anchors
            .get(id)
            .is_some_and(|registration| &registration.path == path)
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

/// First pass: registers every anchor and element id that reaches the output,
/// so that references anywhere in the document, including forward ones, can be
/// resolved. Ids inside subtrees the converter drops or flattens to text are
/// left out; references to them degrade to a plain `link`.
pub(crate) fn collect_anchors(
    document: &SourceNode,
    table: &mut ReferenceTable,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<(), StructureError> {
    collect_in(
        document,
        &NodePath::root(),
        Some(Context::Block),
        table,
        diagnostics,
    )
}

/// Where the converter places the children of a node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Context {
    Block,
    Inline,
    /// Direct children of a table: rows, or stray nodes given a row of their own.
    Table,
    /// Direct children of a table row.
    Row,
}

/// `context` is where `node` itself is placed; `None` once an ancestor has
/// been dropped. Dead subtrees are still walked for the nesting limit.
fn collect_in(
    node: &SourceNode,
    path: &NodePath,
    context: Option<Context>,
    table: &mut ReferenceTable,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<(), StructureError> {
    if path.depth() > MAX_NESTING {
        return Err(StructureError::NestingTooDeep {
            limit: MAX_NESTING,
            path: path.clone(),
        });
    }

    let inner = context.and_then(|_| child_context(&node.kind));
    // Folded into section metadata as plain text.
    let metadata = match node.kind {
        NodeKind::Section { .. } | NodeKind::Topic { .. } => leading_field_list(&node.children),
        _ => None,
    };
    for (index, child) in node.children.iter().enumerate() {
        let child_path = path.child(index);
        let live = inner
            .filter(|context| is_retained(&child.kind, *context))
            .filter(|_| metadata != Some(index));
        if live.is_some() {
            match &child.kind {
                NodeKind::Anchor { id } => {
                    let label =
                        promoted_section(&node.children, index).and_then(section_title_text);
                    register(table, id, label, &child_path, diagnostics);
                }
                NodeKind::Section { id: Some(id), .. }
                | NodeKind::Topic { id: Some(id) }
                | NodeKind::Glossary { id: Some(id) } => {
                    register(table, id, section_title_text(child), &child_path, diagnostics);
                }
                NodeKind::GlossaryEntry { id: Some(id) } => {
                    register(table, id, entry_term_text(child), &child_path, diagnostics);
                }
                _ => {}
            }
        }
        collect_in(child, &child_path, live, table, diagnostics)?;
    }
    Ok(())
}

/// Context the converter gives the children of `kind`, or `None` when they
/// never become elements of their own.
fn child_context(kind: &NodeKind) -> Option<Context> {
    match kind {
        NodeKind::Paragraph
        | NodeKind::Title
        | NodeKind::Subtitle
        | NodeKind::Term
        | NodeKind::Emphasis
        | NodeKind::Strong
        | NodeKind::InlineLiteral
        | NodeKind::Subscript
        | NodeKind::Superscript
        | NodeKind::TitleReference
        | NodeKind::TermReference { .. }
        | NodeKind::Literal {
            kind: LiteralKind::Lines,
            ..
        } => Some(Context::Inline),
        NodeKind::Table => Some(Context::Table),
        NodeKind::TableRow { .. } => Some(Context::Row),
        // A resolved reference becomes an empty xref.
        NodeKind::Reference { .. }
        | NodeKind::Literal {
            kind: LiteralKind::Code,
            ..
        }
        | NodeKind::Anchor { .. }
        | NodeKind::Image { .. }
        | NodeKind::Text { .. }
        | NodeKind::Comment
        | NodeKind::Unknown { .. } => None,
        _ => Some(Context::Block),
    }
}

/// False when the converter drops `kind` in `context` or flattens it to text.
fn is_retained(kind: &NodeKind, context: Context) -> bool {
    match kind {
        NodeKind::Document | NodeKind::Comment | NodeKind::Unknown { .. } => false,
        NodeKind::TableRow { .. } => context == Context::Table,
        NodeKind::TableCell => context == Context::Row,
        _ => !(context == Context::Inline && kind.placement() == Placement::Block),
    }
}

fn register(
    table: &mut ReferenceTable,
    id: &str,
    label: Option<String>,
    path: &NodePath,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if let Err(duplicate) = table.register_anchor(id, label, path.clone()) {
        log::debug!("{} at {}", duplicate, path);
        let mut diagnostic = Diagnostic::warning(
            path.clone(),
            W_ANCHOR_DUP,
            format!("duplicate anchor `{}`; the later definition wins", id),
        );
        diagnostic.related.push(RelatedDiagnostic::new(
            duplicate.previous,
            Some("earlier definition".to_string()),
        ));
        diagnostics.push(diagnostic);
    }
}

pub(crate) fn section_title_text(section: &SourceNode) -> Option<String> {
    let index = section.first_child_of(|kind| matches!(kind, NodeKind::Title))?;
    let text = section.children[index].text_content();
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn entry_term_text(entry: &SourceNode) -> Option<String> {
    let index = entry.first_child_of(|kind| matches!(kind, NodeKind::Term))?;
    let text = entry.children[index].text_content();
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_registration_wins_and_reports_the_earlier_one() {
        let mut table = ReferenceTable::new();
        let first = NodePath(vec![0]);
        let second = NodePath(vec![3, 1]);
        assert!(table.register_anchor("intro", None, first.clone()).is_ok());
        let err = table
            .register_anchor("intro", Some("Intro".into()), second.clone())
            .unwrap_err();
        assert_eq!(err.previous, first);
        assert!(table.owns("intro", &second));
        assert!(!table.owns("intro", &first));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn resolution_falls_back_from_exact_to_normalized() {
        let mut table = ReferenceTable::new();
        table
            .register_anchor("getting-started", Some("Getting started".into()), NodePath(vec![1]))
            .unwrap();
        let expected = ResolvedTarget::CrossReference {
            id: "getting-started".into(),
            label: Some("Getting started".into()),
        };
        assert_eq!(table.resolve_reference("getting-started"), expected);
        assert_eq!(table.resolve_reference("#getting-started"), expected);
        assert_eq!(table.resolve_reference("Getting Started"), expected);
    }

    #[test]
    fn unknown_targets_are_external_or_unresolved() {
        let table = ReferenceTable::new();
        assert_eq!(
            table.resolve_reference("https://example.com"),
            ResolvedTarget::External {
                uri: "https://example.com".into()
            }
        );
        assert_eq!(
            table.resolve_reference("ghost"),
            ResolvedTarget::Unresolved { raw: "ghost".into() }
        );
    }
}
