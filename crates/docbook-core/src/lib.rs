mod assemble;
mod ast;
mod batch;
mod convert;
mod diagnostic;
mod element;
mod emit;
mod error;
mod json;
mod label;
mod resolver;
mod section;
mod template;

pub use assemble::{
    ConvertResult, DOCBOOK_PUBLIC_ID, DOCBOOK_SYSTEM_ID, XML_DECLARATION, assemble,
    convert_document, convert_document_with_template, render_document,
};
pub use ast::{LiteralKind, NodeKind, NodePath, Placement, SourceNode};
pub use batch::{BatchItem, BatchOutcome, convert_batch};
pub use convert::{ConvertOptions, ConvertedDocument, ConvertedTree, TopLevel, convert};
pub use diagnostic::{
    Diagnostic, DiagnosticSeverity, I_NODE_SKIPPED, RelatedDiagnostic, W_ADMONITION_UNKNOWN,
    W_ANCHOR_DUP, W_BLOCK_IN_INLINE, W_LIST_ITEM, W_NODE_UNKNOWN, W_REF_UNRESOLVED,
    W_SECTION_DEPTH, W_TABLE_EMPTY, W_TABLE_RAGGED, W_TEXT_CONTROL, W_TITLE_EXTRA,
};
pub use element::{Content, ContentModel, Element, Position, TagRule, make_element, tag_rule};
pub use emit::{EmitOptions, emit_children, emit_xml, escape_xml};
pub use error::{ConvertError, SourceError, StructureError, TemplateError};
pub use json::source_from_json;
pub use resolver::{
    DuplicateAnchorError, MAX_NESTING, ReferenceEntry, ReferenceTable, ResolvedTarget,
};
pub use section::{
    DEFAULT_HIERARCHY, DEFAULT_ROOT_ELEMENT, LevelResolution, SectionHierarchy, resolve_level,
};
pub use template::Template;
