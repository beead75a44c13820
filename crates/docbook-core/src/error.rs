//! Fatal conversion failures. Each aborts the current document only.

use thiserror::Error;

use crate::ast::NodePath;

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum StructureError {
    #[error("block element <{child}> cannot be placed inside inline-only <{parent}>")]
    BlockInInline { parent: String, child: String },

    #[error("<{parent}> is an empty element and cannot hold {child}")]
    ChildOfEmpty { parent: String, child: String },

    #[error("inline content {child} cannot be placed directly inside block-only <{parent}>")]
    InlineInBlock { parent: String, child: String },

    #[error("document has {count} root-level blocks but <{root}> must be the only root")]
    MultipleRoots { root: String, count: usize },

    #[error("source tree nests deeper than {limit} levels at {path}")]
    NestingTooDeep { limit: usize, path: NodePath },
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum TemplateError {
    #[error("template is missing the root element placeholder `{{{{data.root_element}}}}`")]
    MissingRootElement,

    #[error("template is missing the contents placeholder `{{{{data.contents}}}}`")]
    MissingContents,
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Structure(#[from] StructureError),

    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Errors raised while loading a source tree from JSON.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("node at {path} is not a JSON object")]
    NotAnObject { path: NodePath },

    #[error("node at {path} is missing required field `{field}`")]
    MissingField { path: NodePath, field: &'static str },

    #[error("field `{field}` of node at {path} must be {expected}")]
    InvalidField {
        path: NodePath,
        field: &'static str,
        expected: &'static str,
    },

    #[error("source tree must be rooted at a document node, found `{found}`")]
    NotADocument { found: String },
}
