//! Converting many independent documents at once.
//!
//! Each document gets its own reference table and diagnostics; nothing is
//! shared between conversions except the read-only options and the parsed
//! template, so documents are spread over the rayon pool and collected back
//! in input order.

use rayon::prelude::*;

use crate::assemble::{ConvertResult, convert_document_with_template};
use crate::ast::SourceNode;
use crate::convert::ConvertOptions;
use crate::error::ConvertError;
use crate::template::Template;

/// One document of a batch, with optional per-document overrides.
#[derive(Clone, Debug)]
pub struct BatchItem {
    pub name: String,
    pub document: SourceNode,
    pub document_id: Option<String>,
    /// Template text for this document only; replaces the batch template.
    pub template: Option<String>,
}

impl BatchItem {
    pub fn new(name: impl Into<String>, document: SourceNode) -> Self {
        Self {
            name: name.into(),
            document,
            document_id: None,
            template: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct BatchOutcome {
    pub name: String,
    pub result: Result<ConvertResult, ConvertError>,
}

/// Converts every item against the shared `template`; a failing document
/// never affects the others. Outcomes come back in the order of `items`.
///
/// `options.template` is not consulted here: the batch template is parsed
/// once by the caller and passed in.
pub fn convert_batch(
    items: &[BatchItem],
    options: &ConvertOptions,
    template: Option<&Template>,
) -> Vec<BatchOutcome> {
    log::info!("converting {} documents", items.len());

    let outcomes: Vec<BatchOutcome> = items
        .par_iter()
        .map(|item| convert_item(item, options, template))
        .collect();

    let failed = outcomes
        .iter()
        .filter(|outcome| outcome.result.is_err())
        .count();
    log::info!(
        "converted {} documents, {} failed",
        outcomes.len() - failed,
        failed
    );
    outcomes
}

fn convert_item(
    item: &BatchItem,
    options: &ConvertOptions,
    template: Option<&Template>,
) -> BatchOutcome {
    let result = match &item.template {
        Some(text) => Template::parse(text)
            .map_err(ConvertError::from)
            .and_then(|own| convert_with(item, options, Some(&own))),
        None => convert_with(item, options, template),
    };
    if let Err(err) = &result {
        log::warn!("{}: {}", item.name, err);
    }
    BatchOutcome {
        name: item.name.clone(),
        result,
    }
}

fn convert_with(
    item: &BatchItem,
    options: &ConvertOptions,
    template: Option<&Template>,
) -> Result<ConvertResult, ConvertError> {
    match &item.document_id {
        Some(document_id) => {
            let local = ConvertOptions {
                document_id: Some(document_id.clone()),
                ..options.clone()
            };
            convert_document_with_template(&item.document, &local, template)
        }
        None => convert_document_with_template(&item.document, options, template),
    }
}
