//! Choosing the root element and producing the final document text.

use crate::ast::SourceNode;
use crate::convert::{ConvertOptions, ConvertedTree, TopLevel, convert};
use crate::diagnostic::Diagnostic;
use crate::element::{Content, Element};
use crate::emit::{EmitOptions, emit_children, emit_xml};
use crate::error::{ConvertError, StructureError};
use crate::template::Template;

pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
pub const DOCBOOK_PUBLIC_ID: &str = "-//OASIS//DTD DocBook XML V4.1.2//EN";
pub const DOCBOOK_SYSTEM_ID: &str = "http://www.oasis-open.org/docbook/xml/4.1.2/docbookx.dtd";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConvertResult {
    pub xml: String,
    /// Tag of the element that ended up as the root.
    pub root_element: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Picks the single root element for a converted tree.
///
/// A tree whose only top-level block is a section is rooted at that section.
/// A tree without sections is wrapped in `root_element` under an empty title.
/// Anything else has more than one candidate root and is rejected.
pub fn assemble(
    tree: ConvertedTree,
    root_element: &str,
    document_id: Option<&str>,
) -> Result<Element, StructureError> {
    let ConvertedTree { title, items } = tree;

    let mut root = match title {
        Some(title) => {
            let mut root = Element::new(root_element);
            root.append_child(title)?;
            append_items(&mut root, items)?;
            root
        }
        None => root_from_items(items, root_element)?,
    };

    if let Some(document_id) = document_id {
        let displaced = root.attrs.insert("id".to_string(), document_id.to_string());
        if let Some(displaced) = displaced.filter(|previous| previous != document_id) {
            // The section's own id stays reachable as an anchor.
            let index = title_end(&root);
            root.insert_child(index, Element::new("anchor").with_attr("id", displaced))?;
        }
    }
    Ok(root)
}

fn root_from_items(items: Vec<TopLevel>, root_element: &str) -> Result<Element, StructureError> {
    let sections = items
        .iter()
        .filter(|item| matches!(item, TopLevel::Section(_)))
        .count();
    let blocks = items
        .iter()
        .filter(|item| matches!(item, TopLevel::Block(_)))
        .count();

    if sections == 0 {
        let mut root = Element::new(root_element);
        root.append_child(Element::new("title"))?;
        append_items(&mut root, items)?;
        return Ok(root);
    }
    if sections > 1 || blocks > 0 {
        return Err(StructureError::MultipleRoots {
            root: root_element.to_string(),
            count: sections + blocks,
        });
    }

    let mut anchors = Vec::new();
    let mut section = None;
    for item in items {
        match item {
            TopLevel::Section(element) => section = Some(element),
            other => anchors.push(other.into_element()),
        }
    }
    let Some(mut root) = section else {
        return Err(StructureError::MultipleRoots {
            root: root_element.to_string(),
            count: 0,
        });
    };
    let mut index = title_end(&root);
    for anchor in anchors {
        root.insert_child(index, anchor)?;
        index += 1;
    }
    Ok(root)
}

fn append_items(root: &mut Element, items: Vec<TopLevel>) -> Result<(), StructureError> {
    for item in items {
        root.append_child(item.into_element())?;
    }
    Ok(())
}

/// Index just past the leading metadata, title and subtitle.
fn title_end(element: &Element) -> usize {
    element
        .children
        .iter()
        .take_while(|child| match child {
            Content::Element(child) => {
                child.tag == "title" || child.tag == "subtitle" || child.tag.ends_with("info")
            }
            Content::Text(_) => false,
        })
        .count()
}

/// Serializes `root`, either through `template` or as a standalone document
/// with XML declaration and DocBook doctype.
pub fn render_document(root: &Element, template: Option<&Template>, emit: &EmitOptions) -> String {
    match template {
        Some(template) => template.render(&root.tag, &emit_children(root, emit)),
        None => format!(
            "{}\n<!DOCTYPE {} PUBLIC \"{}\" \"{}\">\n{}\n",
            XML_DECLARATION,
            root.tag,
            DOCBOOK_PUBLIC_ID,
            DOCBOOK_SYSTEM_ID,
            emit_xml(root, emit)
        ),
    }
}

/// Converts one source tree all the way to DocBook text.
///
/// The template is checked before any conversion work so a bad template
/// fails fast. Warnings never stop conversion; they come back alongside the
/// text.
pub fn convert_document(
    document: &SourceNode,
    options: &ConvertOptions,
) -> Result<ConvertResult, ConvertError> {
    let template = options
        .template
        .as_deref()
        .map(Template::parse)
        .transpose()?;
    convert_document_with_template(document, options, template.as_ref())
}

/// Like [`convert_document`], with an already parsed template taking the
/// place of `options.template`.
pub fn convert_document_with_template(
    document: &SourceNode,
    options: &ConvertOptions,
    template: Option<&Template>,
) -> Result<ConvertResult, ConvertError> {
    let converted = convert(document, options)?;
    let root = assemble(
        converted.tree,
        &options.root_element,
        options.document_id.as_deref(),
    )?;
    let xml = render_document(&root, template, &options.emit);
    log::debug!(
        "converted document into <{}> with {} diagnostics",
        root.tag,
        converted.diagnostics.len()
    );
    Ok(ConvertResult {
        xml,
        root_element: root.tag,
        diagnostics: converted.diagnostics,
    })
}
