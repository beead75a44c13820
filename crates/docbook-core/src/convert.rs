//! Source tree to DocBook element tree.
//!
//! Conversion runs in two passes over one document. The first registers every
//! anchor and section id in a [`ReferenceTable`]; the second walks the tree
//! again, emitting elements and resolving references against the finished
//! table, so forward references resolve like backward ones.
//!
//! The walk never aborts on odd input. Constructs without a DocBook mapping
//! degrade in place and leave a [`Diagnostic`]; only structural impossibilities
//! surface as [`StructureError`].

use std::borrow::Cow;

use crate::ast::{
    LiteralKind, NodeKind, NodePath, Placement, SourceNode, leading_field_list, promoted_section,
};
use crate::diagnostic::{
    Diagnostic, DiagnosticSeverity, I_NODE_SKIPPED, W_ADMONITION_UNKNOWN, W_BLOCK_IN_INLINE,
    W_LIST_ITEM, W_NODE_UNKNOWN, W_REF_UNRESOLVED, W_SECTION_DEPTH, W_TABLE_EMPTY,
    W_TABLE_RAGGED, W_TEXT_CONTROL, W_TITLE_EXTRA,
};
use crate::element::{Content, Element};
use crate::emit::EmitOptions;
use crate::error::StructureError;
use crate::label::strip_invalid_xml_chars;
use crate::resolver::{ReferenceTable, ResolvedTarget, collect_anchors};
use crate::section::{DEFAULT_ROOT_ELEMENT, SectionHierarchy};

/// Per-invocation settings.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConvertOptions {
    /// Tag of the outermost element; also the tag of depth-0 sections.
    pub root_element: String,
    /// Placed as `id` on the root element.
    pub document_id: Option<String>,
    /// Give titles of elements with an id an id of their own (`<id>.title`).
    pub use_ids_in_titles: bool,
    pub hierarchy: SectionHierarchy,
    /// Template text with `{{data.root_element}}` and `{{data.contents}}`
    /// placeholders. Without one the output is a self-contained document.
    pub template: Option<String>,
    pub emit: EmitOptions,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            root_element: DEFAULT_ROOT_ELEMENT.to_string(),
            document_id: None,
            use_ids_in_titles: false,
            hierarchy: SectionHierarchy::default(),
            template: None,
            emit: EmitOptions::default(),
        }
    }
}

/// Top-level content of a converted document, before a root element is chosen.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConvertedTree {
    /// Set when the Document node carries its own title; the document then
    /// acts as the depth-0 section and every item belongs inside the root.
    pub title: Option<Element>,
    pub items: Vec<TopLevel>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TopLevel {
    Section(Element),
    Anchor(Element),
    Block(Element),
}

impl TopLevel {
    pub fn into_element(self) -> Element {
        match self {
            TopLevel::Section(element) | TopLevel::Anchor(element) | TopLevel::Block(element) => {
                element
            }
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConvertedDocument {
    pub tree: ConvertedTree,
    pub diagnostics: Vec<Diagnostic>,
}

/// Converts a source tree. A root that is not a Document node is treated as
/// the only child of an implicit one.
pub fn convert(
    document: &SourceNode,
    options: &ConvertOptions,
) -> Result<ConvertedDocument, StructureError> {
    let wrapped;
    let document = if matches!(document.kind, NodeKind::Document) {
        document
    } else {
        wrapped = SourceNode::with_children(NodeKind::Document, vec![document.clone()]);
        &wrapped
    };

    let mut converter = Converter {
        options,
        references: ReferenceTable::new(),
        diagnostics: Vec::new(),
    };
    collect_anchors(
        document,
        &mut converter.references,
        &mut converter.diagnostics,
    )?;
    let tree = converter.convert_document(document)?;
    Ok(ConvertedDocument {
        tree,
        diagnostics: converter.diagnostics,
    })
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Origin {
    Section,
    Anchor,
    Other,
}

struct Placed {
    element: Element,
    origin: Origin,
}

#[derive(Clone, Copy)]
enum TitlePolicy<'t> {
    /// Sectioning elements: a missing title is synthesized empty.
    Required,
    /// Other titled blocks: use the fallback text, or go without.
    Optional(Option<&'t str>),
}

struct Converter<'a> {
    options: &'a ConvertOptions,
    references: ReferenceTable,
    diagnostics: Vec<Diagnostic>,
}

impl Converter<'_> {
    fn convert_document(&mut self, document: &SourceNode) -> Result<ConvertedTree, StructureError> {
        let root = NodePath::root();

        if let Some(title_index) = document.first_child_of(|kind| matches!(kind, NodeKind::Title)) {
            let owner = self.options.document_id.clone();
            let title = self.convert_title(
                &document.children[title_index],
                &root.child(title_index),
                owner.as_deref(),
            )?;
            let placed = self.convert_blocks(&document.children, &root, 1, &[title_index])?;
            return Ok(ConvertedTree {
                title: Some(title),
                items: placed
                    .into_iter()
                    .map(|placed| TopLevel::Block(placed.element))
                    .collect(),
            });
        }

        let placed = self.convert_blocks(&document.children, &root, 0, &[])?;
        let items = placed
            .into_iter()
            .map(|placed| match placed.origin {
                Origin::Section => TopLevel::Section(placed.element),
                Origin::Anchor => TopLevel::Anchor(placed.element),
                Origin::Other => TopLevel::Block(placed.element),
            })
            .collect();
        Ok(ConvertedTree { title: None, items })
    }

    /// Converts children that sit in block context. Runs of inline nodes are
    /// gathered into a synthesized `para`.
    fn convert_blocks(
        &mut self,
        children: &[SourceNode],
        parent: &NodePath,
        section_depth: usize,
        skip: &[usize],
    ) -> Result<Vec<Placed>, StructureError> {
        let mut out = Vec::new();
        let mut pending: Option<Element> = None;
        let mut promoted: Option<String> = None;

        for (index, child) in children.iter().enumerate() {
            if skip.contains(&index) {
                continue;
            }
            let path = parent.child(index);

            if pending.is_none() && child.is_blank_text() {
                continue;
            }
            if let NodeKind::Anchor { id } = &child.kind {
                if promoted_section(children, index).is_some() {
                    if self.references.owns(id, &path) {
                        promoted = Some(id.clone());
                    }
                    continue;
                }
                match pending.as_mut() {
                    Some(para) => self.convert_inline(para, child, &path)?,
                    None => {
                        if let Some(anchor) = self.anchor_element(id, &path) {
                            out.push(Placed {
                                element: anchor,
                                origin: Origin::Anchor,
                            });
                        }
                    }
                }
                continue;
            }
            if child.kind.is_inline() {
                let para = pending.get_or_insert_with(|| Element::new("para"));
                self.convert_inline(para, child, &path)?;
                continue;
            }

            flush_para(&mut pending, &mut out);
            let origin = if matches!(child.kind, NodeKind::Section { .. } | NodeKind::Topic { .. }) {
                Origin::Section
            } else {
                Origin::Other
            };
            let promoted_id = match origin {
                Origin::Section => promoted.take(),
                _ => None,
            };
            for element in self.convert_block(child, &path, section_depth, promoted_id)? {
                out.push(Placed { element, origin });
            }
        }
        flush_para(&mut pending, &mut out);
        Ok(out)
    }

    fn fill_blocks(
        &mut self,
        parent: &mut Element,
        children: &[SourceNode],
        path: &NodePath,
        section_depth: usize,
    ) -> Result<(), StructureError> {
        for placed in self.convert_blocks(children, path, section_depth, &[])? {
            parent.append_child(placed.element)?;
        }
        Ok(())
    }

    /// Converts one node in block context into zero or more block elements.
    fn convert_block(
        &mut self,
        node: &SourceNode,
        path: &NodePath,
        section_depth: usize,
        promoted_id: Option<String>,
    ) -> Result<Vec<Element>, StructureError> {
        let element = match &node.kind {
            NodeKind::Section { id, .. } | NodeKind::Topic { id } => {
                self.convert_section(node, path, section_depth, id.as_deref(), promoted_id)?
            }
            NodeKind::Paragraph => {
                let mut para = Element::new("para");
                self.convert_inlines(&mut para, &node.children, path)?;
                para
            }
            NodeKind::List { ordered } => {
                self.convert_list(node, path, section_depth, *ordered)?
            }
            NodeKind::ListItem => {
                self.warn(
                    path,
                    W_LIST_ITEM,
                    "list item outside a list; wrapped in <itemizedlist>",
                );
                let mut item = Element::new("listitem");
                self.fill_blocks(&mut item, &node.children, path, section_depth)?;
                let mut list = Element::new("itemizedlist");
                list.append_child(item)?;
                list
            }
            NodeKind::DefinitionList => self.convert_definition_list(node, path, section_depth)?,
            NodeKind::DefinitionItem => {
                self.warn(
                    path,
                    W_LIST_ITEM,
                    "definition item outside a definition list; wrapped in <variablelist>",
                );
                let entry = self.convert_definition_item(node, path, section_depth)?;
                let mut list = Element::new("variablelist");
                list.append_child(entry)?;
                list
            }
            NodeKind::Term => {
                self.warn(
                    path,
                    W_LIST_ITEM,
                    "term outside a definition item; kept as a paragraph",
                );
                let mut para = Element::new("para");
                self.convert_inlines(&mut para, &node.children, path)?;
                para
            }
            NodeKind::Definition => {
                self.warn(
                    path,
                    W_LIST_ITEM,
                    "definition outside a definition item; kept as a block quote",
                );
                let mut quote = Element::new("blockquote");
                self.fill_blocks(&mut quote, &node.children, path, section_depth)?;
                quote
            }
            NodeKind::Glossary { id } => {
                self.convert_glossary(node, path, section_depth, id.as_deref())?
            }
            NodeKind::GlossaryEntry { id } => {
                let entry = self.convert_glossary_entry(node, path, section_depth, id.as_deref())?;
                let mut list = Element::new("glosslist");
                list.append_child(entry)?;
                list
            }
            NodeKind::FieldList => self.convert_field_list(node, path, section_depth)?,
            NodeKind::Field { name } => {
                self.warn(
                    path,
                    W_LIST_ITEM,
                    "field outside a field list; wrapped in <variablelist>",
                );
                let entry = self.convert_field(node, path, section_depth, name)?;
                let mut list = Element::new("variablelist").with_attr("role", "field_list");
                list.append_child(entry)?;
                list
            }
            NodeKind::Table => self.convert_table(node, path, section_depth)?,
            NodeKind::TableRow { .. } | NodeKind::TableCell => {
                self.degrade_block(node, path, " outside a table")
            }
            NodeKind::Literal { kind, language } => {
                self.convert_literal(node, path, *kind, language.as_deref())?
            }
            NodeKind::BlockQuote => {
                let mut quote = Element::new("blockquote");
                self.fill_blocks(&mut quote, &node.children, path, section_depth)?;
                quote
            }
            NodeKind::Admonition { kind } => {
                self.convert_admonition(node, path, section_depth, kind)?
            }
            NodeKind::VersionModified { change, version } => {
                self.convert_version_modified(node, path, section_depth, change, version)?
            }
            NodeKind::Image {
                uri,
                alt,
                align,
                scale,
            } => {
                let mut media = Element::new("mediaobject");
                for object in
                    self.image_objects(uri, alt.as_deref(), align.as_deref(), scale.as_deref(), path)?
                {
                    media.append_child(object)?;
                }
                media
            }
            NodeKind::Figure => self.convert_figure(node, path, section_depth)?,
            NodeKind::Caption => {
                let placed = self.convert_blocks(&node.children, path, section_depth, &[])?;
                return Ok(placed.into_iter().map(|placed| placed.element).collect());
            }
            NodeKind::Title | NodeKind::Subtitle => {
                self.warn(
                    path,
                    W_TITLE_EXTRA,
                    format!(
                        "{} has no title slot here; kept as <bridgehead>",
                        node.kind.name()
                    ),
                );
                let mut head = Element::new("bridgehead");
                self.convert_inlines(&mut head, &node.children, path)?;
                head
            }
            NodeKind::Anchor { id } => {
                return Ok(self.anchor_element(id, path).into_iter().collect());
            }
            NodeKind::Comment => {
                self.skip(node, path);
                return Ok(Vec::new());
            }
            NodeKind::Unknown { .. } | NodeKind::Document => self.degrade_block(node, path, ""),
            NodeKind::Text { .. }
            | NodeKind::Emphasis
            | NodeKind::Strong
            | NodeKind::InlineLiteral
            | NodeKind::Subscript
            | NodeKind::Superscript
            | NodeKind::TitleReference
            | NodeKind::Reference { .. }
            | NodeKind::TermReference { .. } => {
                let mut para = Element::new("para");
                self.convert_inline(&mut para, node, path)?;
                para
            }
        };
        Ok(vec![element])
    }

    fn convert_section(
        &mut self,
        node: &SourceNode,
        path: &NodePath,
        depth: usize,
        own_id: Option<&str>,
        promoted_id: Option<String>,
    ) -> Result<Element, StructureError> {
        let level = self
            .options
            .hierarchy
            .resolve_level(depth, &self.options.root_element);
        if level.clamped {
            self.warn(
                path,
                W_SECTION_DEPTH,
                format!(
                    "section nested {} levels deep runs past the sectioning hierarchy; using <{}>",
                    depth, level.tag
                ),
            );
        }

        let mut section = Element::new(level.tag);
        let id = match own_id {
            Some(id) if self.references.owns(id, path) => Some(id.to_string()),
            Some(_) => None,
            None => promoted_id,
        };
        if let Some(id) = &id {
            section.set_attr("id", id.clone());
        }
        self.fill_titled(
            &mut section,
            node,
            path,
            depth + 1,
            id.as_deref(),
            TitlePolicy::Required,
        )?;
        Ok(section)
    }

    /// Fills a titled container: title first (synthesized when the policy asks
    /// for it), then the subtitle of a sectioning element, then the body.
    fn fill_titled(
        &mut self,
        container: &mut Element,
        node: &SourceNode,
        path: &NodePath,
        child_depth: usize,
        owner_id: Option<&str>,
        policy: TitlePolicy<'_>,
    ) -> Result<(), StructureError> {
        let title_index = node.first_child_of(|kind| matches!(kind, NodeKind::Title));
        let subtitle_index = match policy {
            TitlePolicy::Required => {
                node.first_child_of(|kind| matches!(kind, NodeKind::Subtitle))
            }
            TitlePolicy::Optional(_) => None,
        };
        let info_index = match policy {
            TitlePolicy::Required => leading_field_list(&node.children),
            TitlePolicy::Optional(_) => None,
        };

        let title = match (title_index, policy) {
            (Some(index), _) => Some(self.convert_title(
                &node.children[index],
                &path.child(index),
                owner_id,
            )?),
            (None, TitlePolicy::Required) => Some(self.title_element(owner_id)),
            (None, TitlePolicy::Optional(Some(text))) => {
                let mut title = self.title_element(owner_id);
                title.append_text(text)?;
                Some(title)
            }
            (None, TitlePolicy::Optional(None)) => None,
        };
        if let Some(title) = title {
            container.append_child(title)?;
        }
        if let Some(index) = subtitle_index {
            let mut subtitle = Element::new("subtitle");
            self.convert_inlines(&mut subtitle, &node.children[index].children, &path.child(index))?;
            container.append_child(subtitle)?;
        }

        let skip: Vec<usize> = [title_index, subtitle_index, info_index]
            .into_iter()
            .flatten()
            .collect();
        for placed in self.convert_blocks(&node.children, path, child_depth, &skip)? {
            container.append_child(placed.element)?;
        }

        if let Some(index) = info_index {
            let info = self.section_info(&container.tag, &node.children[index], &path.child(index))?;
            if !info.is_empty() {
                container.insert_child(0, info)?;
            }
        }
        Ok(())
    }

    /// `<{tag}info>` built from the fields of a leading field list. Fields
    /// without a metadata element are dropped with a note.
    fn section_info(
        &mut self,
        tag: &str,
        fields: &SourceNode,
        path: &NodePath,
    ) -> Result<Element, StructureError> {
        let mut info = Element::new(format!("{}info", tag));
        for (index, field) in fields.children.iter().enumerate() {
            let field_path = path.child(index);
            let NodeKind::Field { name } = &field.kind else {
                if !field.is_blank_text() {
                    self.skip(field, &field_path);
                }
                continue;
            };
            let value = field.text_content();
            let value = self.clean_text(value.trim(), &field_path).into_owned();
            match name.to_ascii_lowercase().as_str() {
                _ if value.is_empty() => self.skip(field, &field_path),
                "author" => info.append_child(author_element(&value)?)?,
                "authors" => {
                    for author in split_authors(&value) {
                        info.append_child(author_element(author)?)?;
                    }
                }
                "date" => info.append_child(text_element("pubdate", &value)?)?,
                "version" | "revision" => {
                    info.append_child(text_element("releaseinfo", &value)?)?
                }
                _ => {
                    log::debug!("dropping field {} at {}", name, field_path);
                    self.diagnostics.push(Diagnostic::new(
                        field_path,
                        DiagnosticSeverity::Info,
                        I_NODE_SKIPPED,
                        format!("field `{}` has no metadata slot; dropped", name),
                    ));
                }
            }
        }
        Ok(info)
    }

    fn title_element(&self, owner_id: Option<&str>) -> Element {
        let mut title = Element::new("title");
        if self.options.use_ids_in_titles {
            if let Some(owner) = owner_id {
                title.set_attr("id", format!("{}.title", owner));
            }
        }
        title
    }

    fn convert_title(
        &mut self,
        node: &SourceNode,
        path: &NodePath,
        owner_id: Option<&str>,
    ) -> Result<Element, StructureError> {
        let mut title = self.title_element(owner_id);
        self.convert_inlines(&mut title, &node.children, path)?;
        Ok(title)
    }

    fn convert_list(
        &mut self,
        node: &SourceNode,
        path: &NodePath,
        depth: usize,
        ordered: bool,
    ) -> Result<Element, StructureError> {
        let mut list = Element::new(if ordered {
            "orderedlist"
        } else {
            "itemizedlist"
        });
        for (index, child) in node.children.iter().enumerate() {
            let child_path = path.child(index);
            match &child.kind {
                NodeKind::ListItem => {
                    let mut item = Element::new("listitem");
                    self.fill_blocks(&mut item, &child.children, &child_path, depth)?;
                    list.append_child(item)?;
                }
                NodeKind::Comment => self.skip(child, &child_path),
                _ if child.is_blank_text() => {}
                _ => {
                    self.warn(
                        &child_path,
                        W_LIST_ITEM,
                        format!(
                            "list child `{}` is not a list item; wrapped in <listitem>",
                            child.kind.name()
                        ),
                    );
                    let mut item = Element::new("listitem");
                    for element in self.convert_block(child, &child_path, depth, None)? {
                        item.append_child(element)?;
                    }
                    list.append_child(item)?;
                }
            }
        }
        Ok(list)
    }

    fn convert_definition_list(
        &mut self,
        node: &SourceNode,
        path: &NodePath,
        depth: usize,
    ) -> Result<Element, StructureError> {
        let mut list = Element::new("variablelist");
        for (index, child) in node.children.iter().enumerate() {
            let child_path = path.child(index);
            match &child.kind {
                NodeKind::DefinitionItem => {
                    let entry = self.convert_definition_item(child, &child_path, depth)?;
                    list.append_child(entry)?;
                }
                NodeKind::Comment => self.skip(child, &child_path),
                _ if child.is_blank_text() => {}
                _ => {
                    self.warn(
                        &child_path,
                        W_LIST_ITEM,
                        format!(
                            "definition list child `{}` is not a definition item; given an empty term",
                            child.kind.name()
                        ),
                    );
                    let entry = self.termless_entry(child, &child_path, depth)?;
                    list.append_child(entry)?;
                }
            }
        }
        Ok(list)
    }

    /// A `varlistentry` with an empty term holding `node` as its item.
    fn termless_entry(
        &mut self,
        node: &SourceNode,
        path: &NodePath,
        depth: usize,
    ) -> Result<Element, StructureError> {
        let mut entry = Element::new("varlistentry");
        entry.append_child(Element::new("term"))?;
        let mut item = Element::new("listitem");
        for element in self.convert_block(node, path, depth, None)? {
            item.append_child(element)?;
        }
        if item.is_empty() {
            item.append_child(Element::new("para"))?;
        }
        entry.append_child(item)?;
        Ok(entry)
    }

    fn convert_field_list(
        &mut self,
        node: &SourceNode,
        path: &NodePath,
        depth: usize,
    ) -> Result<Element, StructureError> {
        let mut list = Element::new("variablelist").with_attr("role", "field_list");
        for (index, child) in node.children.iter().enumerate() {
            let child_path = path.child(index);
            match &child.kind {
                NodeKind::Field { name } => {
                    let entry = self.convert_field(child, &child_path, depth, name)?;
                    list.append_child(entry)?;
                }
                NodeKind::Comment => self.skip(child, &child_path),
                _ if child.is_blank_text() => {}
                _ => {
                    self.warn(
                        &child_path,
                        W_LIST_ITEM,
                        format!(
                            "field list child `{}` is not a field; given an empty term",
                            child.kind.name()
                        ),
                    );
                    let entry = self.termless_entry(child, &child_path, depth)?;
                    list.append_child(entry)?;
                }
            }
        }
        Ok(list)
    }

    /// A field as a `varlistentry` whose term is the field name.
    fn convert_field(
        &mut self,
        node: &SourceNode,
        path: &NodePath,
        depth: usize,
        name: &str,
    ) -> Result<Element, StructureError> {
        let mut term = Element::new("term");
        let name = self.clean_text(name, path);
        term.append_text(&name)?;
        let mut item = Element::new("listitem");
        self.fill_blocks(&mut item, &node.children, path, depth)?;
        if item.is_empty() {
            item.append_child(Element::new("para"))?;
        }
        let mut entry = Element::new("varlistentry");
        entry.append_child(term)?;
        entry.append_child(item)?;
        Ok(entry)
    }

    fn convert_glossary(
        &mut self,
        node: &SourceNode,
        path: &NodePath,
        depth: usize,
        own_id: Option<&str>,
    ) -> Result<Element, StructureError> {
        let mut glossary = Element::new("glossary");
        let id = own_id.filter(|id| self.references.owns(id, path));
        if let Some(id) = id {
            glossary.set_attr("id", id);
        }
        let title_index = node.first_child_of(|kind| matches!(kind, NodeKind::Title));
        let title = match title_index {
            Some(index) => self.convert_title(&node.children[index], &path.child(index), id)?,
            None => {
                let mut title = self.title_element(id);
                title.append_text("Glossary")?;
                title
            }
        };
        glossary.append_child(title)?;

        let mut skip: Vec<usize> = title_index.into_iter().collect();
        skip.extend(node.children.iter().enumerate().filter_map(|(index, child)| {
            matches!(
                child.kind,
                NodeKind::GlossaryEntry { .. }
                    | NodeKind::DefinitionItem
                    | NodeKind::DefinitionList
            )
            .then_some(index)
        }));
        for placed in self.convert_blocks(&node.children, path, depth, &skip)? {
            glossary.append_child(placed.element)?;
        }

        // Entries close the glossary, after every other block.
        let mut entries = Vec::new();
        for (index, child) in node.children.iter().enumerate() {
            let child_path = path.child(index);
            match &child.kind {
                NodeKind::GlossaryEntry { id } => {
                    let entry =
                        self.convert_glossary_entry(child, &child_path, depth, id.as_deref())?;
                    entries.push(entry);
                }
                NodeKind::DefinitionItem => {
                    let entry = self.convert_glossary_entry(child, &child_path, depth, None)?;
                    entries.push(entry);
                }
                NodeKind::DefinitionList => {
                    for (item_index, item) in child.children.iter().enumerate() {
                        let item_path = child_path.child(item_index);
                        match &item.kind {
                            NodeKind::GlossaryEntry { id } => entries.push(
                                self.convert_glossary_entry(item, &item_path, depth, id.as_deref())?,
                            ),
                            NodeKind::DefinitionItem => entries
                                .push(self.convert_glossary_entry(item, &item_path, depth, None)?),
                            NodeKind::Anchor { .. } | NodeKind::Comment => {
                                for element in self.convert_block(item, &item_path, depth, None)? {
                                    glossary.append_child(element)?;
                                }
                            }
                            _ if item.is_blank_text() => {}
                            _ => {
                                self.warn(
                                    &item_path,
                                    W_LIST_ITEM,
                                    format!(
                                        "glossary child `{}` is not an entry; kept ahead of the entries",
                                        item.kind.name()
                                    ),
                                );
                                for element in self.convert_block(item, &item_path, depth, None)? {
                                    glossary.append_child(element)?;
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        for entry in entries {
            glossary.append_child(entry)?;
        }
        Ok(glossary)
    }

    /// A `glossentry`: every term joins one `glossterm`, the rest is its definition.
    fn convert_glossary_entry(
        &mut self,
        node: &SourceNode,
        path: &NodePath,
        depth: usize,
        own_id: Option<&str>,
    ) -> Result<Element, StructureError> {
        let mut entry = Element::new("glossentry");
        if let Some(id) = own_id {
            if self.references.owns(id, path) {
                entry.set_attr("id", id);
            }
        }
        let mut term = Element::new("glossterm");
        let mut definition = Element::new("glossdef");
        let mut terms = 0;
        for (index, child) in node.children.iter().enumerate() {
            let child_path = path.child(index);
            match &child.kind {
                NodeKind::Term => {
                    if terms > 0 {
                        term.append_text(", ")?;
                    }
                    self.convert_inlines(&mut term, &child.children, &child_path)?;
                    terms += 1;
                }
                NodeKind::Definition => {
                    self.fill_blocks(&mut definition, &child.children, &child_path, depth)?;
                }
                _ if child.is_blank_text() => {}
                _ => {
                    for element in self.convert_block(child, &child_path, depth, None)? {
                        definition.append_child(element)?;
                    }
                }
            }
        }
        if definition.is_empty() {
            definition.append_child(Element::new("para"))?;
        }
        entry.append_child(term)?;
        entry.append_child(definition)?;
        Ok(entry)
    }

    fn convert_definition_item(
        &mut self,
        node: &SourceNode,
        path: &NodePath,
        depth: usize,
    ) -> Result<Element, StructureError> {
        let mut entry = Element::new("varlistentry");
        let mut item = Element::new("listitem");
        let mut has_term = false;
        for (index, child) in node.children.iter().enumerate() {
            let child_path = path.child(index);
            match &child.kind {
                NodeKind::Term => {
                    let mut term = Element::new("term");
                    self.convert_inlines(&mut term, &child.children, &child_path)?;
                    entry.append_child(term)?;
                    has_term = true;
                }
                NodeKind::Definition => {
                    self.fill_blocks(&mut item, &child.children, &child_path, depth)?;
                }
                _ if child.is_blank_text() => {}
                _ => {
                    for element in self.convert_block(child, &child_path, depth, None)? {
                        item.append_child(element)?;
                    }
                }
            }
        }
        if !has_term {
            entry.insert_child(0, Element::new("term"))?;
        }
        if item.is_empty() {
            item.append_child(Element::new("para"))?;
        }
        entry.append_child(item)?;
        Ok(entry)
    }

    fn convert_table(
        &mut self,
        node: &SourceNode,
        path: &NodePath,
        depth: usize,
    ) -> Result<Element, StructureError> {
        let mut table = Element::new("table");
        let mut rows: Vec<RowSource<'_>> = Vec::new();

        let title_index = node.first_child_of(|kind| matches!(kind, NodeKind::Title));
        if let Some(index) = title_index {
            let title = self.convert_title(&node.children[index], &path.child(index), None)?;
            table.append_child(title)?;
        }

        for (index, child) in node.children.iter().enumerate() {
            if Some(index) == title_index {
                continue;
            }
            let child_path = path.child(index);
            match &child.kind {
                NodeKind::TableRow { header } => {
                    let mut cells = Vec::new();
                    for (cell_index, cell) in child.children.iter().enumerate() {
                        let cell_path = child_path.child(cell_index);
                        match &cell.kind {
                            NodeKind::TableCell => cells.push(CellSource::Cell(cell, cell_path)),
                            NodeKind::Comment => self.skip(cell, &cell_path),
                            _ if cell.is_blank_text() => {}
                            _ => cells.push(CellSource::Bare(cell, cell_path)),
                        }
                    }
                    rows.push(RowSource {
                        header: *header,
                        cells,
                    });
                }
                NodeKind::Comment => self.skip(child, &child_path),
                _ if child.is_blank_text() => {}
                _ => {
                    self.warn(
                        &child_path,
                        W_NODE_UNKNOWN,
                        format!(
                            "table child `{}` is not a row; placed in a row of its own",
                            child.kind.name()
                        ),
                    );
                    rows.push(RowSource {
                        header: false,
                        cells: vec![CellSource::Bare(child, child_path)],
                    });
                }
            }
        }

        let widest = rows.iter().map(|row| row.cells.len()).max().unwrap_or(0);
        let narrowest = rows.iter().map(|row| row.cells.len()).min().unwrap_or(0);
        let cols = widest.max(1);
        if widest == 0 {
            self.warn(path, W_TABLE_EMPTY, "table has no cells; emitted a single empty entry");
        } else if narrowest < widest {
            self.warn(
                path,
                W_TABLE_RAGGED,
                format!(
                    "table rows have between {} and {} cells; short rows padded with empty entries",
                    narrowest, widest
                ),
            );
        }
        let has_body = rows.iter().any(|row| !row.header);
        if widest > 0 && !has_body {
            self.warn(path, W_TABLE_EMPTY, "table has no body rows; added an empty one");
        }

        let mut tgroup = Element::new("tgroup").with_attr("cols", cols.to_string());
        let mut thead = Element::new("thead");
        let mut tbody = Element::new("tbody");
        for row in rows {
            let mut element = Element::new("row");
            let count = row.cells.len();
            for cell in row.cells {
                element.append_child(self.convert_cell(cell, depth)?)?;
            }
            for _ in count..cols {
                element.append_child(Element::new("entry"))?;
            }
            if row.header {
                thead.append_child(element)?;
            } else {
                tbody.append_child(element)?;
            }
        }
        if tbody.is_empty() {
            let mut row = Element::new("row");
            for _ in 0..cols {
                row.append_child(Element::new("entry"))?;
            }
            tbody.append_child(row)?;
        }
        if !thead.is_empty() {
            tgroup.append_child(thead)?;
        }
        tgroup.append_child(tbody)?;
        table.append_child(tgroup)?;
        Ok(table)
    }

    fn convert_cell(&mut self, cell: CellSource<'_>, depth: usize) -> Result<Element, StructureError> {
        let mut entry = Element::new("entry");
        match cell {
            CellSource::Cell(node, path) => {
                if is_inline_run(&node.children) {
                    self.convert_inlines(&mut entry, &node.children, &path)?;
                } else {
                    self.fill_blocks(&mut entry, &node.children, &path, depth)?;
                }
            }
            CellSource::Bare(node, path) => {
                if node.kind.is_inline() {
                    self.convert_inline(&mut entry, node, &path)?;
                } else {
                    for element in self.convert_block(node, &path, depth, None)? {
                        entry.append_child(element)?;
                    }
                }
            }
        }
        Ok(entry)
    }

    fn convert_literal(
        &mut self,
        node: &SourceNode,
        path: &NodePath,
        kind: LiteralKind,
        language: Option<&str>,
    ) -> Result<Element, StructureError> {
        match kind {
            LiteralKind::Code => {
                let mut listing = Element::new("programlisting");
                if let Some(language) = language {
                    listing.set_attr("language", language);
                }
                let text = node.text_content();
                let text = self.clean_text(&text, path);
                listing.append_text(&text)?;
                Ok(listing)
            }
            LiteralKind::Lines => {
                let mut layout = Element::new("literallayout");
                self.convert_inlines(&mut layout, &node.children, path)?;
                Ok(layout)
            }
        }
    }

    fn convert_admonition(
        &mut self,
        node: &SourceNode,
        path: &NodePath,
        depth: usize,
        kind: &str,
    ) -> Result<Element, StructureError> {
        let element = match admonition_mapping(kind) {
            Some((tag, fallback_title)) => (Element::new(tag), fallback_title),
            None => {
                self.warn(
                    path,
                    W_ADMONITION_UNKNOWN,
                    format!("unknown admonition kind `{}`; emitted as <note>", kind),
                );
                (Element::new("note").with_attr("role", kind), None)
            }
        };
        let (mut element, fallback_title) = element;
        self.fill_titled(
            &mut element,
            node,
            path,
            depth,
            None,
            TitlePolicy::Optional(fallback_title),
        )?;
        Ok(element)
    }

    fn convert_version_modified(
        &mut self,
        node: &SourceNode,
        path: &NodePath,
        depth: usize,
        change: &str,
        version: &str,
    ) -> Result<Element, StructureError> {
        let mut note = Element::new("note");
        if !change.is_empty() {
            note.set_attr("role", change);
        }
        let heading = format!("{} {}", version_label(change), version);
        let heading = self.clean_text(heading.trim(), path).into_owned();
        self.fill_titled(
            &mut note,
            node,
            path,
            depth,
            None,
            TitlePolicy::Optional(Some(heading.as_str())),
        )?;
        Ok(note)
    }

    fn convert_figure(
        &mut self,
        node: &SourceNode,
        path: &NodePath,
        depth: usize,
    ) -> Result<Element, StructureError> {
        let mut media = Element::new("mediaobject");
        let mut caption = Element::new("caption");
        for (index, child) in node.children.iter().enumerate() {
            let child_path = path.child(index);
            match &child.kind {
                NodeKind::Image {
                    uri,
                    alt,
                    align,
                    scale,
                } => {
                    for object in self.image_objects(
                        uri,
                        alt.as_deref(),
                        align.as_deref(),
                        scale.as_deref(),
                        &child_path,
                    )? {
                        media.append_child(object)?;
                    }
                }
                NodeKind::Caption => {
                    self.fill_blocks(&mut caption, &child.children, &child_path, depth)?;
                }
                _ if child.is_blank_text() => {}
                _ => {
                    // Legend material travels with the caption.
                    for element in self.convert_block(child, &child_path, depth, None)? {
                        caption.append_child(element)?;
                    }
                }
            }
        }
        if !caption.is_empty() {
            media.append_child(caption)?;
        }
        Ok(media)
    }

    fn image_objects(
        &mut self,
        uri: &str,
        alt: Option<&str>,
        align: Option<&str>,
        scale: Option<&str>,
        path: &NodePath,
    ) -> Result<Vec<Element>, StructureError> {
        let mut data = Element::new("imagedata").with_attr("fileref", uri);
        if let Some(align) = align {
            match align {
                "top" | "middle" | "bottom" => data.set_attr("valign", align),
                _ => data.set_attr("align", align),
            }
        }
        if let Some(scale) = scale {
            data.set_attr("scale", scale);
        }
        let mut image = Element::new("imageobject");
        image.append_child(data)?;

        let mut objects = vec![image];
        if let Some(alt) = alt {
            let alt = self.clean_text(alt, path);
            let mut phrase = Element::new("phrase");
            phrase.append_text(&alt)?;
            let mut text = Element::new("textobject");
            text.append_child(phrase)?;
            objects.push(text);
        }
        Ok(objects)
    }

    fn convert_inlines(
        &mut self,
        parent: &mut Element,
        children: &[SourceNode],
        path: &NodePath,
    ) -> Result<(), StructureError> {
        for (index, child) in children.iter().enumerate() {
            self.convert_inline(parent, child, &path.child(index))?;
        }
        Ok(())
    }

    /// Converts one node in inline context, appending to `parent`.
    fn convert_inline(
        &mut self,
        parent: &mut Element,
        node: &SourceNode,
        path: &NodePath,
    ) -> Result<(), StructureError> {
        match &node.kind {
            NodeKind::Text { content } => {
                let text = self.clean_text(content, path);
                parent.append_text(&text)?;
            }
            NodeKind::Emphasis => self.inline_wrapper(parent, Element::new("emphasis"), node, path)?,
            NodeKind::Strong => self.inline_wrapper(
                parent,
                Element::new("emphasis").with_attr("role", "strong"),
                node,
                path,
            )?,
            NodeKind::InlineLiteral => {
                self.inline_wrapper(parent, Element::new("literal"), node, path)?
            }
            NodeKind::Subscript => {
                self.inline_wrapper(parent, Element::new("subscript"), node, path)?
            }
            NodeKind::Superscript => {
                self.inline_wrapper(parent, Element::new("superscript"), node, path)?
            }
            NodeKind::TitleReference => {
                self.inline_wrapper(parent, Element::new("citetitle"), node, path)?
            }
            NodeKind::Reference { target } => self.convert_reference(parent, node, target, path)?,
            NodeKind::TermReference { target } => {
                self.convert_term_reference(parent, node, target, path)?
            }
            NodeKind::Anchor { id } => {
                if let Some(anchor) = self.anchor_element(id, path) {
                    parent.append_child(anchor)?;
                }
            }
            NodeKind::Image {
                uri,
                alt,
                align,
                scale,
            } => {
                let mut media = Element::new("inlinemediaobject");
                for object in
                    self.image_objects(uri, alt.as_deref(), align.as_deref(), scale.as_deref(), path)?
                {
                    media.append_child(object)?;
                }
                parent.append_child(media)?;
            }
            NodeKind::Comment => self.skip(node, path),
            NodeKind::Unknown { .. } | NodeKind::Document => {
                self.warn(
                    path,
                    W_NODE_UNKNOWN,
                    format!("no DocBook mapping for `{}`; kept as plain text", node.kind.name()),
                );
                let text = node.text_content();
                let text = self.clean_text(&text, path);
                let mut phrase = Element::new("phrase").with_attr("role", node.kind.name());
                phrase.append_text(&text)?;
                parent.append_child(phrase)?;
            }
            _ => {
                self.warn(
                    path,
                    W_BLOCK_IN_INLINE,
                    format!(
                        "block `{}` inside inline <{}>; flattened to its text",
                        node.kind.name(),
                        parent.tag
                    ),
                );
                let text = node.text_content();
                let text = self.clean_text(&text, path);
                parent.append_text(&text)?;
            }
        }
        Ok(())
    }

    fn inline_wrapper(
        &mut self,
        parent: &mut Element,
        mut wrapper: Element,
        node: &SourceNode,
        path: &NodePath,
    ) -> Result<(), StructureError> {
        self.convert_inlines(&mut wrapper, &node.children, path)?;
        parent.append_child(wrapper)
    }

    fn convert_reference(
        &mut self,
        parent: &mut Element,
        node: &SourceNode,
        target: &str,
        path: &NodePath,
    ) -> Result<(), StructureError> {
        match self.references.resolve_reference(target) {
            ResolvedTarget::CrossReference { id, .. } => {
                parent.append_child(Element::new("xref").with_attr("linkend", id))
            }
            ResolvedTarget::External { uri } => {
                let mut link = Element::new("ulink").with_attr("url", uri.clone());
                self.link_body(&mut link, node, &uri, path)?;
                parent.append_child(link)
            }
            ResolvedTarget::Unresolved { raw } => {
                self.warn(
                    path,
                    W_REF_UNRESOLVED,
                    format!("reference target `{}` does not match any anchor", raw),
                );
                let mut link = Element::new("link").with_attr("linkend", raw.clone());
                self.link_body(&mut link, node, &raw, path)?;
                parent.append_child(link)
            }
        }
    }

    /// A `glossterm` linked to the glossary entry `target` names, or a bare one
    /// when nothing matches.
    fn convert_term_reference(
        &mut self,
        parent: &mut Element,
        node: &SourceNode,
        target: &str,
        path: &NodePath,
    ) -> Result<(), StructureError> {
        let mut term = Element::new("glossterm");
        match self.references.resolve_reference(target) {
            ResolvedTarget::CrossReference { id, .. } => term.set_attr("linkend", id),
            _ => self.warn(
                path,
                W_REF_UNRESOLVED,
                format!("term `{}` does not match any glossary entry", target),
            ),
        }
        self.link_body(&mut term, node, target, path)?;
        parent.append_child(term)
    }

    /// The reference's own children, or the raw target when it has none.
    fn link_body(
        &mut self,
        link: &mut Element,
        node: &SourceNode,
        raw: &str,
        path: &NodePath,
    ) -> Result<(), StructureError> {
        if node.children.iter().all(SourceNode::is_blank_text) {
            let text = self.clean_text(raw, path);
            link.append_text(&text)
        } else {
            self.convert_inlines(link, &node.children, path)
        }
    }

    /// An `anchor` element, unless a later definition of the same id owns it.
    fn anchor_element(&self, id: &str, path: &NodePath) -> Option<Element> {
        if self.references.owns(id, path) {
            Some(Element::new("anchor").with_attr("id", id))
        } else {
            None
        }
    }

    fn degrade_block(&mut self, node: &SourceNode, path: &NodePath, context: &str) -> Element {
        self.warn(
            path,
            W_NODE_UNKNOWN,
            format!(
                "no DocBook mapping for `{}`{}; kept as a plain paragraph",
                node.kind.name(),
                context
            ),
        );
        let text = node.text_content();
        let text = self.clean_text(&text, path);
        let mut para = Element::new("para").with_attr("role", node.kind.name());
        if !text.is_empty() {
            para.children.push(Content::Text(text.into_owned()));
        }
        para
    }

    fn clean_text<'t>(&mut self, text: &'t str, path: &NodePath) -> Cow<'t, str> {
        match strip_invalid_xml_chars(text) {
            Some(clean) => {
                self.warn(
                    path,
                    W_TEXT_CONTROL,
                    "removed characters that XML cannot represent",
                );
                Cow::Owned(clean)
            }
            None => Cow::Borrowed(text),
        }
    }

    fn skip(&mut self, node: &SourceNode, path: &NodePath) {
        log::debug!("skipping {} at {}", node.kind.name(), path);
        self.diagnostics.push(Diagnostic::new(
            path.clone(),
            DiagnosticSeverity::Info,
            I_NODE_SKIPPED,
            format!("{} dropped from the output", node.kind.name()),
        ));
    }

    fn warn(&mut self, path: &NodePath, code: &'static str, message: impl Into<String>) {
        let diagnostic = Diagnostic::warning(path.clone(), code, message);
        log::debug!("{} at {}: {}", code, path, diagnostic.message);
        self.diagnostics.push(diagnostic);
    }
}

struct RowSource<'n> {
    header: bool,
    cells: Vec<CellSource<'n>>,
}

enum CellSource<'n> {
    /// A proper TableCell; its children are the entry content.
    Cell(&'n SourceNode, NodePath),
    /// Any other node standing in a cell position; the node itself is the content.
    Bare(&'n SourceNode, NodePath),
}

fn flush_para(pending: &mut Option<Element>, out: &mut Vec<Placed>) {
    if let Some(para) = pending.take() {
        if !para.is_empty() {
            out.push(Placed {
                element: para,
                origin: Origin::Other,
            });
        }
    }
}

fn is_inline_run(children: &[SourceNode]) -> bool {
    children.iter().all(|child| match child.kind.placement() {
        Placement::Inline => true,
        Placement::Any => matches!(child.kind, NodeKind::Anchor { .. } | NodeKind::Comment),
        Placement::Block => false,
    })
}

/// DocBook tag and synthesized title for an admonition kind.
fn admonition_mapping(kind: &str) -> Option<(&'static str, Option<&'static str>)> {
    let mapping = match kind.to_ascii_lowercase().as_str() {
        "note" => ("note", None),
        "warning" => ("warning", None),
        "tip" => ("tip", None),
        "caution" => ("caution", None),
        "important" => ("important", None),
        "admonition" => ("note", None),
        "attention" => ("important", Some("Attention")),
        "danger" => ("warning", Some("Danger")),
        "error" => ("important", Some("Error")),
        "hint" => ("tip", Some("Hint")),
        "todo" => ("note", Some("TODO")),
        "seealso" => ("note", Some("See also")),
        _ => return None,
    };
    Some(mapping)
}

/// Heading of a version note.
fn version_label(change: &str) -> &'static str {
    match change {
        "versionadded" => "New in version",
        "versionchanged" => "Changed in version",
        "deprecated" => "Deprecated since version",
        "versionremoved" => "Removed in version",
        _ => "Version",
    }
}

fn text_element(tag: &str, text: &str) -> Result<Element, StructureError> {
    let mut element = Element::new(tag);
    element.append_text(text)?;
    Ok(element)
}

fn author_element(name: &str) -> Result<Element, StructureError> {
    let mut author = Element::new("author");
    author.append_child(text_element("othername", name)?)?;
    Ok(author)
}

/// Names in an `authors` field, separated by semicolons or, failing that, commas.
fn split_authors(value: &str) -> impl Iterator<Item = &str> {
    let separator = if value.contains(';') { ';' } else { ',' };
    value
        .split(separator)
        .map(str::trim)
        .filter(|name| !name.is_empty())
}
