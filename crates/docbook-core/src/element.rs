//! DocBook element tree with a static content-model table.
//!
//! Every tag is classified by where it may sit (block or inline position) and
//! what it may hold. [`Element::append_child`] enforces the table, so a tree
//! built through it never places a block inside inline-only content, nor
//! inline content directly inside a block-only container.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;

use crate::error::StructureError;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Position {
    Block,
    Inline,
    Any,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentModel {
    /// Only block-position elements.
    Block,
    /// Text and inline-position elements.
    Inline,
    /// Anything.
    Mixed,
    /// Nothing at all.
    Empty,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TagRule {
    pub position: Position,
    pub content: ContentModel,
}

const fn rule(position: Position, content: ContentModel) -> TagRule {
    TagRule { position, content }
}

static TAG_RULES: Lazy<HashMap<&'static str, TagRule>> = Lazy::new(|| {
    use ContentModel as C;
    use Position as P;

    let mut rules = HashMap::new();
    for tag in [
        "book",
        "part",
        "chapter",
        "appendix",
        "preface",
        "article",
        "section",
        "sect1",
        "sect2",
        "sect3",
        "sect4",
        "sect5",
        "note",
        "warning",
        "tip",
        "caution",
        "important",
        "blockquote",
        "itemizedlist",
        "orderedlist",
        "listitem",
        "variablelist",
        "varlistentry",
        "table",
        "tgroup",
        "thead",
        "tbody",
        "row",
        "mediaobject",
        "imageobject",
        "caption",
        "author",
        "glossary",
        "glossentry",
        "glossdef",
        "glosslist",
    ] {
        rules.insert(tag, rule(P::Block, C::Block));
    }
    for tag in [
        "title",
        "subtitle",
        "para",
        "term",
        "bridgehead",
        "programlisting",
        "literallayout",
        "othername",
        "pubdate",
        "releaseinfo",
    ] {
        rules.insert(tag, rule(P::Block, C::Inline));
    }
    for tag in [
        "emphasis",
        "literal",
        "link",
        "ulink",
        "citetitle",
        "subscript",
        "superscript",
        "phrase",
    ] {
        rules.insert(tag, rule(P::Inline, C::Inline));
    }
    rules.insert("entry", rule(P::Block, C::Mixed));
    rules.insert("textobject", rule(P::Block, C::Mixed));
    rules.insert("inlinemediaobject", rule(P::Inline, C::Block));
    rules.insert("xref", rule(P::Inline, C::Empty));
    rules.insert("anchor", rule(P::Any, C::Empty));
    rules.insert("glossterm", rule(P::Any, C::Inline));
    rules.insert("imagedata", rule(P::Block, C::Empty));
    rules.insert("colspec", rule(P::Block, C::Empty));
    rules
});

/// Looks up the content rule for `tag`. Tags outside the table are treated as
/// block containers that accept anything.
pub fn tag_rule(tag: &str) -> TagRule {
    TAG_RULES
        .get(tag)
        .copied()
        .unwrap_or(rule(Position::Block, ContentModel::Mixed))
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    pub children: Vec<Content>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Content {
    Element(Element),
    Text(String),
}

impl Content {
    pub fn is_inline(&self) -> bool {
        match self {
            Content::Text(_) => true,
            Content::Element(element) => element.rule().position == Position::Inline,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Content::Element(element) => Some(element),
            Content::Text(_) => None,
        }
    }

    fn describe(&self) -> String {
        match self {
            Content::Element(element) => format!("<{}>", element.tag),
            Content::Text(_) => "text".to_string(),
        }
    }
}

impl From<Element> for Content {
    fn from(element: Element) -> Self {
        Content::Element(element)
    }
}

/// Creates an empty element carrying `attrs`.
pub fn make_element<K, V>(tag: &str, attrs: impl IntoIterator<Item = (K, V)>) -> Element
where
    K: Into<String>,
    V: Into<String>,
{
    let mut element = Element::new(tag);
    for (key, value) in attrs {
        element.attrs.insert(key.into(), value.into());
    }
    element
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attrs.insert(key.into(), value.into());
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn rule(&self) -> TagRule {
        tag_rule(&self.tag)
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Appends `child`, rejecting it when the content model forbids it here.
    pub fn append_child(&mut self, child: impl Into<Content>) -> Result<(), StructureError> {
        let child = child.into();
        self.check_child(&child)?;
        self.children.push(child);
        Ok(())
    }

    /// Inserts `child` at `index` under the same rules as [`Element::append_child`].
    pub fn insert_child(
        &mut self,
        index: usize,
        child: impl Into<Content>,
    ) -> Result<(), StructureError> {
        let child = child.into();
        self.check_child(&child)?;
        let index = index.min(self.children.len());
        self.children.insert(index, child);
        Ok(())
    }

    /// Appends text, merging with a trailing text child.
    pub fn append_text(&mut self, text: &str) -> Result<(), StructureError> {
        if text.is_empty() {
            return Ok(());
        }
        if let Some(Content::Text(last)) = self.children.last_mut() {
            last.push_str(text);
            return Ok(());
        }
        self.append_child(Content::Text(text.to_string()))
    }

    fn check_child(&self, child: &Content) -> Result<(), StructureError> {
        let parent = self.tag.clone();
        match self.rule().content {
            ContentModel::Mixed => Ok(()),
            ContentModel::Empty => Err(StructureError::ChildOfEmpty {
                parent,
                child: child.describe(),
            }),
            ContentModel::Inline => match child {
                Content::Element(element) if element.rule().position == Position::Block => {
                    Err(StructureError::BlockInInline {
                        parent,
                        child: element.tag.clone(),
                    })
                }
                _ => Ok(()),
            },
            ContentModel::Block => {
                if child.is_inline() {
                    Err(StructureError::InlineInBlock {
                        parent,
                        child: child.describe(),
                    })
                } else {
                    Ok(())
                }
            }
        }
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Content::as_element)
    }

    pub fn first_child_element(&self) -> Option<&Element> {
        self.child_elements().next()
    }

    /// True when every child is text or inline-position.
    pub fn has_only_inline_children(&self) -> bool {
        self.children.iter().all(Content::is_inline)
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                Content::Text(text) => out.push_str(text),
                Content::Element(element) => out.push_str(&element.text_content()),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_model_rejects_misplaced_children() {
        let mut para = Element::new("para");
        assert_eq!(
            para.append_child(Element::new("itemizedlist")),
            Err(StructureError::BlockInInline {
                parent: "para".into(),
                child: "itemizedlist".into()
            })
        );

        let mut section = Element::new("section");
        assert!(matches!(
            section.append_text("loose"),
            Err(StructureError::InlineInBlock { .. })
        ));
        assert!(matches!(
            section.append_child(Element::new("emphasis")),
            Err(StructureError::InlineInBlock { .. })
        ));
        assert!(section.append_child(Element::new("anchor")).is_ok());

        let mut xref = make_element("xref", [("linkend", "intro")]);
        assert!(matches!(
            xref.append_text("x"),
            Err(StructureError::ChildOfEmpty { .. })
        ));
    }

    #[test]
    fn adjacent_text_is_merged() {
        let mut title = Element::new("title");
        title.append_text("Getting ").unwrap();
        title.append_text("started").unwrap();
        assert_eq!(title.children, vec![Content::Text("Getting started".into())]);
        assert_eq!(title.text_content(), "Getting started");
    }

    #[test]
    fn unknown_tags_accept_anything() {
        let mut custom = Element::new("refentry");
        assert!(custom.append_text("text").is_ok());
        assert!(custom.append_child(Element::new("para")).is_ok());
        assert_eq!(custom.first_child_element().map(|e| e.tag.as_str()), Some("para"));
    }
}
