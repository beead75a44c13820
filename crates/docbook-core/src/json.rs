//! Loading a source tree from its JSON form.
//!
//! Each node is an object `{"type": "<kind>", "children": [...], ...}` with the
//! kind's attributes as sibling fields. Unrecognized `type` values load as
//! [`NodeKind::Unknown`] so the converter can degrade them.

use serde_json::{Map, Value};

use crate::ast::{LiteralKind, NodeKind, NodePath, SourceNode};
use crate::error::SourceError;

pub fn source_from_json(text: &str) -> Result<SourceNode, SourceError> {
    let value: Value = serde_json::from_str(text)?;
    let node = node_from_value(&value, &NodePath::root())?;
    if !matches!(node.kind, NodeKind::Document) {
        return Err(SourceError::NotADocument {
            found: node.kind.name().to_string(),
        });
    }
    Ok(node)
}

fn node_from_value(value: &Value, path: &NodePath) -> Result<SourceNode, SourceError> {
    let object = value
        .as_object()
        .ok_or_else(|| SourceError::NotAnObject { path: path.clone() })?;
    let fields = Fields { object, path };

    let kind_name = fields.required_str("type")?;
    let kind = match kind_name {
        "document" => NodeKind::Document,
        "section" => NodeKind::Section {
            level: fields.level()?,
            id: fields.optional_str("id")?,
        },
        "topic" => NodeKind::Topic {
            id: fields.optional_str("id")?,
        },
        "title" => NodeKind::Title,
        "subtitle" => NodeKind::Subtitle,
        "paragraph" => NodeKind::Paragraph,
        "list" => NodeKind::List {
            ordered: fields.flag("ordered")?,
        },
        "list_item" => NodeKind::ListItem,
        "definition_list" => NodeKind::DefinitionList,
        "definition_item" => NodeKind::DefinitionItem,
        "term" => NodeKind::Term,
        "definition" => NodeKind::Definition,
        "table" => NodeKind::Table,
        "table_row" => NodeKind::TableRow {
            header: fields.flag("header")?,
        },
        "table_cell" => NodeKind::TableCell,
        "literal" => NodeKind::Literal {
            kind: match fields.optional_str("kind")?.as_deref() {
                None | Some("code") => LiteralKind::Code,
                Some("lines") => LiteralKind::Lines,
                Some(_) => {
                    return Err(SourceError::InvalidField {
                        path: path.clone(),
                        field: "kind",
                        expected: "\"code\" or \"lines\"",
                    });
                }
            },
            language: fields.optional_str("language")?,
        },
        "block_quote" => NodeKind::BlockQuote,
        "admonition" => NodeKind::Admonition {
            kind: fields.required_str("kind")?.to_string(),
        },
        "version_modified" => NodeKind::VersionModified {
            change: fields.required_str("change")?.to_string(),
            version: fields.optional_str("version")?.unwrap_or_default(),
        },
        "glossary" => NodeKind::Glossary {
            id: fields.optional_str("id")?,
        },
        "glossary_entry" => NodeKind::GlossaryEntry {
            id: fields.optional_str("id")?,
        },
        "field_list" => NodeKind::FieldList,
        "field" => NodeKind::Field {
            name: fields.required_str("name")?.to_string(),
        },
        "emphasis" => NodeKind::Emphasis,
        "strong" => NodeKind::Strong,
        "inline_literal" => NodeKind::InlineLiteral,
        "subscript" => NodeKind::Subscript,
        "superscript" => NodeKind::Superscript,
        "title_reference" => NodeKind::TitleReference,
        "reference" => NodeKind::Reference {
            target: fields.required_str("target")?.to_string(),
        },
        "term_reference" => NodeKind::TermReference {
            target: fields.required_str("target")?.to_string(),
        },
        "anchor" => NodeKind::Anchor {
            id: fields.required_str("id")?.to_string(),
        },
        "image" => NodeKind::Image {
            uri: fields.required_str("uri")?.to_string(),
            alt: fields.optional_str("alt")?,
            align: fields.optional_str("align")?,
            scale: fields.scale()?,
        },
        "figure" => NodeKind::Figure,
        "caption" => NodeKind::Caption,
        "comment" => NodeKind::Comment,
        "text" => NodeKind::Text {
            content: fields.required_str("content")?.to_string(),
        },
        other => NodeKind::Unknown {
            name: other.to_string(),
        },
    };

    let children = match object.get("children") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| node_from_value(item, &path.child(index)))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => {
            return Err(SourceError::InvalidField {
                path: path.clone(),
                field: "children",
                expected: "an array",
            });
        }
    };
    Ok(SourceNode::with_children(kind, children))
}

struct Fields<'a> {
    object: &'a Map<String, Value>,
    path: &'a NodePath,
}

impl<'a> Fields<'a> {
    fn invalid(&self, field: &'static str, expected: &'static str) -> SourceError {
        SourceError::InvalidField {
            path: self.path.clone(),
            field,
            expected,
        }
    }

    fn required_str(&self, field: &'static str) -> Result<&'a str, SourceError> {
        match self.object.get(field) {
            Some(Value::String(value)) => Ok(value),
            Some(_) => Err(self.invalid(field, "a string")),
            None => Err(SourceError::MissingField {
                path: self.path.clone(),
                field,
            }),
        }
    }

    fn optional_str(&self, field: &'static str) -> Result<Option<String>, SourceError> {
        match self.object.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.clone())),
            Some(_) => Err(self.invalid(field, "a string")),
        }
    }

    fn flag(&self, field: &'static str) -> Result<bool, SourceError> {
        match self.object.get(field) {
            None | Some(Value::Null) => Ok(false),
            Some(Value::Bool(value)) => Ok(*value),
            Some(_) => Err(self.invalid(field, "a boolean")),
        }
    }

    fn level(&self) -> Result<u8, SourceError> {
        match self.object.get("level") {
            None | Some(Value::Null) => Ok(1),
            Some(value) => value
                .as_u64()
                .and_then(|level| u8::try_from(level).ok())
                .ok_or_else(|| self.invalid("level", "an integer between 0 and 255")),
        }
    }

    /// Scale is accepted as a number or a string and kept as written.
    fn scale(&self) -> Result<Option<String>, SourceError> {
        match self.object.get("scale") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.clone())),
            Some(Value::Number(value)) => Ok(Some(value.to_string())),
            Some(_) => Err(self.invalid("scale", "a number or string")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_kinds_and_attributes() {
        let tree = source_from_json(
            r#"{"type": "document", "children": [
                {"type": "section", "id": "intro", "children": [
                    {"type": "title", "children": [{"type": "text", "content": "Intro"}]},
                    {"type": "literal", "kind": "lines", "children": []},
                    {"type": "image", "uri": "a.png", "scale": 50}
                ]}
            ]}"#,
        )
        .unwrap();
        let section = &tree.children[0];
        assert_eq!(
            section.kind,
            NodeKind::Section {
                level: 1,
                id: Some("intro".into())
            }
        );
        assert_eq!(section.children[0].text_content(), "Intro");
        assert!(matches!(
            section.children[1].kind,
            NodeKind::Literal {
                kind: LiteralKind::Lines,
                ..
            }
        ));
        match &section.children[2].kind {
            NodeKind::Image { scale, .. } => assert_eq!(scale.as_deref(), Some("50")),
            other => panic!("expected image, got {:?}", other),
        }
    }

    #[test]
    fn loads_glossary_fields_and_version_notes() {
        let tree = source_from_json(
            r#"{"type": "document", "children": [
                {"type": "topic", "children": []},
                {"type": "version_modified", "change": "versionadded", "version": "2.1"},
                {"type": "version_modified", "change": "deprecated"},
                {"type": "glossary", "id": "terms", "children": [
                    {"type": "glossary_entry", "id": "term-api"}
                ]},
                {"type": "field_list", "children": [{"type": "field", "name": "date"}]},
                {"type": "paragraph", "children": [{"type": "term_reference", "target": "api"}]}
            ]}"#,
        )
        .unwrap();
        let kinds: Vec<&NodeKind> = tree.children.iter().map(|child| &child.kind).collect();
        assert_eq!(kinds[0], &NodeKind::Topic { id: None });
        assert_eq!(
            kinds[1],
            &NodeKind::VersionModified {
                change: "versionadded".into(),
                version: "2.1".into()
            }
        );
        assert_eq!(
            kinds[2],
            &NodeKind::VersionModified {
                change: "deprecated".into(),
                version: String::new()
            }
        );
        assert_eq!(
            tree.children[3].children[0].kind,
            NodeKind::GlossaryEntry {
                id: Some("term-api".into())
            }
        );
        assert_eq!(
            tree.children[4].children[0].kind,
            NodeKind::Field {
                name: "date".into()
            }
        );
        assert_eq!(
            tree.children[5].children[0].kind,
            NodeKind::TermReference {
                target: "api".into()
            }
        );
    }

    #[test]
    fn unknown_types_load_as_unknown() {
        let tree =
            source_from_json(r#"{"type": "document", "children": [{"type": "sidebar"}]}"#).unwrap();
        assert_eq!(
            tree.children[0].kind,
            NodeKind::Unknown {
                name: "sidebar".into()
            }
        );
    }

    #[test]
    fn reports_missing_fields_with_their_path() {
        let err = source_from_json(
            r#"{"type": "document", "children": [{"type": "paragraph"}, {"type": "reference"}]}"#,
        )
        .unwrap_err();
        match err {
            SourceError::MissingField { path, field } => {
                assert_eq!(path, NodePath(vec![1]));
                assert_eq!(field, "target");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn root_must_be_a_document() {
        let err = source_from_json(r#"{"type": "paragraph"}"#).unwrap_err();
        assert!(matches!(err, SourceError::NotADocument { .. }));
    }
}
