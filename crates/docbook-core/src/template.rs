//! Output templates: caller-supplied text with `{{data.root_element}}` and
//! `{{data.contents}}` placeholders that wrap the converted body.

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};

use crate::error::TemplateError;

static ROOT_ELEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*data\.root_element\s*\}\}").expect("valid root_element placeholder regex")
});
static CONTENTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*data\.contents\s*\}\}").expect("valid contents placeholder regex")
});

/// Output wrapper text with `{{data.root_element}}` and `{{data.contents}}`
/// placeholders. Both must appear at least once.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Template {
    text: String,
}

impl Template {
    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        if !ROOT_ELEMENT.is_match(text) {
            return Err(TemplateError::MissingRootElement);
        }
        if !CONTENTS.is_match(text) {
            return Err(TemplateError::MissingContents);
        }
        Ok(Self {
            text: text.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Substitutes every placeholder. The root element goes in first so that
    /// placeholder-shaped text inside `contents` is left alone.
    pub fn render(&self, root_element: &str, contents: &str) -> String {
        let with_root = ROOT_ELEMENT.replace_all(&self.text, NoExpand(root_element));
        CONTENTS
            .replace_all(&with_root, NoExpand(contents))
            .into_owned()
    }
}
