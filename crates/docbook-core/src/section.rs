//! Maps section nesting depth to DocBook sectioning tags.

/// DocBook's sectioning tags, outermost first.
pub const DEFAULT_HIERARCHY: [&str; 6] = ["chapter", "section", "sect2", "sect3", "sect4", "sect5"];

pub const DEFAULT_ROOT_ELEMENT: &str = "section";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SectionHierarchy {
    tags: Vec<String>,
}

impl Default for SectionHierarchy {
    fn default() -> Self {
        Self {
            tags: DEFAULT_HIERARCHY.iter().map(|tag| tag.to_string()).collect(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LevelResolution {
    pub tag: String,
    /// Set when the depth ran past the table and the deepest tag was reused.
    pub clamped: bool,
}

impl SectionHierarchy {
    /// Builds a hierarchy from `tags`; an empty list falls back to the default table.
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        if tags.is_empty() {
            Self::default()
        } else {
            Self { tags }
        }
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Picks the sectioning tag for a section nested `depth` sections deep.
    ///
    /// Depth 0 is always `root`. Deeper levels walk the table starting after
    /// the root's own slot; a root missing from the table occupies slot 0.
    pub fn resolve_level(&self, depth: usize, root: &str) -> LevelResolution {
        if depth == 0 {
            return LevelResolution {
                tag: root.to_string(),
                clamped: false,
            };
        }
        let base = self.tags.iter().position(|tag| tag == root).unwrap_or(0);
        let index = base + depth;
        match self.tags.get(index) {
            Some(tag) => LevelResolution {
                tag: tag.clone(),
                clamped: false,
            },
            None => LevelResolution {
                tag: self.tags.last().cloned().unwrap_or_else(|| root.to_string()),
                clamped: true,
            },
        }
    }

    /// Deepest depth that still resolves without clamping under `root`.
    pub fn max_depth(&self, root: &str) -> usize {
        let base = self.tags.iter().position(|tag| tag == root).unwrap_or(0);
        self.tags.len().saturating_sub(base + 1)
    }
}

/// [`SectionHierarchy::resolve_level`] against the default table.
pub fn resolve_level(depth: usize, configured_root: &str) -> LevelResolution {
    SectionHierarchy::default().resolve_level(depth, configured_root)
}
