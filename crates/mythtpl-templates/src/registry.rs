use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

use crate::error::TemplateError;

/// Callback that renders a custom tag from its captured groups.
pub type TagCallback = Arc<dyn Fn(&TagMatches) -> String + Send + Sync>;

/// All occurrences of one capture group across a token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureGroup {
    pub name: Option<String>,
    /// One entry per match in the token; empty strings for groups that did
    /// not participate.
    pub values: Vec<String>,
}

/// Capture groups of a custom tag pattern, grouped by index with group 0
/// holding the full matches.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagMatches {
    pub groups: Vec<CaptureGroup>,
}

impl TagMatches {
    fn collect(pattern: &Regex, text: &str) -> Option<Self> {
        let mut groups: Vec<CaptureGroup> = pattern
            .capture_names()
            .map(|name| CaptureGroup {
                name: name.map(str::to_string),
                values: Vec::new(),
            })
            .collect();

        let mut found = false;
        for captures in pattern.captures_iter(text) {
            found = true;
            for (idx, group) in groups.iter_mut().enumerate() {
                let value = captures.get(idx).map_or("", |m| m.as_str());
                group.values.push(value.to_string());
            }
        }

        found.then_some(Self { groups })
    }

    #[must_use]
    pub fn group(&self, index: usize) -> Option<&[String]> {
        self.groups.get(index).map(|g| g.values.as_slice())
    }

    #[must_use]
    pub fn named(&self, name: &str) -> Option<&[String]> {
        self.groups
            .iter()
            .find(|g| g.name.as_deref() == Some(name))
            .map(|g| g.values.as_slice())
    }

    /// First match of a group, the common case for single-occurrence tags.
    #[must_use]
    pub fn first(&self, index: usize) -> Option<&str> {
        self.group(index)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

struct RegisteredTag {
    name: String,
    pattern: Regex,
    callback: TagCallback,
}

/// User-defined tags, consulted in registration order after the built-ins.
///
/// Build the registry up front and share it behind an [`Arc`]; the compiler
/// only reads from it.
#[derive(Default)]
pub struct TagRegistry {
    tags: Vec<RegisteredTag>,
}

impl TagRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tag. Re-registering a name replaces the earlier entry but
    /// keeps its position.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::InvalidPattern`] when `pattern` does not compile.
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        pattern: &str,
        callback: F,
    ) -> Result<&mut Self, TemplateError>
    where
        F: Fn(&TagMatches) -> String + Send + Sync + 'static,
    {
        let name = name.into();
        let pattern = Regex::new(pattern).map_err(|err| TemplateError::InvalidPattern {
            name: name.clone(),
            message: err.to_string(),
        })?;

        let tag = RegisteredTag {
            name,
            pattern,
            callback: Arc::new(callback),
        };

        match self.tags.iter_mut().find(|t| t.name == tag.name) {
            Some(existing) => {
                tracing::debug!("replacing custom tag '{}'", tag.name);
                *existing = tag;
            }
            None => self.tags.push(tag),
        }

        Ok(self)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|t| t.name.as_str())
    }

    /// Every registered tag whose pattern matches `text`, in registration order.
    pub fn matches<'a>(&'a self, text: &'a str) -> impl Iterator<Item = (&'a str, TagMatches)> + 'a {
        self.tags.iter().filter_map(move |tag| {
            TagMatches::collect(&tag.pattern, text).map(|m| (tag.name.as_str(), m))
        })
    }

    /// Run a tag's callback, as a renderer does for each custom-tag instruction.
    #[must_use]
    pub fn invoke(&self, name: &str, matches: &TagMatches) -> Option<String> {
        self.tags
            .iter()
            .find(|t| t.name == name)
            .map(|t| (t.callback)(matches))
    }
}

impl fmt::Debug for TagRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagRegistry")
            .field("tags", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TagRegistry {
        let mut registry = TagRegistry::new();
        registry
            .register("date", r"\{date\}", |_| "2024-01-01".to_string())
            .unwrap()
            .register("upper", r"\{upper=(?P<word>\w+)\}", |m| {
                m.named("word").map(|w| w[0].to_uppercase()).unwrap_or_default()
            })
            .unwrap();
        registry
    }

    #[test]
    fn matches_in_registration_order() {
        let registry = registry();
        let names: Vec<_> = registry.matches("{date}").map(|(name, _)| name).collect();
        assert_eq!(names, vec!["date"]);
        assert_eq!(registry.matches("{nothing}").count(), 0);
    }

    #[test]
    fn groups_keep_names_and_indices() {
        let registry = registry();
        let (_, matches) = registry.matches("{upper=abc}").next().unwrap();
        assert_eq!(matches.first(0), Some("{upper=abc}"));
        assert_eq!(matches.first(1), Some("abc"));
        assert_eq!(matches.named("word"), Some(&["abc".to_string()][..]));
        assert_eq!(registry.invoke("upper", &matches).as_deref(), Some("ABC"));
    }

    #[test]
    fn collects_every_occurrence() {
        let mut registry = TagRegistry::new();
        registry
            .register("pair", r"(\w)(\d)?", |_| String::new())
            .unwrap();
        let (_, matches) = registry.matches("a1b").next().unwrap();
        assert_eq!(matches.group(1).unwrap(), ["a", "b"]);
        assert_eq!(matches.group(2).unwrap(), ["1", ""]);
    }

    #[test]
    fn reregistering_replaces_in_place() {
        let mut registry = registry();
        registry
            .register("date", r"\{today\}", |_| "now".to_string())
            .unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["date", "upper"]);
        assert_eq!(registry.matches("{date}").count(), 0);
        let (_, matches) = registry.matches("{today}").next().unwrap();
        assert_eq!(registry.invoke("date", &matches).as_deref(), Some("now"));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let mut registry = TagRegistry::new();
        let err = registry
            .register("broken", r"\{(", |_| String::new())
            .unwrap_err();
        assert!(matches!(err, TemplateError::InvalidPattern { ref name, .. } if name == "broken"));
        assert_eq!(err.code(), "M200");
        assert!(registry.is_empty());
    }

    #[test]
    fn invoke_unknown_tag() {
        assert_eq!(registry().invoke("missing", &TagMatches::default()), None);
    }
}
