use serde::{Deserialize, Serialize};
use std::fmt;

/// One step into the configuration tree
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
    /// Placeholder for "the current array item" inside item templates
    Item,
}

impl Serialize for PathSegment {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            PathSegment::Key(key) => serializer.serialize_str(key),
            PathSegment::Index(index) => serializer.serialize_u64(*index as u64),
            PathSegment::Item => serializer.serialize_str("*"),
        }
    }
}

impl<'de> Deserialize<'de> for PathSegment {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Index(usize),
            Key(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Index(index) => PathSegment::Index(index),
            Raw::Key(key) if key == "*" => PathSegment::Item,
            Raw::Key(key) => PathSegment::Key(key),
        })
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(index) => write!(f, "{index}"),
            PathSegment::Item => f.write_str("*"),
        }
    }
}

/// Location of a field inside the nested configuration object
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    /// Parse dot notation; numeric parts become indices and `*` becomes the item placeholder.
    pub fn parse(dotted: &str) -> Self {
        if dotted.is_empty() {
            return Self::root();
        }
        Self(
            dotted
                .split('.')
                .map(|part| match part {
                    "*" => PathSegment::Item,
                    _ => match part.parse::<usize>() {
                        Ok(index) => PathSegment::Index(index),
                        Err(_) => PathSegment::Key(part.to_string()),
                    },
                })
                .collect(),
        )
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, segment: impl Into<PathSegment>) {
        self.0.push(segment.into());
    }

    pub fn child(&self, segment: impl Into<PathSegment>) -> Self {
        let mut next = self.clone();
        next.push(segment);
        next
    }

    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    pub fn last_key(&self) -> Option<&str> {
        match self.0.last() {
            Some(PathSegment::Key(key)) => Some(key),
            _ => None,
        }
    }

    /// Substitute the first item placeholder with a concrete index.
    ///
    /// Nested arrays are resolved outermost first, one call per level.
    pub fn with_index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        if let Some(slot) = segments.iter_mut().find(|s| **s == PathSegment::Item) {
            *slot = PathSegment::Index(index);
        }
        Self(segments)
    }

    /// True once every item placeholder has been substituted
    pub fn is_concrete(&self) -> bool {
        !self.0.contains(&PathSegment::Item)
    }

    pub fn starts_with(&self, prefix: &FieldPath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Stable identifier derived from the path
    pub fn id(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl From<&str> for FieldPath {
    fn from(dotted: &str) -> Self {
        FieldPath::parse(dotted)
    }
}

impl<const N: usize> From<[&str; N]> for FieldPath {
    fn from(keys: [&str; N]) -> Self {
        FieldPath(keys.iter().map(|k| PathSegment::from(*k)).collect())
    }
}
