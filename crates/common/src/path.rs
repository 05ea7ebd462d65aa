//! # Field Paths
//!
//! Dotted paths from an instance's root object to one field, including
//! collection index segments: `stats.health`, `waypoints[2].position`.
//!
//! Paths are the positional half of a field node's identity; the other half
//! is the owning instance id. All per-field caches (expansion, selection,
//! list controllers) are keyed by `(InstanceId, FieldPath)`.

use std::fmt;

/// One step in a [`FieldPath`]
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

/// Path from a root object to a nested field
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// The empty path, addressing the root object itself
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    /// Parse `a.b[3].c`. Malformed index segments are kept as field names.
    pub fn parse(text: &str) -> Self {
        let mut segments = Vec::new();
        for part in text.split('.').filter(|p| !p.is_empty()) {
            let mut rest = part;
            if let Some(open) = rest.find('[') {
                let name = &rest[..open];
                if !name.is_empty() {
                    segments.push(PathSegment::Field(name.to_string()));
                }
                rest = &rest[open..];
                while let Some(stripped) = rest.strip_prefix('[') {
                    let Some(close) = stripped.find(']') else {
                        segments.push(PathSegment::Field(rest.to_string()));
                        rest = "";
                        break;
                    };
                    match stripped[..close].parse::<usize>() {
                        Ok(index) => segments.push(PathSegment::Index(index)),
                        Err(_) => segments.push(PathSegment::Field(stripped[..close].to_string())),
                    }
                    rest = &stripped[close + 1..];
                }
                if !rest.is_empty() {
                    segments.push(PathSegment::Field(rest.to_string()));
                }
            } else {
                segments.push(PathSegment::Field(rest.to_string()));
            }
        }
        Self { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Append a named field segment
    pub fn field(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Field(name.to_string()));
        Self { segments }
    }

    /// Append a collection index segment
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Index(index));
        Self { segments }
    }

    /// Path of the structural parent (the container path)
    pub fn container(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self { segments }
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// Name of the last field segment, if the path ends in one
    pub fn leaf_name(&self) -> Option<&str> {
        match self.segments.last() {
            Some(PathSegment::Field(name)) => Some(name),
            _ => None,
        }
    }

    /// True if `self` equals `prefix` or lies underneath it
    pub fn starts_with(&self, prefix: &FieldPath) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Field(name) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(name)?;
                }
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}
