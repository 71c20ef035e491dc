//! Canonical paths into the remote JSON tree.
//!
//! A path is an ordered sequence of non-empty segments rooted at `/`:
//! - Segments must not be empty and never contain `/`
//! - Segments must not contain `.`, `$`, `#`, `[`, `]` or control characters
//! - The canonical string joins segments with `/` and starts with `/`
//! - The root path has no segments and renders as exactly `/`
//!
//! Paths are immutable. [`Path::child`] and [`Path::parent`] return new
//! values.

use std::fmt;
use std::str::FromStr;

use crate::error::{PathError, PathResult};

/// Characters the remote key space forbids anywhere in a segment.
const FORBIDDEN_CHARS: &[char] = &['.', '$', '#', '[', ']'];

/// An immutable, validated path into the remote tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// The root path `/`.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a user-supplied path string.
    ///
    /// Stray slashes are normalized away, so `"a/b"`, `"/a/b"` and
    /// `"/a//b/"` all produce `/a/b`. Each remaining segment is validated.
    ///
    /// # Examples
    ///
    /// ```
    /// use rtdb_types::Path;
    ///
    /// let path = Path::parse("/users//alice/").unwrap();
    /// assert_eq!(path.to_string(), "/users/alice");
    /// assert!(Path::parse("users/a.b").is_err());
    /// ```
    pub fn parse(s: &str) -> PathResult<Self> {
        let mut segments = Vec::new();
        for segment in s.split('/').filter(|seg| !seg.is_empty()) {
            validate_segment(s, segment)?;
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    /// Parse a relative path strictly: every segment between slashes must be
    /// non-empty, including the first and the last.
    pub fn relative(s: &str) -> PathResult<Self> {
        if s.is_empty() {
            return Err(PathError::EmptySegment {
                path: s.to_string(),
            });
        }
        let mut segments = Vec::new();
        for segment in s.split('/') {
            validate_segment(s, segment)?;
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    /// Append a segment (or a `/`-separated run of segments) to this path.
    pub fn child(&self, relative: &str) -> PathResult<Self> {
        Ok(self.join(&Self::relative(relative)?))
    }

    /// Concatenate another path onto this one.
    pub fn join(&self, other: &Path) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    /// The path with its last segment removed.
    ///
    /// The parent of the root is the root itself.
    pub fn parent(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self { segments }
    }

    /// The last segment, or `""` for the root.
    pub fn key(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns `true` if `other` equals this path or lies beneath it.
    pub fn is_prefix_of(&self, other: &Path) -> bool {
        other.segments.len() >= self.segments.len()
            && self
                .segments
                .iter()
                .zip(other.segments.iter())
                .all(|(a, b)| a == b)
    }
}

fn validate_segment(path: &str, segment: &str) -> PathResult<()> {
    if segment.is_empty() {
        return Err(PathError::EmptySegment {
            path: path.to_string(),
        });
    }
    if let Some(ch) = segment
        .chars()
        .find(|ch| FORBIDDEN_CHARS.contains(ch) || ch.is_ascii_control())
    {
        return Err(PathError::ForbiddenCharacter {
            path: path.to_string(),
            segment: segment.to_string(),
            ch,
        });
    }
    Ok(())
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> PathResult<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn root_renders_as_slash() {
        let root = Path::root();
        assert_eq!(root.to_string(), "/");
        assert_eq!(root.key(), "");
        assert!(root.is_root());
    }

    #[test]
    fn parse_normalizes_slashes() {
        assert_eq!(Path::parse("").unwrap(), Path::root());
        assert_eq!(Path::parse("/").unwrap(), Path::root());
        assert_eq!(Path::parse("a/b").unwrap().to_string(), "/a/b");
        assert_eq!(Path::parse("//a//b//").unwrap().to_string(), "/a/b");
    }

    #[test]
    fn parse_rejects_forbidden_chars() {
        for bad in ["a.b", "a$b", "a#b", "a[b", "a]b", "a\u{7f}b"] {
            let err = Path::parse(&format!("users/{bad}")).unwrap_err();
            assert!(matches!(err, PathError::ForbiddenCharacter { .. }), "{bad}");
        }
    }

    #[test]
    fn key_and_display() {
        let path = Path::parse("_adminsdk/rust/dinodb").unwrap();
        assert_eq!(path.key(), "dinodb");
        assert_eq!(path.to_string(), "/_adminsdk/rust/dinodb");
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn child_appends_nested_segments() {
        let path = Path::parse("dinodb").unwrap();
        let child = path.child("dinosaurs/lambeosaurus").unwrap();
        assert_eq!(child.to_string(), "/dinodb/dinosaurs/lambeosaurus");
        assert_eq!(child.key(), "lambeosaurus");
    }

    #[test]
    fn child_rejects_empty_segments() {
        let path = Path::parse("dinodb").unwrap();
        for bad in ["", "a//b", "/a", "a/"] {
            assert!(
                matches!(path.child(bad), Err(PathError::EmptySegment { .. })),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn child_rejects_forbidden_chars() {
        let path = Path::root();
        assert!(path.child("a.b").is_err());
        assert!(path.child("ok/bad$").is_err());
    }

    #[test]
    fn parent_of_root_is_root() {
        assert_eq!(Path::root().parent(), Path::root());
        assert_eq!(Path::root().parent().parent(), Path::root());
    }

    #[test]
    fn parent_drops_last_segment() {
        let path = Path::parse("_adminsdk/rust/dinodb").unwrap();
        let parent = path.parent();
        assert_eq!(parent.to_string(), "/_adminsdk/rust");
        assert_eq!(parent.key(), "rust");
    }

    #[test]
    fn prefix_relation() {
        let a = Path::parse("a").unwrap();
        let ab = Path::parse("a/b").unwrap();
        let ac = Path::parse("ac").unwrap();
        assert!(a.is_prefix_of(&ab));
        assert!(a.is_prefix_of(&a));
        assert!(!ab.is_prefix_of(&a));
        assert!(!a.is_prefix_of(&ac));
        assert!(Path::root().is_prefix_of(&ab));
    }

    fn segment() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9_-]{1,12}"
    }

    proptest! {
        #[test]
        fn child_then_parent_is_identity(
            base in proptest::collection::vec(segment(), 0..5),
            leaf in segment(),
        ) {
            let path = Path::parse(&base.join("/")).unwrap();
            let child = path.child(&leaf).unwrap();
            prop_assert_eq!(child.key(), leaf.as_str());
            prop_assert_eq!(child.parent(), path);
        }

        #[test]
        fn canonical_form_round_trips(segments in proptest::collection::vec(segment(), 0..6)) {
            let path = Path::parse(&segments.join("/")).unwrap();
            let rendered = path.to_string();
            prop_assert!(rendered.starts_with('/'));
            prop_assert!(rendered == "/" || !rendered.ends_with('/'));
            prop_assert_eq!(Path::parse(&rendered).unwrap(), path);
        }
    }
}
