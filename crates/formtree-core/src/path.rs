#![forbid(unsafe_code)]

//! Deep-path addressing into `serde_json::Value` trees.
//!
//! A [`Path`] is an ordered sequence of [`Seg`]ments addressing a node in a
//! nested tree of objects, arrays, and primitives. Paths are expressible as
//! dot-joined strings (`"a.b.0.c"`) or built from segments directly; both
//! forms resolve identically.
//!
//! # Invariants
//!
//! 1. The empty path addresses the tree itself: `resolve(tree, &Path::root())`
//!    is always `Some(tree)`. "Unset" means "operate on the whole node",
//!    never "fail".
//! 2. [`resolve`] is total: missing keys, out-of-range indices, and traversal
//!    through primitives yield `None`, never a panic.
//! 3. [`resolve`] never creates intermediate containers. Only [`assign`] and
//!    [`ensure`] auto-vivify, and they do so per segment kind: a missing
//!    [`Seg::Key`] step becomes an object, a missing [`Seg::Index`] step
//!    becomes an array padded with `null`.
//! 4. An index segment is accepted as either a number or a canonical digit
//!    string: `Seg::Index(0)` and `Seg::Key("0".into())` address the same
//!    node in both arrays and digit-keyed objects. Digit strings with a
//!    leading zero (`"01"`) stay keys, so paths round-trip through
//!    `Display` unchanged.
//! 5. Empty string fragments behave identically to no path at all:
//!    `Path::parse("")` is the empty path, and `"a..b"` parses as `"a.b"`.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Seg
// ---------------------------------------------------------------------------

/// One step of a [`Path`]: an object key or an array index.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Seg {
    /// Object member lookup by key.
    Key(String),
    /// Array element lookup by position (also matches digit-keyed objects).
    Index(usize),
}

impl Seg {
    /// The segment as an array index, if it is one.
    ///
    /// `Index(i)` yields `i`; `Key(k)` yields a parse of `k` when it is a
    /// canonical digit string. Non-numeric keys yield `None`.
    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Seg::Index(i) => Some(*i),
            Seg::Key(k) => parse_index(k),
        }
    }
}

/// A canonical index string: all digits, no leading zero (except `"0"`).
/// `"01"` is a key, not an index, so such segments round-trip through
/// `Display` unchanged.
fn parse_index(s: &str) -> Option<usize> {
    if s.is_empty() || (s.len() > 1 && s.starts_with('0')) {
        return None;
    }
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl fmt::Display for Seg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seg::Key(k) => f.write_str(k),
            Seg::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for Seg {
    fn from(s: &str) -> Self {
        match parse_index(s) {
            Some(i) => Seg::Index(i),
            None => Seg::Key(s.to_owned()),
        }
    }
}

impl From<usize> for Seg {
    fn from(i: usize) -> Self {
        Seg::Index(i)
    }
}

// ---------------------------------------------------------------------------
// Path
// ---------------------------------------------------------------------------

/// An addressing key into a nested tree: an ordered sequence of segments.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Path(Vec<Seg>);

impl Path {
    /// The empty path, addressing the whole tree.
    #[must_use]
    pub fn root() -> Self {
        Path(Vec::new())
    }

    /// Parse a dot-joined path string. All-digit segments become indices;
    /// empty segments (and the empty string) are skipped.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        s.split('.').filter(|seg| !seg.is_empty()).map(Seg::from).collect()
    }

    /// The segments, in order.
    #[must_use]
    pub fn segs(&self) -> &[Seg] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Append a segment in place.
    pub fn push(&mut self, seg: impl Into<Seg>) {
        self.0.push(seg.into());
    }

    /// Concatenate, yielding `self` followed by `other`.
    #[must_use]
    pub fn join(&self, other: &Path) -> Path {
        let mut segs = self.0.clone();
        segs.extend(other.0.iter().cloned());
        Path(segs)
    }

    /// The path without its last segment; `None` for the empty path.
    #[must_use]
    pub fn parent(&self) -> Option<Path> {
        if self.0.is_empty() {
            None
        } else {
            Some(Path(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Non-empty prefixes of this path, shortest first, ending with the
    /// path itself. Empty for the empty path.
    pub fn prefixes(&self) -> impl Iterator<Item = Path> + '_ {
        (1..=self.0.len()).map(|n| Path(self.0[..n].to_vec()))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{seg}")?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Path::parse(s))
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Path::parse(s)
    }
}

impl From<String> for Path {
    fn from(s: String) -> Self {
        Path::parse(&s)
    }
}

impl FromIterator<Seg> for Path {
    fn from_iter<I: IntoIterator<Item = Seg>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

/// Concatenate optional path fragments, skipping absent ones, into one
/// normalized path.
///
/// Used to compose a field's relative name with ambient prefixes (scope
/// nesting, array indices).
#[must_use]
pub fn merge_paths<'a, I>(parts: I) -> Path
where
    I: IntoIterator<Item = Option<&'a Path>>,
{
    let mut out = Path::root();
    for part in parts.into_iter().flatten() {
        out.0.extend(part.0.iter().cloned());
    }
    out
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

/// Resolve `path` within `tree`, returning the addressed node.
///
/// The empty path yields `Some(tree)`. Any miss — absent key, out-of-range
/// index, traversal through a primitive — yields `None`.
#[must_use]
pub fn resolve<'a>(tree: &'a Value, path: &Path) -> Option<&'a Value> {
    let mut cur = tree;
    for seg in path.segs() {
        cur = match cur {
            Value::Object(map) => match seg {
                Seg::Key(k) => map.get(k)?,
                Seg::Index(i) => map.get(&i.to_string())?,
            },
            Value::Array(items) => items.get(seg.as_index()?)?,
            _ => return None,
        };
    }
    Some(cur)
}

/// Set `value` at `path` within `tree`, creating missing intermediates.
///
/// The empty path merges an object `value`'s keys shallowly into an object
/// `tree` (preserving sibling keys); any other combination replaces `tree`
/// wholesale. A non-empty path auto-vivifies missing or mistyped
/// intermediates per segment kind before setting the terminal node.
pub fn assign(tree: &mut Value, path: &Path, value: Value) {
    if path.is_empty() {
        match (tree, value) {
            (Value::Object(dst), Value::Object(src)) => {
                for (k, v) in src {
                    dst.insert(k, v);
                }
            }
            (dst, value) => *dst = value,
        }
        return;
    }
    *ensure(tree, path) = value;
}

/// Walk to the node at `path`, vivifying containers along the way, and
/// return a mutable reference to it.
///
/// Intermediates take the container kind the next segment demands: objects
/// for keys, `null`-padded arrays for indices. Existing objects keep digit
/// keys even for index segments; anything else in the way is replaced.
pub fn ensure<'a>(tree: &'a mut Value, path: &Path) -> &'a mut Value {
    let mut cur = tree;
    for seg in path.segs() {
        cur = slot(cur, seg);
    }
    cur
}

/// Descend one segment with vivification.
///
/// An existing object wins even for digit segments, so shadow trees that
/// were converted to digit-keyed objects stay addressable.
fn slot<'a>(cur: &'a mut Value, seg: &Seg) -> &'a mut Value {
    match seg.as_index() {
        Some(i) if !cur.is_object() => {
            if !cur.is_array() {
                *cur = Value::Array(Vec::new());
            }
            let Value::Array(items) = cur else {
                unreachable!("just vivified an array")
            };
            while items.len() <= i {
                items.push(Value::Null);
            }
            &mut items[i]
        }
        _ => {
            if !cur.is_object() {
                *cur = Value::Object(Map::new());
            }
            let Value::Object(map) = cur else {
                unreachable!("just vivified an object")
            };
            map.entry(seg.to_string()).or_insert(Value::Null)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn parse_splits_on_dots() {
        let p = Path::parse("a.b.0.c");
        assert_eq!(
            p.segs(),
            &[
                Seg::Key("a".into()),
                Seg::Key("b".into()),
                Seg::Index(0),
                Seg::Key("c".into()),
            ]
        );
    }

    #[test]
    fn parse_empty_is_root() {
        assert!(Path::parse("").is_empty());
        assert_eq!(Path::parse("a..b"), Path::parse("a.b"));
    }

    #[test]
    fn display_round_trips() {
        for s in ["a.b.0.c", "items.10.name", "x"] {
            assert_eq!(Path::parse(s).to_string(), s);
        }
    }

    #[test]
    fn string_and_segment_forms_resolve_identically() {
        let tree = json!({"items": [{"name": "x"}]});
        let from_str = Path::parse("items.0.name");
        let from_segs: Path =
            [Seg::Key("items".into()), Seg::Index(0), Seg::Key("name".into())]
                .into_iter()
                .collect();
        assert_eq!(resolve(&tree, &from_str), resolve(&tree, &from_segs));
        assert_eq!(resolve(&tree, &from_str), Some(&json!("x")));
    }

    #[test]
    fn resolve_empty_path_is_identity() {
        let tree = json!({"a": 1});
        assert_eq!(resolve(&tree, &Path::root()), Some(&tree));
    }

    #[test]
    fn resolve_misses_yield_none() {
        let tree = json!({"a": {"b": 1}, "xs": [1, 2]});
        assert_eq!(resolve(&tree, &"a.c".into()), None);
        assert_eq!(resolve(&tree, &"xs.5".into()), None);
        assert_eq!(resolve(&tree, &"a.b.deeper".into()), None);
        assert_eq!(resolve(&tree, &"missing.entirely".into()), None);
    }

    #[test]
    fn leading_zero_segments_stay_keys() {
        assert_eq!(Seg::from("0"), Seg::Index(0));
        assert_eq!(Seg::from("10"), Seg::Index(10));
        assert_eq!(Seg::from("01"), Seg::Key("01".into()));

        let tree = json!({"01": "x", "xs": ["a", "b"]});
        assert_eq!(resolve(&tree, &"01".into()), Some(&json!("x")));
        assert_eq!(resolve(&tree, &"xs.01".into()), None);
        assert_eq!(Path::parse("a.01").to_string(), "a.01");
    }

    #[test]
    fn index_segment_matches_digit_keyed_object() {
        let tree = json!({"xs": {"0": "zero"}});
        assert_eq!(resolve(&tree, &"xs.0".into()), Some(&json!("zero")));
    }

    #[test]
    fn assign_sets_and_vivifies() {
        let mut tree = json!({});
        assign(&mut tree, &"a.b.0.c".into(), json!(7));
        assert_eq!(tree, json!({"a": {"b": [{"c": 7}]}}));
    }

    #[test]
    fn assign_pads_arrays_with_null() {
        let mut tree = json!({});
        assign(&mut tree, &"xs.2".into(), json!("z"));
        assert_eq!(tree, json!({"xs": [null, null, "z"]}));
    }

    #[test]
    fn assign_through_primitive_replaces_it() {
        let mut tree = json!({"a": 5});
        assign(&mut tree, &"a.b".into(), json!(1));
        assert_eq!(tree, json!({"a": {"b": 1}}));
    }

    #[test]
    fn assign_empty_path_merges_objects() {
        let mut tree = json!({"values": {"a": 1}, "isSubmitting": true});
        assign(&mut tree, &Path::root(), json!({"values": {"a": 2}}));
        // Sibling keys beside the assigned ones survive.
        assert_eq!(tree, json!({"values": {"a": 2}, "isSubmitting": true}));
    }

    #[test]
    fn assign_empty_path_replaces_non_objects() {
        let mut tree = json!({"a": 1});
        assign(&mut tree, &Path::root(), json!(42));
        assert_eq!(tree, json!(42));
    }

    #[test]
    fn assign_preserves_array_siblings() {
        let mut tree = json!({"xs": [{"n": 1}, {"n": 2}]});
        assign(&mut tree, &"xs.1.n".into(), json!(9));
        assert_eq!(tree, json!({"xs": [{"n": 1}, {"n": 9}]}));
    }

    #[test]
    fn merge_paths_skips_absent_fragments() {
        let prefix = Path::parse("items.0");
        let name = Path::parse("name");
        let merged = merge_paths([Some(&prefix), None, Some(&name)]);
        assert_eq!(merged.to_string(), "items.0.name");

        let empty = Path::root();
        assert_eq!(merge_paths([Some(&empty), Some(&name)]), name);
    }

    #[test]
    fn prefixes_shortest_first() {
        let p = Path::parse("a.b.c");
        let got: Vec<String> = p.prefixes().map(|p| p.to_string()).collect();
        assert_eq!(got, ["a", "a.b", "a.b.c"]);
        assert_eq!(Path::root().prefixes().count(), 0);
    }

    #[test]
    fn parent_drops_last_segment() {
        assert_eq!(Path::parse("a.b").parent(), Some(Path::parse("a")));
        assert_eq!(Path::parse("a").parent(), Some(Path::root()));
        assert_eq!(Path::root().parent(), None);
    }

    // ---- property tests ----

    fn seg_strategy() -> impl Strategy<Value = Seg> {
        prop_oneof![
            "[a-z]{1,6}".prop_map(|k| Seg::Key(k)),
            (0usize..4).prop_map(Seg::Index),
        ]
    }

    fn path_strategy() -> impl Strategy<Value = Path> {
        prop::collection::vec(seg_strategy(), 1..5).prop_map(Path::from_iter)
    }

    fn value_strategy() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i32>().prop_map(|n| json!(n)),
            "[a-z]{0,4}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 16, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        // Resolve after assign always returns the assigned value.
        #[test]
        fn assign_then_resolve_round_trips(
            mut tree in value_strategy(),
            path in path_strategy(),
            replacement in value_strategy(),
        ) {
            assign(&mut tree, &path, replacement.clone());
            prop_assert_eq!(resolve(&tree, &path), Some(&replacement));
        }

        #[test]
        fn parse_display_round_trips(path in path_strategy()) {
            prop_assert_eq!(Path::parse(&path.to_string()), path);
        }
    }
}
