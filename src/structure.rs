//! Path-addressed access to nested JSON catalogs.
//!
//! A [`TreePath`] addresses one node of a tree; [`path_to_key`] renders it as the canonical
//! key (`a.b[0].c`) used everywhere else in the crate (prompts, cache fingerprints, reports).

use std::fmt;

use serde_json::Value;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathStep {
    Key(String),
    Index(usize),
}

impl From<&str> for PathStep {
    fn from(value: &str) -> Self {
        Self::Key(value.to_string())
    }
}

impl From<usize> for PathStep {
    fn from(value: usize) -> Self {
        Self::Index(value)
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(k) => f.write_str(k),
            Self::Index(i) => write!(f, "[{i}]"),
        }
    }
}

pub type TreePath = Vec<PathStep>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StructureError {
    #[error("path must not be empty")]
    EmptyPath,
    #[error("cannot traverse `{step}` at `{at}`")]
    Untraversable { at: String, step: String },
    #[error("cannot assign `{step}` at `{at}`")]
    Unassignable { at: String, step: String },
}

/// Depth-first iterator over string leaves, in map insertion order then array order.
pub struct StringNodes<'a> {
    stack: Vec<(TreePath, &'a Value)>,
}

impl<'a> Iterator for StringNodes<'a> {
    type Item = (TreePath, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((path, node)) = self.stack.pop() {
            match node {
                Value::Object(map) => {
                    for (k, v) in map.iter().rev() {
                        let mut child = path.clone();
                        child.push(PathStep::Key(k.clone()));
                        self.stack.push((child, v));
                    }
                }
                Value::Array(items) => {
                    for (i, v) in items.iter().enumerate().rev() {
                        let mut child = path.clone();
                        child.push(PathStep::Index(i));
                        self.stack.push((child, v));
                    }
                }
                Value::String(s) => return Some((path, s.as_str())),
                _ => {}
            }
        }
        None
    }
}

pub fn iter_string_nodes(tree: &Value) -> StringNodes<'_> {
    StringNodes {
        stack: vec![(Vec::new(), tree)],
    }
}

pub fn get_value<'a>(tree: &'a Value, path: &[PathStep]) -> Option<&'a Value> {
    let mut current = tree;
    for step in path {
        current = match (step, current) {
            (PathStep::Index(i), Value::Array(items)) => items.get(*i)?,
            (PathStep::Key(k), Value::Object(map)) => map.get(k)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Overwrites the node at `path`. Every non-terminal step must already exist.
pub fn set_value(tree: &mut Value, path: &[PathStep], value: Value) -> Result<(), StructureError> {
    let Some((last, parents)) = path.split_last() else {
        return Err(StructureError::EmptyPath);
    };

    let mut current = tree;
    for (depth, step) in parents.iter().enumerate() {
        let next = match (step, current) {
            (PathStep::Index(i), Value::Array(items)) => items.get_mut(*i),
            (PathStep::Key(k), Value::Object(map)) => map.get_mut(k),
            _ => None,
        };
        current = next.ok_or_else(|| StructureError::Untraversable {
            at: path_to_key(&path[..depth]),
            step: step.to_string(),
        })?;
    }

    match (last, current) {
        (PathStep::Index(i), Value::Array(items)) if *i < items.len() => {
            items[*i] = value;
            Ok(())
        }
        (PathStep::Key(k), Value::Object(map)) => {
            map.insert(k.clone(), value);
            Ok(())
        }
        _ => Err(StructureError::Unassignable {
            at: path_to_key(parents),
            step: last.to_string(),
        }),
    }
}

pub fn path_to_key(path: &[PathStep]) -> String {
    let mut parts: Vec<String> = Vec::new();
    for step in path {
        match step {
            PathStep::Index(i) => match parts.last_mut() {
                Some(last) => last.push_str(&format!("[{i}]")),
                None => parts.push(format!("[{i}]")),
            },
            PathStep::Key(k) => parts.push(k.clone()),
        }
    }
    parts.join(".")
}

/// Inverse of [`path_to_key`] for keys whose field names contain neither `.` nor `[`.
pub fn parse_key(key: &str) -> Option<TreePath> {
    let mut path = TreePath::new();
    if key.is_empty() {
        return Some(path);
    }
    for segment in key.split('.') {
        let (field, mut rest) = match segment.find('[') {
            Some(i) => segment.split_at(i),
            None => (segment, ""),
        };
        if !field.is_empty() {
            path.push(PathStep::Key(field.to_string()));
        } else if rest.is_empty() || !path.is_empty() {
            return None;
        }
        while !rest.is_empty() {
            let inner = rest.strip_prefix('[')?;
            let close = inner.find(']')?;
            path.push(PathStep::Index(inner[..close].parse().ok()?));
            rest = &inner[close + 1..];
        }
    }
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(tree: &Value) -> Vec<String> {
        iter_string_nodes(tree).map(|(p, _)| path_to_key(&p)).collect()
    }

    #[test]
    fn flat_and_nested_maps() {
        assert_eq!(keys(&json!({"a": "v1", "b": "v2"})), vec!["a", "b"]);
        let nested = json!({"level1": {"level2": {"level3": "deep_value"}}});
        let nodes: Vec<_> = iter_string_nodes(&nested).collect();
        assert_eq!(nodes.len(), 1);
        assert_eq!(path_to_key(&nodes[0].0), "level1.level2.level3");
        assert_eq!(nodes[0].1, "deep_value");
    }

    #[test]
    fn arrays_and_insertion_order() {
        let tree = json!({"zeta": "z", "items": ["first", "second", "third"], "alpha": "a"});
        assert_eq!(
            keys(&tree),
            vec!["zeta", "items[0]", "items[1]", "items[2]", "alpha"]
        );
    }

    #[test]
    fn non_strings_are_skipped() {
        let tree = json!({"string": "text", "number": 123, "bool": true, "null": null});
        let nodes: Vec<_> = iter_string_nodes(&tree).collect();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].1, "text");
    }

    #[test]
    fn key_rendering() {
        let path: TreePath = vec!["a".into(), "b".into(), 0usize.into(), "c".into()];
        assert_eq!(path_to_key(&path), "a.b[0].c");
        assert_eq!(path_to_key(&["items".into(), 0usize.into()]), "items[0]");
        assert_eq!(path_to_key(&["matrix".into(), 0usize.into(), 1usize.into()]), "matrix[0][1]");
        assert_eq!(path_to_key(&[0usize.into(), "name".into()]), "[0].name");
        assert_eq!(path_to_key(&[]), "");
    }

    #[test]
    fn parse_key_inverts_rendering() {
        for key in ["a.b[0].c", "items[0]", "matrix[0][1]", "[0].name", "[2][3]", ""] {
            let path = parse_key(key).expect("parse");
            assert_eq!(path_to_key(&path), key);
        }
        assert_eq!(parse_key("a[x]"), None);
        assert_eq!(parse_key("a..b"), None);
    }

    #[test]
    fn get_value_is_total() {
        let tree = json!({"a": {"b": ["x", "y"]}});
        assert_eq!(get_value(&tree, &["a".into(), "b".into(), 1usize.into()]), Some(&json!("y")));
        assert_eq!(get_value(&tree, &["a".into(), "b".into(), 5usize.into()]), None);
        assert_eq!(get_value(&tree, &["a".into(), 0usize.into()]), None);
        assert_eq!(get_value(&tree, &["missing".into()]), None);
        assert_eq!(get_value(&tree, &[]), Some(&tree));
    }

    #[test]
    fn get_and_set_commute_with_iteration() {
        let mut tree = json!({"a": "1", "list": [{"x": "2"}, "3"], "n": 4});
        let nodes: Vec<(TreePath, String)> = iter_string_nodes(&tree)
            .map(|(p, v)| (p, v.to_string()))
            .collect();
        for (path, value) in &nodes {
            assert_eq!(get_value(&tree, path), Some(&Value::String(value.clone())));
        }
        for (path, value) in &nodes {
            set_value(&mut tree, path, json!(format!("{value}!"))).expect("set");
            assert_eq!(get_value(&tree, path), Some(&json!(format!("{value}!"))));
        }
    }

    #[test]
    fn set_value_errors() {
        let mut tree = json!({"a": {"b": "c"}, "list": ["x"]});
        assert_eq!(set_value(&mut tree, &[], json!(1)), Err(StructureError::EmptyPath));
        assert!(matches!(
            set_value(&mut tree, &["missing".into(), "b".into()], json!(1)),
            Err(StructureError::Untraversable { .. })
        ));
        assert!(matches!(
            set_value(&mut tree, &["list".into(), 3usize.into()], json!(1)),
            Err(StructureError::Unassignable { .. })
        ));
    }
}
