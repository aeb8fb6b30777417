//! Segment tree for `/`-separated identifier patterns.
//!
//! Pattern segments are literals (`shop`), named parameters (`:id`) or a
//! trailing catch-all (`*rest`). Lookups prefer literals over parameters over
//! the catch-all. When no pattern covers the whole identifier, the deepest
//! registered prefix matches and the unmatched segments are reported as `rest`.

use std::collections::HashMap;

/// Outcome of a successful lookup.
#[derive(Debug, PartialEq)]
pub struct PathMatch<'t, T> {
    pub value: &'t T,
    pub pattern: &'t str,
    pub params: Vec<(String, String)>,
    /// Segments past the matched pattern, joined with `/`.
    pub rest: Option<String>,
}

struct Entry<T> {
    pattern: String,
    /// Parameter names in segment order, the catch-all last.
    names: Vec<String>,
    value: T,
}

impl<T> Entry<T> {
    fn bind(&self, values: Vec<String>) -> Vec<(String, String)> {
        self.names.iter().cloned().zip(values).collect()
    }
}

struct Node<T> {
    entry: Option<Entry<T>>,
    literals: HashMap<String, Node<T>>,
    param: Option<Box<Node<T>>>,
    catch_all: Option<Entry<T>>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self {
            entry: None,
            literals: HashMap::new(),
            param: None,
            catch_all: None,
        }
    }
}

struct Candidate<'t, T> {
    entry: &'t Entry<T>,
    values: Vec<String>,
    depth: usize,
    rest: Option<String>,
}

pub struct PathTree<T> {
    root: Node<T>,
    len: usize,
}

impl<T> Default for PathTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

impl<T> PathTree<T> {
    pub fn new() -> Self {
        Self {
            root: Node::default(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts `value` at `pattern`, returning the value it replaced.
    ///
    /// Patterns differing only in parameter names share a slot, so the later
    /// one replaces the earlier one.
    pub fn insert(&mut self, pattern: &str, value: T) -> Option<T> {
        let mut node = &mut self.root;
        let mut names = Vec::new();
        let parts = segments(pattern);

        for (i, segment) in parts.iter().enumerate() {
            if let Some(name) = segment.strip_prefix('*') {
                if i + 1 == parts.len() {
                    names.push(name.to_string());
                    let entry = Entry {
                        pattern: pattern.to_string(),
                        names,
                        value,
                    };
                    let previous = node.catch_all.replace(entry);
                    return self.track(previous.map(|e| e.value));
                }
            }
            node = match segment.strip_prefix(':') {
                Some(name) => {
                    names.push(name.to_string());
                    node.param.get_or_insert_with(Box::default).as_mut()
                }
                None => node.literals.entry(segment.to_string()).or_default(),
            };
        }

        let entry = Entry {
            pattern: pattern.to_string(),
            names,
            value,
        };
        let previous = node.entry.replace(entry);
        self.track(previous.map(|e| e.value))
    }

    fn track(&mut self, previous: Option<T>) -> Option<T> {
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    pub fn get(&self, path: &str) -> Option<PathMatch<'_, T>> {
        let parts = segments(path);
        let mut values = Vec::new();
        let mut best = None;
        search(&self.root, &parts, 0, &mut values, &mut best);

        best.map(|candidate| {
            let rest = if candidate.rest.is_some() {
                candidate.rest
            } else if candidate.depth < parts.len() {
                Some(parts[candidate.depth..].join("/"))
            } else {
                None
            };
            PathMatch {
                value: &candidate.entry.value,
                pattern: &candidate.entry.pattern,
                params: candidate.entry.bind(candidate.values),
                rest,
            }
        })
    }

    pub fn clear(&mut self) {
        self.root = Node::default();
        self.len = 0;
    }
}

/// Depth-first search. Returns true once a full-length match is recorded.
fn search<'t, T>(
    node: &'t Node<T>,
    parts: &[&str],
    depth: usize,
    values: &mut Vec<String>,
    best: &mut Option<Candidate<'t, T>>,
) -> bool {
    if depth == parts.len() {
        if let Some(entry) = &node.entry {
            *best = Some(Candidate {
                entry,
                values: values.clone(),
                depth,
                rest: None,
            });
            return true;
        }
    } else {
        if let Some(entry) = &node.entry {
            if best.as_ref().map_or(true, |b| depth > b.depth) {
                *best = Some(Candidate {
                    entry,
                    values: values.clone(),
                    depth,
                    rest: None,
                });
            }
        }

        if let Some(child) = node.literals.get(parts[depth]) {
            if search(child, parts, depth + 1, values, best) {
                return true;
            }
        }

        if let Some(child) = &node.param {
            values.push(parts[depth].to_string());
            if search(child, parts, depth + 1, values, best) {
                return true;
            }
            values.pop();
        }
    }

    if let Some(entry) = &node.catch_all {
        let rest = parts[depth..].join("/");
        let mut captured = values.clone();
        captured.push(rest.clone());
        *best = Some(Candidate {
            entry,
            values: captured,
            depth: parts.len(),
            rest: Some(rest).filter(|r| !r.is_empty()),
        });
        return true;
    }
    false
}
