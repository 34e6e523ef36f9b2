//! Ordered keyed tree shared by contracts, handler trees and middleware trees

use std::fmt;

/// A tree position: either a leaf value or a nested tree
pub enum Node<T> {
    Leaf(T),
    Branch(Tree<T>),
}

impl<T> Node<T> {
    pub fn as_leaf(&self) -> Option<&T> {
        match self {
            Node::Leaf(value) => Some(value),
            Node::Branch(_) => None,
        }
    }

    pub fn as_branch(&self) -> Option<&Tree<T>> {
        match self {
            Node::Leaf(_) => None,
            Node::Branch(tree) => Some(tree),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }
}

impl<T: fmt::Debug> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Leaf(value) => f.debug_tuple("Leaf").field(value).finish(),
            Node::Branch(tree) => f.debug_tuple("Branch").field(tree).finish(),
        }
    }
}

impl<T: Clone> Clone for Node<T> {
    fn clone(&self) -> Self {
        match self {
            Node::Leaf(value) => Node::Leaf(value.clone()),
            Node::Branch(tree) => Node::Branch(tree.clone()),
        }
    }
}

/// Ordered mapping from unique string keys to [`Node`]s.
///
/// Declaration order is preserved; inserting an existing key replaces its node
/// in place, keeping the position of the first declaration.
///
/// ```rust
/// use restype_core::Tree;
///
/// let tree: Tree<u32> = Tree::new()
///     .leaf("a", 1u32)
///     .branch("nested", Tree::new().leaf("b", 2u32))
///     .leaf("a", 3u32);
///
/// assert_eq!(tree.keys().collect::<Vec<_>>(), vec!["a", "nested"]);
/// assert_eq!(tree.lookup(&["nested", "b"]), Some(&2));
/// assert_eq!(tree.lookup(&["a"]), Some(&3));
/// ```
pub struct Tree<T> {
    entries: Vec<(String, Node<T>)>,
}

impl<T> Default for Tree<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> Tree<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a leaf under `key`
    pub fn leaf(mut self, key: impl Into<String>, value: impl Into<T>) -> Self {
        self.insert(key, Node::Leaf(value.into()));
        self
    }

    /// Add a nested tree under `key`
    pub fn branch(mut self, key: impl Into<String>, tree: Tree<T>) -> Self {
        self.insert(key, Node::Branch(tree));
        self
    }

    /// Insert a node, returning the node it replaced
    pub fn insert(&mut self, key: impl Into<String>, node: Node<T>) -> Option<Node<T>> {
        let key = key.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, node)),
            None => {
                self.entries.push((key, node));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Node<T>> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, node)| node)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Entries in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node<T>)> {
        self.entries.iter().map(|(key, node)| (key.as_str(), node))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every leaf with its full key path, depth-first in declaration order
    pub fn leaves(&self) -> Vec<(Vec<String>, &T)> {
        let mut out = Vec::new();
        collect_leaves(self, &mut Vec::new(), &mut out);
        out
    }

    /// Follow a key path down to a leaf
    pub fn lookup(&self, key_path: &[&str]) -> Option<&T> {
        let (last, parents) = key_path.split_last()?;
        let mut current = self;
        for key in parents {
            current = current.get(key)?.as_branch()?;
        }
        current.get(last)?.as_leaf()
    }
}

fn collect_leaves<'a, T>(
    tree: &'a Tree<T>,
    prefix: &mut Vec<String>,
    out: &mut Vec<(Vec<String>, &'a T)>,
) {
    for (key, node) in &tree.entries {
        prefix.push(key.clone());
        match node {
            Node::Leaf(value) => out.push((prefix.clone(), value)),
            Node::Branch(sub) => collect_leaves(sub, prefix, out),
        }
        prefix.pop();
    }
}

impl<T: Clone> Clone for Tree<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Tree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(key, node)| (key, node)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_in_place() {
        let mut tree: Tree<&str> = Tree::new().leaf("first", "a").leaf("second", "b");
        let replaced = tree.insert("first", Node::Leaf("c"));

        assert!(matches!(replaced, Some(Node::Leaf("a"))));
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.keys().collect::<Vec<_>>(), vec!["first", "second"]);
        assert_eq!(tree.lookup(&["first"]), Some(&"c"));
    }

    #[test]
    fn test_leaves_in_declaration_order() {
        let tree: Tree<u8> = Tree::new()
            .leaf("a", 1u8)
            .branch("b", Tree::new().leaf("c", 2u8).branch("d", Tree::new().leaf("e", 3u8)))
            .leaf("f", 4u8);

        let leaves: Vec<(String, u8)> = tree
            .leaves()
            .into_iter()
            .map(|(path, value)| (path.join("."), *value))
            .collect();

        assert_eq!(
            leaves,
            vec![
                ("a".to_string(), 1),
                ("b.c".to_string(), 2),
                ("b.d.e".to_string(), 3),
                ("f".to_string(), 4),
            ]
        );
    }

    #[test]
    fn test_lookup_misses() {
        let tree: Tree<u8> = Tree::new().leaf("a", 1u8).branch("b", Tree::new().leaf("c", 2u8));
        assert_eq!(tree.lookup(&[]), None);
        assert_eq!(tree.lookup(&["b"]), None);
        assert_eq!(tree.lookup(&["a", "c"]), None);
        assert_eq!(tree.lookup(&["b", "x"]), None);
    }
}
