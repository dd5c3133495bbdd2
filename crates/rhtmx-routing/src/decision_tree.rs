/// Decision tree over discrete criteria
///
/// Items describe themselves as `(key, value)` criteria through a
/// `Classifier`. The tree branches on the most common key first, so a
/// walk only visits items whose criteria agree with the looked-up values.
///
/// # Design Decisions
/// - Items lacking a node's chosen key are built into sibling criteria of
///   that node instead of being copied into every branch
/// - A walk returns items in insertion order, without duplicates
/// - Keys are case-folded; values go through `Classifier::normalize`

use std::collections::HashMap;

use crate::values::fold_case;

/// Describes the criteria of one kind of item
pub trait Classifier<T> {
    /// `(key, value)` pairs the item requires
    fn criteria(&self, item: &T) -> Vec<(String, String)>;

    /// Canonical form used for value comparison
    fn normalize(&self, value: &str) -> String {
        fold_case(value)
    }
}

#[derive(Debug, Default)]
struct Node {
    matches: Vec<usize>,
    criteria: Vec<Criterion>,
}

#[derive(Debug)]
struct Criterion {
    key: String,
    branches: HashMap<String, Node>,
}

type Pending = (usize, Vec<(String, String)>);

/// Immutable decision tree over `T`
///
/// # Examples
///
/// ```
/// use rhtmx_routing::decision_tree::{Classifier, DecisionTree};
///
/// struct ByPair;
///
/// impl Classifier<(&'static str, &'static str)> for ByPair {
///     fn criteria(&self, item: &(&'static str, &'static str)) -> Vec<(String, String)> {
///         vec![("controller".into(), item.0.into()), ("action".into(), item.1.into())]
///     }
/// }
///
/// let tree = DecisionTree::build(
///     vec![("Home", "Index"), ("Home", "About"), ("Blog", "Index")],
///     &ByPair,
/// );
/// let found = tree.walk(&ByPair, |key| match key {
///     "controller" => vec!["home".to_string()],
///     "action" => vec!["INDEX".to_string()],
///     _ => Vec::new(),
/// });
/// assert_eq!(found, vec![&("Home", "Index")]);
/// ```
#[derive(Debug)]
pub struct DecisionTree<T> {
    items: Vec<T>,
    root: Node,
}

impl<T> DecisionTree<T> {
    pub fn build<C: Classifier<T>>(items: Vec<T>, classifier: &C) -> Self {
        let pending: Vec<Pending> = items
            .iter()
            .enumerate()
            .map(|(index, item)| (index, normalized_criteria(classifier, item)))
            .collect();

        Self {
            root: build_node(pending),
            items,
        }
    }

    /// Items whose every criterion is satisfied by one of `lookup(key)`
    pub fn walk<C, F>(&self, classifier: &C, mut lookup: F) -> Vec<&T>
    where
        C: Classifier<T>,
        F: FnMut(&str) -> Vec<String>,
    {
        let mut found = Vec::new();
        walk_node(&self.root, classifier, &mut lookup, &mut found);
        found.sort_unstable();
        found.dedup();
        found.into_iter().map(|index| &self.items[index]).collect()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn normalized_criteria<T, C: Classifier<T>>(classifier: &C, item: &T) -> Vec<(String, String)> {
    let mut criteria: Vec<(String, String)> = Vec::new();
    for (key, value) in classifier.criteria(item) {
        let key = fold_case(&key);
        if !criteria.iter().any(|(k, _)| *k == key) {
            criteria.push((key, classifier.normalize(&value)));
        }
    }
    criteria
}

fn build_node(pending: Vec<Pending>) -> Node {
    let mut node = Node::default();
    let mut remaining = Vec::new();

    for (index, criteria) in pending {
        if criteria.is_empty() {
            node.matches.push(index);
        } else {
            remaining.push((index, criteria));
        }
    }

    while let Some(key) = most_common_key(&remaining) {
        let (with_key, without_key): (Vec<Pending>, Vec<Pending>) = remaining
            .into_iter()
            .partition(|(_, criteria)| criteria.iter().any(|(k, _)| *k == key));

        let mut groups: Vec<(String, Vec<Pending>)> = Vec::new();
        for (index, mut criteria) in with_key {
            let position = criteria.iter().position(|(k, _)| *k == key);
            let Some(position) = position else { continue };
            let (_, value) = criteria.remove(position);
            match groups.iter_mut().find(|(v, _)| *v == value) {
                Some((_, group)) => group.push((index, criteria)),
                None => groups.push((value, vec![(index, criteria)])),
            }
        }

        node.criteria.push(Criterion {
            key,
            branches: groups
                .into_iter()
                .map(|(value, group)| (value, build_node(group)))
                .collect(),
        });
        remaining = without_key;
    }

    node
}

/// Most frequent key; ties go to the first one encountered
fn most_common_key(pending: &[Pending]) -> Option<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for (_, criteria) in pending {
        for (key, _) in criteria {
            match counts.iter_mut().find(|(k, _)| *k == key.as_str()) {
                Some((_, count)) => *count += 1,
                None => counts.push((key.as_str(), 1)),
            }
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (key, count) in counts {
        if best.map_or(true, |(_, most)| count > most) {
            best = Some((key, count));
        }
    }
    best.map(|(key, _)| key.to_string())
}

fn walk_node<T, C, F>(node: &Node, classifier: &C, lookup: &mut F, found: &mut Vec<usize>)
where
    C: Classifier<T>,
    F: FnMut(&str) -> Vec<String>,
{
    found.extend_from_slice(&node.matches);
    for criterion in &node.criteria {
        for value in lookup(&criterion.key) {
            if let Some(child) = criterion.branches.get(&classifier.normalize(&value)) {
                walk_node(child, classifier, lookup, found);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pairs;

    impl Classifier<Vec<(&'static str, &'static str)>> for Pairs {
        fn criteria(&self, item: &Vec<(&'static str, &'static str)>) -> Vec<(String, String)> {
            item.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        }
    }

    #[test]
    fn test_item_without_key_matches_any_value() {
        let tree = DecisionTree::build(
            vec![
                vec![("a", "1"), ("b", "x")],
                vec![("b", "y")],
                vec![("a", "2")],
            ],
            &Pairs,
        );

        let found = tree.walk(&Pairs, |key| match key {
            "a" => vec!["1".into()],
            "b" => vec!["y".into()],
            _ => Vec::new(),
        });
        assert_eq!(found, vec![&vec![("b", "y")]]);
    }

    #[test]
    fn test_items_without_criteria_always_match() {
        let tree = DecisionTree::build(vec![vec![], vec![("a", "1")]], &Pairs);
        let found = tree.walk(&Pairs, |_| Vec::new());
        assert_eq!(found.len(), 1);
        assert!(found[0].is_empty());
    }

    #[test]
    fn test_most_common_key_prefers_first_on_tie() {
        let pending = vec![
            (0, vec![("b".to_string(), "1".to_string())]),
            (1, vec![("a".to_string(), "1".to_string())]),
        ];
        assert_eq!(most_common_key(&pending).as_deref(), Some("b"));
    }
}
