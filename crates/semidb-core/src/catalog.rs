use std::collections::{BTreeMap, BTreeSet};

/// Sorted index over a `(system, structure, functional)` hierarchy.
///
/// The first level is the material label for convergence and EoS data and
/// the canonical binary label for alloys. Listings are lexicographically
/// sorted so repeated calls return identical sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    tree: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
}

impl Catalog {
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str, &'a str)>,
    {
        let mut catalog = Self::default();
        for (system, structure, functional) in entries {
            catalog.insert(system, structure, functional);
        }
        catalog
    }

    pub fn insert(&mut self, system: &str, structure: &str, functional: &str) {
        self.tree
            .entry(system.to_string())
            .or_default()
            .entry(structure.to_string())
            .or_default()
            .insert(functional.to_string());
    }

    pub fn systems(&self) -> Vec<String> {
        self.tree.keys().cloned().collect()
    }

    pub fn structures(&self, system: &str) -> Vec<String> {
        self.tree
            .get(system)
            .map(|structures| structures.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn functionals(&self, system: &str, structure: &str) -> Vec<String> {
        self.tree
            .get(system)
            .and_then(|structures| structures.get(structure))
            .map(|functionals| functionals.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Functionals for the pair, or just `default` when none are recorded.
    pub fn functionals_or(&self, system: &str, structure: &str, default: &str) -> Vec<String> {
        let functionals = self.functionals(system, structure);
        if functionals.is_empty() {
            vec![default.to_string()]
        } else {
            functionals
        }
    }

    pub fn contains(&self, system: &str, structure: &str, functional: &str) -> bool {
        self.tree
            .get(system)
            .and_then(|structures| structures.get(structure))
            .is_some_and(|functionals| functionals.contains(functional))
    }
}
