//! Dependency graph over registry entries

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::entry::Entry;

pub(crate) type Entries = IndexMap<String, Arc<Entry>>;

/// Entry name -> names it references, restricted to names present in `entries`
pub fn dependency_map(entries: &Entries) -> IndexMap<String, Vec<String>> {
    entries
        .iter()
        .map(|(name, entry)| {
            let deps = entry
                .dependencies()
                .iter()
                .filter(|d| entries.contains_key(*d))
                .cloned()
                .collect();
            (name.clone(), deps)
        })
        .collect()
}

/// Kahn's algorithm. Dependencies come before their dependents; ties keep
/// insertion order. On a cycle, returns the names that could not be ordered.
pub fn topological_sort(dependencies: &IndexMap<String, Vec<String>>) -> Result<Vec<String>, Vec<String>> {
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    let mut reverse_deps: HashMap<&str, Vec<&str>> = HashMap::new();

    for (name, deps) in dependencies {
        in_degree.insert(name, deps.len());
        for dep in deps {
            reverse_deps.entry(dep.as_str()).or_default().push(name);
        }
    }

    let mut queue: VecDeque<&str> = dependencies
        .keys()
        .map(String::as_str)
        .filter(|name| in_degree.get(name) == Some(&0))
        .collect();

    let mut result = Vec::with_capacity(dependencies.len());
    while let Some(node) = queue.pop_front() {
        result.push(node.to_string());
        for dependent in reverse_deps.get(node).into_iter().flatten() {
            if let Some(deg) = in_degree.get_mut(dependent) {
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(dependent);
                }
            }
        }
    }

    if result.len() < dependencies.len() {
        let cycle = dependencies
            .keys()
            .filter(|name| in_degree.get(name.as_str()).is_some_and(|&d| d > 0))
            .cloned()
            .collect();
        Err(cycle)
    } else {
        Ok(result)
    }
}

/// Entries that reference `name` directly
pub fn direct_dependents(entries: &Entries, name: &str) -> Vec<String> {
    entries
        .iter()
        .filter(|(other, entry)| other.as_str() != name && entry.dependencies().iter().any(|d| d == name))
        .map(|(other, _)| other.clone())
        .collect()
}

/// Every entry that reaches `name` through references, in an order where
/// each comes after everything it depends on
pub fn transitive_dependents(entries: &Entries, name: &str) -> Result<Vec<String>, Vec<String>> {
    let mut reached: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::from([name.to_string()]);
    while let Some(current) = queue.pop_front() {
        for dependent in direct_dependents(entries, &current) {
            if reached.insert(dependent.clone()) {
                queue.push_back(dependent);
            }
        }
    }

    let order = topological_sort(&dependency_map(entries))?;
    Ok(order.into_iter().filter(|n| reached.contains(n)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &[&str])]) -> IndexMap<String, Vec<String>> {
        edges
            .iter()
            .map(|(n, deps)| (n.to_string(), deps.iter().map(|d| d.to_string()).collect()))
            .collect()
    }

    #[test]
    fn test_topological_order() {
        let g = graph(&[("mass", &["rho", "vol"]), ("rho", &[]), ("vol", &[])]);
        let order = topological_sort(&g).unwrap();
        assert_eq!(order, vec!["rho", "vol", "mass"]);
    }

    #[test]
    fn test_cycle_reported() {
        let g = graph(&[("a", &["b"]), ("b", &["a"]), ("c", &[])]);
        let cycle = topological_sort(&g).unwrap_err();
        assert_eq!(cycle, vec!["a", "b"]);
    }

    #[test]
    fn test_self_loop() {
        let g = graph(&[("f", &["f"])]);
        assert_eq!(topological_sort(&g).unwrap_err(), vec!["f"]);
    }
}
