//! `ElementGraph`: an arena of `Element`s plus their successor edges
//! (§9 "arena + integer handle").

use crate::element::{Element, ElementId};

/// The dependency graph itself: a growable arena of elements with a
/// forward adjacency list. Nothing is ever removed — elements that
/// turn out to be dead ends are simply never visited again.
#[derive(Debug, Default)]
pub struct ElementGraph {
    elements: Vec<Element>,
    successors: Vec<Vec<ElementId>>,
}

impl ElementGraph {
    /// An empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new element, returning its handle.
    pub fn insert(&mut self, element: Element) -> ElementId {
        let id = ElementId(u32::try_from(self.elements.len()).expect("element graph overflow"));
        self.elements.push(element);
        self.successors.push(Vec::new());
        id
    }

    /// Add a directed edge `from -> to`, if not already present.
    pub fn add_edge(&mut self, from: ElementId, to: ElementId) {
        let succ = &mut self.successors[from.index()];
        if !succ.contains(&to) {
            succ.push(to);
        }
    }

    /// Look up an element by handle.
    #[must_use]
    pub fn get(&self, id: ElementId) -> &Element {
        &self.elements[id.index()]
    }

    /// This element's successors, in insertion order.
    #[must_use]
    pub fn successors(&self, id: ElementId) -> &[ElementId] {
        &self.successors[id.index()]
    }

    /// Number of elements in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the arena is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterate over every `(id, element)` pair.
    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &Element)> {
        self.elements.iter().enumerate().map(|(i, e)| (ElementId(i as u32), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{VersionChoice, VersionElement};

    #[test]
    fn insert_and_edge_round_trip() {
        let mut graph = ElementGraph::new();
        let a = graph.insert(Element::Version(VersionElement {
            choice: VersionChoice::Absent("foo".to_string()),
        }));
        let b = graph.insert(Element::Version(VersionElement {
            choice: VersionChoice::Absent("bar".to_string()),
        }));
        graph.add_edge(a, b);
        graph.add_edge(a, b); // duplicate, should not double up
        assert_eq!(graph.successors(a), &[b]);
        assert_eq!(graph.len(), 2);
    }
}
