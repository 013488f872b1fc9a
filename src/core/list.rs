//! Intrusive doubly-linked list over a node slab
//!
//! Elements embed a [`Link`] and live in a caller-owned slab (any `[T]`
//! where `T: Linked<Q>`). A [`List`] owns no elements, only its sentinel
//! head and a length: nodes are addressed by slab index, and every link
//! carries the identifier of the list it currently belongs to instead of a
//! raw back-pointer.
//!
//! The list is circular through its sentinel: the head's `next` is the
//! first node, the head's `previous` the last one, and an empty list is a
//! head pointing at itself in both directions.
//!
//! Every structural precondition (node already linked, position belongs to
//! another list, index outside the slab) is checked and reported as a
//! [`ListError`], so a caller bug never corrupts the links silently.
//!
//! # Example
//!
//! ```
//! use flight_daq::core::list::{Cursor, Link, Linked, List};
//!
//! struct Reading {
//!     value: i32,
//!     link: Link<u8>,
//! }
//!
//! impl Linked<u8> for Reading {
//!     fn link(&self) -> &Link<u8> {
//!         &self.link
//!     }
//!     fn link_mut(&mut self) -> &mut Link<u8> {
//!         &mut self.link
//!     }
//! }
//!
//! let mut slab = [5, 1, 3].map(|value| Reading { value, link: Link::new() });
//! let mut list = List::new(0u8);
//! for index in 0..slab.len() {
//!     list.add_ordered(&mut slab, index, |a, b| a.value.cmp(&b.value)).unwrap();
//! }
//!
//! let values: Vec<i32> = list.iter(&slab).map(|i| slab[i].value).collect();
//! assert_eq!(values, [1, 3, 5]);
//! assert_eq!(list.next(&slab, Cursor::Head), Cursor::Node(1));
//! ```

use core::cmp::Ordering;
use core::fmt;

/// A position inside a list: its sentinel head or a node of the slab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Cursor {
    /// The sentinel head of the list
    Head,
    /// Slab index of a linked node
    Node(usize),
}

/// Errors reported by list operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ListError {
    /// The node is already a member of a list
    AlreadyLinked,
    /// The node is not a member of any list
    NotLinked,
    /// The node or position belongs to a different list
    ForeignNode,
    /// The index is outside of the node slab
    OutOfBounds,
}

impl fmt::Display for ListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListError::AlreadyLinked => write!(f, "node is already linked"),
            ListError::NotLinked => write!(f, "node is not linked"),
            ListError::ForeignNode => write!(f, "node belongs to another list"),
            ListError::OutOfBounds => write!(f, "node index out of bounds"),
        }
    }
}

/// Links embedded in an element that can be a member of a [`List`].
///
/// `Q` identifies lists; a linked node records the identifier of its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link<Q> {
    owner: Option<Q>,
    next: Option<Cursor>,
    previous: Option<Cursor>,
}

impl<Q: Copy + Eq> Link<Q> {
    /// An unlinked node: no owner, no neighbours.
    pub const fn new() -> Self {
        Self {
            owner: None,
            next: None,
            previous: None,
        }
    }

    /// Clear owner and neighbours.
    ///
    /// Only meaningful on a node that was never inserted or has been removed;
    /// resetting a linked node would leave its neighbours pointing at it.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Identifier of the list this node belongs to
    pub fn owner(&self) -> Option<Q> {
        self.owner
    }

    /// Check if the node is a member of a list
    pub fn is_linked(&self) -> bool {
        self.owner.is_some()
    }

    /// Successor of this node, `None` when unlinked
    pub fn next(&self) -> Option<Cursor> {
        self.next
    }

    /// Predecessor of this node, `None` when unlinked
    pub fn previous(&self) -> Option<Cursor> {
        self.previous
    }
}

impl<Q: Copy + Eq> Default for Link<Q> {
    fn default() -> Self {
        Self::new()
    }
}

/// Access to the [`Link`] embedded in an element.
pub trait Linked<Q> {
    /// Shared access to the embedded link
    fn link(&self) -> &Link<Q>;

    /// Exclusive access to the embedded link
    fn link_mut(&mut self) -> &mut Link<Q>;
}

/// Circular doubly-linked list with a sentinel head.
#[derive(Debug, Clone)]
pub struct List<Q> {
    id: Q,
    length: usize,
    // The sentinel's own links
    first: Cursor,
    last: Cursor,
}

impl<Q: Copy + Eq> List<Q> {
    /// Create an empty list identified by `id`.
    pub const fn new(id: Q) -> Self {
        Self {
            id,
            length: 0,
            first: Cursor::Head,
            last: Cursor::Head,
        }
    }

    /// Reset to the empty state.
    ///
    /// Nodes still carrying this list's identifier must be reset by the
    /// caller before they are inserted again.
    pub fn init(&mut self) {
        self.length = 0;
        self.first = Cursor::Head;
        self.last = Cursor::Head;
    }

    /// Identifier carried by every node of this list
    pub fn id(&self) -> Q {
        self.id
    }

    /// Number of linked nodes
    pub fn len(&self) -> usize {
        self.length
    }

    /// Check if the list has no nodes
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Slab index of the first node
    pub fn front(&self) -> Option<usize> {
        match self.first {
            Cursor::Head => None,
            Cursor::Node(index) => Some(index),
        }
    }

    /// Slab index of the last node
    pub fn back(&self) -> Option<usize> {
        match self.last {
            Cursor::Head => None,
            Cursor::Node(index) => Some(index),
        }
    }

    /// Follow the `next` link of `at`.
    ///
    /// Following `next` from the head `len()` + 1 times returns to the head.
    pub fn next<T: Linked<Q>>(&self, nodes: &[T], at: Cursor) -> Cursor {
        match at {
            Cursor::Head => self.first,
            Cursor::Node(index) => nodes
                .get(index)
                .and_then(|node| node.link().next)
                .unwrap_or(Cursor::Head),
        }
    }

    /// Follow the `previous` link of `at`.
    pub fn previous<T: Linked<Q>>(&self, nodes: &[T], at: Cursor) -> Cursor {
        match at {
            Cursor::Head => self.last,
            Cursor::Node(index) => nodes
                .get(index)
                .and_then(|node| node.link().previous)
                .unwrap_or(Cursor::Head),
        }
    }

    /// Iterate over the slab indices of the linked nodes, front to back
    pub fn iter<'n, T: Linked<Q>>(&'n self, nodes: &'n [T]) -> Iter<'n, Q, T> {
        Iter {
            list: self,
            nodes,
            cursor: self.first,
            remaining: self.length,
        }
    }

    /// Splice `node` right after `position`.
    ///
    /// `position` must be the head or a node of this list.
    pub fn add_after<T: Linked<Q>>(
        &mut self,
        nodes: &mut [T],
        node: usize,
        position: Cursor,
    ) -> Result<(), ListError> {
        self.check_insertable(nodes, node)?;
        self.check_position(nodes, position)?;

        let successor = self.next(nodes, position);
        self.link_between(nodes, node, position, successor);
        Ok(())
    }

    /// Splice `node` right before `position`.
    ///
    /// Inserting before the head appends at the tail.
    pub fn add_before<T: Linked<Q>>(
        &mut self,
        nodes: &mut [T],
        node: usize,
        position: Cursor,
    ) -> Result<(), ListError> {
        self.check_insertable(nodes, node)?;
        self.check_position(nodes, position)?;

        let predecessor = self.previous(nodes, position);
        self.link_between(nodes, node, predecessor, position);
        Ok(())
    }

    /// Append `node` at the tail.
    pub fn push_back<T: Linked<Q>>(&mut self, nodes: &mut [T], node: usize) -> Result<(), ListError> {
        self.add_before(nodes, node, Cursor::Head)
    }

    /// Insert `node` before the first element comparing strictly greater.
    ///
    /// `compare(existing, new)` is a three-way comparison. Equal elements keep
    /// their insertion order: the new node lands after all of them. O(n).
    pub fn add_ordered<T, F>(
        &mut self,
        nodes: &mut [T],
        node: usize,
        mut compare: F,
    ) -> Result<(), ListError>
    where
        T: Linked<Q>,
        F: FnMut(&T, &T) -> Ordering,
    {
        self.check_insertable(nodes, node)?;

        let mut cursor = self.first;
        while let Cursor::Node(index) = cursor {
            if compare(&nodes[index], &nodes[node]) == Ordering::Greater {
                break;
            }
            cursor = self.next(nodes, cursor);
        }

        self.add_before(nodes, node, cursor)
    }

    /// Splice `node` out of this list and clear its links.
    pub fn remove<T: Linked<Q>>(&mut self, nodes: &mut [T], node: usize) -> Result<(), ListError> {
        let link = nodes.get(node).ok_or(ListError::OutOfBounds)?.link();
        match link.owner {
            None => return Err(ListError::NotLinked),
            Some(owner) if owner != self.id => return Err(ListError::ForeignNode),
            Some(_) => {}
        }

        let predecessor = link.previous.unwrap_or(Cursor::Head);
        let successor = link.next.unwrap_or(Cursor::Head);
        self.set_next(nodes, predecessor, successor);
        self.set_previous(nodes, successor, predecessor);

        nodes[node].link_mut().reset();
        self.length -= 1;
        Ok(())
    }

    fn check_insertable<T: Linked<Q>>(&self, nodes: &[T], node: usize) -> Result<(), ListError> {
        let link = nodes.get(node).ok_or(ListError::OutOfBounds)?.link();
        if link.is_linked() {
            return Err(ListError::AlreadyLinked);
        }
        Ok(())
    }

    fn check_position<T: Linked<Q>>(&self, nodes: &[T], position: Cursor) -> Result<(), ListError> {
        match position {
            Cursor::Head => Ok(()),
            Cursor::Node(index) => {
                let link = nodes.get(index).ok_or(ListError::OutOfBounds)?.link();
                match link.owner {
                    Some(owner) if owner == self.id => Ok(()),
                    Some(_) => Err(ListError::ForeignNode),
                    None => Err(ListError::NotLinked),
                }
            }
        }
    }

    fn link_between<T: Linked<Q>>(
        &mut self,
        nodes: &mut [T],
        node: usize,
        predecessor: Cursor,
        successor: Cursor,
    ) {
        let link = nodes[node].link_mut();
        link.owner = Some(self.id);
        link.previous = Some(predecessor);
        link.next = Some(successor);

        self.set_next(nodes, predecessor, Cursor::Node(node));
        self.set_previous(nodes, successor, Cursor::Node(node));
        self.length += 1;
    }

    fn set_next<T: Linked<Q>>(&mut self, nodes: &mut [T], at: Cursor, to: Cursor) {
        match at {
            Cursor::Head => self.first = to,
            Cursor::Node(index) => nodes[index].link_mut().next = Some(to),
        }
    }

    fn set_previous<T: Linked<Q>>(&mut self, nodes: &mut [T], at: Cursor, to: Cursor) {
        match at {
            Cursor::Head => self.last = to,
            Cursor::Node(index) => nodes[index].link_mut().previous = Some(to),
        }
    }
}

/// Iterator over the slab indices of a [`List`]
pub struct Iter<'n, Q, T> {
    list: &'n List<Q>,
    nodes: &'n [T],
    cursor: Cursor,
    remaining: usize,
}

impl<Q: Copy + Eq, T: Linked<Q>> Iterator for Iter<'_, Q, T> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        match self.cursor {
            Cursor::Head => None,
            Cursor::Node(index) => {
                self.remaining -= 1;
                self.cursor = self.list.next(self.nodes, self.cursor);
                Some(index)
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    #[derive(Debug)]
    struct Item {
        value: i32,
        tag: u8,
        link: Link<u8>,
    }

    impl Linked<u8> for Item {
        fn link(&self) -> &Link<u8> {
            &self.link
        }

        fn link_mut(&mut self) -> &mut Link<u8> {
            &mut self.link
        }
    }

    fn slab(values: &[i32]) -> Vec<Item> {
        values
            .iter()
            .enumerate()
            .map(|(i, &value)| Item {
                value,
                tag: i as u8,
                link: Link::new(),
            })
            .collect()
    }

    fn values(list: &List<u8>, nodes: &[Item]) -> Vec<i32> {
        list.iter(nodes).map(|i| nodes[i].value).collect()
    }

    /// Walk `len() + 1` next links from the head and check we are back.
    fn assert_circular(list: &List<u8>, nodes: &[Item]) {
        let mut cursor = Cursor::Head;
        for _ in 0..list.len() {
            cursor = list.next(nodes, cursor);
            assert!(matches!(cursor, Cursor::Node(_)));
        }
        assert_eq!(list.next(nodes, cursor), Cursor::Head);

        let mut cursor = Cursor::Head;
        for _ in 0..list.len() {
            cursor = list.previous(nodes, cursor);
        }
        assert_eq!(list.previous(nodes, cursor), Cursor::Head);
    }

    #[test]
    fn test_new_list_is_self_referencing() {
        let list: List<u8> = List::new(7);
        let nodes: Vec<Item> = Vec::new();

        assert!(list.is_empty());
        assert_eq!(list.id(), 7);
        assert_eq!(list.next(&nodes, Cursor::Head), Cursor::Head);
        assert_eq!(list.previous(&nodes, Cursor::Head), Cursor::Head);
        assert_eq!(list.front(), None);
        assert_eq!(list.back(), None);
    }

    #[test]
    fn test_init_is_idempotent() {
        let mut list: List<u8> = List::new(0);
        list.init();
        list.init();
        assert_eq!(list.len(), 0);
        assert_eq!(list.front(), None);
    }

    #[test]
    fn test_new_node_is_unlinked() {
        let link: Link<u8> = Link::new();
        assert!(!link.is_linked());
        assert_eq!(link.owner(), None);
        assert_eq!(link.next(), None);
        assert_eq!(link.previous(), None);
    }

    #[test]
    fn test_add_before_head_appends() {
        let mut nodes = slab(&[10, 20, 30]);
        let mut list = List::new(0);

        for i in 0..3 {
            list.add_before(&mut nodes, i, Cursor::Head).unwrap();
        }

        assert_eq!(values(&list, &nodes), [10, 20, 30]);
        assert_eq!(list.len(), 3);
        assert_eq!(list.front(), Some(0));
        assert_eq!(list.back(), Some(2));
        assert_circular(&list, &nodes);
    }

    #[test]
    fn test_add_after_head_prepends() {
        let mut nodes = slab(&[10, 20, 30]);
        let mut list = List::new(0);

        for i in 0..3 {
            list.add_after(&mut nodes, i, Cursor::Head).unwrap();
        }

        assert_eq!(values(&list, &nodes), [30, 20, 10]);
        assert_circular(&list, &nodes);
    }

    #[test]
    fn test_add_relative_to_node() {
        let mut nodes = slab(&[1, 2, 3, 4]);
        let mut list = List::new(0);

        list.push_back(&mut nodes, 0).unwrap();
        list.push_back(&mut nodes, 3).unwrap();
        list.add_after(&mut nodes, 1, Cursor::Node(0)).unwrap();
        list.add_before(&mut nodes, 2, Cursor::Node(3)).unwrap();

        assert_eq!(values(&list, &nodes), [1, 2, 3, 4]);
        assert_eq!(nodes[1].link().owner(), Some(0));
        assert_circular(&list, &nodes);
    }

    #[test]
    fn test_remove_updates_length_and_clears_links() {
        let mut nodes = slab(&[1, 2, 3]);
        let mut list = List::new(0);
        for i in 0..3 {
            list.push_back(&mut nodes, i).unwrap();
        }

        list.remove(&mut nodes, 1).unwrap();

        assert_eq!(list.len(), 2);
        assert_eq!(values(&list, &nodes), [1, 3]);
        assert!(!nodes[1].link().is_linked());
        assert_eq!(nodes[1].link().next(), None);
        assert_eq!(nodes[1].link().previous(), None);
        assert_circular(&list, &nodes);

        list.remove(&mut nodes, 0).unwrap();
        list.remove(&mut nodes, 2).unwrap();
        assert!(list.is_empty());
        assert_eq!(list.next(&nodes, Cursor::Head), Cursor::Head);
    }

    #[test]
    fn test_remove_unlinked_node_fails() {
        let mut nodes = slab(&[1]);
        let mut list = List::new(0);

        assert_eq!(list.remove(&mut nodes, 0), Err(ListError::NotLinked));
        assert_eq!(list.remove(&mut nodes, 5), Err(ListError::OutOfBounds));
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn test_remove_from_wrong_list_fails() {
        let mut nodes = slab(&[1]);
        let mut first = List::new(0);
        let mut second = List::new(1);

        first.push_back(&mut nodes, 0).unwrap();

        assert_eq!(second.remove(&mut nodes, 0), Err(ListError::ForeignNode));
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn test_node_belongs_to_one_list() {
        let mut nodes = slab(&[1, 2]);
        let mut first = List::new(0);
        let mut second = List::new(1);

        first.push_back(&mut nodes, 0).unwrap();
        assert_eq!(
            second.push_back(&mut nodes, 0),
            Err(ListError::AlreadyLinked)
        );
        assert_eq!(
            first.push_back(&mut nodes, 0),
            Err(ListError::AlreadyLinked)
        );

        // Position from another list is rejected
        second.push_back(&mut nodes, 1).unwrap();
        first.remove(&mut nodes, 0).unwrap();
        assert_eq!(
            first.add_after(&mut nodes, 0, Cursor::Node(1)),
            Err(ListError::ForeignNode)
        );
        assert_eq!(first.len(), 0);
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn test_add_ordered_sorts_values() {
        let mut nodes = slab(&[5, 1, 3]);
        let mut list = List::new(0);

        for i in 0..3 {
            list.add_ordered(&mut nodes, i, |a, b| a.value.cmp(&b.value))
                .unwrap();
        }

        assert_eq!(values(&list, &nodes), [1, 3, 5]);
        assert_circular(&list, &nodes);
    }

    #[test]
    fn test_add_ordered_is_stable_for_ties() {
        let mut nodes = slab(&[2, 1, 2, 2, 1]);
        let mut list = List::new(0);

        for i in 0..nodes.len() {
            list.add_ordered(&mut nodes, i, |a, b| a.value.cmp(&b.value))
                .unwrap();
        }

        let tags: Vec<u8> = list.iter(&nodes).map(|i| nodes[i].tag).collect();
        assert_eq!(tags, [1, 4, 0, 2, 3]);
    }

    #[test]
    fn test_mixed_operations_keep_length_consistent() {
        let mut nodes = slab(&[9, 4, 7, 1, 8, 2, 6, 3]);
        let mut list = List::new(0);

        for i in 0..nodes.len() {
            list.add_ordered(&mut nodes, i, |a, b| a.value.cmp(&b.value))
                .unwrap();
        }
        for &i in &[0, 3, 5] {
            list.remove(&mut nodes, i).unwrap();
        }
        list.add_after(&mut nodes, 3, Cursor::Head).unwrap();

        let linked = nodes.iter().filter(|n| n.link().is_linked()).count();
        assert_eq!(list.len(), linked);
        assert_eq!(list.iter(&nodes).count(), linked);
        assert_circular(&list, &nodes);

        let sorted: Vec<i32> = values(&list, &nodes);
        assert!(sorted.windows(2).all(|w| w[0] <= w[1]));
    }
}
