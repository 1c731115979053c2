use crate::*;

/// Node id within the tree arena.
type NodeId = usize;

/// B+ tree node. Leaves carry locators and a link to the next leaf; internal
/// nodes carry separator keys and child ids.
#[derive(Clone, Debug, Default)]
struct Node {
    /// Leaf flag.
    leaf: bool,
    /// Sorted keys. A non-root node holds between min_keys and degree - 1 of them.
    keys: Vec<i64>,
    /// Locators, leaf nodes only. Parallel to keys.
    vals: Vec<RecordId>,
    /// Child node ids, internal nodes only. One more than keys.
    kids: Vec<NodeId>,
    /// Next leaf in ascending key order.
    next: Option<NodeId>,
}

impl Node {
    fn new_leaf() -> Self {
        Node {
            leaf: true,
            ..Node::default()
        }
    }

    fn new_internal() -> Self {
        Node::default()
    }
}

/// Integer keyed B+ tree index with a linked leaf chain for range scans.
///
/// Nodes live in an arena and refer to each other by slot, so the tree owns all
/// of its nodes and nothing else. All data entries live in the leaves; internal
/// nodes carry only separator keys, and equal keys route right of a separator.
#[derive(Clone)]
pub struct BPlusTree {
    /// Node arena.
    nodes: Vec<Node>,
    /// Released arena slots, reused by alloc.
    free: Vec<NodeId>,
    /// Root node, absent while the tree is empty.
    root: Option<NodeId>,
    /// Maximum number of children of an internal node.
    degree: usize,
    /// Number of data entries.
    len: usize,
}

impl BPlusTree {
    /// Construct an empty tree. The degree must be at least 3.
    pub fn new(degree: usize) -> Self {
        assert!(degree >= 3, "B+ tree degree must be at least 3");
        BPlusTree {
            nodes: Vec::new(),
            free: Vec::new(),
            root: None,
            degree,
            len: 0,
        }
    }

    /// Number of data entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when there are no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum keys per node.
    fn max_keys(&self) -> usize {
        self.degree - 1
    }

    /// Minimum keys per non-root node. The borrow/merge decision uses strict
    /// inequality against this, so a degree 3 tree cannot re-underflow.
    fn min_keys(&self) -> usize {
        ((self.degree - 1) / 2).max(1)
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        self.nodes[id] = Node::default();
        self.free.push(id);
    }

    /// Child index for a key: first separator strictly greater than the key.
    fn child_ix(&self, x: NodeId, key: i64) -> usize {
        self.nodes[x].keys.partition_point(|k| *k <= key)
    }

    /// Point search. Returns the stored locator, or the invalid sentinel.
    pub fn search(&self, key: i64) -> RecordId {
        let Some(mut x) = self.root else {
            return RecordId::INVALID;
        };
        while !self.nodes[x].leaf {
            x = self.nodes[x].kids[self.child_ix(x, key)];
        }
        match self.nodes[x].keys.binary_search(&key) {
            Ok(i) => self.nodes[x].vals[i],
            Err(_) => RecordId::INVALID,
        }
    }

    /// Insert a key with its locator. If the key is already present the locator
    /// is updated in place; the result says whether a new entry was added.
    pub fn insert(&mut self, key: i64, val: RecordId) -> bool {
        let Some(root) = self.root else {
            let id = self.alloc(Node::new_leaf());
            self.nodes[id].keys.push(key);
            self.nodes[id].vals.push(val);
            self.root = Some(id);
            self.len = 1;
            return true;
        };
        let start = if self.nodes[root].keys.len() >= self.max_keys() {
            // Split the root preemptively so the descent never sees a full node.
            let new_root = self.alloc(Node::new_internal());
            self.nodes[new_root].kids.push(root);
            self.split_child(new_root, 0);
            self.root = Some(new_root);
            let ix = usize::from(key >= self.nodes[new_root].keys[0]);
            self.nodes[new_root].kids[ix]
        } else {
            root
        };
        let added = self.insert_non_full(start, key, val);
        if added {
            self.len += 1;
        }
        added
    }

    /// Insert below a node that is not full, splitting full children on the way.
    fn insert_non_full(&mut self, mut x: NodeId, key: i64, val: RecordId) -> bool {
        loop {
            if self.nodes[x].leaf {
                let n = &mut self.nodes[x];
                return match n.keys.binary_search(&key) {
                    Ok(i) => {
                        n.vals[i] = val;
                        false
                    }
                    Err(i) => {
                        n.keys.insert(i, key);
                        n.vals.insert(i, val);
                        true
                    }
                };
            }
            let mut i = self.child_ix(x, key);
            if self.nodes[self.nodes[x].kids[i]].keys.len() >= self.max_keys() {
                self.split_child(x, i);
                // Equal keys route right of the newly promoted separator.
                if key >= self.nodes[x].keys[i] {
                    i += 1;
                }
            }
            x = self.nodes[x].kids[i];
        }
    }

    /// Split the full child at position ix of parent x.
    ///
    /// A leaf splits at mid = n/2; the first key of the new right leaf is copied
    /// up as the separator and the leaf chain is relinked. An internal node moves
    /// its middle key up instead.
    fn split_child(&mut self, x: NodeId, ix: usize) {
        let child = self.nodes[x].kids[ix];
        let mid = self.nodes[child].keys.len() / 2;
        let (sep, right) = if self.nodes[child].leaf {
            let keys = self.nodes[child].keys.split_off(mid);
            let vals = self.nodes[child].vals.split_off(mid);
            let sep = keys[0];
            let right = self.alloc(Node {
                leaf: true,
                keys,
                vals,
                kids: Vec::new(),
                next: self.nodes[child].next,
            });
            self.nodes[child].next = Some(right);
            (sep, right)
        } else {
            let keys = self.nodes[child].keys.split_off(mid + 1);
            let kids = self.nodes[child].kids.split_off(mid + 1);
            let sep = self.nodes[child].keys.pop().unwrap();
            let right = self.alloc(Node {
                leaf: false,
                keys,
                vals: Vec::new(),
                kids,
                next: None,
            });
            (sep, right)
        };
        self.nodes[x].keys.insert(ix, sep);
        self.nodes[x].kids.insert(ix + 1, right);
    }

    /// Delete a key. A no-op when the key is absent.
    pub fn remove(&mut self, key: i64) {
        let Some(root) = self.root else {
            return;
        };
        if !self.search(key).valid() {
            return;
        }
        self.remove_from(root, key);
        // Root collapse.
        if self.nodes[root].keys.is_empty() {
            if self.nodes[root].leaf {
                self.release(root);
                self.root = None;
            } else {
                let child = self.nodes[root].kids[0];
                self.release(root);
                self.root = Some(child);
            }
        }
    }

    /// Recursive delete. Children at minimum occupancy are filled before the
    /// descent, so removal from the leaf can never underflow an ancestor.
    fn remove_from(&mut self, x: NodeId, key: i64) {
        if self.nodes[x].leaf {
            if let Ok(i) = self.nodes[x].keys.binary_search(&key) {
                self.nodes[x].keys.remove(i);
                self.nodes[x].vals.remove(i);
                self.len -= 1;
            }
            return;
        }
        let mut i = self.child_ix(x, key);
        if self.nodes[self.nodes[x].kids[i]].keys.len() <= self.min_keys() {
            self.fill(x, i);
            // The child layout changed; find the key again.
            i = self.child_ix(x, key).min(self.nodes[x].kids.len() - 1);
        }
        let child = self.nodes[x].kids[i];
        self.remove_from(child, key);
        // Separators follow the leftmost key of their right subtree.
        for i in 0..self.nodes[x].keys.len() {
            let sub = self.nodes[x].kids[i + 1];
            if let Some(k) = self.leftmost_key(sub) {
                self.nodes[x].keys[i] = k;
            }
        }
    }

    /// Smallest key below a node.
    fn leftmost_key(&self, mut x: NodeId) -> Option<i64> {
        while !self.nodes[x].leaf {
            x = self.nodes[x].kids[0];
        }
        self.nodes[x].keys.first().copied()
    }

    /// Bring the child at position i of node x above minimum occupancy: borrow
    /// from a sibling holding strictly more than the minimum, else merge.
    fn fill(&mut self, x: NodeId, i: usize) {
        let min = self.min_keys();
        if i > 0 && self.nodes[self.nodes[x].kids[i - 1]].keys.len() > min {
            self.borrow_from_prev(x, i);
        } else if i < self.nodes[x].keys.len()
            && self.nodes[self.nodes[x].kids[i + 1]].keys.len() > min
        {
            self.borrow_from_next(x, i);
        } else if i < self.nodes[x].keys.len() {
            self.merge(x, i);
        } else {
            self.merge(x, i - 1);
        }
    }

    /// Rotate one entry from the left sibling through the parent separator.
    fn borrow_from_prev(&mut self, x: NodeId, i: usize) {
        let child = self.nodes[x].kids[i];
        let sib = self.nodes[x].kids[i - 1];
        if self.nodes[child].leaf {
            let k = self.nodes[sib].keys.pop().unwrap();
            let v = self.nodes[sib].vals.pop().unwrap();
            let c = &mut self.nodes[child];
            c.keys.insert(0, k);
            c.vals.insert(0, v);
            self.nodes[x].keys[i - 1] = k;
        } else {
            let k = self.nodes[sib].keys.pop().unwrap();
            let kid = self.nodes[sib].kids.pop().unwrap();
            let sep = std::mem::replace(&mut self.nodes[x].keys[i - 1], k);
            let c = &mut self.nodes[child];
            c.keys.insert(0, sep);
            c.kids.insert(0, kid);
        }
    }

    /// Rotate one entry from the right sibling through the parent separator.
    fn borrow_from_next(&mut self, x: NodeId, i: usize) {
        let child = self.nodes[x].kids[i];
        let sib = self.nodes[x].kids[i + 1];
        if self.nodes[child].leaf {
            let k = self.nodes[sib].keys.remove(0);
            let v = self.nodes[sib].vals.remove(0);
            let c = &mut self.nodes[child];
            c.keys.push(k);
            c.vals.push(v);
            self.nodes[x].keys[i] = self.nodes[sib].keys[0];
        } else {
            let k = self.nodes[sib].keys.remove(0);
            let kid = self.nodes[sib].kids.remove(0);
            let sep = std::mem::replace(&mut self.nodes[x].keys[i], k);
            let c = &mut self.nodes[child];
            c.keys.push(sep);
            c.kids.push(kid);
        }
    }

    /// Merge the child at position i with its right sibling. The parent separator
    /// is pulled down for an internal merge; a leaf merge discards it ( it was a
    /// copy ) and relinks the leaf chain.
    fn merge(&mut self, x: NodeId, i: usize) {
        let left = self.nodes[x].kids[i];
        let right = self.nodes[x].kids[i + 1];
        let sep = self.nodes[x].keys.remove(i);
        self.nodes[x].kids.remove(i + 1);
        let mut r = std::mem::take(&mut self.nodes[right]);
        let l = &mut self.nodes[left];
        if l.leaf {
            l.keys.append(&mut r.keys);
            l.vals.append(&mut r.vals);
            l.next = r.next;
        } else {
            l.keys.push(sep);
            l.keys.append(&mut r.keys);
            l.kids.append(&mut r.kids);
        }
        self.free.push(right);
    }

    /// Leaf that would contain the key.
    fn find_leaf(&self, key: i64) -> Option<NodeId> {
        let mut x = self.root?;
        while !self.nodes[x].leaf {
            x = self.nodes[x].kids[self.child_ix(x, key)];
        }
        Some(x)
    }

    /// Leftmost leaf of the tree.
    fn leftmost_leaf(&self) -> Option<NodeId> {
        let mut x = self.root?;
        while !self.nodes[x].leaf {
            x = self.nodes[x].kids[0];
        }
        Some(x)
    }

    /// Locators for min <= key <= max, in ascending key order.
    pub fn range_between(&self, min: i64, max: i64) -> Vec<RecordId> {
        let mut result = Vec::new();
        let mut leaf = self.find_leaf(min);
        while let Some(x) = leaf {
            let n = &self.nodes[x];
            for (i, &k) in n.keys.iter().enumerate() {
                if k > max {
                    return result;
                }
                if k >= min {
                    result.push(n.vals[i]);
                }
            }
            leaf = n.next;
        }
        result
    }

    /// Locators for key < max, in ascending key order.
    pub fn range_less_than(&self, max: i64) -> Vec<RecordId> {
        let mut result = Vec::new();
        let mut leaf = self.leftmost_leaf();
        while let Some(x) = leaf {
            let n = &self.nodes[x];
            for (i, &k) in n.keys.iter().enumerate() {
                if k >= max {
                    return result;
                }
                result.push(n.vals[i]);
            }
            leaf = n.next;
        }
        result
    }

    /// Locators for key > min, in ascending key order.
    pub fn range_greater_than(&self, min: i64) -> Vec<RecordId> {
        let mut result = Vec::new();
        let mut leaf = self.find_leaf(min);
        while let Some(x) = leaf {
            let n = &self.nodes[x];
            for (i, &k) in n.keys.iter().enumerate() {
                if k > min {
                    result.push(n.vals[i]);
                }
            }
            leaf = n.next;
        }
        result
    }

    /// All keys in ascending order, read off the leaf chain.
    pub fn keys(&self) -> Vec<i64> {
        let mut result = Vec::with_capacity(self.len);
        let mut leaf = self.leftmost_leaf();
        while let Some(x) = leaf {
            result.extend_from_slice(&self.nodes[x].keys);
            leaf = self.nodes[x].next;
        }
        result
    }

    #[cfg(any(feature = "verify", test))]
    /// Verify tree structure: key ordering and bounds, occupancy limits, uniform
    /// leaf depth, leaf chain agreement, and the entry count.
    pub fn verify(&self) {
        let Some(root) = self.root else {
            assert_eq!(self.len, 0, "empty tree with non-zero len");
            return;
        };
        let mut leaf_depth = None;
        let mut count = 0;
        self.verify_node(root, true, None, None, 0, &mut leaf_depth, &mut count);
        assert_eq!(count, self.len, "leaf entry count disagrees with len");
        let keys = self.keys();
        assert_eq!(keys.len(), self.len, "leaf chain disagrees with len");
        assert!(
            keys.windows(2).all(|w| w[0] < w[1]),
            "leaf chain is not strictly ascending"
        );
    }

    #[cfg(any(feature = "verify", test))]
    fn verify_node(
        &self,
        x: NodeId,
        is_root: bool,
        lo: Option<i64>,
        hi: Option<i64>,
        depth: usize,
        leaf_depth: &mut Option<usize>,
        count: &mut usize,
    ) {
        let n = &self.nodes[x];
        // Leaves obey the occupancy bounds exactly. Internal nodes get one key
        // of slack both ways: the preemptive split leaves a right half one key
        // short at small degrees, and a merge pulls the separator into a node
        // that is already at minimum; both heal on later descents.
        if n.leaf {
            assert!(n.keys.len() <= self.max_keys(), "leaf overfull");
            if !is_root {
                assert!(n.keys.len() >= self.min_keys(), "leaf underfull");
            }
        } else {
            assert!(n.keys.len() <= self.max_keys() + 1, "node overfull");
            if !is_root {
                assert!(
                    n.keys.len() + 1 >= self.min_keys(),
                    "node underfull"
                );
            }
        }
        if is_root {
            assert!(!n.keys.is_empty() || n.leaf, "empty internal root");
        }
        assert!(n.keys.windows(2).all(|w| w[0] < w[1]), "node keys unsorted");
        for &k in &n.keys {
            // Keys of child i sit at or above separator i-1 and below separator i.
            assert!(lo.map_or(true, |lo| k >= lo), "key below subtree bound");
            assert!(hi.map_or(true, |hi| k < hi), "key above subtree bound");
        }
        if n.leaf {
            assert_eq!(n.vals.len(), n.keys.len(), "leaf vals out of step");
            match *leaf_depth {
                None => *leaf_depth = Some(depth),
                Some(d) => assert_eq!(d, depth, "leaves at different depths"),
            }
            *count += n.keys.len();
        } else {
            assert_eq!(n.kids.len(), n.keys.len() + 1, "child count out of step");
            for (i, &kid) in n.kids.iter().enumerate() {
                let klo = if i == 0 { lo } else { Some(n.keys[i - 1]) };
                let khi = if i == n.keys.len() { hi } else { Some(n.keys[i]) };
                self.verify_node(kid, false, klo, khi, depth + 1, leaf_depth, count);
            }
        }
    }
}
