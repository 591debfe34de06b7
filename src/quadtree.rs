use crate::geometry::{Point, Rect};

/// Entries per node before it splits into quadrants.
const NODE_CAPACITY: usize = 16;

/// 2D point quadtree over the static element set.
///
/// Built once at session load and read-only afterwards; range queries and
/// typed counting run without locking. Entries whose position falls on a
/// quadrant boundary (or outside the construction bounds) stay resident in
/// the node where subdivision strands them, and the pruning bounds union
/// every inserted point, so a range query finds exactly the entries whose
/// position lies within the query rect.
#[derive(Debug, Clone)]
pub struct QuadTree<T> {
    root: Node<T>,
    len: usize,
}

#[derive(Debug, Clone)]
struct Node<T> {
    /// Pruning bounds: construction quadrant unioned with every point stored
    /// in or below this node.
    bounds: Rect,
    /// Quadrant partition frame, fixed at split time.
    frame: Rect,
    entries: Vec<(Point, T)>,
    children: Option<Box<[Node<T>; 4]>>,
}

impl<T> QuadTree<T> {
    pub fn new(bounds: Rect) -> Self {
        Self {
            root: Node::new(bounds),
            len: 0,
        }
    }

    /// Builds a tree sized to the extent of the given entries. The usual
    /// session-load path: compute the network extent, then index everything.
    pub fn from_entries(entries: impl IntoIterator<Item = (Point, T)>) -> Self {
        let entries: Vec<(Point, T)> = entries.into_iter().collect();
        let bounds = match entries.first() {
            Some((first, _)) => entries
                .iter()
                .fold(rect_at(*first), |acc, (pos, _)| acc.union_point(*pos)),
            None => Rect::new(0.0, 0.0, 0.0, 0.0),
        };
        let mut tree = Self::new(bounds);
        for (pos, item) in entries {
            tree.insert(item, pos);
        }
        tree
    }

    pub fn insert(&mut self, item: T, pos: Point) {
        self.root.insert(pos, item);
        self.len += 1;
    }

    /// Every indexed element whose position lies within `rect`. Order is
    /// unspecified but stable for a fixed tree. Empty tree yields an empty
    /// vec, not an error.
    pub fn query(&self, rect: &Rect) -> Vec<&T> {
        let mut out = Vec::new();
        self.root.query(rect, &mut out);
        out
    }

    /// Allocation-reusing variant of [`query`](Self::query) for per-frame use.
    pub fn query_into<'a>(&'a self, rect: &Rect, out: &mut Vec<&'a T>) {
        out.clear();
        self.root.query(rect, out);
    }

    /// Counts indexed elements matching `predicate` without materializing
    /// them. Used to size downstream buffers before allocation.
    pub fn count_matching(&self, predicate: impl Fn(&T) -> bool) -> usize {
        self.root.count_matching(&predicate)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bounds covering every inserted position.
    pub fn bounds(&self) -> Rect {
        self.root.bounds
    }
}

impl<T> Node<T> {
    fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            frame: bounds,
            entries: Vec::new(),
            children: None,
        }
    }

    fn insert(&mut self, pos: Point, item: T) {
        self.bounds = self.bounds.union_point(pos);

        if self.children.is_none() {
            self.entries.push((pos, item));
            if self.entries.len() > NODE_CAPACITY && self.frame.width() > 0.0 {
                self.split();
            }
            return;
        }

        match self.quadrant_of(pos) {
            Some(idx) => {
                if let Some(children) = self.children.as_mut() {
                    children[idx].insert(pos, item);
                }
            }
            // Boundary points and outliers stay with the parent.
            None => self.entries.push((pos, item)),
        }
    }

    fn split(&mut self) {
        let center = self.frame.center();
        let children = Box::new([
            Node::new(Rect::new(
                self.frame.min_easting,
                self.frame.min_northing,
                center.easting,
                center.northing,
            )),
            Node::new(Rect::new(
                center.easting,
                self.frame.min_northing,
                self.frame.max_easting,
                center.northing,
            )),
            Node::new(Rect::new(
                self.frame.min_easting,
                center.northing,
                center.easting,
                self.frame.max_northing,
            )),
            Node::new(Rect::new(
                center.easting,
                center.northing,
                self.frame.max_easting,
                self.frame.max_northing,
            )),
        ]);
        self.children = Some(children);

        let entries = std::mem::take(&mut self.entries);
        for (pos, item) in entries {
            match self.quadrant_of(pos) {
                Some(idx) => {
                    if let Some(children) = self.children.as_mut() {
                        children[idx].insert(pos, item);
                    }
                }
                None => self.entries.push((pos, item)),
            }
        }
    }

    /// Quadrant index for a strictly interior assignment; `None` keeps the
    /// entry in this node (split-line points, out-of-frame points).
    fn quadrant_of(&self, pos: Point) -> Option<usize> {
        if !self.frame.contains(pos) {
            return None;
        }
        let center = self.frame.center();
        if pos.easting == center.easting || pos.northing == center.northing {
            return None;
        }
        let east = pos.easting > center.easting;
        let north = pos.northing > center.northing;
        Some(match (east, north) {
            (false, false) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (true, true) => 3,
        })
    }

    fn query<'a>(&'a self, rect: &Rect, out: &mut Vec<&'a T>) {
        if !self.bounds.intersects(rect) {
            return;
        }
        for (pos, item) in &self.entries {
            if rect.contains(*pos) {
                out.push(item);
            }
        }
        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                child.query(rect, out);
            }
        }
    }

    fn count_matching(&self, predicate: &impl Fn(&T) -> bool) -> usize {
        let mut count = self.entries.iter().filter(|(_, item)| predicate(item)).count();
        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                count += child.count_matching(predicate);
            }
        }
        count
    }
}

fn rect_at(point: Point) -> Rect {
    Rect::new(point.easting, point.northing, point.easting, point.northing)
}
