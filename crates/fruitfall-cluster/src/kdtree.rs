//! Static 2-D KD-tree over projected point coordinates.
//!
//! Built once per zoom level. Entries are partially sorted in place so that
//! every subtree occupies a contiguous range; ranges no larger than
//! `node_size + 1` are scanned linearly.

#[derive(Debug, Clone, Copy)]
struct Entry {
    index: usize,
    x: f64,
    y: f64,
}

impl Entry {
    fn coord(&self, axis: usize) -> f64 {
        if axis == 0 {
            self.x
        } else {
            self.y
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct KdTree {
    entries: Vec<Entry>,
    node_size: usize,
}

impl KdTree {
    /// Index `points`; the position of each point in the iterator is the
    /// value returned by queries.
    pub(crate) fn build(points: impl IntoIterator<Item = (f64, f64)>, node_size: usize) -> Self {
        let node_size = node_size.max(1);
        let mut entries: Vec<Entry> = points
            .into_iter()
            .enumerate()
            .map(|(index, (x, y))| Entry { index, x, y })
            .collect();
        sort_kd(&mut entries, node_size, 0);
        Self { entries, node_size }
    }

    /// Indices of all points inside the axis-aligned box (inclusive).
    pub(crate) fn range(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<usize> {
        let inside = |e: &Entry| e.x >= min_x && e.x <= max_x && e.y >= min_y && e.y <= max_y;
        self.search(inside, |axis, value| {
            if axis == 0 {
                (min_x <= value, max_x >= value)
            } else {
                (min_y <= value, max_y >= value)
            }
        })
    }

    /// Indices of all points within Euclidean distance `r` of `(x, y)`.
    pub(crate) fn within(&self, x: f64, y: f64, r: f64) -> Vec<usize> {
        let r2 = r * r;
        let inside = |e: &Entry| {
            let dx = e.x - x;
            let dy = e.y - y;
            dx * dx + dy * dy <= r2
        };
        self.search(inside, |axis, value| {
            let centre = if axis == 0 { x } else { y };
            (centre - r <= value, centre + r >= value)
        })
    }

    /// Shared traversal. `descend(axis, split)` returns whether the left and
    /// right halves can still contain matches.
    fn search<P, D>(&self, inside: P, descend: D) -> Vec<usize>
    where
        P: Fn(&Entry) -> bool,
        D: Fn(usize, f64) -> (bool, bool),
    {
        let mut result = Vec::new();
        if self.entries.is_empty() {
            return result;
        }

        let mut stack = vec![(0usize, self.entries.len() - 1, 0usize)];
        while let Some((left, right, axis)) = stack.pop() {
            if right - left <= self.node_size {
                result.extend(
                    self.entries[left..=right]
                        .iter()
                        .filter(|e| inside(e))
                        .map(|e| e.index),
                );
                continue;
            }

            let m = left + (right - left) / 2;
            let pivot = &self.entries[m];
            if inside(pivot) {
                result.push(pivot.index);
            }

            let (go_left, go_right) = descend(axis, pivot.coord(axis));
            if go_left {
                stack.push((left, m - 1, 1 - axis));
            }
            if go_right {
                stack.push((m + 1, right, 1 - axis));
            }
        }
        result
    }
}

fn sort_kd(entries: &mut [Entry], node_size: usize, axis: usize) {
    if entries.len() <= node_size + 1 {
        return;
    }
    let m = (entries.len() - 1) / 2;
    entries.select_nth_unstable_by(m, |a, b| a.coord(axis).total_cmp(&b.coord(axis)));
    let (lower, upper) = entries.split_at_mut(m);
    sort_kd(lower, node_size, 1 - axis);
    sort_kd(&mut upper[1..], node_size, 1 - axis);
}
