//! Grouping, ordering and visibility helpers shared by topics and content.
//!
//! `order_index` is a position within a scope (unit for topics, topic for
//! content). A missing index sorts after every present one. A missing
//! `visible` flag means visible.

use std::collections::HashSet;
use std::hash::Hash;

pub trait Ordered {
    fn order_index(&self) -> Option<i64>;
    fn set_order_index(&mut self, idx: Option<i64>);
}

pub trait Visible {
    fn visible(&self) -> Option<bool>;
    fn set_visible(&mut self, v: bool);

    fn is_visible(&self) -> bool {
        self.visible() != Some(false)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// Group items by key. Groups come out in first-seen key order and items keep
/// their relative order inside a group.
pub fn group_by_key<T, K, F>(items: impl IntoIterator<Item = T>, key_fn: F) -> Vec<(K, Vec<T>)>
where
    K: Eq + Hash + Clone,
    F: Fn(&T) -> K,
{
    let mut groups: Vec<(K, Vec<T>)> = Vec::new();
    let mut seen: HashSet<K> = HashSet::new();
    for item in items {
        let key = key_fn(&item);
        if seen.insert(key.clone()) {
            groups.push((key, vec![item]));
        } else if let Some((_, group)) = groups.iter_mut().find(|(k, _)| *k == key) {
            group.push(item);
        }
    }
    groups
}

/// Stable ascending sort; items without an index go last.
pub fn sort_by_order_index<T: Ordered>(items: &mut [T]) {
    items.sort_by_key(|it| sort_key(it.order_index()));
}

pub fn sorted_by_order_index<T: Ordered + Clone>(items: &[T]) -> Vec<T> {
    let mut out = items.to_vec();
    sort_by_order_index(&mut out);
    out
}

fn sort_key(idx: Option<i64>) -> (bool, i64) {
    match idx {
        Some(i) => (false, i),
        None => (true, 0),
    }
}

/// Keep items whose `visible` flag is not explicitly `false`.
pub fn filter_visible<T: Visible + Clone>(items: &[T]) -> Vec<T> {
    items.iter().filter(|it| it.is_visible()).cloned().collect()
}

/// New value after a toggle. Absent counts as visible, so the first toggle hides.
pub fn toggled_visibility(current: Option<bool>) -> bool {
    !current.unwrap_or(true)
}

/// Swap the `order_index` of the target with its neighbour inside its scope.
///
/// Returns `false` (and changes nothing) when the target is not in scope or is
/// already at the boundary. When the scope has missing or duplicate indices they
/// are rewritten to `0..n` in current sorted order before swapping.
pub fn swap_with_neighbor<T, P, S>(items: &mut [T], is_target: P, in_scope: S, dir: MoveDirection) -> bool
where
    T: Ordered,
    P: Fn(&T) -> bool,
    S: Fn(&T) -> bool,
{
    let mut scope: Vec<usize> = (0..items.len()).filter(|&i| in_scope(&items[i])).collect();
    scope.sort_by_key(|&i| sort_key(items[i].order_index()));

    let Some(pos) = scope.iter().position(|&i| is_target(&items[i])) else {
        return false;
    };
    let neighbor_pos = match dir {
        MoveDirection::Up if pos > 0 => pos - 1,
        MoveDirection::Down if pos + 1 < scope.len() => pos + 1,
        _ => return false,
    };

    let mut distinct = HashSet::new();
    let needs_renumber = scope
        .iter()
        .any(|&i| items[i].order_index().map_or(true, |v| !distinct.insert(v)));
    if needs_renumber {
        for (n, &i) in scope.iter().enumerate() {
            items[i].set_order_index(Some(n as i64));
        }
    }

    let (a, b) = (scope[pos], scope[neighbor_pos]);
    let a_idx = items[a].order_index();
    let b_idx = items[b].order_index();
    items[a].set_order_index(b_idx);
    items[b].set_order_index(a_idx);
    true
}
