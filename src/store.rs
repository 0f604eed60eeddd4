//! Immutable quadrant → items mapping.
//!
//! Every operation returns a new [`Contents`]; quadrants an operation does not touch
//! keep sharing the same allocation as the input snapshot.

use crate::model::{Item, Quadrant};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct Contents {
    quadrants: [Arc<[Item]>; 4],
}

impl Default for Contents {
    fn default() -> Self {
        let empty: Arc<[Item]> = Arc::from(Vec::new());
        Contents {
            quadrants: [empty.clone(), empty.clone(), empty.clone(), empty],
        }
    }
}

impl Contents {
    pub fn get(&self, quadrant: Quadrant) -> &Arc<[Item]> {
        &self.quadrants[quadrant.index()]
    }

    pub fn item(&self, quadrant: Quadrant, index: usize) -> Option<&Item> {
        self.get(quadrant).get(index)
    }

    pub fn total_len(&self) -> usize {
        self.quadrants.iter().map(|items| items.len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Quadrant, &[Item])> + '_ {
        Quadrant::ALL
            .into_iter()
            .map(move |q| (q, &self.quadrants[q.index()][..]))
    }

    fn with(&self, quadrant: Quadrant, items: Vec<Item>) -> Contents {
        let mut next = self.clone();
        next.quadrants[quadrant.index()] = Arc::from(items);
        next
    }

    pub fn replace_quadrant(&self, quadrant: Quadrant, items: Vec<Item>) -> Contents {
        debug!(%quadrant, len = items.len(), "replace quadrant");
        self.with(quadrant, items)
    }

    pub fn append_item(&self, quadrant: Quadrant, item: Item) -> Contents {
        let mut items = self.get(quadrant).to_vec();
        items.push(item);
        debug!(%quadrant, len = items.len(), "append item");
        self.with(quadrant, items)
    }

    pub fn remove_at(&self, quadrant: Quadrant, index: usize) -> Contents {
        let current = self.get(quadrant);
        if index >= current.len() {
            return self.clone();
        }
        let items = current
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, item)| item.clone())
            .collect();
        debug!(%quadrant, index, "remove item");
        self.with(quadrant, items)
    }

    /// Copies the quadrant with one element changed. Out-of-range indices leave the
    /// snapshot untouched.
    pub fn update_at<F>(&self, quadrant: Quadrant, index: usize, f: F) -> Contents
    where
        F: FnOnce(&mut Item),
    {
        if index >= self.get(quadrant).len() {
            return self.clone();
        }
        let mut items = self.get(quadrant).to_vec();
        f(&mut items[index]);
        self.with(quadrant, items)
    }

    /// Removes `from_index` from `from` and appends `item` to `to` in a single
    /// snapshot, so the item is never observed in both quadrants or in neither.
    pub fn move_across(
        &self,
        from: Quadrant,
        from_index: usize,
        to: Quadrant,
        item: Item,
    ) -> Contents {
        if from_index >= self.get(from).len() {
            return self.clone();
        }
        debug!(%from, from_index, %to, "move item across quadrants");
        self.remove_at(from, from_index).append_item(to, item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::model::Rgb;
    use proptest::prelude::*;

    fn item(text: &str) -> Item {
        Item {
            text: text.into(),
            color: Rgb::BLACK,
            font_size: 16,
            position: Point::default(),
            is_todo: false,
            completed: false,
        }
    }

    fn texts(contents: &Contents, q: Quadrant) -> Vec<String> {
        contents.get(q).iter().map(|i| i.text.clone()).collect()
    }

    fn seeded() -> Contents {
        Contents::default()
            .append_item(Quadrant::A, item("a0"))
            .append_item(Quadrant::A, item("a1"))
            .append_item(Quadrant::B, item("b0"))
            .append_item(Quadrant::D, item("d0"))
    }

    #[test]
    fn default_has_four_empty_quadrants() {
        let contents = Contents::default();
        assert_eq!(contents.iter().count(), 4);
        assert!(contents.iter().all(|(_, items)| items.is_empty()));
    }

    #[test]
    fn untouched_quadrants_share_storage() {
        let before = seeded();
        let after = before.append_item(Quadrant::A, item("a2"));
        assert!(!Arc::ptr_eq(before.get(Quadrant::A), after.get(Quadrant::A)));
        for q in [Quadrant::B, Quadrant::C, Quadrant::D] {
            assert!(Arc::ptr_eq(before.get(q), after.get(q)));
        }

        let removed = after.remove_at(Quadrant::B, 0);
        for q in [Quadrant::A, Quadrant::C, Quadrant::D] {
            assert!(Arc::ptr_eq(after.get(q), removed.get(q)));
        }

        let replaced = removed.replace_quadrant(Quadrant::C, vec![item("c0")]);
        for q in [Quadrant::A, Quadrant::B, Quadrant::D] {
            assert!(Arc::ptr_eq(removed.get(q), replaced.get(q)));
        }
    }

    #[test]
    fn remove_out_of_range_is_noop() {
        let before = seeded();
        let after = before.remove_at(Quadrant::A, 9);
        assert_eq!(before, after);
        assert!(Arc::ptr_eq(before.get(Quadrant::A), after.get(Quadrant::A)));
    }

    #[test]
    fn remove_keeps_order() {
        let contents = seeded()
            .append_item(Quadrant::A, item("a2"))
            .remove_at(Quadrant::A, 1);
        assert_eq!(texts(&contents, Quadrant::A), ["a0", "a2"]);
    }

    #[test]
    fn update_changes_single_element() {
        let contents = seeded().update_at(Quadrant::A, 1, |i| i.text = "edited".into());
        assert_eq!(texts(&contents, Quadrant::A), ["a0", "edited"]);
        let unchanged = contents.update_at(Quadrant::C, 0, |i| i.text = "nope".into());
        assert_eq!(unchanged, contents);
    }

    #[test]
    fn move_across_appends_to_destination() {
        let before = seeded();
        let moving = before.item(Quadrant::A, 0).cloned().unwrap();
        let after = before.move_across(Quadrant::A, 0, Quadrant::D, moving);
        assert_eq!(texts(&after, Quadrant::A), ["a1"]);
        assert_eq!(texts(&after, Quadrant::D), ["d0", "a0"]);
        assert!(Arc::ptr_eq(before.get(Quadrant::B), after.get(Quadrant::B)));
        assert_eq!(before.total_len(), after.total_len());
    }

    #[test]
    fn move_across_with_stale_index_does_not_duplicate() {
        let before = seeded();
        let after = before.move_across(Quadrant::C, 0, Quadrant::A, item("ghost"));
        assert_eq!(before, after);
    }

    proptest! {
        #[test]
        fn moves_preserve_item_count(
            moves in prop::collection::vec((0usize..4, 0usize..6, 0usize..4), 0..40)
        ) {
            let mut contents = seeded();
            let total = contents.total_len();
            for (from, index, to) in moves {
                let (from, to) = (Quadrant::ALL[from], Quadrant::ALL[to]);
                let moving = contents.item(from, index).cloned().unwrap_or_else(|| item("x"));
                contents = contents.move_across(from, index, to, moving);
                prop_assert_eq!(contents.total_len(), total);
            }
        }
    }
}
