//! Order normalisation.
//!
//! A reorder request may be partial, contain unknown ids, duplicates or
//! gapped indices. The result always covers every entity of the collection
//! with indices `0..n`: requested entities first, by requested index, then
//! the rest in their prior relative order.

use std::collections::{HashMap, HashSet};

use auberge_shared::{CatalogEntity, EntityId, OrderEntry};

/// Compute the full order for `items` given a requested (partial) order.
pub fn normalize_order(items: &[CatalogEntity], requested: &[OrderEntry]) -> Vec<OrderEntry> {
    let known: HashSet<&EntityId> = items.iter().map(|e| &e.id).collect();

    let mut seen = HashSet::new();
    let mut placed: Vec<(u32, usize, &EntityId)> = requested
        .iter()
        .enumerate()
        .filter(|(_, entry)| known.contains(&entry.id) && seen.insert(&entry.id))
        .map(|(pos, entry)| (entry.order_index, pos, &entry.id))
        .collect();
    placed.sort_by_key(|(index, pos, _)| (*index, *pos));

    let mut prior: Vec<(usize, &CatalogEntity)> = items.iter().enumerate().collect();
    prior.sort_by_key(|(pos, e)| (e.order_index, *pos));

    placed
        .into_iter()
        .map(|(_, _, id)| id)
        .chain(
            prior
                .into_iter()
                .map(|(_, e)| &e.id)
                .filter(|id| !seen.contains(id)),
        )
        .enumerate()
        .map(|(index, id)| OrderEntry::new(id.clone(), index as u32))
        .collect()
}

/// Assign the indices of `order` and sort `items` by them. Entities absent
/// from `order` keep their index and sort after equal indices.
pub fn apply_order(items: &mut [CatalogEntity], order: &[OrderEntry]) {
    let positions: HashMap<&EntityId, u32> =
        order.iter().map(|entry| (&entry.id, entry.order_index)).collect();
    for item in items.iter_mut() {
        if let Some(&index) = positions.get(&item.id) {
            item.order_index = index;
        }
    }
    items.sort_by_key(|e| e.order_index);
}

/// Sort a fetched collection into display order.
pub fn sort_by_order(items: &mut [CatalogEntity]) {
    items.sort_by_key(|e| e.order_index);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(ids: &[&str]) -> Vec<CatalogEntity> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| CatalogEntity::new(EntityId::from(*id), i as u32))
            .collect()
    }

    fn ids(items: &[CatalogEntity]) -> Vec<&str> {
        items.iter().map(|e| e.id.as_str()).collect()
    }

    fn reorder(items: &mut Vec<CatalogEntity>, requested: &[OrderEntry]) {
        let order = normalize_order(items, requested);
        apply_order(items, &order);
    }

    #[test]
    fn test_full_reorder() {
        let mut items = collection(&["a", "b", "c"]);
        reorder(
            &mut items,
            &[OrderEntry::new("c", 0), OrderEntry::new("a", 1), OrderEntry::new("b", 2)],
        );
        assert_eq!(ids(&items), ["c", "a", "b"]);
    }

    #[test]
    fn test_missing_entities_are_appended_in_prior_order() {
        let mut items = collection(&["a", "b", "c", "d"]);
        reorder(&mut items, &[OrderEntry::new("d", 0), OrderEntry::new("b", 1)]);
        assert_eq!(ids(&items), ["d", "b", "a", "c"]);
    }

    #[test]
    fn test_unknown_and_duplicate_ids_are_ignored() {
        let mut items = collection(&["a", "b"]);
        reorder(
            &mut items,
            &[
                OrderEntry::new("ghost", 0),
                OrderEntry::new("b", 5),
                OrderEntry::new("b", 0),
                OrderEntry::new("a", 9),
            ],
        );
        assert_eq!(ids(&items), ["b", "a"]);
    }

    #[test]
    fn test_reorder_is_idempotent() {
        let requested = [OrderEntry::new("c", 3), OrderEntry::new("a", 7)];
        let mut items = collection(&["a", "b", "c", "d"]);

        reorder(&mut items, &requested);
        let first = items.clone();
        reorder(&mut items, &requested);

        assert_eq!(items, first);
    }

    #[test]
    fn test_indices_form_a_permutation() {
        let mut items = collection(&["a", "b", "c", "d", "e"]);
        // scramble the prior indices with gaps and duplicates
        for (item, index) in items.iter_mut().zip([4u32, 4, 10, 0, 2]) {
            item.order_index = index;
        }
        reorder(&mut items, &[OrderEntry::new("e", 100), OrderEntry::new("a", 100)]);

        let mut indices: Vec<u32> = items.iter().map(|e| e.order_index).collect();
        indices.sort_unstable();
        assert_eq!(indices, (0..5).collect::<Vec<u32>>());
        assert_eq!(ids(&items), ["e", "a", "d", "b", "c"]);
    }

    #[test]
    fn test_empty_request_compacts_prior_order() {
        let mut items = collection(&["a", "b", "c"]);
        items[0].order_index = 7;
        reorder(&mut items, &[]);
        assert_eq!(ids(&items), ["b", "c", "a"]);
        assert_eq!(items.iter().map(|e| e.order_index).collect::<Vec<_>>(), [0, 1, 2]);
    }
}
