//! Slot assignment and layer rotation for the outfit canvas.
//!
//! Each garment category owns a fixed, ordered set of candidate slots.
//! Adding a garment takes the first free slot; a directional swipe cycles
//! the category's occupants through their slots. Both operations are pure
//! functions over the layer collection.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::slots::{slots, Slot};
use crate::models::{Category, OutfitLayer};

/// Positions coming back from storage went through REAL columns; compare
/// with a tolerance rather than bit equality.
const POSITION_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Left => write!(f, "left"),
            Direction::Right => write!(f, "right"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            _ => Err(format!("Invalid direction '{}'. Valid options: left, right", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanvasError {
    /// Every candidate slot for the category is occupied.
    CategoryFull(Category),
}

impl fmt::Display for CanvasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanvasError::CategoryFull(category) => {
                write!(
                    f,
                    "All {} slot(s) for '{}' are occupied",
                    slots(*category).len(),
                    category
                )
            }
        }
    }
}

impl std::error::Error for CanvasError {}

fn same_position(layer: &OutfitLayer, slot: &Slot) -> bool {
    (layer.position_x - slot.x).abs() < POSITION_EPSILON
        && (layer.position_y - slot.y).abs() < POSITION_EPSILON
}

/// Returns the first free candidate slot for `category`, scanning the
/// table in declared order. Occupancy is exact positional match against
/// layers of the same category.
pub fn assign_slot(
    category: Category,
    layers: &[OutfitLayer],
    categories: &HashMap<Uuid, Category>,
) -> Result<Slot, CanvasError> {
    let occupied: Vec<&OutfitLayer> = layers
        .iter()
        .filter(|l| categories.get(&l.garment_id) == Some(&category))
        .collect();

    slots(category)
        .iter()
        .find(|slot| !occupied.iter().any(|l| same_position(l, slot)))
        .copied()
        .ok_or(CanvasError::CategoryFull(category))
}

/// Rank of a layer among its category's candidate slots: index in the slot
/// table when the position matches a slot, otherwise ordered after all
/// table matches by ascending x.
fn slot_rank(layer: &OutfitLayer, category: Category) -> (usize, f64) {
    let rank = slots(category)
        .iter()
        .position(|slot| same_position(layer, slot))
        .unwrap_or(usize::MAX);
    (rank, layer.position_x)
}

/// Cycles the layers of `category` through their occupied slots.
///
/// With occupants ordered by slot rank, `Right` moves every occupant to the
/// next occupied slot, the last wrapping around to the first; `Left` is the
/// mirror. Each layer keeps its garment, z-index, scale, and rotation and
/// only changes position. Layers of other categories pass through
/// untouched, and a category with fewer than two occupants is a no-op.
pub fn rotate(
    category: Category,
    layers: &[OutfitLayer],
    categories: &HashMap<Uuid, Category>,
    direction: Direction,
) -> Vec<OutfitLayer> {
    let mut result = layers.to_vec();

    let mut selected: Vec<usize> = (0..result.len())
        .filter(|&i| categories.get(&result[i].garment_id) == Some(&category))
        .collect();

    if selected.len() <= 1 {
        return result;
    }

    selected.sort_by(|&a, &b| {
        let (rank_a, x_a) = slot_rank(&result[a], category);
        let (rank_b, x_b) = slot_rank(&result[b], category);
        rank_a.cmp(&rank_b).then(x_a.total_cmp(&x_b))
    });

    let positions: Vec<(f64, f64)> = selected
        .iter()
        .map(|&i| (result[i].position_x, result[i].position_y))
        .collect();

    let count = selected.len();
    for (j, &i) in selected.iter().enumerate() {
        let source = match direction {
            Direction::Right => (j + 1) % count,
            Direction::Left => (j + count - 1) % count,
        };
        result[i].position_x = positions[source].0;
        result[i].position_y = positions[source].1;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer_at(garment_id: Uuid, z: i32, slot: Slot) -> OutfitLayer {
        OutfitLayer::new(garment_id, z, slot.x, slot.y)
    }

    /// Four tops in slots 1..4 with z-index 1..4, plus one unrelated layer.
    fn four_tops() -> (Vec<OutfitLayer>, HashMap<Uuid, Category>, Vec<Uuid>) {
        let table = slots(Category::Top);
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let hat = Uuid::new_v4();

        let mut layers: Vec<OutfitLayer> = ids
            .iter()
            .enumerate()
            .map(|(i, &id)| layer_at(id, i as i32 + 1, table[i]))
            .collect();
        layers.push(layer_at(hat, 9, slots(Category::Head)[0]));

        let mut categories: HashMap<Uuid, Category> =
            ids.iter().map(|&id| (id, Category::Top)).collect();
        categories.insert(hat, Category::Head);

        (layers, categories, ids)
    }

    fn slot_of(layer: &OutfitLayer, category: Category) -> usize {
        slots(category)
            .iter()
            .position(|s| same_position(layer, s))
            .expect("layer not on a candidate slot")
    }

    #[test]
    fn test_assign_slot_first_free() {
        let (layers, categories, _) = four_tops();

        // Tops are full, but head has one slot left
        let slot = assign_slot(Category::Head, &layers, &categories).unwrap();
        assert_eq!(slot, slots(Category::Head)[1]);
    }

    #[test]
    fn test_assign_slot_empty_category() {
        let slot = assign_slot(Category::Bag, &[], &HashMap::new()).unwrap();
        assert_eq!(slot, slots(Category::Bag)[0]);
    }

    #[test]
    fn test_assign_slot_rejects_full_category() {
        let (layers, categories, _) = four_tops();

        let result = assign_slot(Category::Top, &layers, &categories);
        assert_eq!(result, Err(CanvasError::CategoryFull(Category::Top)));
    }

    #[test]
    fn test_rotate_right_cycles_occupants() {
        let (layers, categories, ids) = four_tops();

        let rotated = rotate(Category::Top, &layers, &categories, Direction::Right);

        // G4 wraps to slot 1; everyone else shifts one slot forward
        let by_id = |id: Uuid| rotated.iter().find(|l| l.garment_id == id).unwrap();
        assert_eq!(slot_of(by_id(ids[3]), Category::Top), 0);
        assert_eq!(slot_of(by_id(ids[0]), Category::Top), 1);
        assert_eq!(slot_of(by_id(ids[1]), Category::Top), 2);
        assert_eq!(slot_of(by_id(ids[2]), Category::Top), 3);

        // z-index travels with the garment
        assert_eq!(by_id(ids[3]).z_index, 4);
        assert_eq!(by_id(ids[0]).z_index, 1);
    }

    #[test]
    fn test_rotate_left_is_mirror() {
        let (layers, categories, ids) = four_tops();

        let rotated = rotate(Category::Top, &layers, &categories, Direction::Left);

        let by_id = |id: Uuid| rotated.iter().find(|l| l.garment_id == id).unwrap();
        assert_eq!(slot_of(by_id(ids[0]), Category::Top), 3);
        assert_eq!(slot_of(by_id(ids[1]), Category::Top), 0);
        assert_eq!(slot_of(by_id(ids[2]), Category::Top), 1);
        assert_eq!(slot_of(by_id(ids[3]), Category::Top), 2);
    }

    #[test]
    fn test_rotate_right_then_left_restores() {
        let (layers, categories, _) = four_tops();

        let there = rotate(Category::Top, &layers, &categories, Direction::Right);
        let back = rotate(Category::Top, &there, &categories, Direction::Left);

        assert_eq!(back, layers);
    }

    #[test]
    fn test_rotate_full_cycle_restores() {
        let (layers, categories, _) = four_tops();

        let mut current = layers.clone();
        for _ in 0..4 {
            current = rotate(Category::Top, &current, &categories, Direction::Right);
        }
        assert_eq!(current, layers);
    }

    #[test]
    fn test_rotate_untouched_other_categories() {
        let (layers, categories, _) = four_tops();

        let rotated = rotate(Category::Top, &layers, &categories, Direction::Right);

        let hat_before = layers.last().unwrap();
        let hat_after = rotated
            .iter()
            .find(|l| l.garment_id == hat_before.garment_id)
            .unwrap();
        assert_eq!(hat_after, hat_before);
    }

    #[test]
    fn test_rotate_noop_for_zero_or_one() {
        let categories = HashMap::new();
        assert!(rotate(Category::Top, &[], &categories, Direction::Right).is_empty());

        let id = Uuid::new_v4();
        let layers = vec![layer_at(id, 1, slots(Category::Top)[0])];
        let categories: HashMap<Uuid, Category> = [(id, Category::Top)].into();

        let rotated = rotate(Category::Top, &layers, &categories, Direction::Right);
        assert_eq!(rotated, layers);
        let rotated = rotate(Category::Top, &layers, &categories, Direction::Left);
        assert_eq!(rotated, layers);
    }

    #[test]
    fn test_rotate_partial_occupancy() {
        // Only two of four top slots occupied: rotation swaps them
        let table = slots(Category::Top);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let layers = vec![layer_at(a, 1, table[0]), layer_at(b, 2, table[2])];
        let categories: HashMap<Uuid, Category> =
            [(a, Category::Top), (b, Category::Top)].into();

        let rotated = rotate(Category::Top, &layers, &categories, Direction::Right);

        let by_id = |id: Uuid| rotated.iter().find(|l| l.garment_id == id).unwrap();
        assert_eq!(slot_of(by_id(a), Category::Top), 2);
        assert_eq!(slot_of(by_id(b), Category::Top), 0);
    }

    #[test]
    fn test_rotate_is_deterministic() {
        let (layers, categories, _) = four_tops();

        let first = rotate(Category::Top, &layers, &categories, Direction::Right);
        let second = rotate(Category::Top, &layers, &categories, Direction::Right);
        assert_eq!(first, second);
    }
}
