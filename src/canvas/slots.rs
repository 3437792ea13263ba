use crate::models::Category;

/// One of a category's fixed candidate placement positions, as percentage
/// coordinates on the outfit canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slot {
    pub x: f64,
    pub y: f64,
}

const HEAD_SLOTS: [Slot; 2] = [Slot { x: 50.0, y: 8.0 }, Slot { x: 32.0, y: 10.0 }];

const TOP_SLOTS: [Slot; 4] = [
    Slot { x: 28.0, y: 32.0 },
    Slot { x: 50.0, y: 30.0 },
    Slot { x: 72.0, y: 32.0 },
    Slot { x: 50.0, y: 44.0 },
];

const BOTTOM_SLOTS: [Slot; 3] = [
    Slot { x: 38.0, y: 62.0 },
    Slot { x: 58.0, y: 62.0 },
    Slot { x: 48.0, y: 70.0 },
];

const FEET_SLOTS: [Slot; 2] = [Slot { x: 40.0, y: 88.0 }, Slot { x: 60.0, y: 88.0 }];

const ACC_SLOTS: [Slot; 4] = [
    Slot { x: 15.0, y: 25.0 },
    Slot { x: 85.0, y: 25.0 },
    Slot { x: 15.0, y: 55.0 },
    Slot { x: 85.0, y: 55.0 },
];

const BAG_SLOTS: [Slot; 2] = [Slot { x: 80.0, y: 70.0 }, Slot { x: 20.0, y: 70.0 }];

/// The ordered candidate slots for a category. Order is the assignment
/// priority; capacity is the table length.
pub fn slots(category: Category) -> &'static [Slot] {
    match category {
        Category::Head => &HEAD_SLOTS,
        Category::Top => &TOP_SLOTS,
        Category::Bottom => &BOTTOM_SLOTS,
        Category::Feet => &FEET_SLOTS,
        Category::Acc => &ACC_SLOTS,
        Category::Bag => &BAG_SLOTS,
    }
}
