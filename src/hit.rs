#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::{Bounds, Point};
use crate::element::Element;
use crate::registry::ElementRegistry;

/// Topmost element whose box contains `world_pt` (edges inclusive).
///
/// Later-registered elements draw on top, so the registry is scanned in reverse.
#[must_use]
pub fn hit_test(registry: &ElementRegistry, world_pt: Point) -> Option<&Element> {
    registry.iter().rev().find(|element| element.contains(world_pt))
}

/// Every element overlapping the box spanned by two corners, in draw order.
///
/// The corners may come in any order; partial overlap and touching edges count.
#[must_use]
pub fn query_box(registry: &ElementRegistry, corner_a: Point, corner_b: Point) -> Vec<&Element> {
    query_bounds(registry, &Bounds::from_corners(corner_a, corner_b))
}

/// Every element overlapping `bounds`, in draw order.
#[must_use]
pub fn query_bounds<'a>(registry: &'a ElementRegistry, bounds: &Bounds) -> Vec<&'a Element> {
    registry
        .iter()
        .filter(|element| element.bounds().intersects(bounds))
        .collect()
}

/// Union of all element boxes, or `None` for an empty registry.
#[must_use]
pub fn content_bounds(registry: &ElementRegistry) -> Option<Bounds> {
    registry
        .iter()
        .map(Element::bounds)
        .reduce(|acc, b| acc.union(&b))
}
