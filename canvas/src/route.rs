//! Connection anchors and orthogonal paths.
//!
//! Anchors sit at the midpoints of an entity's bounding box. A connection
//! leaves the source through the side facing the target and enters the target
//! through the opposite side, bending once at the midpoint between the two so
//! the path stays axis-aligned on the grid.

#[cfg(test)]
#[path = "route_test.rs"]
mod route_test;

use std::collections::HashMap;

use crate::camera::{Point, Rect};
use crate::consts::{RESOURCE_HEIGHT, RESOURCE_WIDTH};
use crate::doc::{DocStore, EntityId, EntityKind, EntityRef};

/// One of the four edge midpoints of a bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorSide {
    Left,
    Right,
    Top,
    Bottom,
}

impl AnchorSide {
    pub const ALL: [AnchorSide; 4] = [Self::Left, Self::Right, Self::Top, Self::Bottom];

    #[must_use]
    pub fn is_vertical(self) -> bool {
        matches!(self, Self::Top | Self::Bottom)
    }
}

/// World position of an anchor on `rect`.
#[must_use]
pub fn anchor_point(rect: &Rect, side: AnchorSide) -> Point {
    let c = rect.center();
    match side {
        AnchorSide::Left => Point::new(rect.x, c.y),
        AnchorSide::Right => Point::new(rect.right(), c.y),
        AnchorSide::Top => Point::new(c.x, rect.y),
        AnchorSide::Bottom => Point::new(c.x, rect.bottom()),
    }
}

/// Sides to leave `from` and enter a box centred at `to`.
///
/// Left/right unless the vertical offset dominates.
#[must_use]
pub fn facing_sides(from: Point, to: Point) -> (AnchorSide, AnchorSide) {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    if dy.abs() > dx.abs() {
        if dy >= 0.0 { (AnchorSide::Bottom, AnchorSide::Top) } else { (AnchorSide::Top, AnchorSide::Bottom) }
    } else if dx >= 0.0 {
        (AnchorSide::Right, AnchorSide::Left)
    } else {
        (AnchorSide::Left, AnchorSide::Right)
    }
}

/// Axis-aligned polyline from `start` to `end` with one jog at the midpoint.
///
/// When `vertical` the jog runs through the mid y, otherwise through the mid x.
#[must_use]
pub fn orthogonal_path(start: Point, end: Point, vertical: bool) -> Vec<Point> {
    if vertical {
        let mid_y = (start.y + end.y) * 0.5;
        vec![start, Point::new(start.x, mid_y), Point::new(end.x, mid_y), end]
    } else {
        let mid_x = (start.x + end.x) * 0.5;
        vec![start, Point::new(mid_x, start.y), Point::new(mid_x, end.y), end]
    }
}

/// A drawable connection path.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub points: Vec<Point>,
    /// Drawn dashed; used for the in-progress draft.
    pub dashed: bool,
}

/// Path between two boxes through their facing anchors.
#[must_use]
pub fn route_between(source: &Rect, target: &Rect) -> Route {
    let (out_side, in_side) = facing_sides(source.center(), target.center());
    let start = anchor_point(source, out_side);
    let end = anchor_point(target, in_side);
    Route { points: orthogonal_path(start, end, out_side.is_vertical()), dashed: false }
}

/// Dashed preview from a source box towards the cursor.
#[must_use]
pub fn draft_route(source: &Rect, cursor: Point) -> Route {
    let (out_side, _) = facing_sides(source.center(), cursor);
    let start = anchor_point(source, out_side);
    Route { points: orthogonal_path(start, cursor, out_side.is_vertical()), dashed: true }
}

/// Rectangle of an entity, with transient positions substituted for resources
/// that are mid-drag.
#[must_use]
pub fn entity_rect_with(doc: &DocStore, entity: EntityRef, overrides: &HashMap<EntityId, Point>) -> Option<Rect> {
    match (entity.kind, overrides.get(&entity.id)) {
        (EntityKind::Resource, Some(p)) => Some(Rect::new(p.x, p.y, RESOURCE_WIDTH, RESOURCE_HEIGHT)),
        _ => doc.entity_rect(entity),
    }
}

/// Routes for every connection whose endpoints both have geometry, ordered by
/// connection id.
#[must_use]
pub fn connection_routes(doc: &DocStore, overrides: &HashMap<EntityId, Point>) -> Vec<(EntityId, Route)> {
    doc.sorted_connections()
        .into_iter()
        .filter_map(|c| {
            let source = entity_rect_with(doc, c.source(), overrides)?;
            let target = entity_rect_with(doc, c.target(), overrides)?;
            Some((c.id, route_between(&source, &target)))
        })
        .collect()
}
