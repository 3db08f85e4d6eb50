//! Hit testing: which entity, and which part of it, lies under a world point.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::{Camera, Point, Rect};
use crate::consts::ANCHOR_RADIUS_PX;
use crate::doc::{DocStore, DomainType, EntityId, EntityRef};
use crate::route::{AnchorSide, anchor_point};

/// Which part of an entity was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    Body,
    Anchor(AnchorSide),
}

/// Result of a hit test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub entity: EntityRef,
    pub part: HitPart,
}

/// Test which entity (if any) is under `world_pt`.
///
/// Priority: resource anchors, domain anchors, resource bodies, domain
/// bodies. Anchor zones are sized in screen pixels so they stay grabbable at
/// any zoom. Among overlapping domains the smallest wins.
#[must_use]
pub fn hit_test(world_pt: Point, doc: &DocStore, camera: &Camera) -> Option<Hit> {
    let radius = camera.screen_dist_to_world(ANCHOR_RADIUS_PX);

    let resources: Vec<(EntityRef, Rect)> = doc
        .sorted_resources()
        .into_iter()
        .filter_map(|r| r.rect().map(|rect| (EntityRef::resource(r.id), rect)))
        .collect();
    let domains: Vec<(EntityRef, Rect)> = doc
        .sorted_domains()
        .into_iter()
        .filter_map(|d| doc.domain_rect(&d.id).map(|rect| (EntityRef::domain(d.id), rect)))
        .collect();

    anchor_hit(world_pt, &resources, radius)
        .or_else(|| anchor_hit(world_pt, &domains, radius))
        .or_else(|| {
            resources
                .iter()
                .rev()
                .find(|(_, rect)| rect.contains(world_pt))
                .map(|(entity, _)| Hit { entity: *entity, part: HitPart::Body })
        })
        .or_else(|| {
            smallest_containing(world_pt, domains.iter().copied())
                .map(|entity| Hit { entity, part: HitPart::Body })
        })
}

/// Innermost domain containing `world_pt`, optionally restricted to one type.
#[must_use]
pub fn domain_at(world_pt: Point, doc: &DocStore, kind: Option<DomainType>) -> Option<EntityId> {
    let candidates = doc
        .sorted_domains()
        .into_iter()
        .filter(|d| kind.is_none_or(|k| d.kind == k))
        .filter_map(|d| doc.domain_rect(&d.id).map(|rect| (EntityRef::domain(d.id), rect)));
    smallest_containing(world_pt, candidates).map(|e| e.id)
}

fn anchor_hit(world_pt: Point, boxes: &[(EntityRef, Rect)], radius: f64) -> Option<Hit> {
    boxes.iter().rev().find_map(|(entity, rect)| {
        AnchorSide::ALL.into_iter().find_map(|side| {
            let p = anchor_point(rect, side);
            let (dx, dy) = (world_pt.x - p.x, world_pt.y - p.y);
            (dx * dx + dy * dy <= radius * radius).then_some(Hit { entity: *entity, part: HitPart::Anchor(side) })
        })
    })
}

fn smallest_containing(world_pt: Point, boxes: impl Iterator<Item = (EntityRef, Rect)>) -> Option<EntityRef> {
    boxes
        .filter(|(_, rect)| rect.contains(world_pt))
        .min_by(|(_, a), (_, b)| (a.width * a.height).total_cmp(&(b.width * b.height)))
        .map(|(entity, _)| entity)
}
