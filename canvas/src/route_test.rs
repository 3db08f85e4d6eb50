#![allow(clippy::float_cmp)]

use uuid::Uuid;

use super::*;
use crate::args::Arguments;
use crate::deploy::DeploymentDescriptor;
use crate::doc::{Connection, Domain, DomainType, Resource};

fn rect(x: f64, y: f64) -> Rect {
    Rect::new(x, y, 100.0, 50.0)
}

fn placed(domain_id: EntityId, x: f64, y: f64) -> Resource {
    Resource {
        id: Uuid::new_v4(),
        resource_type: "aws_instance".into(),
        domain_id,
        name: "web".into(),
        arguments: Arguments::new(),
        deployment: DeploymentDescriptor::default(),
        position: Some(Point::new(x, y)),
    }
}

#[test]
fn anchor_points_are_edge_midpoints() {
    let r = rect(0.0, 0.0);
    assert_eq!(anchor_point(&r, AnchorSide::Left), Point::new(0.0, 25.0));
    assert_eq!(anchor_point(&r, AnchorSide::Right), Point::new(100.0, 25.0));
    assert_eq!(anchor_point(&r, AnchorSide::Top), Point::new(50.0, 0.0));
    assert_eq!(anchor_point(&r, AnchorSide::Bottom), Point::new(50.0, 50.0));
}

#[test]
fn facing_sides_prefers_horizontal() {
    let o = Point::new(0.0, 0.0);
    assert_eq!(facing_sides(o, Point::new(100.0, 40.0)), (AnchorSide::Right, AnchorSide::Left));
    assert_eq!(facing_sides(o, Point::new(-100.0, 40.0)), (AnchorSide::Left, AnchorSide::Right));
    assert_eq!(facing_sides(o, Point::new(10.0, 100.0)), (AnchorSide::Bottom, AnchorSide::Top));
    assert_eq!(facing_sides(o, Point::new(10.0, -100.0)), (AnchorSide::Top, AnchorSide::Bottom));
}

#[test]
fn horizontal_route_bends_at_mid_x() {
    let route = route_between(&rect(0.0, 0.0), &rect(300.0, 100.0));
    assert_eq!(
        route.points,
        vec![
            Point::new(100.0, 25.0),
            Point::new(200.0, 25.0),
            Point::new(200.0, 125.0),
            Point::new(300.0, 125.0),
        ]
    );
    assert!(!route.dashed);
}

#[test]
fn vertical_route_bends_at_mid_y() {
    let route = route_between(&rect(0.0, 0.0), &rect(20.0, 400.0));
    assert_eq!(route.points.first(), Some(&Point::new(50.0, 50.0)));
    assert_eq!(route.points.last(), Some(&Point::new(70.0, 400.0)));
    assert_eq!(route.points[1].y, 225.0);
    assert_eq!(route.points[2].y, 225.0);
}

#[test]
fn routes_are_axis_aligned() {
    let route = route_between(&rect(-40.0, 13.0), &rect(170.0, -90.0));
    for pair in route.points.windows(2) {
        assert!(pair[0].x == pair[1].x || pair[0].y == pair[1].y);
    }
}

#[test]
fn draft_route_is_dashed_and_ends_at_cursor() {
    let cursor = Point::new(400.0, 30.0);
    let route = draft_route(&rect(0.0, 0.0), cursor);
    assert!(route.dashed);
    assert_eq!(route.points.last(), Some(&cursor));
}

#[test]
fn connection_routes_use_overrides() {
    let mut doc = DocStore::new();
    let domain = Domain::new("compute", DomainType::Compute);
    let d = domain.id;
    doc.add_domain(domain);
    let a = placed(d, 0.0, 0.0);
    let b = placed(d, 400.0, 0.0);
    doc.add_resource(a.clone());
    doc.add_resource(b.clone());
    let conn = Connection::between(EntityRef::resource(a.id), EntityRef::resource(b.id));
    let conn_id = conn.id;
    doc.add_connection(conn);

    let mut overrides = HashMap::new();
    overrides.insert(b.id, Point::new(400.0, 200.0));
    let routes = connection_routes(&doc, &overrides);
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].0, conn_id);
    let end = *routes[0].1.points.last().unwrap();
    assert_eq!(end, Point::new(400.0, 200.0 + RESOURCE_HEIGHT * 0.5));
}

#[test]
fn connection_routes_skip_unplaced_endpoints() {
    let mut doc = DocStore::new();
    let d1 = Domain::new("a", DomainType::Compute);
    let d2 = Domain::new("b", DomainType::Data);
    let (id1, id2) = (d1.id, d2.id);
    doc.add_domain(d1);
    doc.add_domain(d2);
    doc.add_connection(Connection::between(EntityRef::domain(id1), EntityRef::domain(id2)));
    assert!(connection_routes(&doc, &HashMap::new()).is_empty());
}
