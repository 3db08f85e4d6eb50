//! Graph engine for the infrastructure diagram editor.
//!
//! This crate owns everything about the diagram that can be computed without
//! talking to the network: the entity store with its referential-integrity
//! rules, the pan/zoom camera, grid snapping, connection routing, the
//! deployment-strategy resolver, and the pointer/keyboard state machine that
//! turns raw input into graph mutations. Rendering is left to the host, which
//! reads the store and the routes computed here. Remote validation, cost
//! estimation and artifact generation live in the `api` crate.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level [`engine::EngineCore`] and the [`engine::Action`]s it emits |
//! | [`doc`] | Domains, resources, connections and the [`doc::DocStore`] |
//! | [`deploy`] | Deployment strategies, per-zone expansion, address-block allocation |
//! | [`catalog`] | Static per-resource-type defaults |
//! | [`args`] | Tagged argument values and schema checks |
//! | [`camera`] | Points, rectangles, pan/zoom camera and coordinate conversions |
//! | [`grid`] | Grid snapping |
//! | [`route`] | Connection anchors and orthogonal paths |
//! | [`input`] | Input event types, modes and the gesture state machine |
//! | [`hit`] | Hit-testing against resources, domains and anchors |
//! | [`diag`] | Per-entity diagnostics side-table |
//! | [`project`] | Persisted project snapshot |
//! | [`consts`] | Shared numeric constants |

pub mod args;
pub mod camera;
pub mod catalog;
pub mod consts;
pub mod deploy;
pub mod diag;
pub mod doc;
pub mod engine;
pub mod grid;
pub mod hit;
pub mod input;
pub mod project;
pub mod route;
