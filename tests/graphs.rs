//! Builder and compilation validation.

use loomstep::graphs::{GraphBuilder, GraphCompileError, GraphConfigError};
use loomstep::types::VertexKey;
use serde_json::json;

mod common;
use common::*;

#[test]
fn reserved_ids_are_rejected() {
    let err = GraphBuilder::new()
        .add_node("START", observer())
        .unwrap_err();
    assert!(matches!(err, GraphConfigError::ReservedId { id } if id == "START"));

    let err = GraphBuilder::new().add_node("END", observer()).unwrap_err();
    assert!(matches!(err, GraphConfigError::ReservedId { id } if id == "END"));
}

#[test]
fn empty_id_is_rejected() {
    let err = GraphBuilder::new().add_node("", observer()).unwrap_err();
    assert!(matches!(err, GraphConfigError::EmptyId));
}

#[test]
fn duplicate_vertex_is_rejected() {
    let err = GraphBuilder::new()
        .add_node("a", observer())
        .unwrap()
        .add_node("a", observer())
        .unwrap_err();
    assert!(matches!(err, GraphConfigError::DuplicateVertex { id } if id == "a"));
}

#[test]
fn duplicate_id_across_kinds_is_rejected() {
    let err = GraphBuilder::new()
        .add_node("a", observer())
        .unwrap()
        .add_conditional_node("a", equals_router("k", "v", "x", "y"))
        .unwrap_err();
    assert!(matches!(err, GraphConfigError::DuplicateVertex { id } if id == "a"));
}

#[test]
fn end_as_source_is_rejected() {
    let err = GraphBuilder::new()
        .add_node("a", observer())
        .unwrap()
        .add_edge("END", "a")
        .unwrap_err();
    assert!(matches!(err, GraphConfigError::EndAsSource));
}

#[test]
fn start_as_target_is_rejected() {
    let err = GraphBuilder::new()
        .add_node("a", observer())
        .unwrap()
        .add_edge("a", "START")
        .unwrap_err();
    assert!(matches!(err, GraphConfigError::StartAsTarget));
}

#[test]
fn edges_require_registered_endpoints() {
    let err = GraphBuilder::new()
        .add_node("a", observer())
        .unwrap()
        .add_edge("a", "missing")
        .unwrap_err();
    assert!(matches!(err, GraphConfigError::UnknownVertex { id } if id == "missing"));

    let err = GraphBuilder::new()
        .add_node("a", observer())
        .unwrap()
        .add_edge("missing", "a")
        .unwrap_err();
    assert!(matches!(err, GraphConfigError::UnknownVertex { id } if id == "missing"));
}

#[test]
fn duplicate_edge_is_rejected() {
    let err = GraphBuilder::new()
        .add_node("a", observer())
        .unwrap()
        .add_node("b", observer())
        .unwrap()
        .add_edge("a", "b")
        .unwrap()
        .add_edge("a", "b")
        .unwrap_err();
    assert!(matches!(err, GraphConfigError::DuplicateEdge { .. }));
}

#[test]
fn start_target_is_set_exactly_once() {
    let err = GraphBuilder::new()
        .add_node("a", observer())
        .unwrap()
        .add_node("b", observer())
        .unwrap()
        .add_edge("START", "a")
        .unwrap()
        .add_edge("START", "b")
        .unwrap_err();
    assert!(matches!(err, GraphConfigError::StartAlreadySet { existing } if existing == "a"));
}

#[test]
fn start_cannot_target_end_or_a_router() {
    let err = GraphBuilder::new().add_edge("START", "END").unwrap_err();
    assert!(matches!(err, GraphConfigError::InvalidStartTarget));

    let err = GraphBuilder::new()
        .add_conditional_node("r", equals_router("k", "v", "x", "y"))
        .unwrap()
        .add_edge("START", "r")
        .unwrap_err();
    assert!(matches!(err, GraphConfigError::RouterAsEntry { id } if id == "r"));
}

#[test]
fn second_conditional_child_is_rejected() {
    let err = GraphBuilder::new()
        .add_node("a", observer())
        .unwrap()
        .add_node("x", observer())
        .unwrap()
        .add_node("y", observer())
        .unwrap()
        .add_conditional_node("r1", equals_router("k", "v", "x", "y"))
        .unwrap()
        .add_conditional_node("r2", equals_router("k", "v", "x", "y"))
        .unwrap()
        .add_edge("a", "r1")
        .unwrap()
        .add_edge("a", "r2")
        .unwrap_err();
    assert!(
        matches!(err, GraphConfigError::MultipleRouters { from, existing } if from == "a" && existing == "r1")
    );
}

#[test]
fn routers_have_no_child_list() {
    let err = GraphBuilder::new()
        .add_node("a", observer())
        .unwrap()
        .add_conditional_node("r", equals_router("k", "v", "x", "y"))
        .unwrap()
        .add_edge("r", "a")
        .unwrap_err();
    assert!(matches!(err, GraphConfigError::RouterAsSource { id } if id == "r"));
}

#[test]
fn routing_tables_are_validated() {
    // Table on a standard vertex.
    let err = GraphBuilder::new()
        .add_node("a", observer())
        .unwrap()
        .add_conditional_edges("a", [("k", "END")])
        .unwrap_err();
    assert!(matches!(err, GraphConfigError::NotConditional { id } if id == "a"));

    // Unknown target.
    let err = GraphBuilder::new()
        .add_conditional_node("r", equals_router("k", "v", "x", "y"))
        .unwrap()
        .add_conditional_edges("r", [("go", "missing")])
        .unwrap_err();
    assert!(matches!(err, GraphConfigError::UnknownVertex { id } if id == "missing"));

    // Router targeting a router.
    let err = GraphBuilder::new()
        .add_conditional_node("r1", equals_router("k", "v", "x", "y"))
        .unwrap()
        .add_conditional_node("r2", equals_router("k", "v", "x", "y"))
        .unwrap()
        .add_conditional_edges("r1", [("go", "r2")])
        .unwrap_err();
    assert!(matches!(err, GraphConfigError::RouterAsRouteTarget { .. }));

    // Empty table.
    let err = GraphBuilder::new()
        .add_conditional_node("r", equals_router("k", "v", "x", "y"))
        .unwrap()
        .add_conditional_edges("r", Vec::<(&str, &str)>::new())
        .unwrap_err();
    assert!(matches!(err, GraphConfigError::EmptyRoutingTable { id } if id == "r"));

    // Table set twice.
    let err = GraphBuilder::new()
        .add_node("a", observer())
        .unwrap()
        .add_conditional_node("r", equals_router("k", "v", "x", "y"))
        .unwrap()
        .add_conditional_edges("r", [("go", "a")])
        .unwrap()
        .add_conditional_edges("r", [("stop", "END")])
        .unwrap_err();
    assert!(matches!(err, GraphConfigError::RoutesAlreadySet { id } if id == "r"));
}

#[test]
fn compile_requires_start() {
    let err = GraphBuilder::new()
        .add_node("a", observer())
        .unwrap()
        .compile()
        .unwrap_err();
    assert!(matches!(err, GraphCompileError::MissingStart));
}

#[test]
fn compile_rejects_unreachable_vertices() {
    let err = GraphBuilder::new()
        .add_node("a", observer())
        .unwrap()
        .add_node("island", observer())
        .unwrap()
        .add_edge("START", "a")
        .unwrap()
        .compile()
        .unwrap_err();
    assert!(matches!(err, GraphCompileError::Unreachable { id } if id == "island"));
}

#[test]
fn compile_rejects_router_without_routes() {
    let err = GraphBuilder::new()
        .add_node("a", observer())
        .unwrap()
        .add_conditional_node("r", equals_router("k", "v", "x", "y"))
        .unwrap()
        .add_edge("START", "a")
        .unwrap()
        .add_edge("a", "r")
        .unwrap()
        .compile()
        .unwrap_err();
    assert!(matches!(err, GraphCompileError::RouterWithoutRoutes { id } if id == "r"));
}

#[test]
fn compile_reaches_through_routing_tables() {
    let workflow = GraphBuilder::new()
        .add_node("a", observer())
        .unwrap()
        .add_node("routed", observer())
        .unwrap()
        .add_conditional_node("r", equals_router("k", "v", "go", "go"))
        .unwrap()
        .add_edge("START", "a")
        .unwrap()
        .add_edge("a", "r")
        .unwrap()
        .add_conditional_edges("r", [("go", "routed")])
        .unwrap()
        .compile()
        .unwrap();
    assert!(workflow.vertex("routed").is_some());
}

#[test]
fn childless_vertices_gain_an_end_sink() {
    let workflow = GraphBuilder::new()
        .add_node("a", set_value("k", json!(1)))
        .unwrap()
        .add_edge("START", "a")
        .unwrap()
        .compile()
        .unwrap();
    assert_eq!(workflow.children_of("a"), Some([VertexKey::End].as_slice()));
}

#[test]
fn end_is_retained_alongside_siblings() {
    let workflow = GraphBuilder::new()
        .add_node("a", observer())
        .unwrap()
        .add_node("b", observer())
        .unwrap()
        .add_edge("START", "a")
        .unwrap()
        .add_edge("a", "END")
        .unwrap()
        .add_edge("a", "b")
        .unwrap()
        .compile()
        .unwrap();
    let children = workflow.children_of("a").unwrap();
    assert!(children.contains(&VertexKey::End));
    assert!(children.contains(&VertexKey::Named("b".into())));
}

#[test]
fn builder_counts_track_declarations() {
    let builder = GraphBuilder::new()
        .add_node("a", observer())
        .unwrap()
        .add_node("b", observer())
        .unwrap()
        .add_conditional_node("r", equals_router("k", "v", "x", "y"))
        .unwrap()
        .add_edge("START", "a")
        .unwrap()
        .add_edge("a", "b")
        .unwrap();
    assert_eq!(builder.vertex_count(), 3);
    assert_eq!(builder.edge_count(), 2);
}

#[test]
fn workflow_accessors_reflect_topology() {
    let workflow = GraphBuilder::new()
        .add_node("a", observer())
        .unwrap()
        .add_node("b", observer())
        .unwrap()
        .add_node("c", observer())
        .unwrap()
        .add_conditional_node("r", equals_router("k", "v", "go", "stop"))
        .unwrap()
        .add_edge("START", "a")
        .unwrap()
        .add_edge("a", "b")
        .unwrap()
        .add_edge("b", "r")
        .unwrap()
        .add_conditional_edges("r", [("go", "c"), ("stop", "END")])
        .unwrap()
        .compile()
        .unwrap();

    assert_eq!(workflow.entry(), "a");
    assert!(workflow.is_router("r"));
    assert!(!workflow.is_router("a"));
    assert_eq!(workflow.vertex_ids().count(), 4);
    assert_eq!(
        workflow.routes_of("r").unwrap().get("go"),
        Some(&VertexKey::Named("c".into()))
    );

    let parents_of_a = workflow.parents_of("a");
    assert!(parents_of_a.contains(&VertexKey::Start));
    let parents_of_c = workflow.parents_of("c");
    assert_eq!(parents_of_c, vec![VertexKey::Named("r".into())]);
}
