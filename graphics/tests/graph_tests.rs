//! Integration tests for the render graph subsystem.
//!
//! These tests drive the whole pipeline through the public API (registry,
//! frame graph, compiler, executor) against the dummy backend, which
//! records every allocation and submission so the tests can assert on the
//! exact behavior the engine produced.
//!
//! # Test Categories
//!
//! - **Registry Tests**: Generational handle liveness and slot reuse
//! - **Graph Tests**: Import/export round trips and ordering scenarios
//! - **Compile Tests**: Topological validity, determinism, culling, cycles
//! - **Execute Tests**: Submission order and transient lifetime behavior

use std::sync::Arc;

use rstest::rstest;

use nightshade_core::task::TaskPool;
use nightshade_graphics::{
    ColorAttachment, CompileError, DummyBackend, FrameExecutor, FrameGraph, GraphicsInstance,
    ResourceRegistry, ShaderStages, TextureDescriptor, TextureFormat, TextureNodeId,
    TextureUsage,
};

fn test_registry() -> (Arc<DummyBackend>, Arc<ResourceRegistry>) {
    let _ = env_logger::builder().is_test(true).try_init();

    let backend = Arc::new(DummyBackend::new());
    let instance = GraphicsInstance::with_backend(backend.clone());
    let registry = ResourceRegistry::new(instance.create_device().unwrap());
    (backend, registry)
}

fn color_desc() -> TextureDescriptor {
    TextureDescriptor::new_2d(
        512,
        512,
        TextureFormat::Rgba8Unorm,
        TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
    )
}

#[derive(Clone)]
struct PassOutput {
    color: TextureNodeId,
}

/// Add a pass that creates texture `{name}_out` and writes it.
fn produce(graph: &mut FrameGraph, name: &str) -> PassOutput {
    let target_name = format!("{name}_out");
    graph.add_graphics_pass(
        name,
        |builder| {
            let target = builder.create_texture(target_name.clone(), color_desc());
            PassOutput {
                color: builder.add_color_attachment(ColorAttachment::new(target)),
            }
        },
        |_, _, _| {},
    )
}

/// Add a pass that samples `input` and writes texture `{name}_out`.
fn transform(graph: &mut FrameGraph, name: &str, input: TextureNodeId) -> PassOutput {
    let target_name = format!("{name}_out");
    graph.add_graphics_pass(
        name,
        |builder| {
            builder.add_shader_texture(input, ShaderStages::FRAGMENT);
            let target = builder.create_texture(target_name.clone(), color_desc());
            PassOutput {
                color: builder.add_color_attachment(ColorAttachment::new(target)),
            }
        },
        |_, _, _| {},
    )
}

fn position_of(graph: &FrameGraph, order: &[nightshade_graphics::PassHandle], name: &str) -> usize {
    let handle = graph.pass_handle(name).unwrap();
    order.iter().position(|&h| h == handle).unwrap()
}

// ============================================================================
// Registry Tests
// ============================================================================

/// For all sequences of create/destroy, `is_alive` holds exactly for ids
/// created and not yet destroyed.
#[test]
fn test_registry_liveness_over_mixed_sequence() {
    let (_backend, registry) = test_registry();

    let mut live = Vec::new();
    for _ in 0..8 {
        live.push(registry.create_texture(&color_desc()).unwrap());
    }
    let destroyed: Vec<_> = live.drain(0..4).collect();
    for id in &destroyed {
        registry.destroy_texture(*id).unwrap();
    }
    // A few more creations, reusing freed slots.
    for _ in 0..2 {
        live.push(registry.create_texture(&color_desc()).unwrap());
    }

    for id in &destroyed {
        assert!(!registry.is_texture_alive(*id));
    }
    for id in &live {
        assert!(registry.is_texture_alive(*id));
    }
    assert_eq!(registry.texture_count(), live.len());
}

/// First create yields `{index: 0, generation: 0}`; destroy-then-create
/// reuses the slot with generation 1 and kills the original handle.
#[test]
fn test_registry_slot_reuse_bumps_generation() {
    let (_backend, registry) = test_registry();

    let first = registry.create_texture(&color_desc()).unwrap();
    assert_eq!(first.index(), 0);
    assert_eq!(first.generation(), 0);

    registry.destroy_texture(first).unwrap();

    let second = registry.create_texture(&color_desc()).unwrap();
    assert_eq!(second.index(), 0);
    assert_eq!(second.generation(), 1);
    assert!(!registry.is_texture_alive(first));
    assert!(registry.is_texture_alive(second));
}

// ============================================================================
// Graph Tests
// ============================================================================

/// Importing a persistent resource and exporting the resulting node
/// returns the original persistent id.
#[test]
fn test_import_export_round_trip() {
    let (_backend, registry) = test_registry();
    let id = registry.create_texture(&color_desc()).unwrap();

    let mut graph = FrameGraph::new(Arc::clone(&registry));
    let node = graph.import_texture(id);
    assert_eq!(graph.export_texture(node).unwrap(), id);
}

/// A persistent resource written by the frame exports through the written
/// version, still resolving to the same id.
#[test]
fn test_export_after_write_round_trips() {
    let (_backend, registry) = test_registry();
    let id = registry.create_texture(&color_desc()).unwrap();

    let mut graph = FrameGraph::new(Arc::clone(&registry));
    let imported = graph.import_texture(id);
    let written = graph.add_graphics_pass(
        "tonemap",
        |builder| PassOutput {
            color: builder.add_color_attachment(ColorAttachment::new(imported)),
        },
        |_, _, _| {},
    );
    assert_eq!(graph.export_texture(written.color).unwrap(), id);
}

// ============================================================================
// Compile Tests
// ============================================================================

/// Scenario: A writes "X"; B reads X and writes "Y"; C reads Y. The only
/// valid order is A, B, C.
#[test]
fn test_chain_compiles_to_declaration_order() {
    let (_backend, registry) = test_registry();
    let mut graph = FrameGraph::new(registry);
    let a = produce(&mut graph, "A");
    let b = transform(&mut graph, "B", a.color);
    let c = transform(&mut graph, "C", b.color);
    graph.mark_output_texture(c.color);

    let compiled = graph.compile().unwrap();
    let order = compiled.pass_order();
    assert_eq!(position_of(&graph, order, "A"), 0);
    assert_eq!(position_of(&graph, order, "B"), 1);
    assert_eq!(position_of(&graph, order, "C"), 2);
}

/// Scenario: D independently reads A's output. A must still come first;
/// B before C; D is only constrained to follow A.
#[test]
fn test_independent_reader_is_loosely_ordered() {
    let (_backend, registry) = test_registry();
    let mut graph = FrameGraph::new(registry);
    let a = produce(&mut graph, "A");
    let b = transform(&mut graph, "B", a.color);
    let c = transform(&mut graph, "C", b.color);
    let d = transform(&mut graph, "D", a.color);
    graph.mark_output_texture(c.color);
    graph.mark_output_texture(d.color);

    let compiled = graph.compile().unwrap();
    let order = compiled.pass_order();

    let pos_a = position_of(&graph, order, "A");
    let pos_b = position_of(&graph, order, "B");
    let pos_c = position_of(&graph, order, "C");
    let pos_d = position_of(&graph, order, "D");

    assert_eq!(pos_a, 0);
    assert!(pos_b < pos_c);
    assert!(pos_d > pos_a);
}

/// For every data edge producer → consumer, the producer's compiled
/// position precedes the consumer's.
#[test]
fn test_compiled_order_is_topological() {
    let (_backend, registry) = test_registry();
    let mut graph = FrameGraph::new(registry);

    // Diamond with a tail:  A -> (B, C) -> D -> E
    let a = produce(&mut graph, "A");
    let b = transform(&mut graph, "B", a.color);
    let c = transform(&mut graph, "C", a.color);
    let d = graph.add_graphics_pass(
        "D",
        |builder| {
            builder.add_shader_texture(b.color, ShaderStages::FRAGMENT);
            builder.add_shader_texture(c.color, ShaderStages::FRAGMENT);
            let target = builder.create_texture("D_out", color_desc());
            PassOutput {
                color: builder.add_color_attachment(ColorAttachment::new(target)),
            }
        },
        |_, _, _| {},
    );
    let e = transform(&mut graph, "E", d.color);
    graph.mark_output_texture(e.color);

    let compiled = graph.compile().unwrap();
    let order = compiled.pass_order();
    let position = |name: &str| position_of(&graph, order, name);

    for (producer, consumer) in [("A", "B"), ("A", "C"), ("B", "D"), ("C", "D"), ("D", "E")] {
        assert!(
            position(producer) < position(consumer),
            "{producer} must precede {consumer}"
        );
    }
}

/// Compiling an unchanged graph twice yields an identical order.
#[test]
fn test_compile_is_idempotent() {
    let (_backend, registry) = test_registry();
    let mut graph = FrameGraph::new(registry);
    let a = produce(&mut graph, "A");
    let b = transform(&mut graph, "B", a.color);
    let c = transform(&mut graph, "C", a.color);
    graph.mark_output_texture(b.color);
    graph.mark_output_texture(c.color);

    let first = graph.compile().unwrap();
    let second = graph.compile().unwrap();
    assert_eq!(first.pass_order(), second.pass_order());
}

/// Mutually dependent passes must fail with a cycle error, not silently
/// pick one order.
#[test]
fn test_mutual_dependency_is_a_cycle_error() {
    let (_backend, registry) = test_registry();
    let mut graph = FrameGraph::new(registry);
    let a = produce(&mut graph, "A");
    let b = transform(&mut graph, "B", a.color);
    graph.mark_output_texture(b.color);

    let a_handle = graph.pass_handle("A").unwrap();
    let b_handle = graph.pass_handle("B").unwrap();
    graph.add_dependency(a_handle, b_handle);

    assert!(matches!(
        graph.compile(),
        Err(CompileError::CyclicDependency { .. })
    ));
}

/// Transient resources sharing a physical allocation must have disjoint
/// lifetimes.
#[test]
fn test_aliased_transients_have_disjoint_lifetimes() {
    let (_backend, registry) = test_registry();
    let mut graph = FrameGraph::new(registry);
    let mut previous = produce(&mut graph, "p0");
    let mut outputs = vec![previous.clone()];
    for i in 1..6 {
        previous = transform(&mut graph, &format!("p{i}"), previous.color);
        outputs.push(previous.clone());
    }
    graph.mark_output_texture(previous.color);

    let compiled = graph.compile().unwrap();
    assert!(compiled.texture_slot_count() < outputs.len());

    for (i, first) in outputs.iter().enumerate() {
        for second in outputs.iter().skip(i + 1) {
            let slot_a = compiled.texture_slot(first.color);
            let slot_b = compiled.texture_slot(second.color);
            if slot_a == slot_b {
                let lifetime_a = compiled.texture_lifetime(first.color).unwrap();
                let lifetime_b = compiled.texture_lifetime(second.color).unwrap();
                assert!(
                    !lifetime_a.overlaps(&lifetime_b),
                    "aliased transients with overlapping lifetimes"
                );
            }
        }
    }
}

// ============================================================================
// Execute Tests
// ============================================================================

/// Shadow → structure → lighting: recording may be parallel, but the
/// dummy backend must observe the compiled submission order exactly,
/// whatever the worker count.
#[rstest]
#[case::single_thread(1)]
#[case::two_threads(2)]
#[case::eight_threads(8)]
fn test_multi_pass_frame_submits_in_order(#[case] workers: usize) {
    let (backend, registry) = test_registry();
    let mut graph = FrameGraph::new(Arc::clone(&registry));

    let shadow = produce(&mut graph, "shadow");
    let structure = produce(&mut graph, "structure");
    let lighting = graph.add_graphics_pass(
        "lighting",
        |builder| {
            builder.add_shader_texture(shadow.color, ShaderStages::FRAGMENT);
            builder.add_shader_texture(structure.color, ShaderStages::FRAGMENT);
            let target = builder.create_texture("lit", color_desc());
            PassOutput {
                color: builder.add_color_attachment(ColorAttachment::new(target)),
            }
        },
        |_, _, _| {},
    );
    graph.mark_output_texture(lighting.color);

    let compiled = graph.compile().unwrap();
    let executor = FrameExecutor::new(Arc::clone(&registry), TaskPool::new(workers));
    executor.execute(&graph, &compiled).unwrap();

    let expected: Vec<String> = compiled
        .pass_order()
        .iter()
        .map(|&handle| graph.pass(handle).unwrap().name().to_string())
        .collect();
    assert_eq!(backend.submitted_pass_labels(), expected);
    assert_eq!(
        backend.submitted_pass_labels().last().map(String::as_str),
        Some("lighting")
    );
}

/// Rebuilding and executing frames back to back leaves no transient state
/// behind: only persistent registry contents survive.
#[test]
fn test_frames_rebuild_from_scratch() {
    let (backend, registry) = test_registry();
    let persistent = registry.create_texture(&color_desc()).unwrap();

    for frame in 0..3 {
        let mut graph = FrameGraph::new(Arc::clone(&registry));
        let imported = graph.import_texture(persistent);
        let composed = transform(&mut graph, &format!("compose_{frame}"), imported);
        graph.mark_output_texture(composed.color);

        let compiled = graph.compile().unwrap();
        let executor = FrameExecutor::new(Arc::clone(&registry), TaskPool::new(2));
        executor.execute(&graph, &compiled).unwrap();

        assert_eq!(registry.texture_count(), 1, "frame {frame} leaked transients");
    }

    assert_eq!(backend.submissions().len(), 3);
}

/// A destroyed persistent id must not silently resolve after its slot is
/// reused by a new resource.
#[test]
fn test_stale_import_is_rejected_not_misresolved() {
    let (_backend, registry) = test_registry();

    let old = registry.create_texture(&color_desc()).unwrap();
    registry.destroy_texture(old).unwrap();
    let replacement = registry.create_texture(&color_desc()).unwrap();
    assert_eq!(old.index(), replacement.index());

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let mut graph = FrameGraph::new(Arc::clone(&registry));
        graph.import_texture(old)
    }));
    assert!(result.is_err(), "stale import must fail fast");
}
