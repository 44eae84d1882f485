use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use nightshade_graphics::{
    ColorAttachment, FrameGraph, GraphicsInstance, ResourceRegistry, ShaderStages,
    TextureDescriptor, TextureFormat, TextureNodeId, TextureUsage,
};

fn bench_registry() -> Arc<ResourceRegistry> {
    let instance = GraphicsInstance::new().unwrap();
    ResourceRegistry::new(instance.create_device().unwrap())
}

fn color_desc() -> TextureDescriptor {
    TextureDescriptor::new_2d(
        1920,
        1080,
        TextureFormat::Rgba8Unorm,
        TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
    )
}

#[derive(Clone)]
struct Out {
    color: TextureNodeId,
}

fn add_chain(graph: &mut FrameGraph, length: usize) -> Out {
    let mut previous: Option<Out> = None;
    for i in 0..length {
        let input = previous.as_ref().map(|out| out.color);
        let next = graph.add_graphics_pass(
            format!("pass_{i}"),
            |builder| {
                if let Some(input) = input {
                    builder.add_shader_texture(input, ShaderStages::FRAGMENT);
                }
                let target = builder.create_texture(format!("target_{i}"), color_desc());
                Out {
                    color: builder.add_color_attachment(ColorAttachment::new(target)),
                }
            },
            |_, _, _| {},
        );
        previous = Some(next);
    }
    previous.unwrap()
}

// ---------------------------------------------------------------------------
// Frame graph construction
// ---------------------------------------------------------------------------

fn bench_graph_build_small(c: &mut Criterion) {
    let registry = bench_registry();
    c.bench_function("frame_graph_build_4_passes", |b| {
        b.iter(|| {
            let mut graph = FrameGraph::new(Arc::clone(&registry));
            let out = add_chain(&mut graph, 4);
            graph.mark_output_texture(out.color);
            black_box(&graph);
        });
    });
}

fn bench_graph_build_large(c: &mut Criterion) {
    let registry = bench_registry();
    c.bench_function("frame_graph_build_32_passes_chain", |b| {
        b.iter(|| {
            let mut graph = FrameGraph::new(Arc::clone(&registry));
            let out = add_chain(&mut graph, 32);
            graph.mark_output_texture(out.color);
            black_box(&graph);
        });
    });
}

// ---------------------------------------------------------------------------
// Frame graph compilation
// ---------------------------------------------------------------------------

fn bench_graph_compile_small(c: &mut Criterion) {
    let registry = bench_registry();
    c.bench_function("frame_graph_compile_4_passes", |b| {
        b.iter_with_setup(
            || {
                let mut graph = FrameGraph::new(Arc::clone(&registry));
                let out = add_chain(&mut graph, 4);
                graph.mark_output_texture(out.color);
                graph
            },
            |graph| {
                black_box(graph.compile().unwrap());
            },
        );
    });
}

fn bench_graph_compile_wide(c: &mut Criterion) {
    let registry = bench_registry();
    c.bench_function("frame_graph_compile_16_independent_chains", |b| {
        b.iter_with_setup(
            || {
                let mut graph = FrameGraph::new(Arc::clone(&registry));
                for _ in 0..16 {
                    let out = add_chain(&mut graph, 2);
                    graph.mark_output_texture(out.color);
                }
                graph
            },
            |graph| {
                black_box(graph.compile().unwrap());
            },
        );
    });
}

fn bench_graph_compile_deep(c: &mut Criterion) {
    let registry = bench_registry();
    c.bench_function("frame_graph_compile_64_passes_chain", |b| {
        b.iter_with_setup(
            || {
                let mut graph = FrameGraph::new(Arc::clone(&registry));
                let out = add_chain(&mut graph, 64);
                graph.mark_output_texture(out.color);
                graph
            },
            |graph| {
                black_box(graph.compile().unwrap());
            },
        );
    });
}

criterion_group!(
    benches,
    bench_graph_build_small,
    bench_graph_build_large,
    bench_graph_compile_small,
    bench_graph_compile_wide,
    bench_graph_compile_deep,
);
criterion_main!(benches);
