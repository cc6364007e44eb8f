use criterion::{Criterion, black_box, criterion_group, criterion_main};
use trace_sieve::extract::assemble::assemble;
use trace_sieve::extract::select::{Bounds, ChannelSpec, select_line_traces};
use trace_sieve::store::archive::StoreTree;
use trace_sieve::store::tree::{TraceLeaf, TreeStoreMut};

fn synthetic_line(locations: usize, base_len: usize) -> StoreTree {
    let mut tree = StoreTree::new();
    for location in 0..locations {
        // Vary trace lengths so padding does real work.
        let len = base_len + (location % 7) * 32;
        let samples: Vec<f64> = (0..len).map(|i| (i as f64).sin()).collect();
        tree.put_leaf(
            &format!("line_0/location_{location}/datacapture_0/echogram_0"),
            TraceLeaf::from_samples(samples),
        )
        .unwrap();
    }
    tree
}

fn bench_select_and_assemble(c: &mut Criterion) {
    let tree = synthetic_line(512, 1024);
    let channels = ChannelSpec::Single(0);

    c.bench_function("select_512_locations", |b| {
        b.iter(|| {
            let paths =
                select_line_traces(black_box(&tree), 0, &channels, Bounds::UNBOUNDED).unwrap();
            black_box(paths)
        })
    });

    let paths = select_line_traces(&tree, 0, &channels, Bounds::UNBOUNDED).unwrap();
    c.bench_function("assemble_512x1216", |b| {
        b.iter(|| {
            let (matrix, counts) = assemble(black_box(&tree), 0, &paths).unwrap();
            black_box((matrix, counts))
        })
    });
}

criterion_group!(benches, bench_select_and_assemble);
criterion_main!(benches);
