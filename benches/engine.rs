use criterion::*;
use nakaflow::engine::*;
use nakaflow::primitives::*;
use rand::prelude::*;

const JULY_1: i64 = 1_656_633_600;
const DAY: i64 = 86_400;

/// `days` daily boundaries with `authors` validators whose counters grow by a
/// random amount every day. Some authors skip a boundary.
fn synthetic_input(network: &str, days: usize, authors: usize) -> NetworkInput {
    let mut rng = StdRng::seed_from_u64(authors as u64);
    let mut counters = vec![0_u64; authors];
    let mut boundaries = Vec::with_capacity(days);
    let mut observations = Vec::with_capacity(days * authors);

    for day in 0..days {
        let height = 10_000 + day as u64 * 7_200;
        boundaries.push(PeriodBoundary::new(height, JULY_1 + day as i64 * DAY));

        for (i, counter) in counters.iter_mut().enumerate() {
            *counter += rng.gen_range(0..(i as u64 % 50 + 2));
            if rng.gen_bool(0.05) {
                continue;
            }
            observations.push(AuthorObservation::new(
                network,
                height,
                &format!("author{i}"),
                *counter,
            ));
        }
    }

    NetworkInput {
        network: network.to_owned(),
        boundaries,
        observations,
    }
}

pub fn pipeline_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");

    for authors in [10, 100, 1_000] {
        let input = synthetic_input("ethereum", 365, authors);
        group.bench_with_input(
            BenchmarkId::new("run network one year", authors),
            &input,
            |b, input| b.iter(|| run_network(input, NakamotoThreshold::default()).unwrap()),
        );
    }

    let inputs: Vec<_> = ["ethereum", "polygon", "bsc", "avalanche"]
        .iter()
        .map(|network| synthetic_input(network, 365, 200))
        .collect();
    group.bench_function("run four networks in parallel", |b| {
        b.iter(|| run_networks(&inputs, |_| NakamotoThreshold::default()))
    });

    group.finish();
}

pub fn concentration_benchmark(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let authors: Vec<(String, i64)> = (0..10_000)
        .map(|i| (format!("author{i}"), rng.gen_range(1..1_000)))
        .collect();

    c.bench_function("concentration of 10000 authors", |b| {
        b.iter(|| {
            concentration(
                authors.iter().map(|(a, v)| (a.as_str(), *v)),
                NakamotoThreshold::default(),
            )
            .unwrap()
        })
    });
}

criterion_group!(benches, pipeline_benchmark, concentration_benchmark);
criterion_main!(benches);
