//! Criterion benchmarks for the two inference passes on a synthetic 4-mer
//! move model (257 states), the size a real nanopore model has.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use porepath::{construct_emissions, construct_transitions, GaussianParamsKmer, Hmm, State, VecReads};

fn synthetic_model(k: usize) -> (Hmm, Vec<State>) {
    let n_kmers = 4usize.pow(k as u32);
    let gaussians: Vec<GaussianParamsKmer> = (1..=n_kmers)
        .map(|id| GaussianParamsKmer {
            kmer: porepath::data::kmer::state_id_kmer(id, k),
            mu: id as f64 / n_kmers as f64,
            sigma: 0.05,
        })
        .collect();
    let states = construct_emissions(k, &gaussians).unwrap();
    let mut reads = VecReads::new(vec![]);
    let transitions = construct_transitions(3, 1, k, &mut reads).unwrap();
    let hmm = Hmm::new(0, transitions, &states).unwrap();
    (hmm, states)
}

fn synthetic_trace(len: usize) -> Vec<f64> {
    (0..len).map(|i| (i % 97) as f64 / 97.0).collect()
}

fn bench_viterbi(c: &mut Criterion) {
    let (hmm, states) = synthetic_model(4);
    let mut group = c.benchmark_group("viterbi");

    for trace_len in [16, 64, 256] {
        group.throughput(Throughput::Elements(trace_len as u64));
        group.bench_with_input(
            BenchmarkId::new("trace_len", trace_len),
            &trace_len,
            |b, &trace_len| {
                let trace = synthetic_trace(trace_len);
                b.iter(|| hmm.viterbi(black_box(&trace), black_box(&states)).unwrap())
            },
        );
    }

    group.finish();
}

fn bench_posterior_sample(c: &mut Criterion) {
    let (hmm, states) = synthetic_model(4);
    let mut group = c.benchmark_group("posterior_sample");

    for n_samples in [1, 10, 100] {
        group.throughput(Throughput::Elements(n_samples as u64));
        group.bench_with_input(
            BenchmarkId::new("samples", n_samples),
            &n_samples,
            |b, &n_samples| {
                let trace = synthetic_trace(32);
                b.iter(|| {
                    hmm.posterior_sample(
                        black_box(n_samples),
                        black_box(42),
                        black_box(&trace),
                        black_box(&states),
                    )
                    .unwrap()
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_viterbi, bench_posterior_sample);
criterion_main!(benches);
