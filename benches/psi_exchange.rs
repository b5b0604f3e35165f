//! Benchmarks for a complete PSI exchange
//!
//! Server set of 1000, client set of 100 (half overlapping), including CBOR
//! encoding of every message.

use blindset::crypto::{CommutativeCipher, GroupId};
use blindset::psi::{
    BatchOptions, ClientRequest, MatchMode, PsiClient, PsiServer, ServerResponse, ServerSetup,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn parties(id: GroupId) -> (PsiServer, PsiClient) {
    let server_set: Vec<String> = (0..1000).map(|i| format!("Example {}", i)).collect();
    let client_set: Vec<String> = (950..1050).map(|i| format!("Example {}", i)).collect();

    let server = PsiServer::new(
        CommutativeCipher::with_new_key(id.handle(), id.default_tag()).unwrap(),
        &server_set,
        BatchOptions::default(),
    )
    .unwrap();
    let client = PsiClient::new(
        CommutativeCipher::with_new_key(id.handle(), id.default_tag()).unwrap(),
        client_set,
        BatchOptions::default(),
    )
    .unwrap();
    (server, client)
}

fn exchange(server: &PsiServer, client: &PsiClient, mode: MatchMode) -> usize {
    let setup = ServerSetup::from_bytes(&server.setup(mode).unwrap().to_bytes().unwrap()).unwrap();
    let request =
        ClientRequest::from_bytes(&client.request().unwrap().to_bytes().unwrap()).unwrap();
    let response =
        ServerResponse::from_bytes(&server.respond(&request).unwrap().to_bytes().unwrap())
            .unwrap();
    client.finish(&setup, &response).unwrap().len()
}

fn benchmark_exchange(c: &mut Criterion) {
    let mut group = c.benchmark_group("psi_exchange_1000x100");
    group.sample_size(10);

    for id in GroupId::ALL {
        let (server, client) = parties(id);

        group.bench_function(format!("{}_exact", id), |b| {
            b.iter(|| exchange(black_box(&server), black_box(&client), MatchMode::Exact))
        });

        group.bench_function(format!("{}_filter", id), |b| {
            b.iter(|| {
                exchange(
                    black_box(&server),
                    black_box(&client),
                    MatchMode::Filter {
                        false_positive_rate: 0.01,
                    },
                )
            })
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_exchange);
criterion_main!(benches);
