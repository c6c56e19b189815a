//! Benchmarks for request handling performance.
//!
//! Run with: cargo bench --bench request_handling

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use serde_json::json;
use workapp_gateway::{
    api::{models::ChatRequest, streaming::SseParser},
    services::{llm_client::GeminiClient, CvAnalysisResult},
};

fn create_test_request(message_count: usize) -> String {
    let messages: Vec<_> = (0..message_count)
        .map(|i| {
            json!({
                "role": if i % 2 == 0 { "user" } else { "assistant" },
                "content": format!("Message content {}", i),
            })
        })
        .collect();

    json!({"messages": messages, "provider": "gemini", "systemMessage": "Be brief"}).to_string()
}

fn bench_request_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_validation");

    for message_count in [1, 5, 10, 20].iter() {
        let json = create_test_request(*message_count);

        group.throughput(Throughput::Bytes(json.len() as u64));
        group.bench_function(format!("{}_messages", message_count), |b| {
            b.iter(|| {
                let request: ChatRequest = serde_json::from_str(black_box(&json)).unwrap();
                black_box(request.validated_messages().unwrap());
            });
        });
    }

    group.finish();
}

fn bench_gemini_payload(c: &mut Criterion) {
    let request: ChatRequest = serde_json::from_str(&create_test_request(20)).unwrap();
    let messages = request.validated_messages().unwrap();

    c.bench_function("gemini_payload_20_messages", |b| {
        b.iter(|| black_box(GeminiClient::build_payload(black_box(&messages))));
    });
}

fn bench_sse_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("sse_parsing");

    let stream: String = (0..200)
        .map(|i| format!("data: {{\"choices\":[{{\"delta\":{{\"content\":\"tok{}\"}}}}]}}\n\n", i))
        .collect();
    let bytes = stream.as_bytes();

    for chunk_size in [16, 256, 4096].iter() {
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_function(format!("chunk_{}", chunk_size), |b| {
            b.iter(|| {
                let mut parser = SseParser::new();
                let mut count = 0;
                for chunk in bytes.chunks(*chunk_size) {
                    count += parser.parse(chunk).len();
                }
                black_box(count)
            });
        });
    }

    group.finish();
}

fn bench_cv_normalization(c: &mut Criterion) {
    let upstream = json!({
        "overallScore": 81,
        "sections": (0..8).map(|i| json!({
            "name": format!("Section {}", i),
            "score": 70 + i,
            "feedback": "Solid",
            "suggestions": ["Add numbers"],
            "status": "good"
        })).collect::<Vec<_>>(),
        "keywords": {
            "found": (0..40).map(|i| format!("kw{}", i % 25)).collect::<Vec<_>>(),
            "missing": ["docker", "k8s", "docker"],
            "suggestions": []
        },
        "atsCompatibility": 77,
        "recommendations": ["Tighten the summary", "Quantify impact"]
    });

    c.bench_function("cv_normalization", |b| {
        b.iter(|| black_box(CvAnalysisResult::from_upstream(black_box(&upstream))));
    });
}

criterion_group!(
    benches,
    bench_request_validation,
    bench_gemini_payload,
    bench_sse_parsing,
    bench_cv_normalization
);
criterion_main!(benches);
