use bindery::config::Config;
use bindery::engine::mapping::BindOptions;
use bindery::engine_core::models::{FieldSchema, Schema};
use bindery::engine_core::value::{Map, Value};
use bindery::kernel::Kernel;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn order_schema() -> Schema {
    Schema::new()
        .field("id", FieldSchema::new("int").required())
        .field("email", FieldSchema::new("string").required())
        .field("placed", FieldSchema::new("datetime"))
        .field("note", FieldSchema::new("string").default_value("none"))
        .field(
            "items",
            FieldSchema::new("")
                .required()
                .children(Schema::new().field("qty", FieldSchema::new("int").required())),
        )
}

fn order_input() -> Map {
    let item = |qty: i64| {
        let mut m = Map::new();
        m.insert("qty".into(), Value::Int(qty));
        Value::Map(m)
    };
    let mut input = Map::new();
    input.insert("id".into(), Value::from("42"));
    input.insert("email".into(), Value::from("ada@example.com"));
    input.insert("placed".into(), Value::from("2024-03-01T10:00:00Z"));
    input.insert("items".into(), Value::list([item(1), item(2), item(3)]));
    input
}

fn bench_bind(c: &mut Criterion) {
    let kernel = Kernel::new(Config::default()).unwrap();
    let schema = order_schema();
    let input = order_input();
    let options = BindOptions::default();

    c.bench_function("bind_order", |b| {
        b.iter(|| {
            let _ = kernel.bind(black_box(&schema), black_box(&input), &options);
        })
    });
}

fn bench_tokens(c: &mut Criterion) {
    let kernel = Kernel::new(Config::default()).unwrap();
    let mut claims = Map::new();
    claims.insert("user".into(), Value::from("ada"));
    let (_, text) = kernel.tokens().issue(true, claims.clone(), None, "admin").unwrap();

    c.bench_function("token_issue", |b| {
        b.iter(|| {
            let _ = kernel.tokens().issue(true, black_box(claims.clone()), None, "admin");
        })
    });

    c.bench_function("token_verify", |b| {
        b.iter(|| {
            let _ = kernel.tokens().verify(black_box(&text));
        })
    });
}

fn bench_generate(c: &mut Criterion) {
    let kernel = Kernel::new(Config::default()).unwrap();
    c.bench_function("generate_id", |b| b.iter(|| kernel.generate(black_box("ord_"))));
}

criterion_group!(benches, bench_bind, bench_tokens, bench_generate);
criterion_main!(benches);
