// Copyright 2026 BadCompany
// Licensed under the Apache License, Version 2.0

#![no_main]

use bindery::config::Config;
use bindery::engine::mapping::BindOptions;
use bindery::engine_core::models::{FieldSchema, Schema};
use bindery::engine_core::value::map_from_json;
use bindery::kernel::Kernel;
use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;

fn kernel() -> &'static Kernel {
    static KERNEL: OnceLock<Kernel> = OnceLock::new();
    KERNEL.get_or_init(|| Kernel::new(Config::default()).unwrap())
}

fn schema() -> Schema {
    Schema::new()
        .field("id", FieldSchema::new("int").required())
        .field("name", FieldSchema::new("string"))
        .field("at", FieldSchema::new("datetime"))
        .field("secret", FieldSchema::new("string").decode("text"))
        .field(
            "items",
            FieldSchema::new("")
                .children(Schema::new().field("qty", FieldSchema::new("int").required())),
        )
}

fuzz_target!(|data: &[u8]| {
    // Arbitrary JSON objects bind or fail with an outcome, never panic.
    let Ok(raw) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    if !raw.is_object() {
        return;
    }
    let input = map_from_json(raw);
    let schema = schema();
    let strict = kernel().bind(&schema, &input, &BindOptions::default());
    let tolerant = kernel().bind(&schema, &input, &BindOptions::default().tolerant(true));
    assert!(tolerant.is_ok() || strict.is_err());
});
