// Copyright 2026 BadCompany
// Licensed under the Apache License, Version 2.0

#![no_main]

use bindery::config::Config;
use bindery::kernel::Kernel;
use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;

fn kernel() -> &'static Kernel {
    static KERNEL: OnceLock<Kernel> = OnceLock::new();
    KERNEL.get_or_init(|| Kernel::new(Config::default()).unwrap())
}

fuzz_target!(|data: &[u8]| {
    // Any text either verifies or is rejected, never panics.
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = kernel().tokens().verify(text);
    }
});
