//! Build script for tombstone-core
//!
//! Checks the toolchain and target before compilation:
//! - Minimum Rust version (1.77, where `u128` became 16-byte aligned on
//!   x86-64; the ARM64 FP/SIMD struct relies on it)
//! - Target platform (the ptrace backend is Linux and Android only)
//! - Target architecture (ARM64 and x86-64 have register layouts)

use std::env;

fn main()
{
    println!("cargo:rerun-if-changed=build.rs");

    let min_rust_version = rustc_version::Version::new(1, 77, 0);
    match rustc_version::version() {
        Ok(found) if found < min_rust_version => {
            println!("cargo:warning=tombstone-core needs Rust {min_rust_version} or newer for kernel struct layouts, found {found}");
        }
        Ok(_) => {}
        // Some build environments hide rustc.
        Err(_) => println!("cargo:warning=could not verify Rust version"),
    }

    // The script runs on the host, so look at the target through cargo.
    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if !matches!(target_os.as_str(), "linux" | "android") {
        println!("cargo:warning=tombstone-core: no ptrace backend for target_os={target_os}, register reads will report Unsupported");
    }

    let target_arch = env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
    if !matches!(target_arch.as_str(), "aarch64" | "x86_64") {
        println!("cargo:warning=tombstone-core: no register layout for target_arch={target_arch}, native entry points are disabled");
    }
}
