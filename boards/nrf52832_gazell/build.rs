//! This build script copies the `memory.x` file from the crate root into
//! a directory where the linker can always find it at build time, sets the
//! linker scripts, and links Nordic's prebuilt Gazell library.
//!
//! Gazell is not redistributable, point `GAZELL_LIB_DIR` at the directory of
//! the nRF5 SDK holding `libgzll_nrf52_gcc.a` and the compiled `gzll_glue`
//! object before building.

use std::env;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

fn main() {
    // Put `memory.x` in our output directory and ensure it's
    // on the linker search path.
    let out = &PathBuf::from(env::var_os("OUT_DIR").unwrap());
    File::create(out.join("memory.x"))
        .unwrap()
        .write_all(include_bytes!("memory.x"))
        .unwrap();
    println!("cargo:rustc-link-search={}", out.display());
    println!("cargo:rerun-if-changed=memory.x");

    // Link the vendor radio stack
    println!("cargo:rerun-if-env-changed=GAZELL_LIB_DIR");
    match env::var("GAZELL_LIB_DIR") {
        Ok(dir) => {
            println!("cargo:rustc-link-search=native={}", dir);
            println!("cargo:rustc-link-lib=static=gzll_nrf52_gcc");
            println!("cargo:rustc-link-lib=static=gzll_glue");
        }
        Err(_) => println!("cargo:warning=GAZELL_LIB_DIR is not set, linking will fail on nrf_gzll_* symbols"),
    }

    // `--nmagic` is required if memory section addresses are not aligned to 0x10000,
    // for example the FLASH and RAM sections in your `memory.x`.
    // See https://github.com/rust-embedded/cortex-m-quickstart/pull/95
    println!("cargo:rustc-link-arg=--nmagic");

    // Set the linker script to the one provided by cortex-m-rt.
    println!("cargo:rustc-link-arg=-Tlink.x");

    // Set the extra linker script from defmt
    println!("cargo:rustc-link-arg=-Tdefmt.x");
}
