//! Build script for jcdump-core
//!
//! Checks the toolchain before compilation.
//!
//! ## Requirements
//!
//! - **Rust**: 1.70.0 or newer (`Option::is_some_and`, let-else)

fn main()
{
    let Ok(min_rust_version) = rustc_version::Version::parse("1.70.0") else {
        return;
    };

    if let Ok(rustc_version) = rustc_version::version() {
        if rustc_version < min_rust_version {
            panic!("jcdump-core requires Rust {min_rust_version} or newer, found {rustc_version}");
        }
    } else {
        // If we can't get version (e.g., in some build environments), just warn
        println!("cargo:warning=could not verify Rust version");
    }
}
