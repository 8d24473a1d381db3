use std::env;
use std::path::PathBuf;

use cc;

fn main() {
    // The fake compiler is only needed by tests, but build scripts cannot be limited to test
    // builds: <https://github.com/rust-lang/cargo/issues/1581>
    let src = "src/module/tests/fake_solc.c";
    println!("cargo:rerun-if-changed={}", src);

    let so_path = PathBuf::from(env::var("OUT_DIR").unwrap()).join("libfake_solc.so");
    let status = cc::Build::new()
        .pic(true)
        .get_compiler()
        .to_command()
        .arg("-shared")
        .arg("-o")
        .arg(&so_path)
        .arg(src)
        .status()
        .unwrap();
    assert!(status.success(), "failed to build {}", src);

    println!("cargo:rustc-env=FAKE_SOLC_PATH={}", so_path.display());
}
