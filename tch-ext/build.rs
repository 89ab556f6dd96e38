use std::env;

fn main() {
    // the toolchain adapter drives cc outside of a build script, so it
    // needs the triple this crate is compiled for
    let target = env::var("TARGET").unwrap();
    println!("cargo:rustc-env=TCH_EXT_HOST_TRIPLE={}", target);
    println!("cargo:rerun-if-changed=build.rs");
}
