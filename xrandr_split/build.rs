// build.rs
// https://doc.rust-lang.org/cargo/reference/build-scripts.html#rustc-link-lib

fn main() {
    // dlopen/dlsym live in libdl on older glibc.
    println!("cargo:rustc-link-lib=dylib=dl");

    // 编译期默认值，见 src/config.rs 中的 option_env!
    println!("cargo:rerun-if-env-changed=XRANDR_SPLIT_WIDTH");
    println!("cargo:rerun-if-env-changed=XRANDR_SPLIT_HEIGHT");
    println!("cargo:rerun-if-env-changed=XRANDR_SPLIT_REAL_LIB");
    println!("cargo:rerun-if-changed=build.rs");
}
