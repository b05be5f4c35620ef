// Build script for the optional statically linked backend
//
// With the `static-backend` feature the crate links `bass` at build time.
// Point BASS_LIB_DIR at the directory holding the import library
// (bass.lib / libbass.so) when it is not on the default search path.

fn main() {
    println!("cargo:rerun-if-env-changed=BASS_LIB_DIR");

    if std::env::var_os("CARGO_FEATURE_STATIC_BACKEND").is_none() {
        return;
    }

    if let Ok(dir) = std::env::var("BASS_LIB_DIR") {
        println!("cargo:rustc-link-search=native={dir}");
    }
}
