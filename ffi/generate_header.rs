use std::path::PathBuf;

use cbindgen::{Config, generate_with_config};

fn main() {
    let crate_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let header = crate_dir.join("mpvjs.h");
    println!("Generating bindings...");
    generate_with_config(
        &crate_dir,
        Config::from_file(crate_dir.join("cbindgen.toml")).expect("failed to load cbindgen.toml"),
    )
    .expect("Unable to generate bindings")
    .write_to_file(&header);
    println!("Bindings generated at {}", header.display());
}
