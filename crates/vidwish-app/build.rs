use std::fs;
use std::path::Path;

fn main() {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR is set by cargo");
    let workspace_root = Path::new(&manifest_dir)
        .ancestors()
        .nth(2)
        .expect("crate lives under <root>/crates/");
    let version_file = workspace_root.join("VERSION");
    println!("cargo:rerun-if-changed={}", version_file.display());

    let contents = fs::read_to_string(&version_file)
        .unwrap_or_else(|error| panic!("reading {}: {error}", version_file.display()));
    let version = contents.lines().next().unwrap_or_default().trim();
    if version.is_empty() {
        panic!("{} must start with a version line", version_file.display());
    }

    println!("cargo:rustc-env=VIDWISH_VERSION={version}");
}
