use std::env;
use std::fs;
use std::path::Path;

fn main() {
    // Create config template if it doesn't exist
    let out_dir = env::var("OUT_DIR").unwrap_or_else(|_| "./".to_string());
    let template_path = Path::new(&out_dir).join("../../../tsdemux.template.toml");

    let template = r#"# tsdemux parser configuration
# Copy this file to 'tsdemux.toml' next to the binary's working directory.
# TSDEMUX_TIMESTAMP_OFFSET and TSDEMUX_IGNORE_PROGRAM_STREAM override it.

# Added to every PTS/DTS, in 90 kHz units
timestamp_offset = 0

# Keep the program tables of the init segment, ignore those in the media
ignore_program_stream = false
"#;

    if !template_path.exists() {
        if let Err(e) = fs::write(&template_path, template) {
            println!(
                "cargo:warning=could not write {}: {}",
                template_path.display(),
                e
            );
        }
    }
    println!("cargo:rerun-if-changed=build.rs");
}
