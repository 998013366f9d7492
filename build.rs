fn main() {
    // Expose git commit and build metadata to the crate via OUT_DIR/built.rs
    if let Err(e) = built::write_built_file() {
        panic!("Failed to acquire build-time information: {e}");
    }
}
