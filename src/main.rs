// src/main.rs
fn main() -> anyhow::Result<()> {
    smokewatch::cli::run()
}
