use tracing::Level;

fn build_index(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_uppercase()).collect()
}

#[malloc_hooks::main]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::DEBUG)
        .init();

    let index = build_index(&["alpha", "beta", "gamma"]);
    println!(
        "indexed {} words, {} blocks outstanding",
        index.len(),
        malloc_hooks::allocation_count()
    );

    // Kept alive past the report on purpose.
    let retained: &'static mut [u8] = Box::leak(vec![7u8; 4096].into_boxed_slice());
    std::hint::black_box(&retained);

    Ok(())
}
