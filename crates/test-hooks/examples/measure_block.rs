fn main() {
    malloc_hooks::init_once();

    let (buffer, stats) = malloc_hooks::measure_block!(vec![0u64; 1000]);
    println!(
        "vec: allocation_count={} heap_allocated_memory_in_bytes={}",
        stats.allocation_count, stats.heap_allocated_memory_in_bytes
    );
    drop(buffer);

    let (greeting, stats) = malloc_hooks::measure_block!({
        let mut s = String::with_capacity(10);
        s.push_str("hello");
        s
    });
    println!(
        "string: allocation_count={} heap_allocated_memory_in_bytes={}",
        stats.allocation_count, stats.heap_allocated_memory_in_bytes
    );
    drop(greeting);

    let (freed, stats) = malloc_hooks::measure_block!(vec![1u8; 512].len());
    println!(
        "freed: allocation_count={} heap_allocated_memory_in_bytes={} len={}",
        stats.allocation_count, stats.heap_allocated_memory_in_bytes, freed
    );

    malloc_hooks::tear_down();

    let (_after, stats) = malloc_hooks::measure_block!(vec![0u8; 64]);
    println!(
        "torn down: allocation_count={} heap_allocated_memory_in_bytes={}",
        stats.allocation_count, stats.heap_allocated_memory_in_bytes
    );
}
