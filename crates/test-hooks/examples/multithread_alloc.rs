use std::thread;
use std::time::Duration;

fn allocate_and_work(thread_id: usize, iterations: usize) {
    for i in 0..iterations {
        let vec1 = vec![thread_id; 100];
        std::hint::black_box(&vec1);

        let vec2 = vec![i; 1024];
        std::hint::black_box(&vec2);

        let s = format!("Thread {} iteration {}", thread_id, i);
        std::hint::black_box(&s);

        thread::sleep(Duration::from_micros(1));
    }
}

#[malloc_hooks::main(format = "json")]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    const NUM_THREADS: usize = 14;

    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|i| {
            thread::spawn(move || {
                allocate_and_work(i, 50);
            })
        })
        .collect();

    allocate_and_work(99, 50);

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    Ok(())
}
