#[malloc_hooks::main(format = "json")]
fn main() {
    let scratch: Vec<u64> = (0..1024).collect();
    std::hint::black_box(&scratch);

    let retained: &'static mut [u8] = Box::leak(vec![0u8; 4096].into_boxed_slice());
    std::hint::black_box(&retained);
}
