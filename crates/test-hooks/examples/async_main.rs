use std::time::Duration;

async fn fetch_record(id: u64) -> Vec<u8> {
    tokio::time::sleep(Duration::from_millis(1)).await;
    vec![id as u8; 256]
}

#[tokio::main(flavor = "current_thread")]
#[malloc_hooks::main(format = "json-pretty")]
async fn main() {
    let mut records = Vec::new();
    for id in 0..8 {
        records.push(fetch_record(id).await);
    }

    let handle = tokio::spawn(async { fetch_record(99).await.len() });
    let len = handle.await.expect("task panicked");

    std::hint::black_box((&records, len));
}
