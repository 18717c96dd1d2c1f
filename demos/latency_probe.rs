use reqwest::blocking::Client;
use std::thread;
use std::time::{Duration, Instant};

// Fires concurrent requests at a mock upstream and reports per-request
// latency, the way a gateway with a fixed timeout would see it.
//
// cargo run --example latency_probe -- http://127.0.0.1:8082/ping 4 10
fn main() {
    let mut args = std::env::args().skip(1);
    let url = args
        .next()
        .unwrap_or_else(|| "http://127.0.0.1:8082/ping".to_string());
    let concurrency: usize = args.next().and_then(|s| s.parse().ok()).unwrap_or(2);
    let timeout_secs: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(10);

    println!("Mock Upstream Latency Probe\n");
    println!("Configuration:");
    println!("  URL: {}", url);
    println!("  Concurrent requests: {}", concurrency);
    println!("  Client timeout: {}s\n", timeout_secs);

    let start = Instant::now();

    let handles: Vec<_> = (0..concurrency)
        .map(|id| {
            let url = url.clone();
            thread::spawn(move || {
                let client = Client::builder()
                    .no_proxy()
                    .timeout(Duration::from_secs(timeout_secs))
                    .build()
                    .unwrap();

                let req_start = Instant::now();
                let result = client.get(&url).send().and_then(|resp| {
                    let status = resp.status();
                    resp.text().map(|body| (status, body))
                });
                (id, req_start.elapsed(), result)
            })
        })
        .collect();

    let mut timed_out = 0;
    for handle in handles {
        let (id, latency, result) = handle.join().unwrap();
        match result {
            Ok((status, body)) => {
                println!("  #{} {} in {:.3}s: {}", id, status, latency.as_secs_f64(), body);
            }
            Err(e) if e.is_timeout() => {
                timed_out += 1;
                println!("  #{} timed out after {:.3}s", id, latency.as_secs_f64());
            }
            Err(e) => {
                println!("  #{} failed after {:.3}s: {}", id, latency.as_secs_f64(), e);
            }
        }
    }

    let total = start.elapsed();
    println!("\n=== Results ===");
    println!("Wall time: {:.3}s", total.as_secs_f64());
    println!("Timed out: {}/{}", timed_out, concurrency);
}
