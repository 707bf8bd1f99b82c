//! Pushes a large volume of tagged metric lines through a single handler.
//!
//! Ignored by default; run with `cargo test --test stress -- --ignored`.
//! Set `PROXY_ADDRESS` to stream into a real proxy instead of the local sink.

use std::{env, time::Duration};

use proxy_link::ProxyConnectionBuilder;

#[path = "../test_utils/mod.rs"]
mod test_utils;
use test_utils::ProxySink;

const LINES: usize = 100_000;

fn tagged_line(seq: usize, tags: &str) -> String {
    format!("junk.garbage 0 {seq} source=some_source_{seq} {tags}\n")
}

#[test]
#[ignore]
fn stress_single_connection() {
    let sink = ProxySink::spawn();
    let address = env::var("PROXY_ADDRESS").unwrap_or_else(|_| sink.addr().to_string());
    let handler = ProxyConnectionBuilder::new()
        .with_address(address.as_str())
        .with_flush_interval_ms(100)
        .build_started()
        .expect("build handler");
    handler.connect().expect("connect");

    let tags = (0..20)
        .map(|i| format!("k{i}=v{i}"))
        .collect::<Vec<_>>()
        .join(" ");
    let mut expected_len = 0;
    for seq in 0..LINES {
        let line = tagged_line(seq, &tags);
        expected_len += line.len();
        handler.send_data(&line).expect("send");
    }
    handler.flush().expect("flush");
    handler.close();
    assert_eq!(handler.failure_count(), 0);

    if address == sink.addr().to_string() {
        let received = sink.wait_for_len(expected_len, Duration::from_secs(30));
        assert_eq!(received.len(), expected_len);
    }
}
