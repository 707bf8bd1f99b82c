//! Many producers sharing one handler while ticks flush in the background.

use std::{
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
    thread,
    time::Duration,
};

use rstest::rstest;

mod test_utils;
use test_utils::fixtures::{Harness, harness};

const THREADS: usize = 100;
const LINES_PER_THREAD: usize = 1000;

fn line(thread: usize, seq: usize) -> String {
    format!("load.t{thread} {seq} 1700000000 source=t{thread}\n")
}

#[rstest]
fn concurrent_sends_arrive_intact(harness: Harness) {
    let Harness {
        sink,
        trigger,
        handler,
    } = harness;
    let errors = AtomicU64::new(0);
    let done = AtomicBool::new(false);

    thread::scope(|scope| {
        scope.spawn(|| {
            while !done.load(Ordering::Acquire) {
                trigger.tick();
                thread::sleep(Duration::from_millis(1));
            }
        });
        let producers: Vec<_> = (0..THREADS)
            .map(|t| {
                let handler = &handler;
                let errors = &errors;
                scope.spawn(move || {
                    for i in 0..LINES_PER_THREAD {
                        if handler.send_data(&line(t, i)).is_err() {
                            errors.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().expect("producer panicked");
        }
        done.store(true, Ordering::Release);
    });
    handler.flush().expect("final flush");

    let mut expected: Vec<String> = (0..THREADS)
        .flat_map(|t| (0..LINES_PER_THREAD).map(move |i| line(t, i)))
        .collect();
    let expected_len: usize = expected.iter().map(String::len).sum();
    let received = sink.wait_for_len(expected_len, Duration::from_secs(30));
    let text = String::from_utf8(received).expect("utf8");
    let mut lines: Vec<String> = text.split_inclusive('\n').map(str::to_owned).collect();

    expected.sort();
    lines.sort();
    assert_eq!(handler.failure_count(), errors.load(Ordering::Relaxed));
    assert_eq!(errors.load(Ordering::Relaxed), 0);
    assert_eq!(lines.len(), expected.len());
    assert!(lines == expected, "received lines differ from sent lines");
}

#[rstest]
fn failure_count_is_readable_while_sending(harness: Harness) {
    let Harness { handler, .. } = harness;
    thread::scope(|scope| {
        let sender = scope.spawn(|| {
            for i in 0..10_000 {
                let _ = handler.send_data(&line(0, i));
            }
        });
        while !sender.is_finished() {
            assert_eq!(handler.failure_count(), 0);
        }
    });
}
