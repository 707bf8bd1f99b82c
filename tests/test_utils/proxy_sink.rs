//! In-process stand-in for a telemetry proxy.
//!
//! Accepts any number of TCP connections on an ephemeral local port and
//! appends everything received to one shared buffer that tests can poll.

use std::{
    io::Read,
    net::{SocketAddr, TcpListener, TcpStream},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

pub struct ProxySink {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<u8>>>,
    connections: Arc<AtomicUsize>,
}

impl ProxySink {
    /// Bind to `127.0.0.1:0` and start accepting in the background.
    pub fn spawn() -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral listener");
        let addr = listener.local_addr().expect("listener has address");
        let received = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));
        {
            let received = Arc::clone(&received);
            let connections = Arc::clone(&connections);
            thread::spawn(move || {
                for stream in listener.incoming() {
                    let Ok(stream) = stream else { break };
                    connections.fetch_add(1, Ordering::SeqCst);
                    let received = Arc::clone(&received);
                    thread::spawn(move || drain(stream, &received));
                }
            });
        }
        Self {
            addr,
            received,
            connections,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    #[allow(dead_code)]
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Snapshot of every byte received so far.
    pub fn contents(&self) -> Vec<u8> {
        self.received.lock().expect("sink mutex poisoned").clone()
    }

    /// Poll until at least `len` bytes arrived or `timeout` passes.
    pub fn wait_for_len(&self, len: usize, timeout: Duration) -> Vec<u8> {
        let deadline = Instant::now() + timeout;
        loop {
            let contents = self.contents();
            if contents.len() >= len || Instant::now() >= deadline {
                return contents;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }
}

fn drain(mut stream: TcpStream, received: &Mutex<Vec<u8>>) {
    let mut buf = [0u8; 16 * 1024];
    loop {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => received
                .lock()
                .expect("sink mutex poisoned")
                .extend_from_slice(&buf[..n]),
        }
    }
}

/// Accept a single peer and hand the accepted stream back to the test.
#[allow(dead_code)]
pub fn accept_one(listener: TcpListener) -> std::sync::mpsc::Receiver<TcpStream> {
    let (tx, rx) = std::sync::mpsc::channel();
    thread::spawn(move || {
        if let Ok((stream, _)) = listener.accept() {
            let _ = tx.send(stream);
        }
    });
    rx
}
