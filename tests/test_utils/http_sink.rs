//! Minimal HTTP endpoint capturing shipped requests.

use std::{
    io::{Read, Write},
    net::{SocketAddr, TcpListener, TcpStream},
    sync::mpsc,
    thread,
    time::Duration,
};

/// A request received by [`HttpSink`], split into head and body.
#[derive(Debug)]
pub struct CapturedRequest {
    pub head: String,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    #[allow(dead_code)]
    pub fn content_length(&self) -> Option<usize> {
        self.head
            .lines()
            .find_map(|line| line.strip_prefix("Content-Length: "))
            .and_then(|value| value.trim().parse().ok())
    }

    #[allow(dead_code)]
    pub fn body_text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("body is UTF-8")
    }
}

/// Listener on an ephemeral localhost port answering every request with 204.
pub struct HttpSink {
    addr: SocketAddr,
    requests: mpsc::Receiver<CapturedRequest>,
}

impl HttpSink {
    pub fn start() -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind ephemeral listener");
        let addr = listener.local_addr().expect("listener has address");
        let (tx, requests) = mpsc::channel();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let request = read_request(&mut stream);
                let _ = stream.write_all(b"HTTP/1.1 204 No Content\r\n\r\n");
                if tx.send(request).is_err() {
                    break;
                }
            }
        });
        Self { addr, requests }
    }

    pub fn address(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Wait for the next request.
    pub fn next_request(&self) -> Option<CapturedRequest> {
        self.requests.recv_timeout(Duration::from_secs(2)).ok()
    }
}

fn read_request(stream: &mut TcpStream) -> CapturedRequest {
    stream
        .set_read_timeout(Some(Duration::from_secs(2)))
        .expect("set read timeout");
    let mut data = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        if let Some(request) = split(&data)
            && request.content_length().is_some_and(|len| request.body.len() >= len)
        {
            return request;
        }
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => data.extend_from_slice(&buf[..n]),
        }
    }
    split(&data).unwrap_or(CapturedRequest {
        head: String::from_utf8_lossy(&data).into_owned(),
        body: Vec::new(),
    })
}

fn split(data: &[u8]) -> Option<CapturedRequest> {
    let end = data.windows(4).position(|w| w == b"\r\n\r\n")?;
    Some(CapturedRequest {
        head: String::from_utf8_lossy(&data[..end]).into_owned(),
        body: data[end + 4..].to_vec(),
    })
}
