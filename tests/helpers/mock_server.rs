//! Minimal scripted HTTP/1.1 server for exercising the retry pipeline.
//!
//! Serves one status code per request from a script, repeating the last
//! entry once the script runs out, and counts every request it handles.
//! Runs on a plain std thread so both the async and the blocking executor
//! tests can use it.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

pub struct ScriptedServer {
    base_url: String,
    hits: Arc<AtomicUsize>,
}

impl ScriptedServer {
    /// Bind a random local port and serve `statuses` in order, one per
    /// request, repeating the last entry indefinitely.
    pub fn start(statuses: Vec<u16>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let base_url = format!("http://{}", listener.local_addr().expect("local addr"));
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let hit = counter.fetch_add(1, Ordering::SeqCst);
                let status = statuses
                    .get(hit)
                    .or(statuses.last())
                    .copied()
                    .unwrap_or(200);
                // Each request gets its own connection (Connection: close),
                // so per-connection handling is per-request handling.
                let _ = handle_request(stream, status);
            }
        });

        Self { base_url, hits }
    }

    pub fn url(&self) -> &str {
        &self.base_url
    }

    /// Number of requests served so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Accept connections and drop them immediately without answering,
    /// counting each accept. Lets tests count attempts for failures that
    /// never produce a response.
    #[allow(dead_code)]
    pub fn start_dropping() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let base_url = format!("http://{}", listener.local_addr().expect("local addr"));
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                counter.fetch_add(1, Ordering::SeqCst);
                drop(stream);
            }
        });

        Self { base_url, hits }
    }

    /// A base URL whose port is bound by nobody, for connection-refused
    /// scenarios.
    pub fn refused_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);
        format!("http://{addr}")
    }
}

fn handle_request(stream: TcpStream, status: u16) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream);

    // Read headers, note the content length, drain the body.
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Ok(());
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }
    if content_length > 0 {
        let mut body = vec![0u8; content_length];
        reader.read_exact(&mut body)?;
    }

    let body = format!("{{\"status\":{status}}}");
    let response = format!(
        "HTTP/1.1 {status} Scripted\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n{body}",
        body.len()
    );
    let mut stream = reader.into_inner();
    stream.write_all(response.as_bytes())?;
    stream.flush()
}
