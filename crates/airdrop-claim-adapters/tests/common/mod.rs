#![allow(dead_code)]

use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;
use tiny_http::{Response, Server, StatusCode};

pub const CHAIN_ID: &str = "e476187f6ddfeb9d588c7b45d3df334d5501d6499b3f9ad5595cae86cce16a65";
pub const APP_ID: &str = "6c4a2b1f0e9d8c7b6a59483726150f1e2d3c4b5a69788796a5b4c3d2e1f00112";
pub const OWNER: &str = "0x1000000000000000000000000000000000000001";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub body: Value,
}

/// Serves `responses` in order, one per request, recording what was received.
pub fn spawn_mock_server(
    responses: Vec<(u16, Value)>,
) -> (String, u16, Arc<Mutex<Vec<Recorded>>>, thread::JoinHandle<()>) {
    let server = Server::http("127.0.0.1:0").expect("start server");
    let port = server
        .server_addr()
        .to_ip()
        .expect("ip listener")
        .port();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&calls);

    let join = thread::spawn(move || {
        for (code, payload) in responses {
            let mut req = match server.recv() {
                Ok(r) => r,
                Err(_) => break,
            };
            let mut raw = String::new();
            let _ = req.as_reader().read_to_string(&mut raw);
            let body = serde_json::from_str(&raw).unwrap_or(Value::Null);
            if let Ok(mut g) = recorded.lock() {
                g.push(Recorded {
                    path: req.url().to_owned(),
                    body,
                });
            }
            let response =
                Response::from_string(payload.to_string()).with_status_code(StatusCode(code));
            let _ = req.respond(response);
        }
    });

    (format!("http://127.0.0.1:{port}"), port, calls, join)
}

pub fn claim_url(host: &str, port: u16) -> String {
    format!("http://frontend.test/{CHAIN_ID}?app={APP_ID}&owner={OWNER}&host={host}&port={port}")
}

/// Accepts connections but never answers; requests are held until `hold` elapses.
pub fn spawn_silent_server(hold: Duration) -> (String, thread::JoinHandle<()>) {
    let server = Server::http("127.0.0.1:0").expect("start server");
    let port = server
        .server_addr()
        .to_ip()
        .expect("ip listener")
        .port();
    let join = thread::spawn(move || {
        let deadline = Instant::now() + hold;
        let mut held = Vec::new();
        while let Ok(Some(req)) =
            server.recv_timeout(deadline.saturating_duration_since(Instant::now()))
        {
            held.push(req);
        }
    });
    (format!("http://127.0.0.1:{port}"), join)
}
