#![allow(dead_code)]

pub mod test_server {
    use std::sync::Once;

    /// Ensures May coroutines are configured only once
    static MAY_INIT: Once = Once::new();

    /// Validation runs inside handler coroutines and needs the larger stack.
    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x20000);
        });
    }
}

pub mod fixtures {
    use std::path::PathBuf;

    /// Path of a file under `tests/data`.
    pub fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("data").join(name)
    }
}

pub mod http {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpListener, TcpStream};
    use std::time::Duration;

    /// A port that was free a moment ago.
    pub fn free_addr() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        addr
    }

    /// Write `req` verbatim and read until the server goes quiet.
    pub fn send_request(addr: &SocketAddr, req: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(req.as_bytes()).unwrap();
        stream.set_read_timeout(Some(Duration::from_millis(200))).unwrap();
        let mut buf = Vec::new();
        loop {
            let mut tmp = [0u8; 4096];
            match stream.read(&mut tmp) {
                Ok(0) => break,
                Ok(n) => buf.extend_from_slice(&tmp[..n]),
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    break
                }
                Err(e) => panic!("read error: {e:?}"),
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Status, content type and body of a raw HTTP/1.1 response.
    pub fn parse_parts(resp: &str) -> (u16, String, String) {
        let (headers, body) = resp.split_once("\r\n\r\n").unwrap_or((resp, ""));
        let mut status = 0;
        let mut content_type = String::new();
        for line in headers.lines() {
            if line.starts_with("HTTP/1.1") {
                status = line
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or("0")
                    .parse()
                    .unwrap();
            } else if let Some((name, val)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-type") {
                    content_type = val.trim().to_string();
                }
            }
        }
        (status, content_type, body.to_string())
    }

    /// Value of header `name` in a raw response.
    pub fn header_value(resp: &str, name: &str) -> Option<String> {
        let (headers, _) = resp.split_once("\r\n\r\n")?;
        headers.lines().find_map(|line| {
            let (n, v) = line.split_once(':')?;
            n.eq_ignore_ascii_case(name).then(|| v.trim().to_string())
        })
    }
}

pub mod client {
    use http::Method;
    use std::sync::Arc;
    use swagger_gate::server::{AppService, ParsedRequest};
    use swagger_gate::HandlerResponse;

    /// Drives an [`AppService`] without a socket.
    pub struct TestClient {
        service: AppService,
    }

    impl TestClient {
        pub fn new(service: AppService) -> Self {
            Self { service }
        }

        /// Send one request; header names are lower-cased like the server does.
        pub fn send(&self, method: Method, target: &str, headers: &[(&str, &str)], body: &[u8]) -> HandlerResponse {
            let mut parsed = ParsedRequest::new(method, target);
            for (name, value) in headers {
                parsed
                    .headers
                    .push((Arc::from(name.to_ascii_lowercase().as_str()), (*value).to_string()));
            }
            parsed.body = body.to_vec();
            self.service.handle(parsed)
        }

        /// Status and body text.
        pub fn call(&self, method: Method, target: &str, headers: &[(&str, &str)], body: &[u8]) -> (u16, String) {
            let resp = self.send(method, target, headers, body);
            (resp.status, String::from_utf8_lossy(&resp.body.to_bytes()).to_string())
        }
    }
}
