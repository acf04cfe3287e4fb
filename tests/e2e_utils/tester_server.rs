#![cfg(test)]
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use pacsmith::adapters::{serve, HyperTestAdapter};
use pacsmith::config::AppConfig;
use pacsmith::domain::{DomainSet, PacTester, UpdateStats};

pub struct TestPacServer {
    addr: SocketAddr,
    _server_handle: JoinHandle<()>,
}

impl TestPacServer {
    pub async fn start(domains: DomainSet) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let tester = Arc::new(PacTester::new(domains, Arc::new(AppConfig::default()), "Asia/Shanghai"));
        let adapter = Arc::new(HyperTestAdapter::new(tester, UpdateStats::default()));

        let server_handle = tokio::spawn(async move {
            let _ = serve(listener, adapter).await;
        });

        Ok(Self {
            addr,
            _server_handle: server_handle,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Sends one raw HTTP/1.1 request and returns the whole response text.
    pub async fn request(&self, method: &str, path: &str, body: Option<&str>) -> std::io::Result<String> {
        let mut stream = TcpStream::connect(self.addr).await?;
        let body = body.unwrap_or("");
        let request = format!(
            "{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\nContent-Type: application/json\r\nContent-Length: {len}\r\n\r\n{body}",
            addr = self.addr,
            len = body.len(),
        );
        stream.write_all(request.as_bytes()).await?;

        let mut response = Vec::new();
        stream.read_to_end(&mut response).await?;
        Ok(String::from_utf8_lossy(&response).into_owned())
    }
}
