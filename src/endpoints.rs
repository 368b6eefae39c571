//! Endpoint server exposing Prometheus metrics

use anyhow::Result;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::metrics::metrics;

/// Start the endpoint server
///
/// Every request is answered with the metrics registry in text format.
pub async fn endpoint_server(port: u16) -> Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("Metrics endpoint listening on {}", addr);

    loop {
        match listener.accept().await {
            Ok((mut socket, _peer)) => {
                tokio::spawn(async move {
                    let mut buf = [0; 1024];
                    if let Err(e) = socket.read(&mut buf).await {
                        tracing::error!("Failed to read from socket: {}", e);
                        return;
                    }

                    let response = match metrics().render() {
                        Ok(body) => format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: text/plain; version=0.0.4\r\nContent-Length: {}\r\n\r\n{}",
                            body.len(),
                            body
                        ),
                        Err(e) => {
                            tracing::error!("Failed to encode metrics: {}", e);
                            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\n\r\n".to_string()
                        }
                    };

                    if let Err(e) = socket.write_all(response.as_bytes()).await {
                        tracing::error!("Failed to write metrics response: {}", e);
                    }
                });
            }
            Err(e) => {
                tracing::error!("Failed to accept connection: {}", e);
            }
        }
    }
}
