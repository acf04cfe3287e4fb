use std::sync::Arc;

use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ServerBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use super::HyperTestAdapter;

/// Accepts connections until the listener fails, one task per connection.
pub async fn serve(listener: TcpListener, adapter: Arc<HyperTestAdapter>) -> std::io::Result<()> {
    info!("PAC tester listening on http://{}", listener.local_addr()?);

    loop {
        let (stream, remote) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Failed to accept connection: {}", e);
                return Err(e);
            }
        };
        let io = TokioIo::new(stream);
        let adapter = adapter.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let adapter = adapter.clone();
                async move { Ok::<_, hyper::Error>(adapter.handle(req).await) }
            });

            if let Err(err) = ServerBuilder::new(TokioExecutor::new())
                .serve_connection(io, service)
                .await
            {
                debug!("Connection from {} ended with error: {}", remote, err);
            }
        });
    }
}
