//! HTTP/1 listener

use std::convert::Infallible;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use crate::chain::Chain;

/// `:8080` shorthand for all interfaces
pub fn listen_addr(listen: &str) -> String {
    if listen.starts_with(':') {
        format!("0.0.0.0{}", listen)
    } else {
        listen.to_string()
    }
}

/// Accept connections on `listen` and route every request through `chain`
pub async fn run(listen: &str, chain: Arc<Chain>) -> statik_core::Result<()> {
    let addr = listen_addr(listen);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| statik_core::Error::Server(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("🚀 Statik listening on http://{}", addr);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("Accept error: {}", e);
                continue;
            }
        };

        let io = TokioIo::new(stream);
        let chain = chain.clone();

        tokio::task::spawn(async move {
            let service = service_fn(move |req| {
                let chain = chain.clone();
                async move { Ok::<_, Infallible>(chain.handle(req).await) }
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                tracing::debug!("Error serving connection from {}: {:?}", peer, err);
            }
        });
    }
}
