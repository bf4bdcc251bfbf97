use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use les_config::{Protocol, ServerConfig};
use std::io;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::probe;

/// Half-width of the fallback search window around the configured port
/// when no explicit range is given.
const FALLBACK_WINDOW: u16 = 500;

/// Why a server instance failed to start. Callers match on these: only a
/// bind conflict is retryable, and the instance itself performs that one
/// retry; everything surfacing from `start` is terminal.
#[derive(Debug, Error)]
pub enum StartError {
    /// The ssl key or cert could not be read. Fatal, never retried.
    #[error("error reading ssl cert")]
    TlsRead(#[source] io::Error),
    /// The configured port was taken and the rebind on the probed free
    /// port lost the race as well. One retry is the contract.
    #[error("port {port} in use; fallback port {fallback} also in use")]
    ConflictExhausted { port: u16, fallback: u16 },
    /// Every port of the search window was occupied.
    #[error("no free port in range {start}-{end}")]
    RangeExhausted { start: u16, end: u16 },
    /// Any other bind or host-resolution failure, propagated verbatim so
    /// callers can match on the underlying OS error.
    #[error("bind failed: {0}")]
    Bind(#[from] io::Error),
}

/// A successfully bound listener. `port` is read back from the live
/// socket, so it is the actual port even for ephemeral (port 0) binds or
/// after conflict recovery.
#[derive(Debug, Clone, PartialEq)]
pub struct ListeningInfo {
    pub proto: Protocol,
    pub host: String,
    pub port: u16,
}

impl ListeningInfo {
    /// Browser-facing URL of this listener (http2 maps to https).
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.proto.scheme(), self.host, self.port)
    }
}

/// One server instance: a single `(proto, host, port)` listener over the
/// shared handler stack.
#[derive(Debug)]
pub struct ServerInstance {
    cfg: ServerConfig,
    app: Router,
    tls: Option<RustlsConfig>,
    handle: Option<Handle>,
    bound: Option<ListeningInfo>,
}

impl ServerInstance {
    /// `app` is the shared, read-only handler stack (static mount plus any
    /// live-reload routes); every instance serves the same one.
    pub fn new(cfg: ServerConfig, app: Router) -> Self {
        Self {
            cfg,
            app,
            tls: None,
            handle: None,
            bound: None,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.cfg
    }

    pub fn listening_info(&self) -> Option<&ListeningInfo> {
        self.bound.as_ref()
    }

    /// Select the transport for the configured protocol. For https/http2
    /// this reads the key and cert from disk; a read failure is fatal and
    /// never retried, unlike a bind conflict.
    pub async fn build(&mut self) -> Result<(), StartError> {
        if !self.cfg.proto.is_tls() {
            return Ok(());
        }
        let (Some(key), Some(cert)) = (&self.cfg.ssl_key, &self.cfg.ssl_cert) else {
            return Err(StartError::TlsRead(io::Error::new(
                io::ErrorKind::NotFound,
                "sslKey and sslCert are required for https/http2",
            )));
        };
        let tls = RustlsConfig::from_pem_file(cert, key)
            .await
            .map_err(StartError::TlsRead)?;
        self.tls = Some(tls);
        Ok(())
    }

    /// Bind `host:port` and start serving. Host resolution and bind errors
    /// propagate verbatim; `AddrInUse` is the one recoverable case and is
    /// handled by [`ServerInstance::start`].
    pub async fn listen(&mut self, host: &str, port: u16) -> Result<ListeningInfo, StartError> {
        let listener = TcpListener::bind((host, port)).await?;
        let actual = listener.local_addr()?.port();
        // axum-server takes a std listener; the tokio one is already
        // non-blocking, which from_tcp requires.
        let listener = listener.into_std()?;

        let handle = Handle::new();
        let app = self.app.clone();
        match self.tls.clone() {
            Some(tls) => {
                let server = axum_server::from_tcp_rustls(listener, tls).handle(handle.clone());
                tokio::spawn(async move {
                    if let Err(err) = server.serve(app.into_make_service()).await {
                        eprintln!("server error: {err}");
                    }
                });
            }
            None => {
                let server = axum_server::from_tcp(listener).handle(handle.clone());
                tokio::spawn(async move {
                    if let Err(err) = server.serve(app.into_make_service()).await {
                        eprintln!("server error: {err}");
                    }
                });
            }
        }

        let info = ListeningInfo {
            proto: self.cfg.proto,
            host: host.to_string(),
            port: actual,
        };
        println!(
            "listening at: (proto = {}, host = {}, port = {})",
            info.proto, info.host, info.port
        );
        self.handle = Some(handle);
        self.bound = Some(info.clone());
        Ok(info)
    }

    /// Build + listen with exactly one conflict recovery.
    ///
    /// On `AddrInUse` the search window is the explicit port range when
    /// configured, else `[port - 500, port + 500]`; the prober picks the
    /// lowest free port and the bind is retried once. A second conflict on
    /// that port is terminal, as is an exhausted window.
    pub async fn start(&mut self) -> Result<ListeningInfo, StartError> {
        self.build().await?;
        let host = self.cfg.host.clone();
        let port = self.cfg.port;

        match self.listen(&host, port).await {
            Ok(info) => Ok(info),
            Err(StartError::Bind(err)) if err.kind() == io::ErrorKind::AddrInUse => {
                let (start, end) = self.cfg.port_range.unwrap_or((
                    port.saturating_sub(FALLBACK_WINDOW),
                    port.saturating_add(FALLBACK_WINDOW),
                ));
                let free = probe::find_free_port((start, end))
                    .ok_or(StartError::RangeExhausted { start, end })?;
                println!("port {port} in use, using free port instead {free}");
                match self.listen(&host, free).await {
                    Ok(info) => Ok(info),
                    Err(StartError::Bind(err)) if err.kind() == io::ErrorKind::AddrInUse => {
                        Err(StartError::ConflictExhausted {
                            port,
                            fallback: free,
                        })
                    }
                    Err(err) => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Shut the listener down and report what was released. A stop on a
    /// never-started instance is a no-op success.
    pub fn stop(&mut self) -> Option<ListeningInfo> {
        if let Some(handle) = self.handle.take() {
            handle.shutdown();
        }
        self.bound.take()
    }
}
