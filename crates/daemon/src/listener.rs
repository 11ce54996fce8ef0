// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unix socket listener: frames in, frames out.
//!
//! One task per connection; requests on a connection are handled in order.
//! A `Shutdown` request is acknowledged and then signalled to the main
//! loop through the returned notify handle.

use crate::protocol::{self, Request, Response};
use crate::service::HostService;
use pilot_core::Clock;
use std::sync::Arc;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;
use tracing::{info, warn};

/// Accept loop. Returns only when `shutdown` is notified.
pub async fn serve<C: Clock + 'static>(
    listener: UnixListener,
    service: Arc<HostService<C>>,
    shutdown: Arc<Notify>,
) {
    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                info!("listener shutting down");
                return;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _addr)) => {
                        let service = service.clone();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, service, shutdown).await {
                                warn!(error = %e, "connection error");
                            }
                        });
                    }
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                    }
                }
            }
        }
    }
}

async fn handle_connection<C: Clock + 'static>(
    mut stream: UnixStream,
    service: Arc<HostService<C>>,
    shutdown: Arc<Notify>,
) -> Result<(), protocol::ProtocolError> {
    while let Some(request) = protocol::read_frame::<_, Request>(&mut stream).await? {
        let is_shutdown = matches!(request, Request::Shutdown);
        let response: Response = service.handle_request(request).await;
        protocol::write_frame(&mut stream, &response).await?;
        if is_shutdown {
            shutdown.notify_waiters();
            return Ok(());
        }
    }
    Ok(())
}
