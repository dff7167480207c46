use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::RwLock;
use rosc::{OscPacket, OscType};
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Default UDP port for the OSC trigger server.
pub const DEFAULT_OSC_PORT: u16 = 8000;

/// Callback bound to an OSC address. Invoked with the matched address and
/// any message arguments; arguments are accepted but the trigger semantics
/// ignore them. Handlers must tolerate repeated and concurrent invocation.
pub type TriggerHandler = Arc<dyn Fn(&str, &[OscType]) + Send + Sync>;

/// Canonical leading-slash form of an OSC address.
pub fn normalize_address(address: &str) -> String {
    if address.starts_with('/') {
        address.to_string()
    } else {
        format!("/{}", address)
    }
}

/// Listens for inbound OSC messages over UDP and dispatches them to the
/// handlers registered for their addresses. Strictly inbound and
/// fire-and-forget: no response payload is ever sent.
pub struct OscServer {
    port: u16,
    handlers: Arc<RwLock<HashMap<String, TriggerHandler>>>,
    listener: Option<ListenerTask>,
    local_addr: Option<SocketAddr>,
}

struct ListenerTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl OscServer {
    pub fn new(port: u16) -> Self {
        OscServer {
            port,
            handlers: Arc::new(RwLock::new(HashMap::new())),
            listener: None,
            local_addr: None,
        }
    }

    /// Bind an address to a handler, silently replacing any existing
    /// binding.
    pub fn register(&self, address: &str, handler: TriggerHandler) {
        let address = normalize_address(address);
        self.handlers.write().insert(address.clone(), handler);
        log::info!("registered OSC address {}", address);
    }

    /// Remove a binding if present; a no-op otherwise.
    pub fn unregister(&self, address: &str) {
        let address = normalize_address(address);
        if self.handlers.write().remove(&address).is_some() {
            log::info!("unregistered OSC address {}", address);
        }
    }

    /// Bind the UDP listener and start dispatching on a background task.
    /// A bind failure is logged and leaves the server inactive; the rest of
    /// the system keeps operating on direct triggers.
    pub async fn start(&mut self) -> std::io::Result<SocketAddr> {
        if let Some(addr) = self.local_addr {
            if self.listener.is_some() {
                log::warn!("OSC server already listening on {}", addr);
                return Ok(addr);
            }
        }

        let socket = match UdpSocket::bind(("0.0.0.0", self.port)).await {
            Ok(socket) => socket,
            Err(e) => {
                log::error!("failed to start OSC server on port {}: {}", self.port, e);
                return Err(e);
            }
        };
        let addr = socket.local_addr()?;

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let handlers = Arc::clone(&self.handlers);
        let handle = tokio::spawn(async move {
            let mut buf = vec![0u8; rosc::decoder::MTU];
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    received = socket.recv_from(&mut buf) => match received {
                        Ok((len, peer)) => match rosc::decoder::decode_udp(&buf[..len]) {
                            Ok((_, packet)) => dispatch(&handlers, packet),
                            Err(e) => log::warn!("dropping malformed OSC packet from {}: {}", peer, e),
                        },
                        Err(e) => log::warn!("OSC receive error: {}", e),
                    }
                }
            }
        });

        self.listener = Some(ListenerTask { shutdown, handle });
        self.local_addr = Some(addr);
        log::info!("OSC server listening on port {}", addr.port());
        Ok(addr)
    }

    /// Stop the listener and release its socket. Idempotent.
    pub async fn stop(&mut self) {
        if let Some(listener) = self.listener.take() {
            let _ = listener.shutdown.send(true);
            if let Err(e) = listener.handle.await {
                log::error!("OSC listener task failed: {}", e);
            }
            log::info!("OSC server stopped");
        }
        self.local_addr = None;
    }

    /// Address the listener is actually bound to, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

fn dispatch(handlers: &RwLock<HashMap<String, TriggerHandler>>, packet: OscPacket) {
    match packet {
        OscPacket::Message(msg) => {
            let handler = handlers.read().get(&msg.addr).cloned();
            if let Some(handler) = handler {
                log::debug!("dispatching OSC trigger {}", msg.addr);
                handler.as_ref()(&msg.addr, &msg.args);
            } else {
                log::debug!("no handler registered for OSC address {}", msg.addr);
            }
        }
        OscPacket::Bundle(bundle) => {
            for packet in bundle.content {
                dispatch(handlers, packet);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use rosc::{encoder, OscMessage};

    use super::*;

    fn trigger_message(addr: &str) -> Vec<u8> {
        encoder::encode(&OscPacket::Message(OscMessage {
            addr: addr.to_string(),
            args: vec![],
        }))
        .unwrap()
    }

    fn counting_handler(counter: Arc<AtomicUsize>) -> TriggerHandler {
        Arc::new(move |_addr: &str, _args: &[OscType]| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    async fn send_and_settle(target: SocketAddr, payload: &[u8]) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        socket
            .send_to(payload, ("127.0.0.1", target.port()))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    #[test]
    fn test_normalize_address() {
        assert_eq!(normalize_address("chase1"), "/chase1");
        assert_eq!(normalize_address("/chase1"), "/chase1");
    }

    #[tokio::test]
    async fn test_register_replaces_existing_binding() {
        let server = OscServer::new(0);
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        server.register("/chase", counting_handler(first.clone()));
        server.register("chase", counting_handler(second.clone()));

        let handlers = server.handlers.read();
        assert_eq!(handlers.len(), 1);
        handlers.get("/chase").unwrap().as_ref()("/chase", &[]);
        drop(handlers);

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispatches_matching_message() {
        let mut server = OscServer::new(0);
        let counter = Arc::new(AtomicUsize::new(0));
        server.register("/chase1", counting_handler(counter.clone()));

        let addr = server.start().await.unwrap();
        send_and_settle(addr, &trigger_message("/chase1")).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        // Arguments are accepted but ignored by trigger semantics.
        let with_args = encoder::encode(&OscPacket::Message(OscMessage {
            addr: "/chase1".to_string(),
            args: vec![OscType::Int(1), OscType::Float(0.5)],
        }))
        .unwrap();
        send_and_settle(addr, &with_args).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        server.stop().await;
    }

    #[tokio::test]
    async fn test_unregistered_address_triggers_nothing() {
        let mut server = OscServer::new(0);
        let counter = Arc::new(AtomicUsize::new(0));
        server.register("/chase1", counting_handler(counter.clone()));
        server.unregister("/chase1");

        let addr = server.start().await.unwrap();
        send_and_settle(addr, &trigger_message("/chase1")).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        server.stop().await;
    }

    #[tokio::test]
    async fn test_malformed_packet_does_not_stop_the_listener() {
        let mut server = OscServer::new(0);
        let counter = Arc::new(AtomicUsize::new(0));
        server.register("/chase1", counting_handler(counter.clone()));

        let addr = server.start().await.unwrap();
        send_and_settle(addr, b"definitely not osc").await;
        send_and_settle(addr, &trigger_message("/chase1")).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        server.stop().await;
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let mut server = OscServer::new(0);
        server.start().await.unwrap();
        server.stop().await;
        server.stop().await;
        assert!(server.local_addr().is_none());
    }
}
