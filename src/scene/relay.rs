use crate::osc::{OscError, OscSender};
use rosc::OscMessage;
use std::{
    io,
    net::{SocketAddr, ToSocketAddrs},
    sync::{mpsc, Arc},
};
use tracing::{debug, info};

/// Somewhere replicated scene messages are delivered to.
pub trait RelayTarget: Send {
    /// Delivers one message. Delivery is best effort; failures are not reported.
    fn send(&mut self, message: &OscMessage);
}

/// A remote mirror reached over UDP.
pub struct UdpTarget {
    addr: SocketAddr,
    sender: Arc<OscSender>,
}

impl RelayTarget for UdpTarget {
    fn send(&mut self, message: &OscMessage) {
        if let Err(err) = self.sender.send_to(message, self.addr) {
            debug!(addr = %self.addr, %err, "relay send failed");
        }
    }
}

/// An in-process mirror, e.g. a tree on another thread.
impl RelayTarget for mpsc::Sender<OscMessage> {
    fn send(&mut self, message: &OscMessage) {
        // A mirror that has gone away simply stops receiving
        mpsc::Sender::send(self, message.clone()).ok();
    }
}

/// Fans every replicated message out to all registered targets.
#[derive(Default)]
pub struct Relayer {
    targets: Vec<Box<dyn RelayTarget>>,
    socket: Option<Arc<OscSender>>,
}

impl Relayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_target(&mut self, target: impl RelayTarget + 'static) {
        self.targets.push(Box::new(target));
    }

    /// Adds a UDP mirror at `addr`. All UDP targets share one socket.
    pub fn add_relay_address(&mut self, addr: impl ToSocketAddrs) -> Result<SocketAddr, OscError> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "address resolved to nothing"))?;
        let sender = match &self.socket {
            Some(socket) => Arc::clone(socket),
            None => {
                let socket = Arc::new(OscSender::new()?);
                self.socket = Some(Arc::clone(&socket));
                socket
            }
        };
        info!(%addr, "relaying scene to");
        self.add_target(UdpTarget { addr, sender });
        Ok(addr)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn send(&mut self, message: &OscMessage) {
        for target in self.targets.iter_mut() {
            target.send(message);
        }
    }
}
