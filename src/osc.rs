use rosc::{OscMessage, OscPacket, OscType};
use std::{
    io,
    net::{SocketAddr, ToSocketAddrs, UdpSocket},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle,
    time::Duration,
};
use thiserror::Error;
use tracing::{debug, info, warn};

/// How long the listener blocks on the socket before checking whether it should stop.
const POLL_TIMEOUT: Duration = Duration::from_millis(50);

const MAX_PACKET: usize = 64 * 1024;

/// A typed argument atom as carried by the wire protocol.
#[derive(Clone, Debug, PartialEq)]
pub enum Arg {
    Int(i32),
    Float(f32),
    Str(String),
}

impl Arg {
    /// Converts any OSC atom the protocol understands. Wider numeric types are narrowed,
    /// and 64-bit integers outside the `i32` range are rejected.
    pub fn from_osc(value: &OscType) -> Option<Self> {
        match value {
            OscType::Int(i) => Some(Arg::Int(*i)),
            OscType::Long(i) => i32::try_from(*i).ok().map(Arg::Int),
            OscType::Float(f) => Some(Arg::Float(*f)),
            OscType::Double(f) => Some(Arg::Float(*f as f32)),
            OscType::String(s) => Some(Arg::Str(s.clone())),
            OscType::Bool(b) => Some(Arg::Int(*b as i32)),
            _ => None,
        }
    }

    pub fn to_osc(&self) -> OscType {
        match self {
            Arg::Int(i) => OscType::Int(*i),
            Arg::Float(f) => OscType::Float(*f),
            Arg::Str(s) => OscType::String(s.clone()),
        }
    }

    /// Numeric value of the atom. Strings are parsed, so `"1"` and `1.0` agree.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Arg::Int(i) => Some(*i as f32),
            Arg::Float(f) => Some(*f),
            Arg::Str(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Arg::Int(i) => Some(*i),
            Arg::Float(f) if f.is_finite() => Some(*f as i32),
            Arg::Float(_) => None,
            Arg::Str(s) => {
                let s = s.trim();
                s.parse().ok().or_else(|| s.parse::<f32>().ok().map(|f| f as i32))
            }
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Arg::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i32> for Arg {
    fn from(value: i32) -> Self {
        Arg::Int(value)
    }
}

impl From<f32> for Arg {
    fn from(value: f32) -> Self {
        Arg::Float(value)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Str(value.to_owned())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Str(value)
    }
}

/// Converts the arguments of a message, skipping atoms the protocol has no use for.
pub fn args_of(message: &OscMessage) -> Vec<Arg> {
    message.args.iter().filter_map(Arg::from_osc).collect()
}

pub fn message(addr: impl Into<String>, args: &[Arg]) -> OscMessage {
    OscMessage {
        addr: addr.into(),
        args: args.iter().map(Arg::to_osc).collect(),
    }
}

/// Expands bundles (recursively) into their messages, in order.
pub fn flatten(packet: OscPacket) -> Vec<OscMessage> {
    let mut out = vec![];
    flatten_into(packet, &mut out);
    out
}

fn flatten_into(packet: OscPacket, out: &mut Vec<OscMessage>) {
    match packet {
        OscPacket::Message(message) => out.push(message),
        OscPacket::Bundle(bundle) => {
            for packet in bundle.content {
                flatten_into(packet, out);
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum OscError {
    #[error("OSC socket error: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to encode OSC packet: {0:?}")]
    Encode(rosc::OscError),
}

impl From<rosc::OscError> for OscError {
    fn from(err: rosc::OscError) -> Self {
        OscError::Encode(err)
    }
}

/// Sends single messages over UDP without waiting for any acknowledgement.
#[derive(Debug)]
pub struct OscSender {
    socket: UdpSocket,
}

impl OscSender {
    pub fn new() -> Result<Self, OscError> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        Ok(Self { socket })
    }

    pub fn send_to(&self, message: &OscMessage, addr: impl ToSocketAddrs) -> Result<(), OscError> {
        let buf = rosc::encoder::encode(&OscPacket::Message(message.clone()))?;
        self.socket.send_to(&buf, addr)?;
        Ok(())
    }
}

/// A background thread receiving OSC packets on a UDP port.
///
/// Each decoded message is handed to the callback along with the sender's
/// address. The thread stops when the listener is dropped.
pub struct OscListener {
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl OscListener {
    pub fn spawn<F>(addr: impl ToSocketAddrs, mut handler: F) -> Result<Self, OscError>
    where
        F: FnMut(OscMessage, SocketAddr) + Send + 'static,
    {
        let socket = UdpSocket::bind(addr)?;
        socket.set_read_timeout(Some(POLL_TIMEOUT))?;
        let local_addr = socket.local_addr()?;
        let running = Arc::new(AtomicBool::new(true));

        let thread = std::thread::Builder::new().name("osc-listener".into()).spawn({
            let running = Arc::clone(&running);
            move || {
                let mut buf = vec![0u8; MAX_PACKET];
                while running.load(Ordering::Relaxed) {
                    match socket.recv_from(&mut buf) {
                        Ok((size, from)) => match rosc::decoder::decode_udp(&buf[..size]) {
                            Ok((_, packet)) => {
                                for message in flatten(packet) {
                                    handler(message, from);
                                }
                            }
                            Err(err) => debug!(%from, ?err, "undecodable OSC packet"),
                        },
                        Err(err) if matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {}
                        Err(err) => warn!(%err, "OSC receive failed"),
                    }
                }
            }
        })?;
        info!(addr = %local_addr, "listening for OSC");

        Ok(Self {
            local_addr,
            running,
            thread: Some(thread),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("OSC listener thread panicked");
            }
        }
    }
}

impl Drop for OscListener {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rosc::OscBundle;
    use std::sync::mpsc;

    #[test]
    fn test_arg_conversions() {
        assert_eq!(Arg::from("1").as_f32(), Some(1.0));
        assert_eq!(Arg::from(" 0.5").as_f32(), Some(0.5));
        assert_eq!(Arg::from(3i32).as_f32(), Some(3.0));
        assert_eq!(Arg::from(2.9f32).as_i32(), Some(2));
        assert_eq!(Arg::from("7").as_i32(), Some(7));
        assert_eq!(Arg::from("7.0").as_i32(), Some(7));
        assert_eq!(Arg::from("seven").as_i32(), None);
        assert_eq!(Arg::from(1i32).as_str(), None);
        assert_eq!(Arg::from_osc(&OscType::Bool(true)), Some(Arg::Int(1)));
        assert_eq!(Arg::from_osc(&OscType::Nil), None);
    }

    #[test]
    fn test_long_outside_int_range_is_dropped() {
        assert_eq!(Arg::from_osc(&OscType::Long(-12)), Some(Arg::Int(-12)));
        assert_eq!(Arg::from_osc(&OscType::Long(i32::MAX as i64)), Some(Arg::Int(i32::MAX)));
        assert_eq!(Arg::from_osc(&OscType::Long((1 << 32) + 5)), None);
        assert_eq!(Arg::from_osc(&OscType::Long(i64::MIN)), None);

        let msg = OscMessage {
            addr: "/5/position".into(),
            args: vec![OscType::Long((1 << 32) + 5), OscType::Float(1.0)],
        };
        assert_eq!(args_of(&msg), vec![Arg::Float(1.0)]);
    }

    #[test]
    fn test_flatten_nested_bundles() {
        let inner = OscPacket::Bundle(OscBundle {
            timetag: (0, 1).into(),
            content: vec![OscPacket::Message(message("/b", &[])), OscPacket::Message(message("/c", &[]))],
        });
        let outer = OscPacket::Bundle(OscBundle {
            timetag: (0, 1).into(),
            content: vec![OscPacket::Message(message("/a", &[])), inner],
        });
        let addrs: Vec<_> = flatten(outer).into_iter().map(|m| m.addr).collect();
        assert_eq!(addrs, ["/a", "/b", "/c"]);
    }

    #[test]
    fn test_listener_receives_messages() {
        let (tx, rx) = mpsc::channel();
        let listener = OscListener::spawn("127.0.0.1:0", move |msg, _| {
            tx.send(msg).ok();
        })
        .unwrap();

        let sender = OscSender::new().unwrap();
        let sent = message("/1/setColor", &[Arg::Float(1.0), Arg::Int(0), Arg::from("0")]);
        sender.send_to(&sent, listener.local_addr()).unwrap();

        let received = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(received, sent);
        assert_eq!(args_of(&received), vec![Arg::Float(1.0), Arg::Int(0), Arg::from("0")]);
    }
}
