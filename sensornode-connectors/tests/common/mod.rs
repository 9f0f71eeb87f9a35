//! Minimal MQTT 3.1.1 broker on a loopback socket
//!
//! Answers CONNECT with CONNACK, PINGREQ with PINGRESP and acknowledges
//! QoS 1 publishes whose topic passes the ack filter. Everything the
//! client sends is reported on a channel.

#![allow(dead_code)]

use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

/// What the broker saw, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seen {
    Connect,
    Publish { topic: String, payload: String },
    Disconnect,
}

pub struct Broker {
    pub port: u16,
    pub seen: Receiver<Seen>,
}

impl Broker {
    /// Broker that acknowledges every publish
    pub fn start() -> Self {
        Self::start_with(|_| true)
    }

    /// Broker that acknowledges only publishes to topics `ack` accepts
    pub fn start_with(ack: impl Fn(&str) -> bool + Send + 'static) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, seen) = mpsc::channel();

        thread::spawn(move || {
            if let Ok((stream, _)) = listener.accept() {
                let _ = serve(stream, &tx, &ack);
            }
        });

        Self { port, seen }
    }

    /// Everything seen so far, waiting briefly for in-flight packets
    pub fn drain(&self) -> Vec<Seen> {
        let mut seen = Vec::new();
        while let Ok(packet) = self.seen.recv_timeout(Duration::from_millis(100)) {
            seen.push(packet);
        }
        seen
    }
}

/// A port nothing listens on
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn serve(mut stream: TcpStream, tx: &Sender<Seen>, ack: &dyn Fn(&str) -> bool) -> io::Result<()> {
    loop {
        let (header, body) = read_packet(&mut stream)?;
        match header >> 4 {
            1 => {
                let _ = tx.send(Seen::Connect);
                stream.write_all(&[0x20, 0x02, 0x00, 0x00])?;
            }
            3 => {
                let qos = (header >> 1) & 0x03;
                let topic_len = u16::from_be_bytes([body[0], body[1]]) as usize;
                let topic = String::from_utf8_lossy(&body[2..2 + topic_len]).into_owned();
                let mut rest = 2 + topic_len;
                let pkid = if qos > 0 {
                    rest += 2;
                    Some([body[rest - 2], body[rest - 1]])
                } else {
                    None
                };
                let payload = String::from_utf8_lossy(&body[rest..]).into_owned();

                let acked = ack(&topic);
                let _ = tx.send(Seen::Publish { topic, payload });
                if let (Some([hi, lo]), true) = (pkid, acked) {
                    stream.write_all(&[0x40, 0x02, hi, lo])?;
                }
            }
            12 => stream.write_all(&[0xD0, 0x00])?,
            14 => {
                let _ = tx.send(Seen::Disconnect);
                return Ok(());
            }
            _ => {}
        }
    }
}

fn read_packet(stream: &mut TcpStream) -> io::Result<(u8, Vec<u8>)> {
    let mut byte = [0u8; 1];
    stream.read_exact(&mut byte)?;
    let header = byte[0];

    let mut len = 0usize;
    let mut shift = 0;
    loop {
        stream.read_exact(&mut byte)?;
        len |= ((byte[0] & 0x7F) as usize) << shift;
        if byte[0] & 0x80 == 0 {
            break;
        }
        shift += 7;
    }

    let mut body = vec![0u8; len];
    stream.read_exact(&mut body)?;
    Ok((header, body))
}
