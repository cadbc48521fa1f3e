//! TCP server front end.
//!
//! Listens for client connections and runs one independent session
//! per connection. Transport framing is one JSON object per line in
//! both directions; responses and events share the write side of the
//! socket behind a lock so they never interleave mid-line.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::unbounded;
use serde::Serialize;
use tracing::{error, info, warn};
use weft_engine::EngineFactory;

use crate::protocol::{Request, Response};
use crate::session::Session;

pub struct DebugServer {
    listener: TcpListener,
    factory: Arc<dyn EngineFactory>,
}

impl DebugServer {
    pub fn bind(addr: impl ToSocketAddrs, factory: Arc<dyn EngineFactory>) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        info!(addr = %listener.local_addr()?, "debug adapter listening");
        Ok(Self { listener, factory })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the listener fails. Each connection
    /// gets its own thread and session.
    pub fn run(&self) -> io::Result<()> {
        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let factory = Arc::clone(&self.factory);
                    let peer = stream.peer_addr().ok();
                    thread::spawn(move || match serve_connection(stream, factory) {
                        Ok(()) => info!(?peer, "debug connection closed"),
                        Err(err) => warn!(?peer, error = %err, "debug connection failed"),
                    });
                }
                Err(err) => {
                    error!(error = %err, "accept failed");
                    return Err(err);
                }
            }
        }
        Ok(())
    }
}

fn serve_connection(stream: TcpStream, factory: Arc<dyn EngineFactory>) -> io::Result<()> {
    let (event_tx, event_rx) = unbounded();
    let session = Session::new(factory, event_tx);
    let writer = Arc::new(Mutex::new(stream.try_clone()?));

    let event_writer = Arc::clone(&writer);
    let forwarder = thread::spawn(move || {
        while let Ok(event) = event_rx.recv() {
            if write_line(&event_writer, &event).is_err() {
                break;
            }
        }
    });

    let result = read_requests(stream, &session, &writer);

    // Client is gone or the socket broke: cancel any active run, then
    // let the forwarder drain once the engine thread releases its
    // event sender.
    session.shutdown();
    drop(session);
    let _ = forwarder.join();
    result
}

fn read_requests(
    stream: TcpStream,
    session: &Session,
    writer: &Arc<Mutex<TcpStream>>,
) -> io::Result<()> {
    let reader = BufReader::new(stream);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => session.handle_request(&request),
            Err(err) => {
                warn!(error = %err, "unparseable request line");
                Response::protocol_error(format!("invalid request: {err}"))
            }
        };
        write_line(writer, &response)?;
    }
    Ok(())
}

fn write_line<T: Serialize>(writer: &Arc<Mutex<TcpStream>>, message: &T) -> io::Result<()> {
    let mut text = serde_json::to_string(message).map_err(io::Error::other)?;
    text.push('\n');
    let mut guard = writer
        .lock()
        .map_err(|_| io::Error::other("writer lock poisoned"))?;
    guard.write_all(text.as_bytes())
}
