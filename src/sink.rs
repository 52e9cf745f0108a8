//! Server role that persists received shares
//!
//! The sink binds once, then loops: accept a connection, read until the
//! peer closes, write the whole payload to the sink file, close. Each
//! payload is written inside one critical section, so concurrent
//! connections never interleave partial writes. A failing connection only
//! loses its own data; the listener keeps accepting.

use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::config::{SinkConfig, SinkMode};
use crate::error::{Result, SplitShareError};

/// Outcome of one handled connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    pub peer: SocketAddr,
    pub bytes: usize,
}

/// Persistent destination of received payloads
#[derive(Debug)]
struct SinkStore {
    path: PathBuf,
    mode: SinkMode,
    lock: Mutex<()>,
}

impl SinkStore {
    fn persist(&self, payload: &[u8]) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let written = match self.mode {
            SinkMode::Append => append(&self.path, payload),
            SinkMode::Overwrite => replace(&self.path, payload),
        };
        written.map_err(|source| SplitShareError::SinkWriteFailure {
            path: self.path.display().to_string(),
            source,
        })
    }
}

fn append(path: &Path, payload: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(payload)?;
    file.sync_data()
}

// Written next to the target and renamed, so readers never see a half file
fn replace(path: &Path, payload: &[u8]) -> io::Result<()> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".partial");
    let tmp_path = path.with_file_name(tmp_name);

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp_path)?;
    file.write_all(payload)?;
    file.sync_data()?;
    drop(file);
    fs::rename(&tmp_path, path)
}

#[derive(Debug, Clone, Copy)]
struct ReadLimits {
    timeout: Duration,
    max_payload: usize,
}

/// A bound share sink
#[derive(Debug)]
pub struct ShareSink {
    listener: TcpListener,
    store: Arc<SinkStore>,
    limits: ReadLimits,
}

impl ShareSink {
    /// Binds the listening socket
    ///
    /// # Errors
    /// Returns `Io` if the address cannot be bound; this is fatal for the
    /// server role
    pub fn bind(config: &SinkConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.listen_addr())?;
        let local = listener.local_addr()?;
        info!(
            addr = %local,
            path = %config.path.display(),
            mode = ?config.mode,
            "share sink listening"
        );
        Ok(Self {
            listener,
            store: Arc::new(SinkStore {
                path: config.path.clone(),
                mode: config.mode,
                lock: Mutex::new(()),
            }),
            limits: ReadLimits {
                timeout: config.read_timeout,
                max_payload: config.max_payload,
            },
        })
    }

    /// Address actually bound (useful with port 0)
    ///
    /// # Errors
    /// Returns `Io` if the socket is no longer valid
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts and fully handles one connection before returning
    ///
    /// # Errors
    /// Returns the accept error, or the read/persist error of that
    /// connection; its partial data is discarded
    pub fn accept_one(&self) -> Result<Received> {
        let (stream, peer) = self.listener.accept()?;
        handle_connection(stream, peer, &self.store, self.limits)
    }

    /// Runs the accept loop forever, one thread per connection
    ///
    /// Per-connection failures are logged and do not stop the loop.
    ///
    /// # Errors
    /// Never returns under normal operation
    pub fn serve(self) -> Result<()> {
        for incoming in self.listener.incoming() {
            let stream = match incoming {
                Ok(stream) => stream,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            };
            let peer = match stream.peer_addr() {
                Ok(peer) => peer,
                Err(e) => {
                    warn!(error = %e, "dropping connection without peer address");
                    continue;
                }
            };
            let store = Arc::clone(&self.store);
            let limits = self.limits;
            let spawned = std::thread::Builder::new()
                .name(format!("sink-{peer}"))
                .spawn(move || {
                    if let Err(e) = handle_connection(stream, peer, &store, limits) {
                        warn!(%peer, kind = e.kind(), error = %e, "connection discarded");
                    }
                });
            if let Err(e) = spawned {
                warn!(%peer, error = %e, "no thread for connection, dropping it");
            }
        }
        Ok(())
    }
}

fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    store: &SinkStore,
    limits: ReadLimits,
) -> Result<Received> {
    info!(%peer, "got connection");
    stream.set_read_timeout(Some(limits.timeout))?;

    let payload = read_payload(&mut stream, limits.max_payload)?;
    if !payload.is_empty() {
        store.persist(&payload)?;
    }
    debug!(%peer, bytes = payload.len(), "payload stored");

    Ok(Received {
        peer,
        bytes: payload.len(),
    })
}

/// Reads until end-of-stream, refusing payloads above `max_payload`
fn read_payload<R: Read>(reader: &mut R, max_payload: usize) -> Result<Zeroizing<Vec<u8>>> {
    let mut payload = Zeroizing::new(Vec::new());
    let cap = u64::try_from(max_payload).unwrap_or(u64::MAX).saturating_add(1);
    reader.take(cap).read_to_end(&mut payload)?;
    if payload.len() > max_payload {
        return Err(SplitShareError::invalid(format!(
            "payload exceeds {max_payload} bytes"
        )));
    }
    Ok(payload)
}
