//! Point-to-point delivery of shares
//!
//! Every payload travels over its own TCP connection: connect, write,
//! half-close, then wait for the recipient to close its side. The peer's
//! close is the only acknowledgment. Failures are reported to the caller
//! and never retried here.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};

use serde::Serialize;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::codec;
use crate::config::TransportConfig;
use crate::domain::{Batch, Endpoint, EndpointPair};
use crate::error::{Result, SplitShareError};

/// Confirmation that one payload reached its endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub endpoint: Endpoint,
    pub bytes_written: usize,
}

/// How many share values travel over one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    /// One connection per share value
    #[default]
    Value,
    /// One connection per record
    Record,
    /// One connection for the whole batch
    Batch,
}

impl std::str::FromStr for Granularity {
    type Err = SplitShareError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "value" => Ok(Self::Value),
            "record" => Ok(Self::Record),
            "batch" => Ok(Self::Batch),
            other => Err(SplitShareError::invalid(format!(
                "unknown granularity '{other}' (expected value, record or batch)"
            ))),
        }
    }
}

/// Totals of a completed two-sided delivery
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub endpoint_a: String,
    pub endpoint_b: String,
    pub connections_a: usize,
    pub connections_b: usize,
    pub bytes_a: usize,
    pub bytes_b: usize,
}

/// Thin client that sends share payloads
#[derive(Debug, Clone, Default)]
pub struct ShareTransport {
    config: TransportConfig,
}

impl ShareTransport {
    #[must_use]
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    /// Sends one payload over a fresh connection
    ///
    /// # Errors
    /// Returns `ConnectionRefused`, `Timeout` or `PartialWrite` for the
    /// corresponding transport failures, `InvalidArgument` if the endpoint
    /// does not resolve, and `Io` for anything else
    pub fn send(&self, endpoint: &Endpoint, payload: &[u8]) -> Result<Ack> {
        let mut stream = self.connect(endpoint)?;
        debug!(%endpoint, bytes = payload.len(), "connected");

        stream
            .set_write_timeout(Some(self.config.write_timeout))
            .and_then(|()| stream.set_read_timeout(Some(self.config.write_timeout)))
            .map_err(|e| classify(endpoint, e, 0, payload.len()))?;

        let bytes_written = write_payload(&mut stream, payload)
            .map_err(|(written, e)| classify(endpoint, e, written, payload.len()))?;

        // End of payload is signalled by closing our half of the stream
        stream
            .shutdown(Shutdown::Write)
            .map_err(|e| classify(endpoint, e, bytes_written, payload.len()))?;
        wait_for_close(&mut stream)
            .map_err(|e| classify(endpoint, e, bytes_written, bytes_written))?;

        debug!(%endpoint, bytes_written, "payload acknowledged");
        Ok(Ack {
            endpoint: endpoint.clone(),
            bytes_written,
        })
    }

    /// Sends `payload_a` to endpoint A and `payload_b` to endpoint B
    /// concurrently, returning both outcomes
    pub fn send_pair(
        &self,
        endpoints: &EndpointPair,
        payload_a: &[u8],
        payload_b: &[u8],
    ) -> (Result<Ack>, Result<Ack>) {
        std::thread::scope(|scope| {
            let handle_a = scope.spawn(|| self.send(endpoints.a(), payload_a));
            let result_b = self.send(endpoints.b(), payload_b);
            let result_a = handle_a
                .join()
                .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
            (result_a, result_b)
        })
    }

    /// Delivers two share batches to their recipients
    ///
    /// Payload `i` of batch A and payload `i` of batch B are sent as a pair;
    /// delivery stops at the first failure, whose error names the endpoint.
    ///
    /// # Errors
    /// Returns `SchemaMismatch` if the batches are not aligned, otherwise
    /// the first transport error
    pub fn deliver(
        &self,
        endpoints: &EndpointPair,
        batch_a: &Batch,
        batch_b: &Batch,
        granularity: Granularity,
    ) -> Result<DeliveryReport> {
        check_aligned(batch_a, batch_b)?;

        let payloads_a = payloads(batch_a, granularity);
        let payloads_b = payloads(batch_b, granularity);

        let mut report = DeliveryReport {
            endpoint_a: endpoints.a().to_string(),
            endpoint_b: endpoints.b().to_string(),
            ..DeliveryReport::default()
        };
        for (payload_a, payload_b) in payloads_a.iter().zip(&payloads_b) {
            let (ack_a, ack_b) = self.send_pair(endpoints, payload_a, payload_b);
            let (ack_a, ack_b) = (ack_a?, ack_b?);
            report.connections_a += 1;
            report.connections_b += 1;
            report.bytes_a += ack_a.bytes_written;
            report.bytes_b += ack_b.bytes_written;
        }

        info!(
            endpoint_a = %endpoints.a(),
            endpoint_b = %endpoints.b(),
            connections = report.connections_a,
            ?granularity,
            "delivered share batches"
        );
        Ok(report)
    }

    fn connect(&self, endpoint: &Endpoint) -> Result<TcpStream> {
        let mut last_error = None;
        for addr in endpoint.resolve()? {
            match TcpStream::connect_timeout(&addr, self.config.connect_timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    debug!(%endpoint, %addr, error = %e, "connect attempt failed");
                    last_error = Some(e);
                }
            }
        }
        let error = last_error.unwrap_or_else(|| io::ErrorKind::AddrNotAvailable.into());
        Err(classify(endpoint, error, 0, 0))
    }
}

fn check_aligned(batch_a: &Batch, batch_b: &Batch) -> Result<()> {
    if batch_a.len() != batch_b.len() {
        return Err(SplitShareError::invalid(format!(
            "Share batches differ in length ({} vs {})",
            batch_a.len(),
            batch_b.len()
        )));
    }
    for (index, (a, b)) in batch_a.records().iter().zip(batch_b.records()).enumerate() {
        if a.arity() != b.arity() {
            return Err(SplitShareError::SchemaMismatch {
                index,
                expected: a.arity(),
                got: b.arity(),
            });
        }
    }
    Ok(())
}

fn payloads(batch: &Batch, granularity: Granularity) -> Vec<Zeroizing<Vec<u8>>> {
    match granularity {
        Granularity::Value => batch
            .records()
            .iter()
            .flat_map(|record| record.iter().map(codec::encode_value))
            .collect(),
        Granularity::Record => batch.records().iter().map(codec::encode_record).collect(),
        Granularity::Batch if batch.is_empty() => Vec::new(),
        Granularity::Batch => vec![codec::encode_batch(batch)],
    }
}

/// Writes the payload, reporting how much went out before any failure
fn write_payload<W: Write>(
    writer: &mut W,
    payload: &[u8],
) -> std::result::Result<usize, (usize, io::Error)> {
    let mut written = 0;
    while written < payload.len() {
        match writer.write(&payload[written..]) {
            Ok(0) => return Err((written, io::ErrorKind::WriteZero.into())),
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err((written, e)),
        }
    }
    writer.flush().map_err(|e| (written, e))?;
    Ok(written)
}

fn wait_for_close(stream: &mut TcpStream) -> io::Result<()> {
    let mut scratch = [0u8; 64];
    loop {
        match stream.read(&mut scratch) {
            Ok(0) => return Ok(()),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
}

fn classify(endpoint: &Endpoint, error: io::Error, written: usize, expected: usize) -> SplitShareError {
    let endpoint = endpoint.to_string();
    match error.kind() {
        io::ErrorKind::ConnectionRefused => SplitShareError::ConnectionRefused { endpoint },
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => SplitShareError::Timeout { endpoint },
        io::ErrorKind::WriteZero => SplitShareError::PartialWrite {
            endpoint,
            written,
            expected,
        },
        _ if written < expected => SplitShareError::PartialWrite {
            endpoint,
            written,
            expected,
        },
        _ => SplitShareError::Io(error),
    }
}
