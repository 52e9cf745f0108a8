use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use serde::Serialize;
use tracing::info;

use crate::codec::{self, HeaderPolicy};
use crate::config::SinkConfig;
use crate::domain::{EndpointPair, MaskBound, SharePair, Value};
use crate::mask::MaskGenerator;
use crate::sink::ShareSink;
use crate::split::{BatchPipeline, ValueSplitter};
use crate::transport::{DeliveryReport, Granularity, ShareTransport};

/// Outcome of splitting a record file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitSummary {
    pub records: usize,
    pub arity: usize,
    pub out_a: PathBuf,
    pub out_b: PathBuf,
}

/// Outcome of sending one split value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendReport {
    pub endpoint_a: String,
    pub endpoint_b: String,
    pub bytes_a: usize,
    pub bytes_b: usize,
}

/// Split a record file into two aligned share files
///
/// Both outputs are written only after every record was split, and each is
/// staged next to its target and renamed into place. Either both targets
/// end up with the new shares or neither changes.
///
/// # Errors
/// Returns an error if the input cannot be read or parsed, the batch has
/// inconsistent arity, or an output cannot be written
pub fn split_file(
    input: &Path,
    out_a: &Path,
    out_b: &Path,
    header: HeaderPolicy,
    bound: MaskBound,
    masks: MaskGenerator,
) -> Result<SplitSummary> {
    if out_a == out_b {
        bail!("Both share sets would be written to {}", out_a.display());
    }
    for target in [out_a, out_b] {
        if target.is_dir() {
            bail!("Share output {} is a directory", target.display());
        }
    }

    let text = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let batch = codec::parse_batch_with(&text, header)
        .with_context(|| format!("Failed to parse {}", input.display()))?;

    let mut pipeline = BatchPipeline::new(masks);
    let (batch_a, batch_b) = pipeline
        .process(&batch, bound)
        .context("Failed to split batch")?;

    let staged_a = stage(out_a, &codec::render_batch(&batch_a))?;
    let staged_b = match stage(out_b, &codec::render_batch(&batch_b)) {
        Ok(staged) => staged,
        Err(e) => {
            let _ = fs::remove_file(&staged_a);
            return Err(e);
        }
    };
    commit_pair((&staged_a, out_a), (&staged_b, out_b))?;

    info!(
        records = batch.len(),
        out_a = %out_a.display(),
        out_b = %out_b.display(),
        "wrote share files"
    );

    Ok(SplitSummary {
        records: batch.len(),
        arity: batch.checked_arity()?,
        out_a: out_a.to_path_buf(),
        out_b: out_b.to_path_buf(),
    })
}

fn staging_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    target.with_file_name(name)
}

fn stage(target: &Path, contents: &str) -> Result<PathBuf> {
    let staged = staging_path(target);
    fs::write(&staged, contents)
        .with_context(|| format!("Failed to write {}", staged.display()))?;
    Ok(staged)
}

fn commit(staged: &Path, target: &Path) -> Result<()> {
    fs::rename(staged, target)
        .with_context(|| format!("Failed to move share file into {}", target.display()))
}

fn backup_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".previous");
    target.with_file_name(name)
}

/// Renames both staged files into place, restoring `out_a` if `out_b`
/// cannot be committed
fn commit_pair(
    (staged_a, out_a): (&Path, &Path),
    (staged_b, out_b): (&Path, &Path),
) -> Result<()> {
    let backup = backup_path(out_a);
    let had_previous = out_a.exists();
    let discard_staged = || {
        let _ = fs::remove_file(staged_a);
        let _ = fs::remove_file(staged_b);
    };

    if had_previous {
        if let Err(e) = commit(out_a, &backup) {
            discard_staged();
            return Err(e);
        }
    }
    let restore_a = || {
        if had_previous {
            let _ = fs::rename(&backup, out_a);
        } else {
            let _ = fs::remove_file(out_a);
        }
    };

    if let Err(e) = commit(staged_a, out_a).and_then(|()| commit(staged_b, out_b)) {
        restore_a();
        discard_staged();
        return Err(e);
    }
    if had_previous {
        let _ = fs::remove_file(&backup);
    }
    Ok(())
}

/// Split a single value into a share pair
///
/// # Errors
/// Returns an error if the subtraction overflows
pub fn split_value(value: Value, bound: MaskBound, masks: MaskGenerator) -> Result<SharePair> {
    ValueSplitter::new(masks)
        .split(value, bound)
        .context("Failed to split value")
}

/// Split a value and send share A and share B to their own endpoints
///
/// # Errors
/// Returns an error naming the endpoint(s) whose delivery failed
pub fn send_value(
    value: Value,
    bound: MaskBound,
    endpoints: &EndpointPair,
    transport: &ShareTransport,
    masks: MaskGenerator,
) -> Result<SendReport> {
    let pair = split_value(value, bound, masks)?;
    let payload_a = codec::encode_value(&pair.share_a);
    let payload_b = codec::encode_value(&pair.share_b);

    match transport.send_pair(endpoints, &payload_a, &payload_b) {
        (Ok(ack_a), Ok(ack_b)) => Ok(SendReport {
            endpoint_a: ack_a.endpoint.to_string(),
            endpoint_b: ack_b.endpoint.to_string(),
            bytes_a: ack_a.bytes_written,
            bytes_b: ack_b.bytes_written,
        }),
        (Err(e), Ok(_)) => Err(anyhow!(e).context("Share A was not delivered")),
        (Ok(_), Err(e)) => Err(anyhow!(e).context("Share B was not delivered")),
        (Err(a), Err(b)) => Err(anyhow!(a).context(format!("Neither share was delivered; share B: {b}"))),
    }
}

/// Deliver two share files to their recipients
///
/// # Errors
/// Returns an error if a file cannot be read or parsed, the files are not
/// aligned, or delivery fails
pub fn deliver_files(
    file_a: &Path,
    file_b: &Path,
    endpoints: &EndpointPair,
    transport: &ShareTransport,
    granularity: Granularity,
) -> Result<DeliveryReport> {
    let read = |path: &Path| -> Result<_> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        codec::parse_batch(&text).with_context(|| format!("Failed to parse {}", path.display()))
    };
    let batch_a = read(file_a)?;
    let batch_b = read(file_b)?;

    transport
        .deliver(endpoints, &batch_a, &batch_b, granularity)
        .context("Failed to deliver share files")
}

/// Run the share sink until the process is stopped
///
/// # Errors
/// Returns an error if the listening socket cannot be bound
pub fn serve(config: &SinkConfig) -> Result<()> {
    let sink = ShareSink::bind(config)
        .with_context(|| format!("Failed to listen on {}", config.listen_addr()))?;
    sink.serve().context("Share sink stopped")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{COORDINATE_HEADER, Endpoint};
    use tempfile::TempDir;

    fn write_input(dir: &TempDir, text: &str) -> PathBuf {
        let path = dir.path().join("route.csv");
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_split_file_writes_aligned_outputs() {
        let dir = TempDir::new().unwrap();
        let header = COORDINATE_HEADER.join(",");
        let input = write_input(
            &dir,
            &format!("{header}\n2.17,41.38,2.18,41.39\n10.0,20.0,30.0,40.0\n"),
        );
        let out_a = dir.path().join("data1.csv");
        let out_b = dir.path().join("data2.csv");

        let summary = split_file(
            &input,
            &out_a,
            &out_b,
            HeaderPolicy::Detect,
            MaskBound::SMALL,
            MaskGenerator::seeded(4),
        )
        .unwrap();
        assert_eq!(summary.records, 2);
        assert_eq!(summary.arity, 4);

        let batch_a = codec::parse_batch(&fs::read_to_string(&out_a).unwrap()).unwrap();
        let batch_b = codec::parse_batch(&fs::read_to_string(&out_b).unwrap()).unwrap();
        let original = codec::parse_batch(&fs::read_to_string(&input).unwrap()).unwrap();
        assert_eq!(batch_a.header(), original.header());
        assert_eq!(batch_b.header(), original.header());

        for ((a, b), orig) in batch_a
            .records()
            .iter()
            .zip(batch_b.records())
            .zip(original.records())
        {
            for ((x, y), v) in a.iter().zip(b).zip(orig) {
                assert_eq!(x.checked_add(*y).unwrap(), *v);
            }
        }
    }

    #[test]
    fn test_split_file_schema_mismatch_leaves_no_outputs() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "1,2,3,4\n5,6\n");
        let out_a = dir.path().join("data1.csv");
        let out_b = dir.path().join("data2.csv");

        let err = split_file(
            &input,
            &out_a,
            &out_b,
            HeaderPolicy::Detect,
            MaskBound::SMALL,
            MaskGenerator::seeded(1),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("Schema mismatch"));
        assert!(!out_a.exists());
        assert!(!out_b.exists());
        assert!(!staging_path(&out_a).exists());
    }

    #[test]
    fn test_split_file_rejects_same_output() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "1,2\n");
        let out = dir.path().join("data.csv");
        let result = split_file(
            &input,
            &out,
            &out,
            HeaderPolicy::Detect,
            MaskBound::SMALL,
            MaskGenerator::seeded(1),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_split_file_missing_input() {
        let dir = TempDir::new().unwrap();
        let result = split_file(
            &dir.path().join("nope.csv"),
            &dir.path().join("a.csv"),
            &dir.path().join("b.csv"),
            HeaderPolicy::Detect,
            MaskBound::SMALL,
            MaskGenerator::seeded(1),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_split_file_malformed_first_row_is_not_a_header() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "10.0,2O.0,30.0,40.0\n1,2,3,4\n");
        let out_a = dir.path().join("data1.csv");
        let out_b = dir.path().join("data2.csv");

        let err = split_file(
            &input,
            &out_a,
            &out_b,
            HeaderPolicy::Detect,
            MaskBound::SMALL,
            MaskGenerator::seeded(1),
        )
        .unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("line 1"), "{msg}");
        assert!(!out_a.exists());
        assert!(!out_b.exists());
    }

    #[test]
    fn test_split_file_without_header_splits_every_row() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "10.0,20.0,30.0,40.0\n1,2,3,4\n");
        let out_a = dir.path().join("data1.csv");
        let out_b = dir.path().join("data2.csv");

        let summary = split_file(
            &input,
            &out_a,
            &out_b,
            HeaderPolicy::Absent,
            MaskBound::SMALL,
            MaskGenerator::seeded(8),
        )
        .unwrap();
        assert_eq!(summary.records, 2);
        let text_a = fs::read_to_string(&out_a).unwrap();
        assert_eq!(text_a.lines().count(), 2);
        assert!(codec::parse_batch(&text_a).unwrap().header().is_none());
    }

    #[test]
    fn test_split_file_directory_target_leaves_outputs_untouched() {
        let dir = TempDir::new().unwrap();
        let input = write_input(&dir, "1,2\n3,4\n");
        let out_a = dir.path().join("data1.csv");
        let out_b = dir.path().join("data2.csv");
        fs::write(&out_a, "previous\n").unwrap();
        fs::create_dir(&out_b).unwrap();

        let result = split_file(
            &input,
            &out_a,
            &out_b,
            HeaderPolicy::Detect,
            MaskBound::SMALL,
            MaskGenerator::seeded(2),
        );
        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&out_a).unwrap(), "previous\n");
        assert!(!staging_path(&out_a).exists());
        assert!(!staging_path(&out_b).exists());
    }

    #[test]
    fn test_commit_pair_restores_first_output_on_failure() {
        let dir = TempDir::new().unwrap();
        let out_a = dir.path().join("data1.csv");
        let out_b = dir.path().join("data2.csv");
        fs::write(&out_a, "previous\n").unwrap();
        // Renaming a file over a non-empty directory fails
        fs::create_dir(&out_b).unwrap();
        fs::write(out_b.join("keep"), "x").unwrap();

        let staged_a = stage(&out_a, "1\n").unwrap();
        let staged_b = stage(&out_b, "2\n").unwrap();
        assert!(commit_pair((&staged_a, &out_a), (&staged_b, &out_b)).is_err());

        assert_eq!(fs::read_to_string(&out_a).unwrap(), "previous\n");
        assert!(!staged_a.exists());
        assert!(!staged_b.exists());
        assert!(!backup_path(&out_a).exists());
    }

    #[test]
    fn test_split_value() {
        let value = Value::from_i64(42);
        let pair = split_value(value, MaskBound::new(11).unwrap(), MaskGenerator::seeded(6)).unwrap();
        assert!((0..11).contains(&pair.share_b.mantissa()));
        assert_eq!(pair.share_a.checked_add(pair.share_b).unwrap(), value);
    }

    #[test]
    fn test_send_value_reports_refused_side() {
        // Bind then drop to obtain ports with no listener
        let port_a = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let port_b = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let endpoints = EndpointPair::new(
            Endpoint::new("127.0.0.1", port_a).unwrap(),
            Endpoint::new("127.0.0.1", port_b).unwrap(),
        )
        .unwrap();

        let err = send_value(
            Value::from_i64(2),
            MaskBound::new(11).unwrap(),
            &endpoints,
            &ShareTransport::default(),
            MaskGenerator::seeded(1),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("Connection refused"));
    }
}
