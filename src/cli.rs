use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::codec::HeaderPolicy;
use crate::domain::{Endpoint, MaskBound, Value};
use crate::transport::Granularity;

/// Validates that the mask bound is positive
/// A bound of 0 leaves no range to draw a mask from
fn validate_bound(s: &str) -> Result<MaskBound, String> {
    let value: i64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    MaskBound::new(value).map_err(|e| e.to_string())
}

#[derive(Parser)]
#[command(name = "splitshare")]
#[command(about = "Split numeric data into additive shares and deliver each share to a different server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Split a record file into two share files
    Split {
        /// Input record file (comma separated; a header line is detected
        /// unless --header or --no-header is given)
        #[arg(short, long)]
        file: PathBuf,

        /// Masks are drawn from [0, bound)
        #[arg(short, long, default_value = "400000", value_parser = validate_bound)]
        bound: MaskBound,

        /// Output file for the first share set
        #[arg(long, default_value = "data1.csv")]
        out_a: PathBuf,

        /// Output file for the second share set
        #[arg(long, default_value = "data2.csv")]
        out_b: PathBuf,

        /// The first line of the input is a header
        #[arg(long, conflicts_with = "no_header")]
        header: bool,

        /// Every line of the input is a record
        #[arg(long)]
        no_header: bool,

        /// Fixed RNG seed, for reproducible test data only
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Split one value and send each share to its own server
    Send {
        /// Value to split; read from stdin when omitted
        #[arg(short, long, allow_hyphen_values = true)]
        value: Option<Value>,

        /// Recipient of the first share
        #[arg(short = 'a', long, default_value = "172.17.0.4:12345")]
        endpoint_a: Endpoint,

        /// Recipient of the second share
        #[arg(short = 'b', long, default_value = "172.17.0.5:12345")]
        endpoint_b: Endpoint,

        /// Masks are drawn from [0, bound)
        #[arg(long, default_value = "11", value_parser = validate_bound)]
        bound: MaskBound,
    },
    /// Send two previously split share files to their servers
    Deliver {
        /// Share file for the first recipient
        #[arg(long)]
        file_a: PathBuf,

        /// Share file for the second recipient
        #[arg(long)]
        file_b: PathBuf,

        /// Recipient of the first share file
        #[arg(short = 'a', long)]
        endpoint_a: Endpoint,

        /// Recipient of the second share file
        #[arg(short = 'b', long)]
        endpoint_b: Endpoint,

        /// Payload per connection: value, record or batch
        #[arg(short, long, default_value = "value")]
        granularity: Granularity,
    },
    /// Receive shares and store them in a file
    Serve {
        /// Port to listen on (default 12345)
        #[arg(short, long)]
        port: Option<u16>,

        /// File receiving the shares (default demo.txt)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Append received data instead of overwriting the file
        #[arg(short, long)]
        append: bool,

        /// Address to bind (default 0.0.0.0)
        #[arg(long)]
        bind: Option<String>,
    },
}

/// Maps the `--header` / `--no-header` flags of `split` to a policy
#[must_use]
pub fn header_policy(header: bool, no_header: bool) -> HeaderPolicy {
    match (header, no_header) {
        (true, _) => HeaderPolicy::Present,
        (false, true) => HeaderPolicy::Absent,
        (false, false) => HeaderPolicy::Detect,
    }
}
