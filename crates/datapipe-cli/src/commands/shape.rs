//! Shape command
//!
//! Usage: datapipe shape [--key <NAME>]... <PATH|->

use clap::Args;
use datapipe_core::errors::ExError;
use datapipe_core::model::Record;
use datapipe_core::shaper::{DefaultShaper, Shaper};
use std::io::Read;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ShapeArgs {
    /// JSON file holding one object, or `-` for stdin
    pub path: PathBuf,

    /// Key field name; repeat for compound keys
    #[arg(long = "key")]
    pub keys: Vec<String>,
}

pub fn execute(args: ShapeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let text = if args.path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(&args.path)?
    };

    let record: Record = serde_json::from_str(&text)
        .map_err(|e| format!("{} is not a JSON object: {}", args.path.display(), e))?;

    let shape = DefaultShaper
        .get_shape(&args.keys, &record)
        .map_err(|e| ExError::from(e).with_op("shape"))?;

    println!("{}", serde_json::to_string_pretty(&shape)?);
    Ok(())
}
