//! Shapes command
//!
//! Usage: datapipe shapes [--db <PATH>] [--subscriber <ID>] [--json]

use clap::Args;
use datapipe_store::repo::list_shapes;
use std::path::PathBuf;

use crate::config::Config;

#[derive(Debug, Args)]
pub struct ShapesArgs {
    #[arg(long)]
    pub db: Option<PathBuf>,

    #[arg(long = "subscriber")]
    pub subscriber_id: Option<String>,

    /// One JSON object per line instead of a table
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: ShapesArgs, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let db_path = config.db_path(args.db);
    if !db_path.exists() {
        return Err(format!("no shape database at {}", db_path.display()).into());
    }

    let conn = datapipe_store::db::open_and_migrate(&db_path)?;
    let subscriber_id = config.subscriber_id(args.subscriber_id);
    let shapes = list_shapes(&conn, &subscriber_id)?;

    if args.json {
        for stored in &shapes {
            let line = serde_json::json!({
                "entity": stored.entity,
                "shape": stored.shape,
                "updatedAt": stored.updated_at.to_rfc3339(),
            });
            println!("{}", line);
        }
        return Ok(());
    }

    if shapes.is_empty() {
        println!("No shapes stored for subscriber {}", subscriber_id);
        return Ok(());
    }

    for stored in &shapes {
        println!(
            "{}\t{:08x}\tkeys=[{}]\t{}",
            stored.entity,
            stored.shape.property_hash,
            stored.shape.key_names.join(","),
            stored.shape.properties.join(",")
        );
    }
    Ok(())
}
