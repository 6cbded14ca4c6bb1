use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter;
use tracing_subscriber::prelude::*;

use relstore::common::{CompareOp, StorageOptions, BUFFER_CAPACITY, DISK_BLOCKS};
use relstore::tuple::{AttrType, Value};
use relstore::{Database, Result};

/// relstore: builds a small Students relation and queries it.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Database file, created and formatted if missing
    #[clap(long, default_value = "relstore.db")]
    disk: PathBuf,

    /// Number of blocks in the database file
    #[clap(long, default_value_t = DISK_BLOCKS)]
    blocks: usize,

    /// Number of buffer pool frames
    #[clap(long, default_value_t = BUFFER_CAPACITY)]
    buffers: usize,

    /// Number of Students records to insert
    #[clap(long, default_value_t = 200)]
    records: usize,
}

fn print_relation(db: &mut Database, rel_name: &str) -> Result<()> {
    let rel = db.open_rel(rel_name)?;
    let attrs = db.attributes(rel)?;
    let header = attrs
        .iter()
        .map(|a| a.attr_name.as_str())
        .collect::<Vec<_>>()
        .join(" | ");
    println!("{rel_name}: {header}");

    db.reset_search_index(rel)?;
    while let Some(record) = db.project_next(rel)? {
        let row = attrs
            .iter()
            .map(|a| Value::decode(&record[a.offset], a.attr_type).to_string())
            .collect::<Vec<_>>()
            .join(" | ");
        println!("  {row}");
    }
    db.close_rel(rel_name)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let fmt_layer = tracing_subscriber::fmt::layer().compact();
    let filter_layer =
        filter::EnvFilter::from_default_env().add_directive(LevelFilter::INFO.into());
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    let options = StorageOptions {
        disk_blocks: args.blocks,
        buffer_capacity: args.buffers,
        ..StorageOptions::default()
    };
    let mut db = Database::open(&args.disk, options)?;

    for name in ["Students", "Passed", "Names"] {
        if db.delete_rel(name).is_ok() {
            info!(rel = name, "removed relation left by an earlier run");
        }
    }

    db.create_rel("Students", &[("Name", AttrType::String), ("Marks", AttrType::Number)])?;
    let rel = db.open_rel("Students")?;
    for i in 0..args.records {
        let name = format!("S{i}");
        let marks = (i * 37 % 101).to_string();
        db.insert("Students", &[name.as_str(), marks.as_str()])?;
    }
    db.create_index("Students", "Marks")?;

    let target = Value::Number(55.0).to_attribute()?;
    db.reset_search_index(rel)?;
    db.reset_attr_search_index(rel, "Marks")?;
    let mut hits = 0;
    while db.search_next(rel, "Marks", &target, CompareOp::Eq)?.is_some() {
        hits += 1;
    }
    println!("Students with Marks = 55: {hits}");

    db.select("Students", "Passed", "Marks", CompareOp::Ge, "90")?;
    db.project("Students", "Names", &["Name"])?;
    db.close_rel("Students")?;

    print_relation(&mut db, "Passed")?;
    let names = db.open_rel("Names")?;
    println!("Names: {} records", db.relation(names)?.num_recs);
    db.close_rel("Names")?;

    db.close()
}
