use json_store::{FlushPolicy, JsonStore};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize)]
struct Release {
    name: String,
    version: String,
    stable: bool,
}

fn main() -> Result<(), json_store::Error> {
    let path = std::env::temp_dir().join("json_store_example_builder.json");

    // pretty-printed JSON, temp-file writes, async flush every 5 seconds
    let db = JsonStore::builder(&path)
        .pretty(true)
        .atomic_writes(true)
        .policy(FlushPolicy::Async(Duration::from_secs(5)))
        .build()?;

    db.set_serialized(
        "release",
        &Release {
            name: "json-store".into(),
            version: "0.1.0".into(),
            stable: false,
        },
    )?;
    db.flush()?;

    let contents = std::fs::read_to_string(db.path())?;
    println!("On-disk JSON:\n{contents}");

    let release: Release = db.get_as("release")?;
    println!("\nTyped read: {release:?}");
    println!("Debug output: {db:?}");

    drop(db);
    let _ = std::fs::remove_file(&path);
    Ok(())
}
