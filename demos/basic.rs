use json_store::{into_document, JsonStore};
use serde_json::json;

fn main() -> Result<(), json_store::Error> {
    let path = std::env::temp_dir().join("json_store_example_basic.json");
    let db = JsonStore::open_with_default(&path, into_document(json!({"list": []}))?, true)?;
    println!("start  = {db}");

    // scoped mutation, flushed when the guard drops
    {
        let scope = db.lock();
        scope.update("list", |list| {
            if let Some(items) = list.as_array_mut() {
                items.push(json!(42));
            }
        })?;
    }
    println!("scoped = {}", std::fs::read_to_string(&path)?);

    // plain set, then an explicit flush
    db.set("dict", json!({"answer": 42}))?;
    db.flush()?;
    println!("flush  = {}", std::fs::read_to_string(&path)?);

    // missing keys are errors, not nulls
    if let Err(e) = db.get("nope") {
        println!("get    = {e}");
    }

    println!("keys   = {:?}", db.keys());
    println!("len    = {}", db.len());

    db.overwrite(Default::default())?;
    println!("after overwrite: {}", std::fs::read_to_string(&path)?);

    let _ = std::fs::remove_file(&path);
    Ok(())
}
