use json_store::{into_document, JsonStore};
use serde_json::json;

fn main() -> Result<(), json_store::Error> {
    let path = std::env::temp_dir().join("json_store_example_scoped.json");
    let db = JsonStore::open_with_default(&path, into_document(json!({"hits": 0}))?, true)?;

    // every worker does an atomic read-modify-write; scopes serialize them
    std::thread::scope(|s| {
        for worker in 0..4 {
            let db = &db;
            s.spawn(move || {
                for _ in 0..100 {
                    let res = db.scoped(|g| {
                        let hits = g.get("hits")?.as_u64().unwrap_or(0);
                        g.set("hits", hits + 1);
                        g.set(format!("worker{worker}"), true);
                        Ok(())
                    });
                    if let Err(e) = res {
                        eprintln!("worker {worker}: {e}");
                    }
                }
            });
        }
    });

    println!("hits in memory = {}", db.get("hits")?);
    println!("on disk        = {}", std::fs::read_to_string(&path)?);

    let _ = std::fs::remove_file(&path);
    Ok(())
}
