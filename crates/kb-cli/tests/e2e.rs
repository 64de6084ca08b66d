//! End-to-end tests for kb-cli.
//!
//! Runs the sync engine against a real directory through `NativeFs`, with
//! the in-memory gateway standing in for Notion.

use std::sync::Arc;

use kb_cli::config::{CONFIG_PATH, Config};
use kb_cli::native_fs::NativeFs;
use kb_cli::output::{OutputFormat, render_list};
use kb_cli::list_entries;
use kb_sync::ledger::LEDGER_PATH;
use kb_sync::{
    Block, FileSystem, Ledger, ManualClock, MemoryGateway, Pacer, SyncEngine, SyncOptions,
};
use tempfile::TempDir;

const DB: &str = "db-e2e";

fn engine(
    temp: &TempDir,
    gateway: Arc<MemoryGateway>,
) -> SyncEngine<Arc<MemoryGateway>, NativeFs, ManualClock> {
    SyncEngine::new(
        gateway,
        NativeFs::new(temp.path().to_path_buf()),
        Pacer::unlimited(ManualClock::new()),
        SyncOptions {
            collection_id: DB.to_string(),
            dry_run: false,
        },
    )
}

#[tokio::test]
async fn test_pull_edit_push_on_disk() {
    let temp = TempDir::new().unwrap();
    let gateway = Arc::new(MemoryGateway::new());
    let id = gateway.insert_document(
        DB,
        "Reading List",
        "2026-10-01T08:00:00.000Z",
        vec![Block::heading(1, "Books"), Block::paragraph("Dune")],
    );
    let mut engine = engine(&temp, gateway.clone());
    let mut ledger = Ledger::load(engine.fs()).await.unwrap();

    let pulled = engine.pull(&mut ledger).await.unwrap();
    assert_eq!(pulled.written, vec!["reading-list.md"]);

    let path = temp.path().join("reading-list.md");
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("---\n"));
    assert!(content.ends_with("# Books\n\nDune\n"));
    assert!(temp.path().join(LEDGER_PATH).exists());

    std::fs::write(&path, content.replace("Dune", "Dune\n\n- Hyperion")).unwrap();

    let pushed = engine.push(&mut ledger).await.unwrap();
    assert_eq!(pushed.pushed, vec!["reading-list.md"]);
    assert_eq!(
        gateway.blocks(&id),
        vec![
            Block::heading(1, "Books"),
            Block::paragraph("Dune"),
            Block::BulletedItem {
                text: vec![kb_sync::Span::plain("Hyperion")],
            },
        ]
    );

    let stored = Ledger::load(engine.fs()).await.unwrap();
    assert_eq!(stored.get(&id), ledger.get(&id));
}

#[tokio::test]
async fn test_push_creates_and_list_reports_synced() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("idea.md"), "Write more tests.\n").unwrap();
    let gateway = Arc::new(MemoryGateway::new());
    let mut engine = engine(&temp, gateway.clone());
    let mut ledger = Ledger::new();

    let before = list_entries(engine.fs(), &ledger).await.unwrap();
    assert_eq!(before[0].state, "new");

    engine.push(&mut ledger).await.unwrap();
    assert_eq!(gateway.document_count(), 1);

    let after = list_entries(engine.fs(), &ledger).await.unwrap();
    assert_eq!(after[0].state, "synced");
    assert!(after[0].id.is_some());

    let json = render_list(&after, OutputFormat::Structured).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value[0]["slug"], "idea");
}

#[tokio::test]
async fn test_no_temp_files_left_in_store() {
    let temp = TempDir::new().unwrap();
    let gateway = Arc::new(MemoryGateway::new());
    for title in ["One", "Two", "Three"] {
        gateway.insert_document(DB, title, "m1", vec![Block::paragraph(title)]);
    }
    let mut engine = engine(&temp, gateway);
    let mut ledger = Ledger::new();

    engine.pull(&mut ledger).await.unwrap();

    let mut names: Vec<String> = engine
        .fs()
        .list("")
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    names.sort();
    assert_eq!(names, vec![".sync", "one.md", "three.md", "two.md"]);
}

#[test]
fn test_config_file_in_store() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join(CONFIG_PATH);
    std::fs::create_dir_all(config_path.parent().unwrap()).unwrap();
    std::fs::write(
        &config_path,
        r#"{"notion": {"database_id": "db-from-file", "type_property": "Kind"}}"#,
    )
    .unwrap();

    let config = Config::load(temp.path().to_str().unwrap(), None, Some("token".into())).unwrap();

    assert_eq!(config.notion.type_property, "Kind");
    assert_eq!(config.remote().unwrap().database_id, "db-from-file");
}
