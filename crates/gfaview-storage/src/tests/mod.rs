use super::*;
use tempfile::tempdir;

fn write_chain(storage: &Storage, len: i64) -> Result<(), StorageError> {
    let tx = storage.begin_ingest()?;
    for id in 1..=len {
        tx.insert_sequence(NodeId(id), &"A".repeat(id as usize))?;
        if id < len {
            tx.merge_children(NodeId(id), &[NodeId(id + 1)])?;
        }
    }
    tx.commit()
}

#[test]
fn test_merge_children_skips_duplicates() -> Result<(), StorageError> {
    let storage = Storage::new_in_memory()?;
    let tx = storage.begin_ingest()?;

    assert_eq!(tx.merge_children(NodeId(1), &[NodeId(2), NodeId(3)])?, 2);
    assert_eq!(tx.merge_children(NodeId(1), &[NodeId(3), NodeId(4)])?, 1);
    assert_eq!(tx.merge_children(NodeId(1), &[NodeId(2)])?, 0);
    tx.commit()?;

    assert_eq!(
        storage.children_of(NodeId(1))?,
        vec![NodeId(2), NodeId(3), NodeId(4)]
    );
    assert!(storage.children_of(NodeId(9))?.is_empty());
    Ok(())
}

#[test]
fn test_uncommitted_ingest_leaves_store_empty() -> Result<(), StorageError> {
    let storage = Storage::new_in_memory()?;
    {
        let tx = storage.begin_ingest()?;
        tx.insert_sequence(NodeId(1), "ACGT")?;
        tx.merge_children(NodeId(1), &[NodeId(2)])?;
    }

    let stats = storage.stats()?;
    assert_eq!(stats.node_count, 0);
    assert!(storage.children_of(NodeId(1))?.is_empty());
    Ok(())
}

#[test]
fn test_clear_removes_previous_run() -> Result<(), StorageError> {
    let storage = Storage::new_in_memory()?;
    write_chain(&storage, 4)?;
    assert_eq!(storage.stats()?.node_count, 4);

    let tx = storage.begin_ingest()?;
    tx.clear()?;
    tx.replace_genomes(&["g0".to_string()])?;
    tx.commit()?;

    let stats = storage.stats()?;
    assert_eq!(stats.node_count, 0);
    assert_eq!(stats.max_node_id, 0);
    assert_eq!(stats.genome_count, 1);
    Ok(())
}

#[test]
fn test_genome_side_table_keeps_header_order() -> Result<(), StorageError> {
    let storage = Storage::new_in_memory()?;
    let tx = storage.begin_ingest()?;
    tx.replace_genomes(&["TKK-01".to_string(), "TKK-02".to_string(), "REF".to_string()])?;
    tx.commit()?;

    assert_eq!(storage.genome_names()?, vec!["TKK-01", "TKK-02", "REF"]);
    Ok(())
}

#[test]
fn test_reader_serves_window_queries() -> Result<(), StorageError> {
    let dir = tempdir()?;
    let paths = StorePaths::for_source(dir.path(), "/data/chain.gfa")?;
    {
        let storage = Storage::open(&paths)?;
        write_chain(&storage, 6)?;
        let tx = storage.begin_ingest()?;
        tx.replace_genomes(&["a".to_string(), "b".to_string()])?;
        tx.insert_membership(NodeId(3), &[GenomeId(0), GenomeId(1)])?;
        tx.commit()?;
    }

    let reader = StoreReader::open(&paths)?;
    assert_eq!(reader.store_size()?, 6);
    assert_eq!(reader.node_count()?, 6);

    let lengths = reader.sequence_lengths_between(NodeId(2), NodeId(4))?;
    assert_eq!(lengths, vec![(NodeId(2), 2), (NodeId(3), 3), (NodeId(4), 4)]);

    let adjacency = reader.children_between(NodeId(5), NodeId(10))?;
    assert_eq!(adjacency, vec![(NodeId(5), vec![NodeId(6)])]);

    assert_eq!(reader.sequence(NodeId(3))?.as_deref(), Some("AAA"));
    assert_eq!(reader.sequence(NodeId(42))?, None);
    assert_eq!(reader.genomes_of(NodeId(3))?, vec![GenomeId(0), GenomeId(1)]);
    assert!(reader.genomes_of(NodeId(4))?.is_empty());
    assert_eq!(reader.genome_index("b")?, Some(GenomeId(1)));
    assert_eq!(reader.genome_index("zzz")?, None);
    Ok(())
}

#[test]
fn test_store_paths_follow_base_name() -> Result<(), StorageError> {
    let paths = StorePaths::for_source("/stores", "/home/user/graphs/TB10.gfa")?;
    assert_eq!(paths.base_name, "TB10.gfa");
    assert_eq!(paths.sequence_db, PathBuf::from("/stores/TB10.gfa.sequence.db"));
    assert_eq!(paths.adjacency_db, PathBuf::from("/stores/TB10.gfa.adjacency.db"));
    assert_eq!(paths.catalog, PathBuf::from("/stores/catalog.json"));
    Ok(())
}

#[test]
fn test_catalog_complete_flag_round_trip() -> Result<(), StorageError> {
    let dir = tempdir()?;
    let paths = StorePaths::for_source(dir.path(), "graph.gfa")?;

    mark_incomplete(&paths, Path::new("graph.gfa"))?;
    let catalog = StoreCatalog::load(&paths.catalog)?;
    assert!(!catalog.is_complete("graph.gfa"));

    mark_complete(
        &paths,
        CatalogEntry {
            source: PathBuf::from("graph.gfa"),
            node_count: 5,
            max_node_id: 5,
            edge_count: 4,
            ..Default::default()
        },
    )?;
    let catalog = StoreCatalog::load(&paths.catalog)?;
    let entry = catalog.entry("graph.gfa").expect("entry written");
    assert!(entry.complete);
    assert_eq!(entry.max_node_id, 5);
    assert!(entry.ingested_at.is_some());
    Ok(())
}

#[test]
fn test_concurrent_catalog_updates_keep_every_entry() -> Result<(), StorageError> {
    let dir = tempdir()?;
    let names: Vec<String> = (0..8).map(|i| format!("graph_{i}.gfa")).collect();

    std::thread::scope(|scope| {
        let workers: Vec<_> = names
            .iter()
            .map(|name| {
                let dir = dir.path();
                scope.spawn(move || -> Result<(), StorageError> {
                    let paths = StorePaths::for_source(dir, name)?;
                    for round in 0..10 {
                        mark_incomplete(&paths, Path::new(name))?;
                        mark_complete(
                            &paths,
                            CatalogEntry {
                                source: PathBuf::from(name),
                                max_node_id: round,
                                ..Default::default()
                            },
                        )?;
                    }
                    Ok(())
                })
            })
            .collect();
        for worker in workers {
            worker.join().expect("catalog writer panicked")?;
        }
        Ok::<(), StorageError>(())
    })?;

    let catalog = StoreCatalog::load(&dir.path().join("catalog.json"))?;
    for name in &names {
        let entry = catalog.entry(name).expect("entry written");
        assert!(entry.complete);
        assert_eq!(entry.max_node_id, 9);
    }
    let leftovers = std::fs::read_dir(dir.path())?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
        .count();
    assert_eq!(leftovers, 0);
    Ok(())
}

#[test]
fn test_open_existing_requires_complete_store() -> Result<(), StorageError> {
    let dir = tempdir()?;
    let paths = StorePaths::for_source(dir.path(), "graph.gfa")?;
    assert!(StoreHandle::open_existing(dir.path(), "graph.gfa")?.is_none());

    {
        let storage = Storage::open(&paths)?;
        write_chain(&storage, 3)?;
    }
    mark_incomplete(&paths, Path::new("graph.gfa"))?;
    assert!(StoreHandle::open_existing(dir.path(), "graph.gfa")?.is_none());

    mark_complete(
        &paths,
        CatalogEntry {
            max_node_id: 3,
            ..Default::default()
        },
    )?;
    let handle = StoreHandle::open_existing(dir.path(), "graph.gfa")?.expect("complete store");
    assert_eq!(handle.size(), 3);
    assert_eq!(handle.open_reader()?.store_size()?, 3);
    Ok(())
}

#[test]
fn test_rejects_newer_schema_version() -> Result<(), StorageError> {
    let dir = tempdir()?;
    let paths = StorePaths::for_source(dir.path(), "graph.gfa")?;
    {
        let conn = Connection::open(&paths.sequence_db)?;
        conn.pragma_update(None, "user_version", (SCHEMA_VERSION + 1).to_string())?;
    }

    assert!(matches!(
        Storage::open(&paths),
        Err(StorageError::Other(message)) if message.contains("Unsupported")
    ));
    Ok(())
}
