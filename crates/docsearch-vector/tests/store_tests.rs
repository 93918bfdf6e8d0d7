use docsearch_core::traits::Embedder;
use docsearch_core::types::{Chunk, ChunkMeta};
use docsearch_embed::HashEmbedder;
use docsearch_vector::VectorStore;

fn chunk(url: &str, index: usize, content: &str) -> Chunk {
    Chunk {
        content: content.to_string(),
        meta: ChunkMeta {
            title: url.to_string(),
            url: url.to_string(),
            path: None,
            quality_score: 1.0,
            language: "en".to_string(),
            language_multiplier: 1.0,
            chunk_index: index,
            chunking_method: "recursive".to_string(),
        },
    }
}

fn embed(chunks: &[Chunk]) -> Vec<Vec<f32>> {
    let embedder = HashEmbedder::new();
    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    embedder.embed_batch(&texts).unwrap()
}

#[tokio::test]
async fn search_on_missing_table_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = VectorStore::open(dir.path(), "files_abc").await.unwrap();
    let hits = store.search(&vec![0.0; 1024], 5).await.unwrap();
    assert!(hits.is_empty());
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn replace_then_search_finds_nearest() {
    let dir = tempfile::tempdir().unwrap();
    let store = VectorStore::open(dir.path(), "archive").await.unwrap();
    let chunks = vec![
        chunk("file://a.md", 0, "apple trees grow in the orchard every autumn"),
        chunk("file://b.md", 0, "submarine sonar arrays listen in deep water"),
    ];
    store.replace(&chunks, &embed(&chunks)).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 2);

    let embedder = HashEmbedder::new();
    let query = embedder
        .embed_batch(&["apple orchard autumn".to_string()])
        .unwrap()
        .remove(0);
    let hits = store.search(&query, 2).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].url, "file://a.md");
    assert!(hits[0].score > hits[1].score);
}

#[tokio::test]
async fn sync_overwrites_by_chunk_id() {
    let dir = tempfile::tempdir().unwrap();
    let store = VectorStore::open(dir.path(), "files_x").await.unwrap();

    let original = vec![chunk("file://note.md", 0, "first draft about beekeeping")];
    store.sync(&original, &embed(&original)).await.unwrap();

    let revised = vec![chunk("file://note.md", 0, "revised notes about beekeeping hives")];
    store.sync(&revised, &embed(&revised)).await.unwrap();

    // Same id, so the row count stays at one and the content is updated.
    assert_eq!(store.count().await.unwrap(), 1);
    let embedder = HashEmbedder::new();
    let query = embedder.embed_batch(&["beekeeping".to_string()]).unwrap().remove(0);
    let hits = store.search(&query, 1).await.unwrap();
    assert!(hits[0].text.contains("revised"));
}

#[tokio::test]
async fn sync_deletes_rows_absent_from_new_set() {
    let dir = tempfile::tempdir().unwrap();
    let store = VectorStore::open(dir.path(), "files_z").await.unwrap();

    let first = vec![
        chunk("file://long.md", 0, "chapter one about beekeeping"),
        chunk("file://long.md", 1, "chapter two about beekeeping"),
        chunk("file://gone.md", 0, "a note that is later removed"),
    ];
    store.sync(&first, &embed(&first)).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 3);

    // One document shrank to a single chunk, the other file went away;
    // neither leftover may keep surfacing as a vector hit.
    let second = vec![chunk("file://long.md", 0, "chapter one, revised")];
    store.sync(&second, &embed(&second)).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 1);
    let hits = store.search(&embed(&second)[0], 5).await.unwrap();
    assert!(hits.iter().all(|h| h.url == "file://long.md"));

    // Syncing to an empty set clears the table entirely.
    store.sync(&[], &[]).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn replace_discards_previous_rows() {
    let dir = tempfile::tempdir().unwrap();
    let store = VectorStore::open(dir.path(), "archive").await.unwrap();

    let first = vec![chunk("file://old.md", 0, "stale content about typewriters")];
    store.replace(&first, &embed(&first)).await.unwrap();
    let second = vec![chunk("file://new.md", 0, "fresh content about printing presses")];
    store.replace(&second, &embed(&second)).await.unwrap();

    assert_eq!(store.count().await.unwrap(), 1);
    let embedder = HashEmbedder::new();
    let query = embedder.embed_batch(&["typewriters".to_string()]).unwrap().remove(0);
    let hits = store.search(&query, 5).await.unwrap();
    assert!(hits.iter().all(|h| h.url != "file://old.md"));
}

#[tokio::test]
async fn rejects_mismatched_embedding_width() {
    let dir = tempfile::tempdir().unwrap();
    let store = VectorStore::open(dir.path(), "files_y").await.unwrap();
    let chunks = vec![chunk("file://a.md", 0, "content")];
    let bad = vec![vec![0.5f32; 8]];
    assert!(store.sync(&chunks, &bad).await.is_err());
}
