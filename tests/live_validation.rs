use std::{env, sync::Once};

use docloader::{
    config, embedding,
    qdrant::{DEFAULT_GROUP_SIZE, QdrantGateway, SearchFilterArgs, StorageGateway},
};

static INIT: Once = Once::new();

fn set_default_env(key: &str, value: &str) {
    let needs_value = env::var(key).map(|v| v.trim().is_empty()).unwrap_or(true);
    if needs_value {
        // SAFETY: Tests run serially via Once and we intentionally mutate process env.
        unsafe {
            env::set_var(key, value);
        }
    }
}

fn init_config_once() -> &'static config::Config {
    INIT.call_once(|| {
        set_default_env("QDRANT_URL", "http://127.0.0.1:6333");
        set_default_env("QDRANT_COLLECTION_NAME", "docloader-live");
        set_default_env("EMBEDDING_PROVIDER", "ollama");
        set_default_env("EMBEDDING_MODEL", "nomic-embed-text");
        set_default_env("EMBEDDING_DIMENSION", "768");
        set_default_env("OLLAMA_URL", "http://127.0.0.1:11434");
        config::init_config().expect("live configuration");
    });
    config::get_config()
}

#[tokio::test]
#[ignore = "Requires live Qdrant"]
async fn live_qdrant_schema_and_search() {
    let config = init_config_once();
    let gateway = QdrantGateway::from_config(config).expect("gateway");
    gateway.ensure_schema().await.expect("schema bootstrap");

    let groups = gateway
        .search(
            vec![0.0; config.embedding_dimension],
            DEFAULT_GROUP_SIZE,
            1,
            &SearchFilterArgs::default(),
        )
        .await
        .expect("grouped search");
    for group in groups {
        assert!(
            group.hits.len() <= DEFAULT_GROUP_SIZE,
            "group cap exceeded: {group:?}"
        );
    }
}

#[tokio::test]
#[ignore = "Requires live Ollama embeddings"]
async fn live_ollama_embedding_roundtrip() {
    let config = init_config_once();
    let client = embedding::get_embedding_client(config).expect("embedding client");
    let vectors = client
        .generate_embeddings(vec![
            "Content from Live Check. Page number: 1. docloader live embedding".to_string(),
        ])
        .await
        .expect("failed to request embeddings from provider");
    assert_eq!(vectors.len(), 1, "expected embedding per input chunk");
    assert_eq!(
        vectors[0].len(),
        config.embedding_dimension,
        "embedding dimension mismatch"
    );
}
