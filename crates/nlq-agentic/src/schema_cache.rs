//! Schema introspection boundary and TTL cache
//!
//! The generator grounds its prompts in a schema description. Live
//! introspection runs behind a trait collaborator; results are cached with
//! a time-to-live and refreshed by swapping in a fresh snapshot
//! (replace-not-mutate) so concurrent readers never observe a half-updated
//! cache. When introspection fails - or no introspector is configured -
//! the hardcoded fallback schema from `nlq-core` is substituted so
//! generation can still proceed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Default cache time-to-live: one hour.
const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// One column from live introspection.
#[derive(Debug, Clone)]
pub struct ColumnDescription {
    pub name: String,
    pub sql_type: String,
    pub nullable: bool,
}

/// One table from live introspection.
#[derive(Debug, Clone)]
pub struct TableDescription {
    pub name: String,
    pub columns: Vec<ColumnDescription>,
    pub primary_keys: Vec<String>,
    pub foreign_keys: Vec<String>,
    pub indexes: Vec<String>,
}

/// Trait for schema introspection collaborators.
///
/// Implementations query a live database for the allow-listed tables;
/// tests use fixed-output mocks.
#[async_trait]
pub trait SchemaIntrospector: Send + Sync {
    async fn introspect(&self) -> Result<Vec<TableDescription>>;
}

struct CachedSchema {
    description: String,
    fetched_at: Instant,
}

/// TTL cache over the schema description used in prompts.
pub struct SchemaCache {
    introspector: Option<Arc<dyn SchemaIntrospector>>,
    ttl: Duration,
    current: RwLock<Option<Arc<CachedSchema>>>,
}

impl SchemaCache {
    /// Cache backed by a live introspector.
    pub fn new(introspector: Arc<dyn SchemaIntrospector>) -> Self {
        Self {
            introspector: Some(introspector),
            ttl: DEFAULT_TTL,
            current: RwLock::new(None),
        }
    }

    /// Cache that always serves the fallback schema.
    pub fn fallback_only() -> Self {
        Self {
            introspector: None,
            ttl: DEFAULT_TTL,
            current: RwLock::new(None),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Current schema description, refreshing if the cache is stale.
    pub async fn describe(&self) -> String {
        {
            let guard = self.current.read().await;
            if let Some(cached) = guard.as_ref() {
                if cached.fetched_at.elapsed() < self.ttl {
                    return cached.description.clone();
                }
            }
        }
        self.refresh().await
    }

    /// Force a refresh, swapping in a fresh snapshot.
    pub async fn refresh(&self) -> String {
        let description = self.build_description().await;
        let fresh = Arc::new(CachedSchema {
            description: description.clone(),
            fetched_at: Instant::now(),
        });
        let mut guard = self.current.write().await;
        *guard = Some(fresh);
        description
    }

    async fn build_description(&self) -> String {
        let introspector = match &self.introspector {
            Some(i) => i,
            None => return nlq_core::schema::fallback_schema_description(),
        };
        match introspector.introspect().await {
            Ok(tables) if !tables.is_empty() => render(&tables),
            Ok(_) => {
                tracing::warn!("introspection returned no tables, using fallback schema");
                nlq_core::schema::fallback_schema_description()
            }
            Err(e) => {
                tracing::warn!(error = %e, "schema introspection failed, using fallback schema");
                nlq_core::schema::fallback_schema_description()
            }
        }
    }
}

fn render(tables: &[TableDescription]) -> String {
    let mut out = String::new();
    for table in tables {
        out.push_str(&format!(
            "### {} (PK: {})\n",
            table.name,
            table.primary_keys.join(", ")
        ));
        for c in &table.columns {
            let null = if c.nullable { "NULL" } else { "NOT NULL" };
            out.push_str(&format!("- {} {} {}\n", c.name, c.sql_type, null));
        }
        if !table.foreign_keys.is_empty() {
            out.push_str(&format!("- FK: {}\n", table.foreign_keys.join(", ")));
        }
        if !table.indexes.is_empty() {
            out.push_str(&format!("- indexes: {}\n", table.indexes.join(", ")));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingIntrospector {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SchemaIntrospector for CountingIntrospector {
        async fn introspect(&self) -> Result<Vec<TableDescription>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![TableDescription {
                name: "customers".to_string(),
                columns: vec![ColumnDescription {
                    name: "id".to_string(),
                    sql_type: "BIGINT".to_string(),
                    nullable: false,
                }],
                primary_keys: vec!["id".to_string()],
                foreign_keys: vec![],
                indexes: vec!["idx_customers_name".to_string()],
            }])
        }
    }

    struct FailingIntrospector;

    #[async_trait]
    impl SchemaIntrospector for FailingIntrospector {
        async fn introspect(&self) -> Result<Vec<TableDescription>> {
            Err(anyhow::anyhow!("connection refused"))
        }
    }

    #[tokio::test]
    async fn test_describe_caches_within_ttl() {
        let introspector = Arc::new(CountingIntrospector {
            calls: AtomicUsize::new(0),
        });
        let cache = SchemaCache::new(introspector.clone());
        let first = cache.describe().await;
        let second = cache.describe().await;
        assert_eq!(first, second);
        assert_eq!(introspector.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_cache_refreshes() {
        let introspector = Arc::new(CountingIntrospector {
            calls: AtomicUsize::new(0),
        });
        let cache = SchemaCache::new(introspector.clone()).with_ttl(Duration::from_millis(0));
        cache.describe().await;
        cache.describe().await;
        assert_eq!(introspector.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_substitutes_fallback() {
        let cache = SchemaCache::new(Arc::new(FailingIntrospector));
        let description = cache.describe().await;
        assert!(description.contains("customers"));
        assert!(description.contains("memos"));
        assert!(description.contains("events"));
    }

    #[tokio::test]
    async fn test_fallback_only_cache() {
        let cache = SchemaCache::fallback_only();
        let description = cache.describe().await;
        assert!(description.contains("customers"));
    }

    #[tokio::test]
    async fn test_live_description_renders_indexes() {
        let cache = SchemaCache::new(Arc::new(CountingIntrospector {
            calls: AtomicUsize::new(0),
        }));
        let description = cache.describe().await;
        assert!(description.contains("idx_customers_name"));
    }
}
