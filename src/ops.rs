//! Typed execution wrappers over any [`DatabaseClient`].
//!
//! Each call validates its arguments, builds the statement from cached
//! metadata and performs exactly one round trip. Client errors are returned
//! as-is.

use std::future::Future;

use tracing::{Level, event};

use crate::core::{DbError, Result, ToValue, Value};
use crate::entity::Entity;
use crate::interface::DatabaseClient;
use crate::metadata::MetadataCache;
use crate::params::Params;

/// Entity-level operations available on every [`DatabaseClient`].
///
/// ```ignore
/// let widget: Option<Widget> = client.get::<Widget>(7).await?;
/// client.insert(&widget).await?;
/// ```
pub trait EntityClientExt: DatabaseClient {
    /// All rows whose key equals `id`. No match is an empty vector.
    fn get_many<T: Entity>(&self, id: impl ToValue) -> impl Future<Output = Result<Vec<T>>> + Send;

    /// The row whose key equals `id`, if any. More than one match is an error.
    fn get<T: Entity>(&self, id: impl ToValue) -> impl Future<Output = Result<Option<T>>> + Send;

    /// Inserts `entity` and returns the affected-row count.
    fn insert<T: Entity>(&self, entity: &T) -> impl Future<Output = Result<u64>> + Send;
}

impl<C: DatabaseClient + ?Sized> EntityClientExt for C {
    fn get_many<T: Entity>(&self, id: impl ToValue) -> impl Future<Output = Result<Vec<T>>> + Send {
        get_many_with(self, MetadataCache::global(), id.to_value())
    }

    fn get<T: Entity>(&self, id: impl ToValue) -> impl Future<Output = Result<Option<T>>> + Send {
        get_with(self, MetadataCache::global(), id.to_value())
    }

    fn insert<T: Entity>(&self, entity: &T) -> impl Future<Output = Result<u64>> + Send {
        insert_with(self, MetadataCache::global(), entity)
    }
}

pub async fn get_many_with<C, T>(client: &C, cache: &MetadataCache, id: Value) -> Result<Vec<T>>
where
    C: DatabaseClient + ?Sized,
    T: Entity,
{
    let params = id_params(cache, id)?;
    let sql = cache.build_select::<T>()?;

    event!(Level::TRACE, sql = %sql, "get_many");
    let result = client.query(&sql, &params).await?;

    result.iter().map(T::from_row).collect()
}

pub async fn get_with<C, T>(client: &C, cache: &MetadataCache, id: Value) -> Result<Option<T>>
where
    C: DatabaseClient + ?Sized,
    T: Entity,
{
    let params = id_params(cache, id)?;
    let sql = cache.build_select::<T>()?;

    event!(Level::TRACE, sql = %sql, "get");
    let Some(result) = client.query_optional(&sql, &params).await? else {
        return Ok(None);
    };

    match result.row(0) {
        Some(row) => T::from_row(row).map(Some),
        None => Ok(None),
    }
}

pub async fn insert_with<C, T>(client: &C, cache: &MetadataCache, entity: &T) -> Result<u64>
where
    C: DatabaseClient + ?Sized,
    T: Entity,
{
    let sql = cache.build_insert::<T>()?;
    let params = entity.to_params();

    event!(Level::TRACE, sql = %sql, params = params.len(), "insert");
    client.execute(&sql, &params).await
}

fn id_params(cache: &MetadataCache, id: Value) -> Result<Params> {
    if id.is_null() {
        return Err(DbError::InvalidArgument("id must not be null".into()));
    }

    Ok(Params::new().with(cache.config().id_parameter.as_str(), id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityDescriptor;
    use crate::result::{FromRow, QueryResult, RowRef};
    use async_trait::async_trait;
    use std::sync::OnceLock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, PartialEq)]
    struct Widget {
        id: i64,
        name: String,
    }

    impl FromRow for Widget {
        fn from_row(row: RowRef<'_>) -> Result<Self> {
            Ok(Widget {
                id: row.get("WidgetId")?,
                name: row.get("Name")?,
            })
        }
    }

    impl Entity for Widget {
        fn descriptor() -> &'static EntityDescriptor {
            static DESCRIPTOR: OnceLock<EntityDescriptor> = OnceLock::new();
            DESCRIPTOR.get_or_init(|| {
                EntityDescriptor::builder("Widget")
                    .field("WidgetId")
                    .column("Name", "widget_name")
                    .build()
            })
        }

        fn to_params(&self) -> Params {
            Params::new().with("WidgetId", self.id).with("Name", &self.name)
        }
    }

    /// Returns a canned result and counts round trips.
    struct Canned {
        result: QueryResult,
        calls: AtomicUsize,
    }

    impl Canned {
        fn rows(rows: Vec<(i64, &str)>) -> Self {
            Self {
                result: QueryResult::new(
                    vec!["WidgetId".into(), "Name".into()],
                    rows.into_iter()
                        .map(|(id, name)| vec![Value::Integer(id), Value::Text(name.into())])
                        .collect(),
                ),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DatabaseClient for Canned {
        async fn query(&self, _sql: &str, params: &Params) -> Result<QueryResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(params.get("Id").is_some());
            Ok(self.result.clone())
        }

        async fn execute(&self, _sql: &str, params: &Params) -> Result<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(params.len() as u64)
        }
    }

    #[tokio::test]
    async fn test_get_many_maps_rows() {
        let client = Canned::rows(vec![(1, "a"), (1, "b")]);
        let widgets = client.get_many::<Widget>(1).await.unwrap();
        assert_eq!(widgets.len(), 2);
        assert_eq!(widgets[1].name, "b");
    }

    #[tokio::test]
    async fn test_get_rejects_multiple_rows() {
        let client = Canned::rows(vec![(1, "a"), (1, "b")]);
        let err = client.get::<Widget>(1).await.unwrap_err();
        assert!(matches!(err, DbError::Execution(_)));
    }

    #[tokio::test]
    async fn test_get_none_on_empty() {
        let client = Canned::rows(vec![]);
        assert_eq!(client.get::<Widget>(1).await.unwrap(), None);
        assert!(client.get_many::<Widget>(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_null_id_fails_before_io() {
        let client = Canned::rows(vec![(1, "a")]);

        let err = client.get::<Widget>(Value::Null).await.unwrap_err();
        assert!(err.is_invalid_argument());
        let err = client.get_many::<Widget>(None::<i64>).await.unwrap_err();
        assert!(err.is_invalid_argument());

        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_insert_binds_every_property() {
        let client = Canned::rows(vec![]);
        let affected = client
            .insert(&Widget {
                id: 7,
                name: "a".into(),
            })
            .await
            .unwrap();
        assert_eq!(affected, 2);
    }
}
