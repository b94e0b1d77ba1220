// SPDX-License-Identifier: Apache-2.0

//! Catalog and schema providers backed by lazy, cached metadata reads

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use datafusion::catalog::{CatalogProvider, SchemaProvider, TableProvider};
use datafusion::common::Result as DFResult;
use oracle_client::util::{lock, to_upper};
use oracle_client::{
    ConnectionParameters, OracleConnection, OracleConnectionPool, OracleError,
    DEFAULT_POOL_CAPACITY,
};
use tracing::{debug, info};

use crate::error::df_external;
use crate::provider::OracleTableProvider;

/// An attached Oracle database.
///
/// Owns the connection pool and a cache of schema entries. Creating a
/// schema entry does no Oracle I/O — Oracle has no cheap way to test
/// schema existence from here, so unknown schemas simply turn out empty —
/// while table entries are loaded lazily from the data dictionary and
/// cached per (schema, table).
pub struct OracleCatalog {
    name: String,
    params: ConnectionParameters,
    pool: Arc<OracleConnectionPool>,
    server_major_version: i32,
    schemas: Mutex<HashMap<String, Arc<OracleSchema>>>,
}

impl OracleCatalog {
    /// Attach a database: open one test connection, capture the server
    /// version, then build the catalog with a fresh pool and the default
    /// schema preloaded.
    pub fn attach(name: impl Into<String>, params: ConnectionParameters) -> Result<Arc<Self>, OracleError> {
        let name = name.into();
        params.validate()?;

        let test_connection = OracleConnection::open(&params)?;
        let (server_major_version, banner) = test_connection.server_version();
        drop(test_connection);
        info!(catalog = %name, version = %banner, "attached oracle database");

        let pool = Arc::new(OracleConnectionPool::new(
            params.clone(),
            DEFAULT_POOL_CAPACITY,
        ));

        let catalog = Arc::new(Self {
            name,
            params,
            pool,
            server_major_version,
            schemas: Mutex::new(HashMap::new()),
        });
        catalog.schema_entry(&catalog.params.effective_schema());
        Ok(catalog)
    }

    /// Name this catalog is registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shared connection pool.
    pub fn pool(&self) -> &Arc<OracleConnectionPool> {
        &self.pool
    }

    /// Major version captured at attach time.
    pub fn server_major_version(&self) -> i32 {
        self.server_major_version
    }

    /// Server version banner, read live from a pooled connection.
    pub fn server_version(&self) -> Result<String, OracleError> {
        let conn = self.pool.acquire()?;
        let (_, banner) = conn.server_version();
        self.pool.release(conn);
        Ok(banner)
    }

    /// Return the cached schema entry, creating one on miss. No Oracle
    /// I/O happens here.
    pub fn schema_entry(&self, schema_name: &str) -> Arc<OracleSchema> {
        let upper = to_upper(schema_name);
        if let Some(entry) = lock(&self.schemas).get(&upper) {
            return entry.clone();
        }

        let mut schemas = lock(&self.schemas);
        // Double-check under the write side of the race.
        if let Some(entry) = schemas.get(&upper) {
            return entry.clone();
        }
        debug!(schema = %upper, "creating schema entry");
        let entry = Arc::new(OracleSchema::new(
            upper.clone(),
            self.pool.clone(),
            self.server_major_version,
            self.params.fetch_size,
        ));
        schemas.insert(upper, entry.clone());
        entry
    }

    /// Drop the schema cache and the pool's idle connections, then
    /// re-preload the default schema entry.
    pub fn clear_cache(&self) {
        info!(catalog = %self.name, "clearing oracle catalog caches");
        lock(&self.schemas).clear();
        self.pool.clear();
        self.schema_entry(&self.params.effective_schema());
    }
}

impl std::fmt::Debug for OracleCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleCatalog")
            .field("name", &self.name)
            .field("host", &self.params.host)
            .field("server_major_version", &self.server_major_version)
            .finish()
    }
}

impl CatalogProvider for OracleCatalog {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn schema_names(&self) -> Vec<String> {
        lock(&self.schemas).keys().cloned().collect()
    }

    fn schema(&self, name: &str) -> Option<Arc<dyn SchemaProvider>> {
        Some(self.schema_entry(name))
    }
}

/// One Oracle schema, with a lazily filled table cache.
pub struct OracleSchema {
    name: String,
    pool: Arc<OracleConnectionPool>,
    server_major_version: i32,
    fetch_size: u32,
    tables: Mutex<HashMap<String, Arc<OracleTableProvider>>>,
    /// Table-vs-view classification per object name, filled from
    /// `ALL_OBJECTS` rows as listings and lookups see them.
    view_flags: Mutex<HashMap<String, bool>>,
}

impl OracleSchema {
    fn new(
        name: String,
        pool: Arc<OracleConnectionPool>,
        server_major_version: i32,
        fetch_size: u32,
    ) -> Self {
        Self {
            name,
            pool,
            server_major_version,
            fetch_size,
            tables: Mutex::new(HashMap::new()),
            view_flags: Mutex::new(HashMap::new()),
        }
    }

    /// Schema name, upper-cased.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Load a table entry through the dictionary, caching the result.
    ///
    /// An empty column list means the table does not exist; that is a
    /// lookup miss (`Ok(None)`), not an error.
    pub fn load_table(&self, table_name: &str) -> Result<Option<Arc<OracleTableProvider>>, OracleError> {
        let upper = to_upper(table_name);
        if let Some(entry) = lock(&self.tables).get(&upper) {
            debug!(schema = %self.name, table = %upper, "table cache hit");
            return Ok(Some(entry.clone()));
        }

        let conn = self.pool.acquire()?;
        let columns = conn.list_columns(&self.name, &upper)?;
        if columns.is_empty() {
            self.pool.release(conn);
            return Ok(None);
        }

        // Table or view? A prior listing usually answered this already;
        // otherwise ask the dictionary for the single object.
        let known_flag = lock(&self.view_flags).get(&upper).copied();
        let is_view = match known_flag {
            Some(flag) => flag,
            None => {
                let flag = conn
                    .table_info(&self.name, &upper)?
                    .map_or(false, |info| info.is_view);
                lock(&self.view_flags).insert(upper.clone(), flag);
                flag
            }
        };
        self.pool.release(conn);

        let mut tables = lock(&self.tables);
        if let Some(entry) = tables.get(&upper) {
            return Ok(Some(entry.clone()));
        }
        let entry = Arc::new(OracleTableProvider::new(
            self.name.clone(),
            upper.clone(),
            columns,
            is_view,
            self.pool.clone(),
            self.server_major_version,
            self.fetch_size,
        ));
        tables.insert(upper, entry.clone());
        Ok(Some(entry))
    }
}

impl std::fmt::Debug for OracleSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleSchema").field("name", &self.name).finish()
    }
}

#[async_trait]
impl SchemaProvider for OracleSchema {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn table_names(&self) -> Vec<String> {
        let tables = self
            .pool
            .acquire()
            .and_then(|conn| {
                let tables = conn.list_tables(&self.name);
                self.pool.release(conn);
                tables
            });
        match tables {
            Ok(tables) => {
                // Remember each object's classification so lazy table
                // loads skip the per-object dictionary probe.
                let mut view_flags = lock(&self.view_flags);
                for table in &tables {
                    view_flags.insert(table.name.clone(), table.is_view);
                }
                drop(view_flags);
                tables.into_iter().map(|t| t.name).collect()
            }
            Err(e) => {
                tracing::warn!(schema = %self.name, error = %e, "failed to list oracle tables");
                Vec::new()
            }
        }
    }

    async fn table(&self, name: &str) -> DFResult<Option<Arc<dyn TableProvider>>> {
        self.load_table(name)
            .map(|entry| entry.map(|t| t as Arc<dyn TableProvider>))
            .map_err(df_external)
    }

    fn table_exist(&self, name: &str) -> bool {
        self.load_table(name).map(|t| t.is_some()).unwrap_or(false)
    }

    fn register_table(
        &self,
        _name: String,
        _table: Arc<dyn TableProvider>,
    ) -> DFResult<Option<Arc<dyn TableProvider>>> {
        Err(df_external(OracleError::NotImplemented(
            "CREATE TABLE through the catalog is not supported".to_string(),
        )))
    }

    fn deregister_table(&self, _name: &str) -> DFResult<Option<Arc<dyn TableProvider>>> {
        Err(df_external(OracleError::NotImplemented(
            "DROP TABLE through the catalog is not supported".to_string(),
        )))
    }
}
