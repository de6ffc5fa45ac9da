use crate::database::Database;
use crate::options::Options;
use crate::Result;
use shadowdb_error::errinput;
use shadowdb_execution::registry::FunctionRegistry;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::info;

/// The entry point: a root directory of databases and the databases currently open.
///
/// Creating, opening, closing and dropping databases, and creating, altering and dropping
/// tables within them, are serialized by one lock per instance.
#[derive(Debug)]
pub struct Instance {
    options: Options,
    lifecycle: Arc<Mutex<()>>,
    open: Mutex<BTreeMap<String, Arc<Database>>>,
}

impl Instance {
    pub fn new(options: Options) -> Result<Self> {
        std::fs::create_dir_all(&options.root)?;
        Ok(Self {
            options,
            lifecycle: Arc::new(Mutex::new(())),
            open: Mutex::new(BTreeMap::new()),
        })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The registry databases copy when they are opened. Changes do not reach databases that
    /// are already open.
    pub fn functions_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.options.functions
    }

    pub fn create_database(&self, name: &str) -> Result<Arc<Database>> {
        let mut open = self.open.lock()?;
        let db = {
            let _lifecycle = self.lifecycle.lock()?;
            Arc::new(Database::create(name, &self.options, self.lifecycle.clone())?)
        };
        open.insert(name.to_string(), db.clone());
        Ok(db)
    }

    /// Returns the open database of that name, opening it if needed.
    pub fn use_database(&self, name: &str) -> Result<Arc<Database>> {
        let mut open = self.open.lock()?;
        if let Some(db) = open.get(name).filter(|db| !db.is_closed()) {
            return Ok(db.clone());
        }
        let db = {
            let _lifecycle = self.lifecycle.lock()?;
            Arc::new(Database::open(name, &self.options, self.lifecycle.clone())?)
        };
        open.insert(name.to_string(), db.clone());
        Ok(db)
    }

    pub fn close_database(&self, name: &str) -> Result<()> {
        match self.open.lock()?.remove(name) {
            Some(db) => db.close(),
            None => errinput!("database {name} is not open"),
        }
    }

    /// Closes the database if it is open and deletes it from disk.
    pub fn drop_database(&self, name: &str) -> Result<()> {
        let mut open = self.open.lock()?;
        if let Some(db) = open.remove(name) {
            db.close()?;
        }
        let _lifecycle = self.lifecycle.lock()?;
        let dir = self.options.root.join(name);
        if !dir.is_dir() {
            return errinput!("database {name} does not exist");
        }
        std::fs::remove_dir_all(&dir)?;
        info!(database = name, "dropped database");
        Ok(())
    }

    /// The databases under the root directory, open or not.
    pub fn database_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.options.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Closes every open database.
    pub fn close(&self) -> Result<()> {
        let databases = std::mem::take(&mut *self.open.lock()?);
        for db in databases.into_values() {
            db.close()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::test_util::{insert, instance, shop};
    use shadowdb_error::Error;
    use shadowdb_storage::disk::IoMode;
    use std::sync::Arc;

    #[test]
    fn test_database_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let instance = instance(dir.path(), IoMode::Standard);
        assert!(instance.database_names().unwrap().is_empty());

        let db = shop(&instance);
        instance.create_database("other").unwrap();
        assert!(matches!(
            instance.create_database("shop"),
            Err(Error::InvalidInput(_))
        ));
        assert!(instance.create_database("no/good").is_err());
        assert_eq!(instance.database_names().unwrap(), ["other", "shop"]);

        // Using an open database returns the same handle.
        assert!(Arc::ptr_eq(&db, &instance.use_database("shop").unwrap()));
        assert!(instance.use_database("missing").is_err());

        instance.close_database("shop").unwrap();
        assert!(instance.close_database("shop").is_err());
        let reopened = instance.use_database("shop").unwrap();
        assert!(!Arc::ptr_eq(&db, &reopened));

        instance.drop_database("other").unwrap();
        instance.drop_database("shop").unwrap();
        assert!(reopened.is_closed());
        assert!(instance.database_names().unwrap().is_empty());
        assert!(instance.drop_database("shop").is_err());
    }

    #[test]
    fn test_closed_handle_is_reopened() {
        let dir = tempfile::tempdir().unwrap();
        let instance = instance(dir.path(), IoMode::Standard);
        let db = shop(&instance);
        insert(&db, "a", 20, 1.0);
        db.close().unwrap();

        let db = instance.use_database("shop").unwrap();
        assert_eq!(db.query("select * from test").unwrap().len(), 1);
    }

    #[test]
    fn test_registry_is_copied_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let mut instance = instance(dir.path(), IoMode::Standard);
        let db = shop(&instance);
        insert(&db, "a", 20, 1.0);

        instance
            .functions_mut()
            .register_condition("named_a", |v| Ok(v[0].as_str() == Some("a")));
        assert!(db.query("select * from test where named_a(name)").is_err());

        instance.close_database("shop").unwrap();
        let db = instance.use_database("shop").unwrap();
        assert_eq!(
            db.query("select * from test where named_a(name)")
                .unwrap()
                .len(),
            1
        );
    }
}
