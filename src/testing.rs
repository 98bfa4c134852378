//! In-memory fixtures shared by unit tests.
use crate::migration::{MethodFuture, MethodResult};
use crate::receiver::{MethodTable, Receiver};

use anyhow::{anyhow, bail};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};


pub type Document = BTreeMap<String, String>;
pub type Collections = BTreeMap<String, Vec<Document>>;

fn document(fields: &[(&str, &str)]) -> Document {
    fields.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}


/// A tiny document database: named collections of string maps.
#[derive(Clone, Default)]
pub struct Documents {
    collections: Arc<Mutex<Collections>>,
}

impl Documents {
    pub fn snapshot(&self) -> Collections {
        self.collections.lock().unwrap().clone()
    }

    fn insert_many(&self, collection: &str, new_docs: Vec<Document>) -> MethodResult {
        let mut collections = self.collections.lock().unwrap();
        let docs = collections.entry(collection.to_string()).or_default();
        for doc in new_docs {
            if docs.iter().any(|d| d.get("_id") == doc.get("_id")) {
                bail!("duplicate key in '{collection}'");
            }
            docs.push(doc);
        }
        Ok(())
    }

    fn drop_collection(&self, collection: &str) -> MethodResult {
        self.collections
            .lock()
            .unwrap()
            .remove(collection)
            .map(|_| ())
            .ok_or_else(|| anyhow!("ns not found: '{collection}'"))
    }

    fn rename_field(&self, collection: &str, from: &str, to: &str) -> MethodResult {
        let mut collections = self.collections.lock().unwrap();
        for doc in collections.entry(collection.to_string()).or_default() {
            if let Some(value) = doc.remove(from) {
                doc.insert(to.to_string(), value);
            }
        }
        Ok(())
    }

    fn update_one(&self, collection: &str, field: &str, from: &str, to: &str) -> MethodResult {
        let mut collections = self.collections.lock().unwrap();
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.get(field).map(String::as_str) == Some(from)))
            .ok_or_else(|| anyhow!("not found"))?;
        doc.insert(field.to_string(), to.to_string());
        Ok(())
    }
}


/// Organizations and users, in two versions, over [`Documents`].
pub struct SampleDocumentMigrator {
    docs: Documents,
}

impl SampleDocumentMigrator {
    pub fn new(docs: Documents) -> Self {
        SampleDocumentMigrator { docs }
    }
}

#[allow(non_snake_case)]
impl SampleDocumentMigrator {
    pub fn V001_init_organizations_up(&self) -> MethodFuture<'_> {
        let orgs: Vec<Document> = [
            ("1", "Amazon", "Seattle"),
            ("2", "Google", "Mountain View"),
            ("3", "JFrog", "Santa Clara"),
        ]
        .into_iter()
        .map(|(id, name, location)| document(&[("_id", id), ("name", name), ("location", location)]))
        .collect();
        async move { self.docs.insert_many("organizations", orgs) }.boxed()
    }

    pub fn V001_init_organizations_down(&self) -> MethodFuture<'_> {
        async move { self.docs.drop_collection("organizations") }.boxed()
    }

    pub fn V001_init_users_up(&self) -> MethodFuture<'_> {
        let users: Vec<Document> = [("1", "Alex"), ("2", "Beatrice"), ("3", "Cleo")]
            .into_iter()
            .map(|(id, name)| document(&[("_id", id), ("name", name)]))
            .collect();
        async move { self.docs.insert_many("users", users) }.boxed()
    }

    pub fn V001_init_users_down(&self) -> MethodFuture<'_> {
        async move { self.docs.drop_collection("users") }.boxed()
    }

    pub fn V002_organizations_rename_location_field_to_headquarters_up(&self) -> MethodFuture<'_> {
        async move { self.docs.rename_field("organizations", "location", "headquarters") }.boxed()
    }

    pub fn V002_organizations_rename_location_field_to_headquarters_down(&self) -> MethodFuture<'_> {
        async move { self.docs.rename_field("organizations", "headquarters", "location") }.boxed()
    }

    pub fn V002_change_user_cleo_to_cleopatra_up(&self) -> MethodFuture<'_> {
        async move { self.docs.update_one("users", "name", "Cleo", "Cleopatra") }.boxed()
    }

    pub fn V002_change_user_cleo_to_cleopatra_down(&self) -> MethodFuture<'_> {
        async move { self.docs.update_one("users", "name", "Cleopatra", "Cleo") }.boxed()
    }

    pub fn v001_not_exported_method_up(&self) -> MethodFuture<'_> {
        async { Ok(()) }.boxed()
    }

    pub fn V001_method_with_wrong_signature_up(&self, _label: String) -> MethodFuture<'_> {
        async { Ok(()) }.boxed()
    }

    pub fn V001_method_with_wrong_signature_up2(&self, _docs: Documents) -> MethodFuture<'_> {
        async { Ok(()) }.boxed()
    }

    pub fn V001_method_with_wrong_signature_down(&self) -> BoxFuture<'_, (bool, MethodResult)> {
        async { (true, Ok(())) }.boxed()
    }
}

impl Receiver for SampleDocumentMigrator {
    fn methods() -> MethodTable<Self> {
        crate::methods!(SampleDocumentMigrator => [
            V001_init_organizations_up,
            V001_init_organizations_down,
            V001_init_users_up,
            V001_init_users_down,
            V002_organizations_rename_location_field_to_headquarters_up,
            V002_organizations_rename_location_field_to_headquarters_down,
            V002_change_user_cleo_to_cleopatra_up,
            V002_change_user_cleo_to_cleopatra_down,
            v001_not_exported_method_up,
            V001_method_with_wrong_signature_up,
            V001_method_with_wrong_signature_up2,
            V001_method_with_wrong_signature_down,
        ])
    }
}
