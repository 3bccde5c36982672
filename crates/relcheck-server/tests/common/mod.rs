//! Shared in-memory readers for pipeline integration tests.

#![allow(dead_code)]

use std::collections::HashMap;

use async_trait::async_trait;
use relcheck_domain::error::{DomainError, DomainResult};
use relcheck_domain::model::{AuthorizationModel, Object, RelationDefinition, TupleKey};
use relcheck_domain::resolver::{ModelReader, StoredTupleRef, TupleReader};
use tokio::sync::RwLock;

/// Tuples keyed by "store:object_type:object_id:relation".
#[derive(Default)]
pub struct InMemoryTupleReader {
    tuples: RwLock<HashMap<String, Vec<StoredTupleRef>>>,
}

impl InMemoryTupleReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn write(&self, store_id: &str, tuple: TupleKey) {
        let object = Object::parse(&tuple.object).unwrap();
        let (user_object, user_relation) = match tuple.user.split_once('#') {
            Some((object, relation)) => (object.to_string(), Some(relation.to_string())),
            None => (tuple.user.clone(), None),
        };
        let (user_type, user_id) = user_object.split_once(':').unwrap();

        let key = format!(
            "{store_id}:{}:{}:{}",
            object.object_type, object.object_id, tuple.relation
        );
        self.tuples
            .write()
            .await
            .entry(key)
            .or_default()
            .push(StoredTupleRef::new(user_type, user_id, user_relation));
    }
}

#[async_trait]
impl TupleReader for InMemoryTupleReader {
    async fn read_tuples(
        &self,
        store_id: &str,
        object_type: &str,
        object_id: &str,
        relation: &str,
    ) -> DomainResult<Vec<StoredTupleRef>> {
        let key = format!("{store_id}:{object_type}:{object_id}:{relation}");
        Ok(self
            .tuples
            .read()
            .await
            .get(&key)
            .cloned()
            .unwrap_or_default())
    }
}

/// Models keyed by (store, model id).
#[derive(Default)]
pub struct InMemoryModelReader {
    models: RwLock<HashMap<(String, String), AuthorizationModel>>,
}

impl InMemoryModelReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn write(&self, store_id: &str, model: AuthorizationModel) {
        self.models
            .write()
            .await
            .insert((store_id.to_string(), model.id.clone()), model);
    }
}

#[async_trait]
impl ModelReader for InMemoryModelReader {
    async fn get_relation_definition(
        &self,
        store_id: &str,
        authorization_model_id: &str,
        type_name: &str,
        relation: &str,
    ) -> DomainResult<RelationDefinition> {
        let models = self.models.read().await;
        let model = models
            .get(&(store_id.to_string(), authorization_model_id.to_string()))
            .ok_or_else(|| DomainError::StorageError {
                message: format!("authorization model not found: {authorization_model_id}"),
            })?;
        model.relation_definition(type_name, relation).cloned()
    }
}

/// group
///   blocked: [user, group#member]
///   member:  [user, group#member] but not blocked
pub const GROUP_MODEL: &str = r#"{
  "schema_version": "1.1",
  "type_definitions": [
    { "type_name": "user" },
    {
      "type_name": "group",
      "relations": [
        {
          "name": "blocked",
          "type_constraints": ["user", "group#member"],
          "rewrite": "This"
        },
        {
          "name": "member",
          "type_constraints": ["user", "group#member"],
          "rewrite": {
            "Exclusion": {
              "base": "This",
              "subtract": { "ComputedUserset": { "relation": "blocked" } }
            }
          }
        }
      ]
    }
  ]
}"#;

pub fn group_model(id: &str) -> AuthorizationModel {
    let mut model: AuthorizationModel = serde_json::from_str(GROUP_MODEL).unwrap();
    model.id = id.to_string();
    model
}
