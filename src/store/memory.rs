//! In-memory collection.

use std::sync::RwLock;

use serde_json::Value;

use super::{Collection, Document, Filter, StoreError, distinct_values, project};

#[derive(Debug, Default)]
pub struct MemoryCollection {
    name: String,
    docs: RwLock<Vec<Document>>,
}

impl MemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            docs: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.docs.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Collection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn find(&self, filter: &Filter, projection: Option<&[&str]>) -> Result<Vec<Document>, StoreError> {
        let docs = self.docs.read().map_err(|_| StoreError::Poisoned)?;
        Ok(docs
            .iter()
            .filter(|d| filter.matches(d))
            .map(|d| project(d, projection))
            .collect())
    }

    fn distinct(&self, field: &str) -> Result<Vec<Value>, StoreError> {
        let docs = self.docs.read().map_err(|_| StoreError::Poisoned)?;
        Ok(distinct_values(docs.iter(), field))
    }

    fn delete_many(&self, filter: &Filter) -> Result<u64, StoreError> {
        let mut docs = self.docs.write().map_err(|_| StoreError::Poisoned)?;
        let before = docs.len();
        docs.retain(|d| !filter.matches(d));
        Ok((before - docs.len()) as u64)
    }

    fn insert_many(&self, new_docs: &[Document]) -> Result<usize, StoreError> {
        let mut docs = self.docs.write().map_err(|_| StoreError::Poisoned)?;
        docs.extend(new_docs.iter().cloned());
        Ok(new_docs.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(state: &str, level: f64) -> Document {
        json!({"state": state, "water_level": level}).as_object().cloned().unwrap()
    }

    #[test]
    fn insert_find_delete_round() {
        let col = MemoryCollection::new("raw");
        assert_eq!(col.insert_many(&[doc("A", 1.0), doc("B", 2.0), doc("A", 3.0)]).unwrap(), 3);

        let a = col.find(&Filter::by("state", "A"), Some(&["water_level"][..])).unwrap();
        assert_eq!(a.len(), 2);
        assert!(a.iter().all(|d| !d.contains_key("state")));

        assert_eq!(col.distinct("state").unwrap(), vec![json!("A"), json!("B")]);
        assert_eq!(col.delete_many(&Filter::by("state", "A")).unwrap(), 2);
        assert_eq!(col.find(&Filter::all(), None).unwrap().len(), 1);
        assert_eq!(col.delete_many(&Filter::all()).unwrap(), 1);
        assert!(col.is_empty());
    }
}
