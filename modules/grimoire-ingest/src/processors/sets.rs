use async_trait::async_trait;
use grimoire_common::{Document, SetCodeIndex, SetItem, SetParentAssociation};
use grimoire_store::Scribe;
use scryfall_client::ScryfallSet;
use tracing::debug;

use super::{log_upsert, SetStep};
use crate::error::Result;
use crate::mappers;

/// Map set metadata into at most one document and upsert it.
pub struct SetProjection<D> {
    name: &'static str,
    scribe: Scribe<D>,
    map: fn(&ScryfallSet) -> Option<D>,
}

pub type SetItemsProcessor = SetProjection<SetItem>;
pub type SetAssociationsProcessor = SetProjection<SetParentAssociation>;
pub type SetCodeIndexProcessor = SetProjection<SetCodeIndex>;

impl<D: Document> SetProjection<D> {
    pub fn new(name: &'static str, scribe: Scribe<D>, map: fn(&ScryfallSet) -> Option<D>) -> Self {
        Self { name, scribe, map }
    }
}

impl SetProjection<SetItem> {
    pub fn set_items(scribe: Scribe<SetItem>) -> Self {
        Self::new("set_items", scribe, |set| Some(mappers::to_set_item(set)))
    }
}

impl SetProjection<SetParentAssociation> {
    pub fn set_associations(scribe: Scribe<SetParentAssociation>) -> Self {
        Self::new("set_associations", scribe, mappers::to_set_parent_association)
    }
}

impl SetProjection<SetCodeIndex> {
    pub fn set_code_index(scribe: Scribe<SetCodeIndex>) -> Self {
        Self::new("set_code_index", scribe, |set| Some(mappers::to_set_code_index(set)))
    }
}

#[async_trait]
impl<D: Document + 'static> SetStep for SetProjection<D> {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn process(&self, set: &ScryfallSet) -> Result<()> {
        let Some(doc) = (self.map)(set) else {
            debug!(set_code = %set.code, step = self.name, "Nothing to write");
            return Ok(());
        };
        let resp = self.scribe.upsert(&doc).await?;
        log_upsert(D::COLLECTION, &doc.id(), &resp);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use grimoire_common::{Collection, RetryPolicy};
    use grimoire_store::DocumentStore;

    use super::*;
    use crate::testing::{set, MemoryDocumentStore};

    fn scribe<D: Document>(store: &Arc<MemoryDocumentStore>) -> Scribe<D> {
        let store: Arc<dyn DocumentStore> = store.clone();
        Scribe::new(store, RetryPolicy::none())
    }

    #[tokio::test]
    async fn top_level_set_writes_no_association() {
        let store = Arc::new(MemoryDocumentStore::new());
        let step = SetAssociationsProcessor::set_associations(scribe(&store));

        step.process(&set("lea", "Limited Edition Alpha")).await.unwrap();
        assert_eq!(store.count(Collection::SetParentAssociations), 0);
    }

    #[tokio::test]
    async fn child_set_is_partitioned_under_parent() {
        let store = Arc::new(MemoryDocumentStore::new());
        let step = SetAssociationsProcessor::set_associations(scribe(&store));
        let mut child = set("plea", "Alpha Promos");
        child.parent_set_code = Some("lea".into());

        step.process(&child).await.unwrap();
        assert!(store.get(Collection::SetParentAssociations, "lea", "plea").is_some());
    }

    #[tokio::test]
    async fn set_items_and_code_index_are_keyed_by_id_and_code() {
        let store = Arc::new(MemoryDocumentStore::new());
        let s = set("lea", "Limited Edition Alpha");

        SetItemsProcessor::set_items(scribe(&store)).process(&s).await.unwrap();
        SetCodeIndexProcessor::set_code_index(scribe(&store)).process(&s).await.unwrap();

        let id = s.id.to_string();
        let item = store.get(Collection::SetItems, &id, &id).unwrap();
        assert_eq!(item["iconPath"], s.icon_svg_uri.clone().unwrap());
        let index = store.get(Collection::SetCodeIndex, "lea", "lea").unwrap();
        assert_eq!(index["setId"], id);
    }
}
