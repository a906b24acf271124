use log::info;

use crate::{DatabaseError, ItemData, NewItem, PrimaryKey, TuckshopContext, UpdatedItem};

/// Manages the shelf of orderable items. Staff only, no history is kept.
pub struct ItemManager {
    context: TuckshopContext,
}

impl ItemManager {
    pub fn new(context: &TuckshopContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    pub async fn list(&self) -> Result<Vec<ItemData>, DatabaseError> {
        self.context.database.list_items().await
    }

    pub async fn by_id(&self, item_id: PrimaryKey) -> Result<ItemData, DatabaseError> {
        self.context.database.item_by_id(item_id).await
    }

    pub async fn create(&self, new_item: NewItem) -> Result<ItemData, DatabaseError> {
        let item = self.context.database.create_item(new_item).await?;
        info!("Item {} ({}) added to the shelf", item.id, item.name);

        Ok(item)
    }

    pub async fn update(&self, updated_item: UpdatedItem) -> Result<ItemData, DatabaseError> {
        self.context.database.update_item(updated_item).await
    }

    pub async fn delete(&self, item_id: PrimaryKey) -> Result<(), DatabaseError> {
        self.context.database.delete_item(item_id).await?;
        info!("Item {item_id} removed from the shelf");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ItemCategory, MemoryDatabase, Tuckshop};

    fn tuckshop() -> Tuckshop {
        Tuckshop::new(MemoryDatabase::new())
    }

    #[tokio::test]
    async fn created_items_round_trip_through_the_list() {
        let tuckshop = tuckshop();

        let created = tuckshop
            .items
            .create(NewItem {
                name: "콜라".to_string(),
                category: ItemCategory::Drink,
                image: "https://media.example/cola.png".to_string(),
                in_stock: true,
            })
            .await
            .expect("item is created");

        let items = tuckshop.items.list().await.unwrap();
        let listed = items.iter().find(|i| i.id == created.id).expect("item is listed");

        assert_eq!(listed.name, "콜라");
        assert_eq!(listed.category, ItemCategory::Drink);
        assert!(listed.in_stock);
    }

    #[tokio::test]
    async fn listing_without_writes_is_stable() {
        let tuckshop = tuckshop();

        for (name, category) in [("콜라", ItemCategory::Drink), ("새우깡", ItemCategory::Snack)] {
            tuckshop
                .items
                .create(NewItem {
                    name: name.to_string(),
                    category,
                    image: String::new(),
                    in_stock: true,
                })
                .await
                .unwrap();
        }

        let first = tuckshop.items.list().await.unwrap();
        let second = tuckshop.items.list().await.unwrap();

        let ids: Vec<_> = first.iter().map(|i| (i.id, i.name.clone())).collect();
        let again: Vec<_> = second.iter().map(|i| (i.id, i.name.clone())).collect();
        assert_eq!(ids, again);
    }

    #[tokio::test]
    async fn updating_replaces_the_given_fields() {
        let tuckshop = tuckshop();

        let created = tuckshop
            .items
            .create(NewItem {
                name: "콜라".to_string(),
                category: ItemCategory::Drink,
                image: String::new(),
                in_stock: true,
            })
            .await
            .unwrap();

        let updated = tuckshop
            .items
            .update(UpdatedItem {
                id: created.id,
                name: None,
                category: None,
                image: None,
                in_stock: Some(false),
            })
            .await
            .unwrap();

        assert_eq!(updated.name, "콜라");
        assert!(!updated.in_stock);
    }

    #[tokio::test]
    async fn deleting_unknown_items_reports_not_found() {
        let tuckshop = tuckshop();

        let result = tuckshop.items.delete(999).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }
}
