use misugo::{BoxFuture, Context, Error, Result, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Serialize)]
pub struct Item {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct NewItem {
    pub name: String,
}

/// In-memory item storage shared by the item handlers
#[derive(Clone, Default)]
pub struct ItemStore {
    items: Arc<Mutex<Vec<Item>>>,
}

fn route<F>(f: F) -> F
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
{
    f
}

impl ItemStore {
    pub fn shared() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> Result<Vec<Item>> {
        self.items
            .lock()
            .map(|items| items.clone())
            .map_err(|_| Error::internal("item store poisoned"))
    }

    fn insert(&self, name: String) -> Result<Item> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| Error::internal("item store poisoned"))?;
        let item = Item {
            id: items.len() as u64 + 1,
            name,
        };
        items.push(item.clone());
        Ok(item)
    }

    pub fn list_handler(
        &self,
    ) -> impl for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static
    {
        let store = self.clone();
        route(move |ctx| {
            let items = store.snapshot();
            Box::pin(async move { ctx.write_json(StatusCode::OK, &items?) })
        })
    }

    pub fn create_handler(
        &self,
    ) -> impl for<'a> Fn(&'a mut Context) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static
    {
        let store = self.clone();
        route(move |ctx| {
            let store = store.clone();
            Box::pin(async move {
                let mut new_item = NewItem::default();
                ctx.decode_body(&mut new_item)?;
                if new_item.name.trim().is_empty() {
                    return Err(Error::handler("item name must not be empty"));
                }

                let item = store.insert(new_item.name)?;
                log::info!("Created item {} ({})", item.id, item.name);
                ctx.write_json(StatusCode::CREATED, &item)
            })
        })
    }
}

pub async fn health(ctx: &mut Context) -> Result<()> {
    ctx.write_json(StatusCode::OK, &serde_json::json!({ "status": "ok" }))
}
