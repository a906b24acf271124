mod auth;
mod cheer;
mod db;
mod events;
mod items;
mod orders;
mod users;

pub mod util;

use std::sync::Arc;

pub use auth::*;
pub use cheer::*;
pub use db::*;
pub use events::*;
pub use items::*;
pub use orders::*;
pub use users::*;

/// The tuckshop system, facilitating ordering, the item shelf, accounts,
/// cheer messages, and live notifications.
pub struct Tuckshop {
    pub database: Arc<dyn Database>,

    pub events: EventBus,
    pub auth: Auth,
    pub orders: OrderManager,
    pub items: ItemManager,
    pub users: UserManager,
    pub cheer: CheerBoard,
}

/// A type passed to the various managers of the tuckshop system, to access
/// storage and emit events.
#[derive(Clone)]
pub struct TuckshopContext {
    pub database: Arc<dyn Database>,
    pub events: EventBus,
}

impl Tuckshop {
    pub fn new(database: impl Database + 'static) -> Self {
        let database: Arc<dyn Database> = Arc::new(database);
        let events = EventBus::default();

        let context = TuckshopContext {
            database: database.clone(),
            events: events.clone(),
        };

        Self {
            auth: Auth::new(&context),
            orders: OrderManager::new(&context),
            items: ItemManager::new(&context),
            users: UserManager::new(&context),
            cheer: CheerBoard::new(&context),

            database,
            events,
        }
    }
}
