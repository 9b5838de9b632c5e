pub mod error;
pub mod filter;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use filter::{ChargeFilter, DeliveryFilter, LocationFilter, OrderFilter};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use store::{Store, Transaction};
