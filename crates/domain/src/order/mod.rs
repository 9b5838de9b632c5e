//! Order aggregate rules.

mod model;
mod state;

pub use model::{LineRequest, Order, OrderLine, OrderTotals, validate_lines};
pub use state::OrderStatus;
