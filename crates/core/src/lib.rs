pub mod bill;
pub mod item;
pub mod money;

pub use bill::{BillError, BillState, PersonShare};
pub use item::{normalize_name, Item};
pub use money::Money;
