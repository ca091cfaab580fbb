pub mod catalog_item;
pub mod equivalent;
pub mod inventory;
pub mod price_sample;
