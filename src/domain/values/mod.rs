pub mod platform;
pub mod price_ladder;
pub mod price_summary;
pub mod reference;
