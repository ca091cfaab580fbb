pub mod expand;
pub mod fanout;
pub mod full_search;
pub mod platforms;
pub mod price_search;
pub mod registry;
pub mod stats;
pub mod suggest;
