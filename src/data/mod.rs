pub mod loader;
pub mod types;

pub use loader::{BarLoader, LoaderError};
pub use types::{Greeks, OptionQuote, OptionType, PriceBar};
