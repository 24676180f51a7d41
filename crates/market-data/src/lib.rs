pub mod listing;
pub mod yahoo;

pub use listing::TradingEconomicsClient;
pub use yahoo::YahooChartClient;
