//! Provider adapters.
//!
//! | Adapter | Provider | Endpoint |
//! |---------|----------|----------|
//! | [`YahooChartSource`] | Yahoo Finance | v8 chart, daily interval |
//! | [`FredSource`] | FRED | series observations |

pub mod fred;
pub mod yahoo;

pub use fred::FredSource;
pub use yahoo::YahooChartSource;
