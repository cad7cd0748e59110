//! Collaborator interfaces consumed by the evaluation core.

pub mod indicators;
pub mod market_data;
pub mod notifier;
pub mod persistence;

pub use indicators::{ComputeError, IndicatorOutputs, IndicatorProvider};
pub use market_data::{MarketDataError, MarketDataProvider, StaticMarketData};
pub use notifier::{CollectingNotifier, Notifier, NotifyError};
pub use persistence::{AlertStore, InMemoryAlertStore, StoreError};
