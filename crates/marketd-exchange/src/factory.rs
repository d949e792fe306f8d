//! Adapter construction from catalog records.

use crate::adapter::{AdapterConfig, ExchangeAdapter, VenueEndpoints};
use crate::error::AdapterResult;
use marketd_bus::MessageBus;
use marketd_core::Venue;
use std::sync::Arc;
use tracing::debug;

/// Build the adapter for a catalog exchange record.
///
/// An unknown exchange name is a typed error; the supervisor counts it and
/// retries on a later tick once the catalog is fixed.
pub fn build_adapter(
    endpoints: VenueEndpoints,
    bus: Arc<MessageBus>,
    config: AdapterConfig,
) -> AdapterResult<Arc<ExchangeAdapter>> {
    let venue = Venue::parse(&endpoints.name)?;
    debug!(%venue, "building adapter");
    Ok(Arc::new(ExchangeAdapter::new(venue, endpoints, bus, config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_unknown_venues() {
        let bus = Arc::new(MessageBus::new());
        let make = |name: &str| VenueEndpoints {
            name: name.to_string(),
            base_url: String::new(),
            ws_url: Some("ws://127.0.0.1:1".into()),
        };

        let adapter = build_adapter(make("Binance"), Arc::clone(&bus), AdapterConfig::default());
        assert_eq!(adapter.unwrap().venue(), Venue::Binance);

        assert!(build_adapter(make("okx"), bus, AdapterConfig::default()).is_err());
    }
}
