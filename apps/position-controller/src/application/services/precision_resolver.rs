//! Precision Resolver Service
//!
//! Per-symbol cache of exchange quantity/price grids.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::application::ports::ExchangePort;
use crate::domain::precision::PrecisionProfile;
use crate::domain::shared::Symbol;

/// Resolves and caches [`PrecisionProfile`]s.
///
/// A profile is resolved once per symbol and then served from memory.
/// Lookup failures fall back to [`PrecisionProfile::default`], which is cached
/// as well, so callers never see an error.
pub struct PrecisionResolver<E: ExchangePort> {
    exchange: Arc<E>,
    cache: RwLock<HashMap<Symbol, PrecisionProfile>>,
}

impl<E: ExchangePort> PrecisionResolver<E> {
    /// Create an empty resolver.
    pub fn new(exchange: Arc<E>) -> Self {
        Self {
            exchange,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Profile for `symbol`.
    ///
    /// With `dynamic` off the fallback profile is used without asking the
    /// exchange.
    pub async fn resolve(&self, symbol: &Symbol, dynamic: bool) -> PrecisionProfile {
        let key = Symbol::new(symbol.as_str());
        let cached = self.cache.read().get(&key).cloned();
        if let Some(profile) = cached {
            return profile;
        }

        let profile = if dynamic {
            self.fetch(&key).await
        } else {
            PrecisionProfile::default()
        };

        self.cache
            .write()
            .entry(key)
            .or_insert(profile)
            .clone()
    }

    /// Cached profile for `symbol`, if any.
    pub fn cached(&self, symbol: &Symbol) -> Option<PrecisionProfile> {
        self.cache.read().get(symbol).cloned()
    }

    /// Drop every cached profile.
    pub fn clear(&self) {
        self.cache.write().clear();
    }

    async fn fetch(&self, symbol: &Symbol) -> PrecisionProfile {
        match self.exchange.symbol_filters(symbol).await {
            Ok(filters) => PrecisionProfile::from_filters(
                filters.step_size,
                filters.market_step_size,
                filters.tick_size,
            )
            .map_or_else(
                || {
                    tracing::warn!(
                        symbol = %symbol,
                        step_size = ?filters.step_size,
                        market_step_size = ?filters.market_step_size,
                        tick_size = ?filters.tick_size,
                        "Incomplete exchange filters, using default precision"
                    );
                    PrecisionProfile::default()
                },
                |profile| {
                    tracing::info!(
                        symbol = %symbol,
                        step_size = %profile.step_size,
                        market_step_size = %profile.market_step_size,
                        tick_size = %profile.tick_size,
                        "Resolved precision"
                    );
                    profile
                },
            ),
            Err(e) => {
                tracing::warn!(
                    symbol = %symbol,
                    error = %e,
                    "Precision lookup failed, using default precision"
                );
                PrecisionProfile::default()
            }
        }
    }
}
