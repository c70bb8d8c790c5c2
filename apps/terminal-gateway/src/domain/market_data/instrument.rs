//! Tradable instruments and the symbol catalog.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::Resolution;
use crate::domain::shared::Symbol;

/// Asset class of an instrument. Drives session hours and quote routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentClass {
    /// Listed equity.
    Stock,
    /// Cryptocurrency pair.
    Crypto,
    /// Currency pair.
    Forex,
    /// Metals and other commodities.
    Commodity,
}

impl InstrumentClass {
    /// Symbol type string reported to the chart.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stock => "stock",
            Self::Crypto => "crypto",
            Self::Forex => "forex",
            Self::Commodity => "commodity",
        }
    }

    /// True when the market never closes.
    #[must_use]
    pub const fn trades_around_the_clock(self) -> bool {
        !matches!(self, Self::Stock)
    }
}

impl fmt::Display for InstrumentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const fn default_contract_size() -> Decimal {
    Decimal::ONE
}

const fn default_leverage() -> Decimal {
    Decimal::ONE
}

/// Static metadata for one tradable symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    /// Ticker.
    pub symbol: Symbol,
    /// Human readable name.
    pub description: String,
    /// Listing venue.
    pub exchange: String,
    /// Asset class.
    pub class: InstrumentClass,
    /// Price scale, `10^decimals`.
    pub pricescale: u32,
    /// Seed price for synthetic quotes and history.
    pub base_price: Decimal,
    /// Units per contract, used in margin.
    #[serde(default = "default_contract_size")]
    pub contract_size: Decimal,
    /// Leverage applied when a position does not carry its own.
    #[serde(default = "default_leverage")]
    pub default_leverage: Decimal,
}

impl Instrument {
    /// Trading session in chart notation.
    #[must_use]
    pub const fn session(&self) -> &'static str {
        if self.class.trades_around_the_clock() {
            "24x7"
        } else {
            "0930-1600"
        }
    }

    /// IANA timezone of the session.
    #[must_use]
    pub const fn timezone(&self) -> &'static str {
        if self.class.trades_around_the_clock() {
            "Etc/UTC"
        } else {
            "America/New_York"
        }
    }

    /// Number of decimals implied by the pricescale.
    #[must_use]
    pub const fn price_decimals(&self) -> u32 {
        let mut scale = self.pricescale;
        let mut decimals = 0;
        while scale >= 10 {
            scale /= 10;
            decimals += 1;
        }
        decimals
    }

    /// Round a price to the instrument's tick precision.
    #[must_use]
    pub fn round_price(&self, price: Decimal) -> Decimal {
        price.round_dp(self.price_decimals())
    }

    /// Resolutions the chart may request for this instrument.
    #[must_use]
    pub fn supported_resolutions(&self) -> Vec<Resolution> {
        Resolution::ALL.to_vec()
    }

    /// Volume precision reported to the chart.
    #[must_use]
    pub const fn volume_precision(&self) -> u32 {
        match self.class {
            InstrumentClass::Crypto => 4,
            _ => 0,
        }
    }
}

/// Catalog of every symbol the gateway can resolve.
#[derive(Debug, Clone, Default)]
pub struct InstrumentCatalog {
    instruments: BTreeMap<Symbol, Instrument>,
}

impl InstrumentCatalog {
    /// Build a catalog from a list of instruments. Later entries win.
    #[must_use]
    pub fn new(instruments: impl IntoIterator<Item = Instrument>) -> Self {
        let mut catalog = Self::default();
        catalog.extend(instruments);
        catalog
    }

    /// The built-in stock, crypto, forex and commodity universe.
    #[must_use]
    pub fn builtin() -> Self {
        let stocks = [
            ("AAPL", "Apple Inc.", "NASDAQ", dec!(250)),
            ("MSFT", "Microsoft Corporation", "NASDAQ", dec!(420)),
            ("GOOGL", "Alphabet Inc.", "NASDAQ", dec!(175)),
            ("AMZN", "Amazon.com Inc.", "NASDAQ", dec!(200)),
            ("NVDA", "NVIDIA Corporation", "NASDAQ", dec!(850)),
            ("META", "Meta Platforms Inc.", "NASDAQ", dec!(550)),
            ("TSLA", "Tesla Inc.", "NASDAQ", dec!(250)),
            ("JPM", "JPMorgan Chase & Co.", "NYSE", dec!(200)),
            ("V", "Visa Inc.", "NYSE", dec!(280)),
            ("WMT", "Walmart Inc.", "NYSE", dec!(165)),
            ("NFLX", "Netflix Inc.", "NASDAQ", dec!(700)),
            ("DIS", "The Walt Disney Company", "NYSE", dec!(110)),
            ("AMD", "Advanced Micro Devices Inc.", "NASDAQ", dec!(150)),
            ("INTC", "Intel Corporation", "NASDAQ", dec!(45)),
            ("BA", "The Boeing Company", "NYSE", dec!(180)),
        ];
        let crypto = [
            ("BTCUSD", "Bitcoin / US Dollar", dec!(95000), dec!(2)),
            ("ETHUSD", "Ethereum / US Dollar", dec!(3200), dec!(2)),
            ("SOLUSD", "Solana / US Dollar", dec!(180), dec!(2)),
        ];

        let mut instruments: Vec<Instrument> = stocks
            .into_iter()
            .map(|(symbol, description, exchange, base_price)| Instrument {
                symbol: Symbol::new(symbol),
                description: description.to_string(),
                exchange: exchange.to_string(),
                class: InstrumentClass::Stock,
                pricescale: 100,
                base_price,
                contract_size: Decimal::ONE,
                default_leverage: Decimal::ONE,
            })
            .collect();

        instruments.extend(crypto.into_iter().map(
            |(symbol, description, base_price, leverage)| Instrument {
                symbol: Symbol::new(symbol),
                description: description.to_string(),
                exchange: "CRYPTO".to_string(),
                class: InstrumentClass::Crypto,
                pricescale: 100,
                base_price,
                contract_size: Decimal::ONE,
                default_leverage: leverage,
            },
        ));

        let fx = [
            ("EURUSD", "Euro / US Dollar", 100_000, dec!(1.08)),
            ("GBPUSD", "British Pound / US Dollar", 100_000, dec!(1.27)),
            ("USDJPY", "US Dollar / Japanese Yen", 1_000, dec!(149.5)),
        ];
        instruments.extend(
            fx.into_iter()
                .map(|(symbol, description, pricescale, base_price)| Instrument {
                    symbol: Symbol::new(symbol),
                    description: description.to_string(),
                    exchange: "FOREX".to_string(),
                    class: InstrumentClass::Forex,
                    pricescale,
                    base_price,
                    contract_size: dec!(100000),
                    default_leverage: dec!(100),
                }),
        );

        let metals = [
            ("XAUUSD", "Gold / US Dollar", 100, dec!(2020), dec!(100)),
            ("XAGUSD", "Silver / US Dollar", 1_000, dec!(23.5), dec!(5000)),
        ];
        instruments.extend(metals.into_iter().map(
            |(symbol, description, pricescale, base_price, contract_size)| Instrument {
                symbol: Symbol::new(symbol),
                description: description.to_string(),
                exchange: "COMMODITY".to_string(),
                class: InstrumentClass::Commodity,
                pricescale,
                base_price,
                contract_size,
                default_leverage: dec!(20),
            },
        ));

        Self::new(instruments)
    }

    /// Add or replace instruments.
    pub fn extend(&mut self, instruments: impl IntoIterator<Item = Instrument>) {
        for instrument in instruments {
            self.instruments.insert(instrument.symbol.clone(), instrument);
        }
    }

    /// Look up an instrument by symbol.
    #[must_use]
    pub fn get(&self, symbol: &Symbol) -> Option<&Instrument> {
        self.instruments.get(symbol)
    }

    /// All instruments in symbol order.
    pub fn iter(&self) -> impl Iterator<Item = &Instrument> {
        self.instruments.values()
    }

    /// Number of instruments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    /// True when the catalog holds no instruments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Distinct exchanges in the catalog.
    #[must_use]
    pub fn exchanges(&self) -> Vec<String> {
        let mut exchanges: Vec<String> = self.iter().map(|i| i.exchange.clone()).collect();
        exchanges.sort();
        exchanges.dedup();
        exchanges
    }

    /// Case-insensitive match on symbol or description.
    ///
    /// Empty `exchange` or `class` filters match everything.
    #[must_use]
    pub fn search(
        &self,
        query: &str,
        exchange: Option<&str>,
        class: Option<InstrumentClass>,
    ) -> Vec<&Instrument> {
        let needle = query.trim().to_uppercase();
        let exchange = exchange.map(str::trim).filter(|e| !e.is_empty());
        self.iter()
            .filter(|i| {
                needle.is_empty()
                    || i.symbol.as_str().contains(&needle)
                    || i.description.to_uppercase().contains(&needle)
            })
            .filter(|i| exchange.is_none_or(|e| i.exchange.eq_ignore_ascii_case(e)))
            .filter(|i| class.is_none_or(|c| i.class == c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_covers_all_classes() {
        let catalog = InstrumentCatalog::builtin();
        assert_eq!(catalog.len(), 23);
        assert!(catalog.get(&Symbol::new("aapl")).is_some());
        assert_eq!(
            catalog.get(&Symbol::new("EURUSD")).unwrap().class,
            InstrumentClass::Forex
        );
        assert_eq!(
            catalog.exchanges(),
            vec!["COMMODITY", "CRYPTO", "FOREX", "NASDAQ", "NYSE"]
        );
    }

    #[test]
    fn session_follows_class() {
        let catalog = InstrumentCatalog::builtin();
        let aapl = catalog.get(&Symbol::new("AAPL")).unwrap();
        assert_eq!(aapl.session(), "0930-1600");
        assert_eq!(aapl.timezone(), "America/New_York");

        let btc = catalog.get(&Symbol::new("BTCUSD")).unwrap();
        assert_eq!(btc.session(), "24x7");
        assert_eq!(btc.timezone(), "Etc/UTC");
    }

    #[test]
    fn price_decimals_from_pricescale() {
        let catalog = InstrumentCatalog::builtin();
        let eur = catalog.get(&Symbol::new("EURUSD")).unwrap();
        assert_eq!(eur.price_decimals(), 5);
        assert_eq!(eur.round_price(dec!(1.0812345)), dec!(1.08123));

        let jpy = catalog.get(&Symbol::new("USDJPY")).unwrap();
        assert_eq!(jpy.price_decimals(), 3);
    }

    #[test]
    fn search_matches_symbol_and_description() {
        let catalog = InstrumentCatalog::builtin();

        let by_symbol: Vec<_> = catalog.search("btc", None, None);
        assert_eq!(by_symbol.len(), 1);

        let by_name = catalog.search("tesla", None, None);
        assert_eq!(by_name[0].symbol.as_str(), "TSLA");

        let nyse = catalog.search("", Some("nyse"), None);
        assert!(nyse.iter().all(|i| i.exchange == "NYSE"));
        assert_eq!(nyse.len(), 5);

        let crypto = catalog.search("", Some(""), Some(InstrumentClass::Crypto));
        assert_eq!(crypto.len(), 3);
    }

    #[test]
    fn extend_replaces_existing_symbol() {
        let mut catalog = InstrumentCatalog::builtin();
        let mut custom = catalog.get(&Symbol::new("AAPL")).unwrap().clone();
        custom.base_price = dec!(1);
        catalog.extend([custom]);
        assert_eq!(catalog.get(&Symbol::new("AAPL")).unwrap().base_price, dec!(1));
        assert_eq!(catalog.len(), 23);
    }
}
