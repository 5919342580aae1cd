use ccrawler_common::QuoteRecord;

/// Orders a snapshot by symbol, byte-wise ascending.
///
/// `sort_by` is stable, so records sharing a symbol keep their source order.
/// That makes the generated insert statement reproducible for a given fetch.
pub fn normalize(mut quotes: Vec<QuoteRecord>) -> Vec<QuoteRecord> {
    quotes.sort_by(|a, b| a.symbol.as_bytes().cmp(b.symbol.as_bytes()));
    quotes
}
