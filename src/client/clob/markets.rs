//! Market discovery endpoints.

use tracing::{instrument, trace};

use super::types::{Market, MarketsPage};
use super::Client;
use crate::error::Result;

fn paged_path(base: &str, next_cursor: &str) -> String {
    if next_cursor.is_empty() {
        base.to_string()
    } else {
        format!("{}?next_cursor={}", base, next_cursor)
    }
}

impl Client {
    /// One page of the full market listing.
    #[instrument(skip(self), level = "trace")]
    pub async fn get_markets(&self, next_cursor: &str) -> Result<MarketsPage> {
        let page: MarketsPage = self.get_json(&paged_path("/markets", next_cursor)).await?;
        trace!(count = page.data.len(), "received markets");
        Ok(page)
    }

    /// A single market by condition ID.
    #[instrument(skip(self), level = "trace")]
    pub async fn get_market(&self, condition_id: &str) -> Result<Market> {
        let market: Market = self.get_json(&format!("/markets/{}", condition_id)).await?;
        trace!(condition_id = %market.condition_id, "received market");
        Ok(market)
    }

    /// Markets currently eligible for reward sampling.
    #[instrument(skip(self), level = "trace")]
    pub async fn get_sampling_markets(&self, next_cursor: &str) -> Result<MarketsPage> {
        self.get_json(&paged_path("/sampling-markets", next_cursor))
            .await
    }

    /// Reduced market records (tokens and flags only).
    #[instrument(skip(self), level = "trace")]
    pub async fn get_simplified_markets(&self, next_cursor: &str) -> Result<MarketsPage> {
        self.get_json(&paged_path("/simplified-markets", next_cursor))
            .await
    }

    /// Reduced records for sampling-eligible markets.
    #[instrument(skip(self), level = "trace")]
    pub async fn get_sampling_simplified_markets(&self, next_cursor: &str) -> Result<MarketsPage> {
        self.get_json(&paged_path("/sampling-simplified-markets", next_cursor))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paged_path() {
        assert_eq!(paged_path("/markets", ""), "/markets");
        assert_eq!(paged_path("/markets", "MA=="), "/markets?next_cursor=MA==");
    }
}
