// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Scripted provider for development mode and tests
//!
//! [`StaticProvider`] answers every [`Endpoint`] from a table of scripted
//! responses keyed by [`Endpoint::name`], so address-scoped endpoints share a
//! script regardless of the queried address. Every call is counted, which lets
//! tests assert how many upstream fan-outs actually happened.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::{Value, json};
use tracing::debug;

use crate::{Endpoint, HealthStatus, ProviderClient, ProviderError, RawResponse};

const DEFAULT_STATIC_TIMEOUT: Duration = Duration::from_secs(8);

/// Scripted outcome for one endpoint
#[derive(Debug, Clone, PartialEq)]
pub enum StaticResponse {
    /// 200 with the given JSON body
    Json(Value),
    /// Non-2xx status with an empty body
    Status(u16),
    /// Connection-level failure
    NetworkError(String),
    /// No answer within the provider timeout
    Timeout,
    /// 200 with a body that is not JSON
    Malformed,
    /// Wait before producing the inner outcome
    Delayed(Duration, Box<StaticResponse>),
}

impl StaticResponse {
    /// Shorthand for [`StaticResponse::Json`]
    pub fn json(body: Value) -> Self {
        Self::Json(body)
    }

    /// Wrap this outcome in a delay
    #[must_use]
    pub fn after(self, delay: Duration) -> Self {
        Self::Delayed(delay, Box::new(self))
    }
}

/// Provider serving scripted responses
#[derive(Debug)]
pub struct StaticProvider {
    responses: DashMap<&'static str, StaticResponse>,
    calls: DashMap<&'static str, usize>,
    timeout: Duration,
}

impl Default for StaticProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticProvider {
    /// Create a provider with no scripted responses; every call answers 404
    pub fn new() -> Self {
        Self {
            responses: DashMap::new(),
            calls: DashMap::new(),
            timeout: DEFAULT_STATIC_TIMEOUT,
        }
    }

    /// Create a provider answering every endpoint with realistic canned data
    pub fn demo() -> Self {
        let provider = Self::new();
        for (name, body) in demo_bodies() {
            provider.responses.insert(name, StaticResponse::Json(body));
        }
        provider
    }

    /// Script the response of an endpoint
    #[must_use]
    pub fn with_response(self, endpoint: &Endpoint, response: StaticResponse) -> Self {
        self.set_response(endpoint, response);
        self
    }

    /// Script the same response for several endpoints
    #[must_use]
    pub fn with_responses(self, endpoints: &[Endpoint], response: &StaticResponse) -> Self {
        for endpoint in endpoints {
            self.set_response(endpoint, response.clone());
        }
        self
    }

    /// Set the duration after which [`StaticResponse::Timeout`] fails
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the scripted response of an endpoint on a shared provider
    pub fn set_response(&self, endpoint: &Endpoint, response: StaticResponse) {
        self.responses.insert(endpoint.name(), response);
    }

    /// Number of calls made to an endpoint
    pub fn call_count(&self, endpoint: &Endpoint) -> usize {
        self.calls.get(endpoint.name()).map_or(0, |count| *count)
    }

    /// Number of calls made to any endpoint
    pub fn total_calls(&self) -> usize {
        self.calls.iter().map(|entry| *entry.value()).sum()
    }

    fn settle(&self, response: StaticResponse, started: Instant) -> Result<RawResponse, ProviderError> {
        match response {
            StaticResponse::Json(body) => Ok(RawResponse::ok(body, started.elapsed())),
            StaticResponse::Status(status) => Err(ProviderError::Http {
                status,
                message: "scripted status".to_string(),
            }),
            StaticResponse::NetworkError(message) => Err(ProviderError::Network { message }),
            StaticResponse::Malformed => Err(ProviderError::Decode {
                message: "expected value at line 1 column 1".to_string(),
            }),
            StaticResponse::Timeout => Err(ProviderError::Timeout {
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
            StaticResponse::Delayed(_, inner) => self.settle(*inner, started),
        }
    }
}

impl ProviderClient for StaticProvider {
    async fn fetch(&self, endpoint: &Endpoint) -> Result<RawResponse, ProviderError> {
        let started = Instant::now();
        *self.calls.entry(endpoint.name()).or_insert(0) += 1;

        let Some(mut response) = self
            .responses
            .get(endpoint.name())
            .map(|entry| entry.value().clone())
        else {
            debug!(endpoint = %endpoint, "no scripted response");
            return Err(ProviderError::Http {
                status: 404,
                message: format!("no scripted response for {}", endpoint.name()),
            });
        };

        loop {
            match response {
                StaticResponse::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    response = *inner;
                }
                StaticResponse::Timeout => {
                    tokio::time::sleep(self.timeout).await;
                    return self.settle(StaticResponse::Timeout, started);
                }
                other => return self.settle(other, started),
            }
        }
    }

    async fn health_check(&self) -> Result<HealthStatus, ProviderError> {
        Ok(HealthStatus::Up)
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

fn demo_bodies() -> Vec<(&'static str, Value)> {
    vec![
        (
            "recommended_fees",
            json!({
                "fastestFee": 42,
                "halfHourFee": 28,
                "hourFee": 17,
                "economyFee": 9,
                "minimumFee": 4
            }),
        ),
        (
            "mempool_stats",
            json!({
                "count": 48_213,
                "vsize": 31_876_543,
                "total_fee": 58_123_401
            }),
        ),
        (
            "projected_blocks",
            json!([
                { "blockSize": 1_612_345, "blockVSize": 997_912.5, "nTx": 3211, "medianFee": 31.4 },
                { "blockSize": 1_589_002, "blockVSize": 998_004.0, "nTx": 2987, "medianFee": 19.9 }
            ]),
        ),
        (
            "recent_transactions",
            json!([
                { "txid": "5e1c0f1e4a8b3d2f9c7e6a5b4d3c2b1a0f9e8d7c6b5a4f3e2d1c0b9a8f7e6d5c", "fee": 4_512, "vsize": 141, "value": 1_250_000 },
                { "txid": "9a8b7c6d5e4f3a2b1c0d9e8f7a6b5c4d3e2f1a0b9c8d7e6f5a4b3c2d1e0f9a8b", "fee": 2_870, "vsize": 110, "value": 84_000 },
                { "txid": "0f1e2d3c4b5a69788796a5b4c3d2e1f00f1e2d3c4b5a69788796a5b4c3d2e1f0", "fee": 18_904, "vsize": 562, "value": 9_870_112 }
            ]),
        ),
        (
            "recent_blocks",
            json!([
                {
                    "id": "00000000000000000001a2b3c4d5e6f708192a3b4c5d6e7f8091a2b3c4d5e6f7",
                    "height": 867_530,
                    "timestamp": 1_730_000_000,
                    "size": 1_598_221,
                    "weight": 3_992_817,
                    "tx_count": 3_402
                },
                {
                    "id": "000000000000000000027f6e5d4c3b2a1908f7e6d5c4b3a29180f7e6d5c4b3a2",
                    "height": 867_529,
                    "timestamp": 1_729_999_412,
                    "size": 1_701_930,
                    "weight": 3_993_101,
                    "tx_count": 2_988
                }
            ]),
        ),
        (
            "hashrate",
            json!({
                "hashrates": [
                    { "timestamp": 1_729_740_800, "avgHashrate": 6.42e20 },
                    { "timestamp": 1_729_827_200, "avgHashrate": 6.55e20 },
                    { "timestamp": 1_729_913_600, "avgHashrate": 6.61e20 }
                ],
                "currentHashrate": 6.58e20,
                "currentDifficulty": 95_672_703_408_224.0
            }),
        ),
        (
            "difficulty_adjustment",
            json!({
                "difficulty": 95_672_703_408_224.0,
                "progressPercent": 63.45,
                "difficultyChange": 1.87,
                "estimatedRetargetDate": 1_730_640_000_000_i64,
                "remainingBlocks": 737,
                "remainingTime": 439_200_000
            }),
        ),
        (
            "mining_pools",
            json!({
                "blockCount": 1_008,
                "pools": [
                    { "name": "Foundry USA", "blockCount": 302 },
                    { "name": "AntPool", "blockCount": 241 },
                    { "name": "ViaBTC", "blockCount": 131 },
                    { "name": "F2Pool", "blockCount": 111 },
                    { "name": "MARA Pool", "blockCount": 52 }
                ]
            }),
        ),
        (
            "collections",
            json!({
                "results": [
                    { "name": "Bitcoin Puppets", "volume_24h": "21.7", "floor_price": "0.071", "holders": 4_431 },
                    { "name": "NodeMonkes", "volume_24h": "34.2", "floor_price": "0.089", "holders": 5_870 },
                    { "name": "Quantum Cats", "volume_24h": "8.9", "floor_price": "0.31", "holders": 2_144 },
                    { "name": "Runestone", "volume_24h": "15.3", "floor_price": "0.0042", "holders": 71_002 }
                ]
            }),
        ),
        (
            "runes",
            json!({
                "results": [
                    { "spaced_rune": "SATOSHI•NAKAMOTO", "volume_24h": 3.4, "price_sats": 112.0, "holders": 28_340 },
                    { "spaced_rune": "DOG•GO•TO•THE•MOON", "volume_24h": 41.8, "price_sats": 0.52, "holders": 91_877 },
                    { "spaced_rune": "RSIC•GENESIS•RUNE", "volume_24h": 6.1, "price_sats": 1.9, "holders": 33_120 },
                    { "spaced_rune": "PUPS•WORLD•PEACE", "volume_24h": 9.7, "price_sats": 7.3, "holders": 16_904 }
                ]
            }),
        ),
        (
            "address_inscriptions",
            json!({
                "total": 3,
                "results": [
                    { "id": "6fb976ab49dcec017f1e201e84395983204ae1a7c2abf7ced0a85d692e442799i0" },
                    { "id": "b61b0172d95e266c18aea0c624db987e971a5d6d4ebc2aaed85da4642d635735i0" },
                    { "id": "2a6a8f9b06e4b5a4f6d9e4e8c1f8d7e1a3b5c7d9e1f3a5b7c9d1e3f5a7b9c1d3i12" }
                ]
            }),
        ),
        (
            "address_runes",
            json!({
                "results": [
                    { "spaced_rune": "DOG•GO•TO•THE•MOON", "amount": "250000.00000" },
                    { "spaced_rune": "SATOSHI•NAKAMOTO", "amount": "1200" }
                ]
            }),
        ),
        (
            "btc_price",
            json!({
                "bitcoin": { "usd": 68_412.37, "usd_24h_change": -1.284 }
            }),
        ),
    ]
}
