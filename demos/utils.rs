use chrono::{DateTime, Duration};
use pm_backtest::engine::{ObservationBuilder, PriceObservation};

/// Generates deterministic hourly observations for `markets`, interleaved by time.
pub fn generate_sample_observations(markets: &[&str], hours: i64, seed: i32) -> Vec<PriceObservation> {
    let start = DateTime::from_timestamp_secs(1_704_067_200).unwrap();

    (0..hours)
        .flat_map(move |i| {
            markets.iter().enumerate().map(move |(m, market_id)| {
                let phase = (seed + m as i32) as f64;
                // Mean-reverting oscillation around 50c, slowly widening
                let swing = 0.15 + 0.25 * ((i as f64) / (hours as f64));
                let price = (0.5 + swing * (i as f64 * 0.07 + phase).sin()).clamp(0.01, 0.99);
                // Volume with seasonal pattern
                let volume = 1_000.0 + 500.0 * ((i as f64 * 0.2 + phase).sin()).abs();

                ObservationBuilder::builder()
                    .market_id(*market_id)
                    .timestamp(start + Duration::hours(i))
                    .price(price)
                    .volume(volume)
                    .liquidity(volume * 0.25)
                    .build()
                    .unwrap()
            })
        })
        .collect()
}

pub fn example_observations() -> Vec<PriceObservation> {
    generate_sample_observations(&["rain-nyc", "fed-cut-march", "btc-100k"], 24 * 60, 42)
}
