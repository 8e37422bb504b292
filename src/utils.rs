use crate::engine::PriceObservation;

#[cfg(feature = "serde")]
use crate::errors::{Error, Result};
#[cfg(feature = "serde")]
use serde::Deserialize;

/// Returns `true` when every market's observations are in ascending time order.
///
/// The engine relies on this ordering and does not check it.
pub fn is_time_ordered(observations: &[PriceObservation]) -> bool {
    use std::collections::HashMap;

    let mut last_seen = HashMap::new();
    observations.iter().all(|observation| {
        let timestamp = observation.timestamp();
        match last_seen.insert(observation.market_id(), timestamp) {
            Some(previous) => previous <= timestamp,
            None => true,
        }
    })
}

/// Splits observations into per-market streams, keeping global indices.
/// Markets are returned in order of first appearance.
#[cfg(feature = "optimizer")]
pub(crate) fn partition_by_market(observations: &[PriceObservation]) -> Vec<Vec<(usize, &PriceObservation)>> {
    use std::collections::HashMap;

    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut markets: Vec<Vec<(usize, &PriceObservation)>> = Vec::new();
    for (index, observation) in observations.iter().enumerate() {
        let slot = *slots.entry(observation.market_id()).or_insert_with(|| {
            markets.push(Vec::new());
            markets.len() - 1
        });
        markets[slot].push((index, observation));
    }
    markets
}

// {"history": [{"t": 1697875200, "p": 0.535}, {"t": 1697878800, "p": 0.54}]}
#[cfg(feature = "serde")]
#[derive(Debug, Deserialize)]
struct PriceHistory {
    history: Vec<HistoryPoint>,
}

#[cfg(feature = "serde")]
#[derive(Debug, Deserialize)]
struct HistoryPoint {
    #[serde(alias = "timestamp")]
    t: i64,
    #[serde(alias = "price")]
    p: f64,
}

/// Reads a prices-history document (`{"history": [{"t": .., "p": ..}]}`,
/// unix seconds) from `filepath` and tags every point with `market_id`.
#[cfg(feature = "serde")]
pub fn get_observations_from_file(
    filepath: impl AsRef<std::path::Path>,
    market_id: &str,
) -> Result<Vec<PriceObservation>> {
    use std::{fs::File, io::BufReader};

    let file = File::open(filepath)?;
    let reader = BufReader::new(file);
    let history: PriceHistory = serde_json::from_reader(reader)?;

    history
        .history
        .into_iter()
        .map(|point| {
            let timestamp = chrono::DateTime::from_timestamp(point.t, 0)
                .ok_or_else(|| Error::InvalidObservation(format!("timestamp {} out of range", point.t)))?;
            Ok(PriceObservation::from((market_id, timestamp, point.p)))
        })
        .collect()
}

/// Reads a JSON array of observations.
#[cfg(feature = "serde")]
pub fn get_observations_from_reader<R: std::io::Read>(reader: R) -> Result<Vec<PriceObservation>> {
    serde_json::from_reader(reader).map_err(Error::from)
}

/// Writes `value` as pretty JSON to `filepath`.
#[cfg(feature = "serde")]
pub fn write_json<T: serde::Serialize + ?Sized>(filepath: impl AsRef<std::path::Path>, value: &T) -> Result<()> {
    use std::{fs::File, io::BufWriter};

    let file = File::create(filepath)?;
    serde_json::to_writer_pretty(BufWriter::new(file), value).map_err(Error::from)
}
