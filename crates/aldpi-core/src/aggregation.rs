//! Fold anonymized telemetry into per-district watchlist entries

use std::collections::{BTreeMap, HashMap};

use crate::model::{AnonymizedPoint, DistrictRiskEntry, RiskBands};

/// One entry per district, using its most recent reading
///
/// When two readings share the latest timestamp the larger LFI wins.
/// `names` maps district ids to display names; unknown ids use the id.
/// Output is in district id order; rank it to get the watchlist.
pub fn aggregate_districts(
    points: &[AnonymizedPoint],
    names: &HashMap<String, String>,
    bands: &RiskBands,
) -> Vec<DistrictRiskEntry> {
    let mut latest: BTreeMap<&str, &AnonymizedPoint> = BTreeMap::new();

    for point in points {
        latest
            .entry(point.district_id.as_str())
            .and_modify(|current| {
                let newer = point.recorded_at > current.recorded_at;
                let same_time_higher =
                    point.recorded_at == current.recorded_at && point.lfi > current.lfi;
                if newer || same_time_higher {
                    *current = point;
                }
            })
            .or_insert(point);
    }

    latest
        .into_values()
        .map(|point| {
            let name = names
                .get(&point.district_id)
                .cloned()
                .unwrap_or_else(|| point.district_id.clone());
            DistrictRiskEntry::with_bands(point.district_id.clone(), name, point.lfi, bands)
        })
        .collect()
}
