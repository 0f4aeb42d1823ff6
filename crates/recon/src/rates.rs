//! Rate table: zone → (fixed fee, additional fee).
//!
//! Rate cards arrive in three shapes and all end up as the same mapping:
//!
//! - *wide*: a single data row whose columns are named
//!   `<prefix>_<zone>_fixed` / `<prefix>_<zone>_additional`
//! - *long*: one row per zone with `zone,fixed,additional` columns
//! - *inline*: `[rates.zones.<zone>]` tables in the run config

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::InlineRate;
use crate::error::{ReconError, RowError};
use crate::money::parse_amount_minor;

const WIDE_SOURCE: &str = "rate card (wide)";
const LONG_SOURCE: &str = "rate card (long)";

/// Fees for one zone, in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ZoneRate {
    /// Charge for the base slab (up to 0.5 kg).
    pub fixed_minor: i64,
    /// Charge per extra half-kilogram slab.
    pub additional_minor: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RateCard {
    zones: BTreeMap<String, ZoneRate>,
}

impl RateCard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, zone: impl Into<String>, rate: ZoneRate) -> Option<ZoneRate> {
        self.zones.insert(zone.into(), rate)
    }

    /// Look up the fees for a zone. Unknown zones are a per-row error.
    pub fn rate_for(&self, zone: &str) -> Result<ZoneRate, RowError> {
        self.zones
            .get(zone)
            .copied()
            .ok_or_else(|| RowError::MissingZoneRate { zone: zone.to_string() })
    }

    pub fn zones(&self) -> impl Iterator<Item = (&str, &ZoneRate)> {
        self.zones.iter().map(|(z, r)| (z.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Parse a wide, single-row rate card.
    pub fn from_wide_csv(csv_data: &str, prefix: &str) -> Result<Self, ReconError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(csv_data.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| ReconError::Io(e.to_string()))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        // zone -> (fixed column idx, additional column idx)
        let mut columns: BTreeMap<String, (Option<usize>, Option<usize>)> = BTreeMap::new();
        let lead = format!("{prefix}_");
        for (i, h) in headers.iter().enumerate() {
            let Some(rest) = h.strip_prefix(&lead) else {
                continue;
            };
            if let Some(zone) = rest.strip_suffix("_fixed") {
                columns.entry(zone.to_string()).or_default().0 = Some(i);
            } else if let Some(zone) = rest.strip_suffix("_additional") {
                columns.entry(zone.to_string()).or_default().1 = Some(i);
            }
        }

        if columns.is_empty() {
            return Err(ReconError::SchemaMismatch {
                source: WIDE_SOURCE.into(),
                column: format!("{prefix}_<zone>_fixed"),
            });
        }

        for (zone, (fixed, additional)) in &columns {
            if fixed.is_none() {
                return Err(ReconError::SchemaMismatch {
                    source: WIDE_SOURCE.into(),
                    column: format!("{prefix}_{zone}_fixed"),
                });
            }
            if additional.is_none() {
                return Err(ReconError::SchemaMismatch {
                    source: WIDE_SOURCE.into(),
                    column: format!("{prefix}_{zone}_additional"),
                });
            }
        }

        let records = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ReconError::Io(e.to_string()))?;
        if records.len() != 1 {
            return Err(ReconError::ConfigValidation(format!(
                "wide rate card must have exactly one data row, found {}",
                records.len()
            )));
        }
        let record = &records[0];

        let mut card = RateCard::new();
        for (zone, (fixed, additional)) in columns {
            // Both indices were checked above.
            let (Some(fi), Some(ai)) = (fixed, additional) else {
                continue;
            };
            let rate = ZoneRate {
                fixed_minor: parse_fee(&zone, "fixed", record.get(fi).unwrap_or(""))?,
                additional_minor: parse_fee(&zone, "additional", record.get(ai).unwrap_or(""))?,
            };
            card.insert(zone, rate);
        }
        Ok(card)
    }

    /// Parse a long rate card: one `zone,fixed,additional` row per zone.
    pub fn from_long_csv(csv_data: &str) -> Result<Self, ReconError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(csv_data.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| ReconError::Io(e.to_string()))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let idx = |name: &str| -> Result<usize, ReconError> {
            headers.iter().position(|h| h == name).ok_or_else(|| ReconError::SchemaMismatch {
                source: LONG_SOURCE.into(),
                column: name.into(),
            })
        };
        let zone_idx = idx("zone")?;
        let fixed_idx = idx("fixed")?;
        let additional_idx = idx("additional")?;

        let mut card = RateCard::new();
        for record in reader.records() {
            let record = record.map_err(|e| ReconError::Io(e.to_string()))?;
            let zone = record.get(zone_idx).unwrap_or("").to_string();
            if zone.is_empty() {
                return Err(ReconError::ConfigValidation("rate card row with empty zone".into()));
            }
            let rate = ZoneRate {
                fixed_minor: parse_fee(&zone, "fixed", record.get(fixed_idx).unwrap_or(""))?,
                additional_minor: parse_fee(&zone, "additional", record.get(additional_idx).unwrap_or(""))?,
            };
            if card.insert(zone.clone(), rate).is_some() {
                return Err(ReconError::ConfigValidation(format!(
                    "rate card lists zone '{zone}' more than once"
                )));
            }
        }
        Ok(card)
    }

    /// Build a rate card from `[rates.zones.*]` config tables.
    pub fn from_inline(zones: &BTreeMap<String, InlineRate>) -> Result<Self, ReconError> {
        let mut card = RateCard::new();
        for (zone, rate) in zones {
            card.insert(
                zone.clone(),
                ZoneRate {
                    fixed_minor: parse_fee(zone, "fixed", &rate.fixed)?,
                    additional_minor: parse_fee(zone, "additional", &rate.additional)?,
                },
            );
        }
        Ok(card)
    }
}

fn parse_fee(zone: &str, field: &str, value: &str) -> Result<i64, ReconError> {
    let err = || ReconError::RateParse {
        zone: zone.into(),
        field: field.into(),
        value: value.into(),
    };
    let minor = parse_amount_minor(value).map_err(|_| err())?;
    if minor < 0 {
        return Err(err());
    }
    Ok(minor)
}
