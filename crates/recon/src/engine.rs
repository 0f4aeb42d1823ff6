use std::io::Read;

use crate::aggregate::build_aggregates;
use crate::charge::expected_for_rate;
use crate::classify::classify;
use crate::config::{ColumnMapping, RateFormat, RateSource, ReconConfig};
use crate::error::{ReconError, RowError};
use crate::model::{
    ChargedShipment, LoadedShipments, ReconInput, ReconMeta, ReconResult, ShipmentRecord, SkippedRow,
};
use crate::money::parse_amount_minor;
use crate::rates::RateCard;
use crate::slab::slab_for_grams;
use crate::summary::compute_summary;

const SHIPMENTS_SOURCE: &str = "shipments";

/// Run reconciliation per config. Returns priced rows, skipped rows,
/// summary and aggregates.
pub fn run(config: &ReconConfig, input: &ReconInput) -> Result<ReconResult, ReconError> {
    if input.rates.is_empty() {
        return Err(ReconError::ConfigValidation("rate card has no zones".into()));
    }

    let tolerance = config.tolerance.amount_minor;
    let (rows, mut skipped) = reconcile(&input.shipments.records, &input.rates, tolerance);

    // Loader rejections first, then pricing failures, both in file order.
    let mut all_skipped = input.shipments.rejected.clone();
    all_skipped.append(&mut skipped);
    all_skipped.sort_by_key(|s| s.line);

    if !all_skipped.is_empty() {
        log::warn!(
            "{}: {} row(s) skipped, excluded from totals",
            config.name,
            all_skipped.len()
        );
    }

    let summary = compute_summary(&rows, all_skipped.len());
    let aggregates = build_aggregates(&rows);

    log::info!(
        "{}: {} orders priced, {} correct, {} overcharged, {} undercharged",
        config.name,
        summary.total_orders,
        summary.correct,
        summary.overcharged,
        summary.undercharged,
    );

    Ok(ReconResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            tolerance_minor: tolerance,
            rate_zones: input.rates.len(),
        },
        summary,
        aggregates,
        rows,
        skipped: all_skipped,
    })
}

/// Price every record. Failures are collected, never fatal.
pub fn reconcile(
    records: &[ShipmentRecord],
    rates: &RateCard,
    tolerance_minor: i64,
) -> (Vec<ChargedShipment>, Vec<SkippedRow>) {
    let mut rows = Vec::with_capacity(records.len());
    let mut skipped = Vec::new();

    for record in records {
        match price_shipment(record, rates, tolerance_minor) {
            Ok(row) => rows.push(row),
            Err(error) => {
                log::debug!("line {} (order '{}'): {error}", record.line, record.order_id);
                skipped.push(SkippedRow {
                    line: record.line,
                    order_id: record.order_id.clone(),
                    error,
                });
            }
        }
    }

    (rows, skipped)
}

/// Slab, expected charge and discrepancy for one record.
pub fn price_shipment(
    record: &ShipmentRecord,
    rates: &RateCard,
    tolerance_minor: i64,
) -> Result<ChargedShipment, RowError> {
    let slab = slab_for_grams(record.weight_grams)?;
    let rate = rates.rate_for(&record.zone)?;
    let expected_minor = expected_for_rate(slab, &rate);
    let (difference_minor, discrepancy_class) =
        classify(record.billed_minor, expected_minor, tolerance_minor);

    Ok(ChargedShipment {
        line: record.line,
        order_id: record.order_id.clone(),
        zone: record.zone.clone(),
        shipment_type: record.shipment_type.clone(),
        weight_grams: record.weight_grams,
        weight_kg: record.weight_grams / 1000.0,
        weight_slab_kg: slab.kg(),
        billed_minor: record.billed_minor,
        expected_minor,
        difference_minor,
        discrepancy_class,
        slab,
    })
}

/// Load the joined shipment CSV, one record at a time. Missing columns are
/// fatal; unparseable weights or amounts only reject their own row.
pub fn load_shipment_rows<R: Read>(source: R, columns: &ColumnMapping) -> Result<LoadedShipments, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(source);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ReconError::Io(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let idx = |name: &str| -> Result<usize, ReconError> {
        headers.iter().position(|h| h == name).ok_or_else(|| ReconError::SchemaMismatch {
            source: SHIPMENTS_SOURCE.into(),
            column: name.into(),
        })
    };

    let order_id_idx = idx(&columns.order_id)?;
    let weight_idx = idx(&columns.weight_grams)?;
    let zone_idx = idx(&columns.zone)?;
    let shipment_type_idx = idx(&columns.shipment_type)?;
    let billed_idx = idx(&columns.billed_amount)?;

    let mut loaded = LoadedShipments::default();

    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ReconError::Io(e.to_string()))?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(i + 2);

        let field = |ix: usize| record.get(ix).unwrap_or("").trim();
        let order_id = field(order_id_idx).to_string();

        let weight_str = field(weight_idx);
        let weight_grams = match weight_str.parse::<f64>() {
            Ok(w) => w,
            Err(_) => {
                loaded.rejected.push(SkippedRow {
                    line,
                    order_id,
                    error: RowError::InvalidWeight { value: weight_str.into() },
                });
                continue;
            }
        };

        let billed_str = field(billed_idx);
        let billed_minor = match parse_amount_minor(billed_str) {
            Ok(m) => m,
            Err(_) => {
                loaded.rejected.push(SkippedRow {
                    line,
                    order_id,
                    error: RowError::InvalidAmount { value: billed_str.into() },
                });
                continue;
            }
        };

        loaded.records.push(ShipmentRecord {
            line,
            order_id,
            weight_grams,
            zone: field(zone_idx).to_string(),
            shipment_type: field(shipment_type_idx).to_string(),
            billed_minor,
        });
    }

    log::debug!(
        "loaded {} shipment row(s), {} rejected",
        loaded.records.len(),
        loaded.rejected.len()
    );
    Ok(loaded)
}

/// Build the rate card a config points at. `csv_data` is the contents of
/// `rates.file` and is ignored for inline rates.
pub fn load_rate_card(source: &RateSource, csv_data: Option<&str>) -> Result<RateCard, ReconError> {
    let card = match source.format {
        RateFormat::Inline => RateCard::from_inline(&source.zones)?,
        RateFormat::Wide | RateFormat::Long => {
            let data = csv_data.ok_or_else(|| {
                ReconError::ConfigValidation(format!(
                    "format = \"{}\" needs rate card CSV data",
                    source.format
                ))
            })?;
            if source.format == RateFormat::Wide {
                RateCard::from_wide_csv(data, &source.prefix)?
            } else {
                RateCard::from_long_csv(data)?
            }
        }
    };

    if card.is_empty() {
        return Err(ReconError::ConfigValidation("rate card has no zones".into()));
    }
    log::debug!("rate card ({}): {} zone(s)", source.format, card.len());
    Ok(card)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DiscrepancyClass;
    use crate::rates::ZoneRate;

    fn card_a() -> RateCard {
        let mut card = RateCard::new();
        card.insert("a", ZoneRate { fixed_minor: 3000, additional_minor: 2000 });
        card
    }

    fn record(line: usize, grams: f64, zone: &str, billed: i64) -> ShipmentRecord {
        ShipmentRecord {
            line,
            order_id: format!("order_{line}"),
            weight_grams: grams,
            zone: zone.into(),
            shipment_type: "Forward charges".into(),
            billed_minor: billed,
        }
    }

    const CONFIG: &str = r#"
name = "Engine Test"
[shipments]
file = "shipments.csv"
[rates]
file = "rates.csv"
"#;

    #[test]
    fn price_three_reference_orders() {
        let card = card_a();

        let r = price_shipment(&record(2, 400.0, "a", 3000), &card, 0).unwrap();
        assert_eq!(r.weight_slab_kg, 0.5);
        assert_eq!(r.expected_minor, 3000);
        assert_eq!(r.discrepancy_class, DiscrepancyClass::Correct);

        let r = price_shipment(&record(3, 600.0, "a", 6000), &card, 0).unwrap();
        assert_eq!(r.weight_slab_kg, 1.0);
        assert_eq!(r.expected_minor, 5000);
        assert_eq!(r.difference_minor, 1000);
        assert_eq!(r.discrepancy_class, DiscrepancyClass::Overcharged);

        let r = price_shipment(&record(4, 1000.0, "a", 4000), &card, 0).unwrap();
        assert_eq!(r.weight_kg, 1.0);
        assert_eq!(r.weight_slab_kg, 1.0);
        assert_eq!(r.difference_minor, -1000);
        assert_eq!(r.discrepancy_class, DiscrepancyClass::Undercharged);
    }

    #[test]
    fn zero_weight_is_base_fee() {
        let r = price_shipment(&record(2, 0.0, "a", 3000), &card_a(), 0).unwrap();
        assert_eq!(r.weight_slab_kg, 0.0);
        assert_eq!(r.expected_minor, 3000);
    }

    #[test]
    fn unknown_zone_is_skipped_not_zero_priced() {
        let records = vec![record(2, 400.0, "a", 3000), record(3, 400.0, "z", 0)];
        let (rows, skipped) = reconcile(&records, &card_a(), 0);
        assert_eq!(rows.len(), 1);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].line, 3);
        assert_eq!(skipped[0].error, RowError::MissingZoneRate { zone: "z".into() });
    }

    #[test]
    fn negative_weight_is_skipped() {
        let (rows, skipped) = reconcile(&[record(2, -5.0, "a", 3000)], &card_a(), 0);
        assert!(rows.is_empty());
        assert!(matches!(skipped[0].error, RowError::InvalidWeight { .. }));
    }

    #[test]
    fn load_csv_basic() {
        let csv = "\
Order ID,Weight (g),Zone,Type of Shipment,Billing Amount (Rs.),SKU
2001827036,127,d,Forward charges,135.0,8904223815682
2001821995,150,d,Forward charges,90.2,8904223818706
";
        let loaded = load_shipment_rows(csv.as_bytes(), &ColumnMapping::default()).unwrap();
        assert_eq!(loaded.records.len(), 2);
        assert!(loaded.rejected.is_empty());
        assert_eq!(loaded.records[0].line, 2);
        assert_eq!(loaded.records[0].order_id, "2001827036");
        assert_eq!(loaded.records[0].weight_grams, 127.0);
        assert_eq!(loaded.records[0].billed_minor, 13500);
        assert_eq!(loaded.records[1].billed_minor, 9020);
        assert_eq!(loaded.records[1].line, 3);
    }

    #[test]
    fn load_csv_from_any_reader() {
        let header = "Order ID,Weight (g),Zone,Type of Shipment,Billing Amount (Rs.)\n";
        let body = "o1,400,a,Forward charges,30\no2,600,a,Forward charges,60\n";
        let reader = std::io::BufReader::new(header.as_bytes().chain(body.as_bytes()));
        let loaded = load_shipment_rows(reader, &ColumnMapping::default()).unwrap();
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.records[1].line, 3);
        assert_eq!(loaded.records[1].billed_minor, 6000);
    }

    #[test]
    fn load_csv_missing_column_is_schema_mismatch() {
        let csv = "Order ID,Weight (g),Zone,Billing Amount (Rs.)\n1,100,a,30\n";
        let err = load_shipment_rows(csv.as_bytes(), &ColumnMapping::default()).unwrap_err();
        assert!(matches!(
            err,
            ReconError::SchemaMismatch { ref column, .. } if column == "Type of Shipment"
        ));
    }

    #[test]
    fn load_csv_rejects_bad_cells_per_row() {
        let csv = "\
Order ID,Weight (g),Zone,Type of Shipment,Billing Amount (Rs.)
o1,heavy,a,Forward charges,30
o2,100,a,Forward charges,thirty
o3,100,a,Forward charges,30
o4,,a
";
        let loaded = load_shipment_rows(csv.as_bytes(), &ColumnMapping::default()).unwrap();
        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.records[0].order_id, "o3");
        assert_eq!(loaded.rejected.len(), 3);
        assert_eq!(loaded.rejected[0].error, RowError::InvalidWeight { value: "heavy".into() });
        assert_eq!(loaded.rejected[1].error, RowError::InvalidAmount { value: "thirty".into() });
        assert_eq!(loaded.rejected[2].line, 5);
    }

    #[test]
    fn run_merges_skips_in_line_order() {
        let config = ReconConfig::from_toml(CONFIG).unwrap();
        let csv = "\
Order ID,Weight (g),Zone,Type of Shipment,Billing Amount (Rs.)
o1,400,a,Forward charges,30
o2,bad,a,Forward charges,30
o3,400,q,Forward charges,30
o4,600,a,Forward charges,60
";
        let shipments = load_shipment_rows(csv.as_bytes(), &config.shipments.columns).unwrap();
        let input = ReconInput { shipments, rates: card_a() };
        let result = run(&config, &input).unwrap();

        assert_eq!(result.summary.total_orders, 2);
        assert_eq!(result.summary.skipped, 2);
        assert_eq!(result.skipped[0].line, 3);
        assert_eq!(result.skipped[1].line, 4);
        assert_eq!(result.meta.config_name, "Engine Test");
        assert_eq!(result.meta.rate_zones, 1);
    }

    #[test]
    fn run_rejects_empty_rate_card() {
        let config = ReconConfig::from_toml(CONFIG).unwrap();
        let input = ReconInput {
            shipments: LoadedShipments::default(),
            rates: RateCard::new(),
        };
        assert!(matches!(run(&config, &input), Err(ReconError::ConfigValidation(_))));
    }

    #[test]
    fn tolerance_flows_through_run() {
        let config = ReconConfig::from_toml(&format!("{CONFIG}\n[tolerance]\namount_minor = 5\n")).unwrap();
        let shipments = LoadedShipments {
            records: vec![record(2, 400.0, "a", 3004)],
            rejected: vec![],
        };
        let result = run(&config, &ReconInput { shipments, rates: card_a() }).unwrap();
        assert_eq!(result.summary.correct, 1);
        assert_eq!(result.rows[0].difference_minor, 4);
        assert_eq!(result.meta.tolerance_minor, 5);
    }

    #[test]
    fn extreme_billed_amounts_complete_the_run() {
        let config = ReconConfig::from_toml(CONFIG).unwrap();
        let csv = "\
Order ID,Weight (g),Zone,Type of Shipment,Billing Amount (Rs.)
o1,400,a,Forward charges,-92233720368547758.07
o2,400,a,Forward charges,92233720368547758.07
o3,400,a,Forward charges,92233720368547758.07
";
        let shipments = load_shipment_rows(csv.as_bytes(), &config.shipments.columns).unwrap();
        assert_eq!(shipments.records.len(), 3);
        let result = run(&config, &ReconInput { shipments, rates: card_a() }).unwrap();

        let s = &result.summary;
        assert_eq!(s.total_orders, 3);
        assert_eq!(s.undercharged, 1);
        assert_eq!(s.overcharged, 2);
        assert_eq!(s.total_billed_minor, i64::MAX);
        assert_eq!(s.overcharged_minor, i64::MAX);
        assert_eq!(s.undercharged_minor, i64::MAX);
    }

    #[test]
    fn load_rate_card_by_format() {
        let config = ReconConfig::from_toml(CONFIG).unwrap();
        let card = load_rate_card(&config.rates, Some("fwd_a_fixed,fwd_a_additional\n30,20\n")).unwrap();
        assert_eq!(card, card_a());

        let err = load_rate_card(&config.rates, None).unwrap_err();
        assert!(err.to_string().contains("needs rate card CSV data"));
    }
}
