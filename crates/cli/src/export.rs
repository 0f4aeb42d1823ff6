//! Enriched-row CSV export for `crecon run --rows-csv`.

use std::io::Write;

use courier_recon::money::format_minor;
use courier_recon::ChargedShipment;

const ROW_HEADER: &[&str] = &[
    "line",
    "order_id",
    "zone",
    "shipment_type",
    "weight_grams",
    "weight_kg",
    "weight_slab_kg",
    "billed_amount",
    "expected_charge",
    "charge_difference",
    "discrepancy_class",
];

/// Write priced rows as CSV. Money columns use fixed 2-decimal formatting.
pub fn write_rows_csv(rows: &[ChargedShipment], writer: impl Write) -> Result<(), String> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer
        .write_record(ROW_HEADER)
        .map_err(|e| format!("CSV write error: {e}"))?;

    for row in rows {
        csv_writer
            .write_record([
                row.line.to_string(),
                row.order_id.clone(),
                row.zone.clone(),
                row.shipment_type.clone(),
                row.weight_grams.to_string(),
                row.weight_kg.to_string(),
                format!("{:.1}", row.weight_slab_kg),
                format_minor(row.billed_minor),
                format_minor(row.expected_minor),
                format_minor(row.difference_minor),
                row.discrepancy_class.to_string(),
            ])
            .map_err(|e| format!("CSV write error: {e}"))?;
    }

    csv_writer.flush().map_err(|e| format!("CSV flush error: {e}"))?;
    Ok(())
}
