use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

use crate::error::ReconError;
use crate::rates::RateCard;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReconConfig {
    pub name: String,
    pub shipments: ShipmentSource,
    pub rates: RateSource,
    #[serde(default)]
    pub tolerance: ToleranceConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Shipments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ShipmentSource {
    pub file: String,
    #[serde(default)]
    pub columns: ColumnMapping,
}

/// Header names in the joined shipment CSV. Defaults follow the courier
/// invoice/order report headers.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnMapping {
    #[serde(default = "default_order_id")]
    pub order_id: String,
    #[serde(default = "default_weight_grams")]
    pub weight_grams: String,
    #[serde(default = "default_zone")]
    pub zone: String,
    #[serde(default = "default_shipment_type")]
    pub shipment_type: String,
    #[serde(default = "default_billed_amount")]
    pub billed_amount: String,
}

fn default_order_id() -> String {
    "Order ID".into()
}
fn default_weight_grams() -> String {
    "Weight (g)".into()
}
fn default_zone() -> String {
    "Zone".into()
}
fn default_shipment_type() -> String {
    "Type of Shipment".into()
}
fn default_billed_amount() -> String {
    "Billing Amount (Rs.)".into()
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            order_id: default_order_id(),
            weight_grams: default_weight_grams(),
            zone: default_zone(),
            shipment_type: default_shipment_type(),
            billed_amount: default_billed_amount(),
        }
    }
}

// ---------------------------------------------------------------------------
// Rates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RateSource {
    #[serde(default)]
    pub format: RateFormat,
    #[serde(default)]
    pub file: Option<String>,
    /// Column prefix for the wide format (`fwd_a_fixed` → prefix `fwd`).
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub zones: BTreeMap<String, InlineRate>,
}

fn default_prefix() -> String {
    "fwd".into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateFormat {
    #[default]
    Wide,
    Long,
    Inline,
}

impl std::fmt::Display for RateFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wide => write!(f, "wide"),
            Self::Long => write!(f, "long"),
            Self::Inline => write!(f, "inline"),
        }
    }
}

/// Inline zone fees. Accepts `"29.5"`, `29.5` or `30`; kept as text so the
/// amount is parsed straight into minor units.
#[derive(Debug, Clone, Deserialize)]
pub struct InlineRate {
    #[serde(deserialize_with = "amount_text")]
    pub fixed: String,
    #[serde(deserialize_with = "amount_text")]
    pub additional: String,
}

fn amount_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(i) => i.to_string(),
        Raw::Float(x) => x.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tolerance + Output
// ---------------------------------------------------------------------------

/// Band around zero treated as Correct. Zero means exact match only.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToleranceConfig {
    #[serde(default)]
    pub amount_minor: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub json: Option<String>,
    #[serde(default)]
    pub rows_csv: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.name.trim().is_empty() {
            return Err(ReconError::ConfigValidation("name must not be empty".into()));
        }

        if self.shipments.file.trim().is_empty() {
            return Err(ReconError::ConfigValidation("shipments.file must not be empty".into()));
        }

        let cols = &self.shipments.columns;
        for (field, header) in [
            ("order_id", &cols.order_id),
            ("weight_grams", &cols.weight_grams),
            ("zone", &cols.zone),
            ("shipment_type", &cols.shipment_type),
            ("billed_amount", &cols.billed_amount),
        ] {
            if header.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "shipments.columns.{field} must not be empty"
                )));
            }
        }

        if self.tolerance.amount_minor < 0 {
            return Err(ReconError::ConfigValidation(format!(
                "tolerance.amount_minor must be >= 0, got {}",
                self.tolerance.amount_minor
            )));
        }

        let rates = &self.rates;
        match rates.format {
            RateFormat::Wide | RateFormat::Long => {
                if rates.file.as_deref().map_or(true, |f| f.trim().is_empty()) {
                    return Err(ReconError::ConfigValidation(format!(
                        "rates.file is required for format = \"{}\"",
                        rates.format
                    )));
                }
                if !rates.zones.is_empty() {
                    return Err(ReconError::ConfigValidation(format!(
                        "rates.zones is only allowed with format = \"inline\", got \"{}\"",
                        rates.format
                    )));
                }
                if rates.format == RateFormat::Wide && rates.prefix.is_empty() {
                    return Err(ReconError::ConfigValidation("rates.prefix must not be empty".into()));
                }
            }
            RateFormat::Inline => {
                if rates.zones.is_empty() {
                    return Err(ReconError::ConfigValidation(
                        "format = \"inline\" requires at least one [rates.zones.<zone>] table".into(),
                    ));
                }
                if rates.file.is_some() {
                    return Err(ReconError::ConfigValidation(
                        "rates.file is not used with format = \"inline\"".into(),
                    ));
                }
                RateCard::from_inline(&rates.zones)?;
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
