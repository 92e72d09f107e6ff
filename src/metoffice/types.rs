use std::collections::HashMap;

use serde::Deserialize;

/// Date layout of a daily forecast period value, e.g. "2019-10-03Z".
pub const METOFFICE_DATE_FORMAT: &str = "%Y-%m-%dZ";

// DataPoint wxfcs response document. Every field defaults so that a partial
// or slightly malformed document never fails the whole parse; the checker
// deals with missing numbers on its own.

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Root {
    #[serde(rename = "SiteRep", default)]
    pub site_rep: SiteRep,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteRep {
    #[serde(rename = "DV", default)]
    pub dv: Dv,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dv {
    #[serde(rename = "dataDate", default)]
    pub data_date: String,
    #[serde(rename = "type", default)]
    pub forecast_type: String,
    #[serde(rename = "Location", default)]
    pub location: Location,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Location {
    #[serde(rename = "i", default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub continent: String,
    #[serde(rename = "Period", default)]
    pub periods: Vec<Period>,
}

/// One forecast period (a day for `res=daily`). The reps carry the named
/// numeric observations as strings: `FDm` feels-like day max temperature,
/// `Gn` noon wind gust, `PPd` day precipitation probability, `W` weather
/// type code, and so on. For the daily resolution rep 0 is the day part and
/// rep 1 the night part.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Period {
    #[serde(rename = "type", default)]
    pub period_type: String,
    #[serde(default)]
    pub value: String,
    #[serde(rename = "Rep", default)]
    pub rep: Vec<HashMap<String, String>>,
}
