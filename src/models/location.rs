use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One entry of the Met Office site list: a place a forecast can be requested
/// for. Read-mostly reference data, never touched by the wizard or checker.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SiteLocation {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(rename = "unitaryAuthArea", default)]
    pub auth_area: String,
    #[serde(rename = "nationalPark", default)]
    pub national_park: String,
    #[serde(default)]
    pub latitude: String,
    #[serde(default)]
    pub longitude: String,
    #[serde(default)]
    pub elevation: String,
}

// Wrappers matching the layout of the sitelist JSON document
// (http://datapoint.metoffice.gov.uk/public/data/val/wxfcs/all/json/sitelist).

#[derive(Debug, Deserialize)]
pub struct RootLocations {
    #[serde(rename = "Locations")]
    pub locations: Locations,
}

#[derive(Debug, Deserialize)]
pub struct Locations {
    #[serde(rename = "Location", default)]
    pub location: Vec<SiteLocation>,
}
