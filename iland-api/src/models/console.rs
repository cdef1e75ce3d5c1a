use serde::{Deserialize, Serialize};

/// Datacenter locations served by the console
pub const LOCATION_IDS: &[&str] = &[
    "res01.ilandcloud.com",
    "lax01.ilandcloud.com",
    "man01.ilandcloud.com",
    "man03.ilandcloud.com",
    "lon02.ilandcloud.com",
    "lon03.ilandcloud.com",
    "dal02.ilandcloud.com",
    "dal06.ilandcloud.com",
    "dal22.ilandcloud.com",
    "dal23.ilandcloud.com",
    "dal25.ilandcloud.com",
    "sin01.ilandcloud.com",
    "ams01.ilandcloud.com",
    "ams02.ilandcloud.com",
    "ams03.ilandcloud.com",
    "ams04.ilandcloud.com",
    "syd02.ilandcloud.com",
    "syd03.ilandcloud.com",
    "syd04.ilandcloud.com",
    "mel02.ilandcloud.com",
    "mel03.ilandcloud.com",
    "mel04.ilandcloud.com",
    "str02.ilandcloud.com",
    "str03.ilandcloud.com",
    "str05.ilandcloud.com",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Company {
    #[serde(rename = "company_id")]
    pub id: String,
    pub name: String,
    pub has_iaas: bool,
    pub has_vcc: bool,
    pub has_vccr: bool,
    pub has_object_storage: bool,
    pub has_o365: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Org {
    #[serde(rename = "uuid")]
    pub id: String,
    pub name: String,
    #[serde(rename = "fullname")]
    pub full_name: String,
    pub description: String,
    pub enabled: bool,
    pub location_id: String,
    pub company_id: String,
    pub updated_date: i64,
}

/// List responses wrap their items in `data`
#[derive(Debug, Clone, Deserialize)]
pub struct DataList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}
