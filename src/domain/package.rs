//! Bundle catalog. Static reference data loaded once at startup.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub id: String,
    pub name: String,
    pub price: u32,
    pub validity: String,
    /// More than one successful purchase per number per day is permitted.
    pub allow_multiple: bool,
}

impl Package {
    pub fn new(id: &str, name: &str, price: u32, validity: &str, allow_multiple: bool) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            price,
            validity: validity.to_string(),
            allow_multiple,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    packages: Vec<Package>,
}

impl Catalog {
    pub fn new(packages: Vec<Package>) -> Self {
        Self { packages }
    }

    pub fn find(&self, id: &str) -> Option<&Package> {
        self.packages.iter().find(|p| p.id == id)
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(vec![
            Package::new("p_sh55", "Sh55 - 1.25GB (till midnight)", 55, "till midnight", false),
            Package::new("p_sh20", "Sh20 - 250MB (24hrs)", 20, "24hrs", false),
            Package::new("p_sh19", "Sh19 - 1GB (1hr)", 19, "1hr", false),
            Package::new("p_sh50", "Sh50 - 1.5GB (3hrs)", 50, "3hrs", false),
            Package::new("p_sh99", "Sh99 - 1GB (24hrs)", 99, "24hrs", false),
            Package::new("p_sh49", "Sh49 - 350MB (7 days)", 49, "7 days", false),
            Package::new("p_ksh22", "Ksh 22 - 1GB (1hr) [Multiple allowed]", 22, "1hr", true),
            Package::new("p_ksh52", "Ksh 52 - 1.5GB (3hrs) [Multiple allowed]", 52, "3hrs", true),
            Package::new("p_ksh110", "Ksh 110 - 2GB (24hrs) [Multiple allowed]", 110, "24hrs", true),
            Package::new("m_23", "Ksh 23 - 45 mins (3hrs)", 23, "3hrs", false),
            Package::new("m_51", "Ksh 51 - 50 mins (till midnight)", 51, "till midnight", false),
            Package::new("m_101", "Ksh 101 - 100 mins (48hrs)", 101, "48hrs", false),
            Package::new("s_1000", "1000 SMS (Weekly) - Ksh 30", 30, "7 days", false),
            Package::new("s_200", "200 SMS (Daily) - Ksh 10", 10, "24hrs", false),
            Package::new("s_20", "20 SMS (Daily) - Ksh 5", 5, "24hrs", false),
        ])
    }
}
