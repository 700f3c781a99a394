//! Country -> continent classification.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

/// One of the six inhabited continents, or `Unknown` for countries missing
/// from the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Continent {
    Africa,
    Asia,
    Europe,
    NorthAmerica,
    Oceania,
    SouthAmerica,
    Unknown,
}

impl Continent {
    pub fn name(self) -> &'static str {
        match self {
            Continent::Africa => "Africa",
            Continent::Asia => "Asia",
            Continent::Europe => "Europe",
            Continent::NorthAmerica => "North America",
            Continent::Oceania => "Oceania",
            Continent::SouthAmerica => "South America",
            Continent::Unknown => "Unknown",
        }
    }

    pub fn is_known(self) -> bool {
        self != Continent::Unknown
    }
}

impl fmt::Display for Continent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const EUROPE: &[&str] = &[
    "Germany", "France", "Italy", "Spain", "United Kingdom", "Netherlands", "Belgium",
    "Switzerland", "Austria", "Portugal", "Greece", "Poland", "Czech Republic", "Sweden",
    "Norway", "Denmark", "Finland", "Ireland", "Croatia", "Slovenia", "Hungary", "Romania",
    "Bulgaria", "Serbia", "Slovakia", "Iceland",
];

// Central America is counted as North America.
const NORTH_AMERICA: &[&str] = &[
    "United States", "United States of America", "Canada", "Mexico", "El Salvador",
    "Costa Rica", "Panama", "Guatemala", "Honduras", "Nicaragua", "Belize",
];

const SOUTH_AMERICA: &[&str] = &[
    "Brazil", "Argentina", "Chile", "Peru", "Colombia", "Venezuela", "Ecuador", "Bolivia",
    "Paraguay", "Uruguay", "Guyana", "Suriname",
];

const ASIA: &[&str] = &[
    "China", "Japan", "India", "Thailand", "Vietnam", "Indonesia", "Malaysia", "Singapore",
    "South Korea", "Taiwan", "Philippines",
];

const AFRICA: &[&str] = &["South Africa", "Egypt", "Morocco", "Kenya", "Tanzania", "Nigeria"];

const OCEANIA: &[&str] = &["Australia", "New Zealand", "Fiji"];

static COUNTRY_CONTINENTS: Lazy<HashMap<&'static str, Continent>> = Lazy::new(|| {
    let table = [
        (EUROPE, Continent::Europe),
        (NORTH_AMERICA, Continent::NorthAmerica),
        (SOUTH_AMERICA, Continent::SouthAmerica),
        (ASIA, Continent::Asia),
        (AFRICA, Continent::Africa),
        (OCEANIA, Continent::Oceania),
    ];

    table
        .iter()
        .flat_map(|(countries, continent)| countries.iter().map(move |c| (*c, *continent)))
        .collect()
});

/// Continent for a country display name (exact match).
pub fn continent_of(country: &str) -> Continent {
    COUNTRY_CONTINENTS
        .get(country)
        .copied()
        .unwrap_or(Continent::Unknown)
}

/// True if `name` is a country the table knows.
pub fn is_known_country(name: &str) -> bool {
    continent_of(name).is_known()
}
