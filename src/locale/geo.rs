//! Geographic locale classification.
//!
//! # Responsibilities
//! - Map a platform geo annotation to a candidate locale
//! - Report how specific the match was (country, region, city)
//!
//! # Design Decisions
//! - Lookup tables only; tables come from config and may grow freely
//! - Tiers are evaluated across all tables before moving to the next tier,
//!   so a country hit always beats a region hit for another locale
//! - Codes are compared exactly as the platform supplies them

use std::collections::{HashMap, HashSet};

use crate::config::GeoTableConfig;
use crate::locale::types::{EngineError, GeoClassification, GeoSignal, GeoSource, Locale, SupportedLocales};

const COUNTRY_CONFIDENCE: f64 = 0.95;
const REGION_CONFIDENCE: f64 = 0.9;
const CITY_CONFIDENCE: f64 = 0.8;

/// Region value that matches every region of a country.
pub const ANY_REGION: &str = "*";

#[derive(Debug, Clone)]
struct GeoTable {
    locale: Locale,
    countries: HashSet<String>,
    regions: HashMap<String, HashSet<String>>,
    cities: HashSet<String>,
}

impl GeoTable {
    fn region_matches(&self, country: &str, region: Option<&str>) -> bool {
        match self.regions.get(country) {
            Some(regions) => {
                regions.contains(ANY_REGION) || region.is_some_and(|r| regions.contains(r))
            }
            None => false,
        }
    }
}

/// Table-driven geo classifier.
#[derive(Debug, Clone)]
pub struct GeoClassifier {
    tables: Vec<GeoTable>,
}

impl GeoClassifier {
    /// Build from config tables. Every table locale must be supported.
    pub fn new(tables: &[GeoTableConfig], locales: &SupportedLocales) -> Result<Self, EngineError> {
        let tables = tables
            .iter()
            .map(|t| {
                let locale = locales
                    .get(&t.locale)
                    .cloned()
                    .ok_or_else(|| EngineError::UnsupportedLocale(t.locale.clone()))?;
                Ok(GeoTable {
                    locale,
                    countries: t.countries.iter().cloned().collect(),
                    regions: t
                        .regions
                        .iter()
                        .map(|(country, regions)| (country.clone(), regions.iter().cloned().collect()))
                        .collect(),
                    cities: t.cities.iter().cloned().collect(),
                })
            })
            .collect::<Result<Vec<_>, EngineError>>()?;

        Ok(Self { tables })
    }

    /// Classify a geo signal. `None` means no geographic hint.
    pub fn classify(&self, geo: &GeoSignal) -> Option<GeoClassification> {
        let country = geo.country.as_deref();
        let region = geo.region.as_deref();

        if let Some(country) = country {
            if let Some(table) = self.tables.iter().find(|t| t.countries.contains(country)) {
                return Some(self.hit(table, COUNTRY_CONFIDENCE, GeoSource::Country));
            }
            if let Some(table) = self.tables.iter().find(|t| t.region_matches(country, region)) {
                return Some(self.hit(table, REGION_CONFIDENCE, GeoSource::Region));
            }
        }

        if let Some(city) = geo.city.as_deref() {
            if let Some(table) = self.tables.iter().find(|t| t.cities.contains(city)) {
                return Some(self.hit(table, CITY_CONFIDENCE, GeoSource::City));
            }
        }

        None
    }

    fn hit(&self, table: &GeoTable, confidence: f64, source: GeoSource) -> GeoClassification {
        GeoClassification {
            locale: table.locale.clone(),
            confidence,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeoConfig;

    fn classifier() -> GeoClassifier {
        let locales = SupportedLocales::new(&["de", "en"], "en").unwrap();
        GeoClassifier::new(&GeoConfig::default().tables, &locales).unwrap()
    }

    #[test]
    fn test_primary_countries() {
        let geo = classifier();
        for country in ["DE", "AT", "CH"] {
            let hit = geo.classify(&GeoSignal::country(country)).unwrap();
            assert_eq!(hit.locale, "de");
            assert_eq!(hit.confidence, 0.95);
            assert_eq!(hit.source, GeoSource::Country);
        }
    }

    #[test]
    fn test_region_match() {
        let geo = classifier();
        let hit = geo.classify(&GeoSignal::new(Some("IT"), Some("BZ"), None)).unwrap();
        assert_eq!(hit.source, GeoSource::Region);
        assert_eq!(hit.confidence, 0.9);

        assert!(geo.classify(&GeoSignal::new(Some("IT"), Some("RM"), None)).is_none());
        assert!(geo.classify(&GeoSignal::new(Some("IT"), None, None)).is_none());
    }

    #[test]
    fn test_wildcard_region() {
        let geo = classifier();
        let hit = geo.classify(&GeoSignal::country("LU")).unwrap();
        assert_eq!(hit.source, GeoSource::Region);
        let hit = geo.classify(&GeoSignal::new(Some("LI"), Some("anything"), None)).unwrap();
        assert_eq!(hit.source, GeoSource::Region);
    }

    #[test]
    fn test_city_fallback() {
        let geo = classifier();
        let hit = geo.classify(&GeoSignal::new(Some("US"), None, Some("Berlin"))).unwrap();
        assert_eq!(hit.source, GeoSource::City);
        assert_eq!(hit.confidence, 0.8);

        let hit = geo.classify(&GeoSignal::new(None, None, Some("Vienna"))).unwrap();
        assert_eq!(hit.source, GeoSource::City);
    }

    #[test]
    fn test_country_beats_city() {
        let geo = classifier();
        let hit = geo.classify(&GeoSignal::new(Some("AT"), None, Some("Vienna"))).unwrap();
        assert_eq!(hit.source, GeoSource::Country);
    }

    #[test]
    fn test_no_signal() {
        let geo = classifier();
        assert!(geo.classify(&GeoSignal::default()).is_none());
        assert!(geo.classify(&GeoSignal::new(Some("US"), Some("CA"), Some("Boston"))).is_none());
    }

    #[test]
    fn test_unsupported_table_locale_rejected() {
        let locales = SupportedLocales::new(&["en"], "en").unwrap();
        let err = GeoClassifier::new(&GeoConfig::default().tables, &locales).unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedLocale(_)));
    }
}
