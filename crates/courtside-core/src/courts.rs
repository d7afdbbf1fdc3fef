//! Court directory.
//!
//! Court identifiers differ between the two providers, and the raw upstream
//! codes differ from the labels users see (`"19"` upstream is `"2번"` on
//! screen). All of that lives in this table; call sites never inline a
//! mapping. A court's facility decides which region, and therefore which
//! provider, it is booked through.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::Region;

/// A tennis facility operated by one of the providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facility {
    /// Upstream facility code.
    pub code: String,
    /// Display name.
    pub name: String,
    pub region: Region,
    #[serde(default)]
    pub location: String,
}

/// A single court at a facility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Court {
    /// Stable identifier used by callers.
    pub court_id: String,
    /// Code of the owning [`Facility`].
    pub facility: String,
    /// Raw upstream court code.
    pub provider_code: String,
    /// Court name as printed by the provider, e.g. `"2코트"`.
    pub provider_name: String,
    /// User-facing label, e.g. `"2번"`.
    pub label: String,
}

/// Data-driven lookup table for facilities and courts.
#[derive(Debug, Clone, Default)]
pub struct CourtDirectory {
    facilities: Vec<Facility>,
    courts: Vec<Court>,
    by_id: HashMap<String, usize>,
}

/// (facility code, name, region, location)
const BUILTIN_FACILITIES: &[(&str, &str, Region, &str)] = &[
    ("BULAM", "불암산 테니스장", Region::A, "노원구 중계동"),
    ("MADEUL", "마들 테니스장", Region::A, "노원구 상계동"),
    ("CHOAN", "초안산 테니스장", Region::B, "도봉구 창동"),
    ("DARAK", "다락원 테니스장", Region::B, "도봉구 도봉동"),
];

/// (court id, facility code, provider code, provider name, label)
const BUILTIN_COURTS: &[(&str, &str, &str, &str, &str)] = &[
    ("bulam-1", "BULAM", "18", "1코트", "1번"),
    ("bulam-2", "BULAM", "19", "2코트", "2번"),
    ("bulam-3", "BULAM", "20", "3코트", "3번"),
    ("bulam-4", "BULAM", "21", "4코트", "4번"),
    ("madeul-1", "MADEUL", "31", "1코트", "1번"),
    ("madeul-2", "MADEUL", "32", "2코트", "2번"),
    ("madeul-3", "MADEUL", "33", "3코트", "3번"),
    ("choan-1", "CHOAN", "C1", "1코트", "1번"),
    ("choan-2", "CHOAN", "C2", "2코트", "2번"),
    ("choan-3", "CHOAN", "C3", "3코트", "3번"),
    ("choan-4", "CHOAN", "C4", "4코트", "4번"),
    ("darak-1", "DARAK", "D1", "1코트", "1번"),
    ("darak-2", "DARAK", "D2", "2코트", "2번"),
];

impl CourtDirectory {
    /// Builds a directory from explicit entries. Later courts with a
    /// duplicate id replace earlier ones.
    pub fn new(facilities: Vec<Facility>, courts: Vec<Court>) -> Self {
        let mut directory = Self {
            facilities,
            courts: Vec::with_capacity(courts.len()),
            by_id: HashMap::new(),
        };
        for court in courts {
            directory.insert_court(court);
        }
        directory
    }

    /// The directory of courts known to ship with this build.
    pub fn builtin() -> Self {
        let facilities = BUILTIN_FACILITIES
            .iter()
            .map(|(code, name, region, location)| Facility {
                code: code.to_string(),
                name: name.to_string(),
                region: *region,
                location: location.to_string(),
            })
            .collect();
        let courts = BUILTIN_COURTS
            .iter()
            .map(|(id, facility, code, name, label)| Court {
                court_id: id.to_string(),
                facility: facility.to_string(),
                provider_code: code.to_string(),
                provider_name: name.to_string(),
                label: label.to_string(),
            })
            .collect();
        Self::new(facilities, courts)
    }

    /// Merges extra facilities and courts on top of this directory.
    pub fn extend(mut self, facilities: Vec<Facility>, courts: Vec<Court>) -> Self {
        for facility in facilities {
            match self.facilities.iter_mut().find(|f| f.code == facility.code) {
                Some(existing) => *existing = facility,
                None => self.facilities.push(facility),
            }
        }
        for court in courts {
            self.insert_court(court);
        }
        self
    }

    fn insert_court(&mut self, court: Court) {
        match self.by_id.get(&court.court_id) {
            Some(&idx) => self.courts[idx] = court,
            None => {
                self.by_id.insert(court.court_id.clone(), self.courts.len());
                self.courts.push(court);
            }
        }
    }

    pub fn facility(&self, code: &str) -> Option<&Facility> {
        self.facilities.iter().find(|f| f.code == code)
    }

    pub fn court(&self, court_id: &str) -> Option<&Court> {
        self.by_id.get(court_id).map(|&idx| &self.courts[idx])
    }

    /// Returns the facility a court belongs to.
    pub fn facility_of(&self, court_id: &str) -> Option<&Facility> {
        self.court(court_id).and_then(|c| self.facility(&c.facility))
    }

    /// Returns the region a court is booked through.
    pub fn region_for(&self, court_id: &str) -> Option<Region> {
        self.facility_of(court_id).map(|f| f.region)
    }

    /// Facilities served by one region, in table order.
    pub fn facilities_in(&self, region: Region) -> impl Iterator<Item = &Facility> {
        self.facilities.iter().filter(move |f| f.region == region)
    }

    /// Finds a court by its raw upstream code within a facility.
    pub fn court_by_code(&self, facility: &str, provider_code: &str) -> Option<&Court> {
        self.courts
            .iter()
            .find(|c| c.facility == facility && c.provider_code == provider_code)
    }

    /// Finds a court by the name the provider prints within a facility.
    pub fn court_by_name(&self, facility: &str, provider_name: &str) -> Option<&Court> {
        let wanted = compact(provider_name);
        self.courts
            .iter()
            .find(|c| c.facility == facility && compact(&c.provider_name) == wanted)
    }

    /// Returns the user-facing label for a raw code or printed name.
    ///
    /// Unknown courts keep their raw text so nothing is silently dropped.
    pub fn display_label(&self, facility: &str, raw: &str) -> String {
        self.court_by_code(facility, raw)
            .or_else(|| self.court_by_name(facility, raw))
            .map(|c| c.label.clone())
            .unwrap_or_else(|| raw.trim().to_string())
    }

    /// Returns the display name for a facility code, or the code itself.
    pub fn facility_name(&self, code: &str) -> String {
        self.facility(code)
            .map(|f| f.name.clone())
            .unwrap_or_else(|| code.to_string())
    }
}

fn compact(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}
