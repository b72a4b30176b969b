//! Controlled vocabularies for as-run event classification.
//!
//! Spot types and start/end modes arrive as free text in the XML. Each is
//! mapped onto a closed enum with an explicit `Unknown` arm: classification
//! is total and never fails, and an unrecognized raw value is logged once at
//! the call site so new codes surface in operational monitoring instead of
//! aborting extraction.
//!
//! Adding a code is a two-line change: one variant, one match arm.

use tracing::warn;

/// Whether an as-run record describes program or non-program content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
    Program,
    NonProgram,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Program => "Program",
            EventCategory::NonProgram => "NonProgram",
        }
    }
}

/// Known spot types in the as-run system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpotType {
    /// Commercial content.
    Commercial,
    /// Program content.
    Program,
    /// Station identification.
    StationId,
    /// Public service announcement.
    Psa,
    /// Identity spots and IDs.
    Id,
    /// Feature length, or fillers.
    Fl,
    /// News segment.
    Ns,
    /// Generic segment, or gavel spots.
    Gs,
    /// Special feature.
    Sf,
    /// Program guide.
    Pg,
    /// Re-run segment.
    Rs,
    /// Filler.
    Fi,
    /// Promotional.
    Pr,
    /// Program segment.
    Ps,
    /// Public affairs.
    Pa,
    /// Fundraising.
    Fr,
    /// Daily announcement.
    Da,
    /// Technical notice.
    Tn,
    /// Adjustments, or adjacency.
    Aj,
    /// Anything not in the table above.
    Unknown,
}

impl SpotType {
    /// Map a raw spot-type code onto the closed vocabulary.
    ///
    /// Case-insensitive exact match; anything else is [`SpotType::Unknown`]
    /// with a warning carrying the raw value.
    pub fn classify(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "COMMERCIAL" => SpotType::Commercial,
            "PROGRAM" => SpotType::Program,
            "STATION_ID" | "STATIONID" => SpotType::StationId,
            "PSA" => SpotType::Psa,
            "ID" => SpotType::Id,
            "FL" => SpotType::Fl,
            "NS" => SpotType::Ns,
            "GS" => SpotType::Gs,
            "SF" => SpotType::Sf,
            "PG" => SpotType::Pg,
            "RS" => SpotType::Rs,
            "FI" => SpotType::Fi,
            "PR" => SpotType::Pr,
            "PS" => SpotType::Ps,
            "PA" => SpotType::Pa,
            "FR" => SpotType::Fr,
            "DA" => SpotType::Da,
            "TN" => SpotType::Tn,
            "AJ" => SpotType::Aj,
            _ => {
                warn!(spot_type = raw, "unknown spot type encountered");
                SpotType::Unknown
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpotType::Commercial => "COMMERCIAL",
            SpotType::Program => "PROGRAM",
            SpotType::StationId => "STATION_ID",
            SpotType::Psa => "PSA",
            SpotType::Id => "ID",
            SpotType::Fl => "FL",
            SpotType::Ns => "NS",
            SpotType::Gs => "GS",
            SpotType::Sf => "SF",
            SpotType::Pg => "PG",
            SpotType::Rs => "RS",
            SpotType::Fi => "FI",
            SpotType::Pr => "PR",
            SpotType::Ps => "PS",
            SpotType::Pa => "PA",
            SpotType::Fr => "FR",
            SpotType::Da => "DA",
            SpotType::Tn => "TN",
            SpotType::Aj => "AJ",
            SpotType::Unknown => "UNKNOWN",
        }
    }
}

/// How an event was triggered to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    Fixed,
    Follow,
    Sequential,
    Manual,
    Unknown,
}

impl StartMode {
    pub fn classify(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "FIXED" => StartMode::Fixed,
            "FOLLOW" => StartMode::Follow,
            "SEQUENTIAL" => StartMode::Sequential,
            "MANUAL" => StartMode::Manual,
            _ => {
                warn!(start_mode = raw, "unknown start mode encountered");
                StartMode::Unknown
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StartMode::Fixed => "FIXED",
            StartMode::Follow => "FOLLOW",
            StartMode::Sequential => "SEQUENTIAL",
            StartMode::Manual => "MANUAL",
            StartMode::Unknown => "UNKNOWN",
        }
    }
}

/// How an event was ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndMode {
    Duration,
    Fixed,
    Manual,
    Follow,
    Unknown,
}

impl EndMode {
    pub fn classify(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "DURATION" => EndMode::Duration,
            "FIXED" => EndMode::Fixed,
            "MANUAL" => EndMode::Manual,
            "FOLLOW" => EndMode::Follow,
            _ => {
                warn!(end_mode = raw, "unknown end mode encountered");
                EndMode::Unknown
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EndMode::Duration => "DURATION",
            EndMode::Fixed => "FIXED",
            EndMode::Manual => "MANUAL",
            EndMode::Follow => "FOLLOW",
            EndMode::Unknown => "UNKNOWN",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spot_type_matches_case_insensitively() {
        assert_eq!(SpotType::classify("commercial"), SpotType::Commercial);
        assert_eq!(SpotType::classify("Psa"), SpotType::Psa);
        assert_eq!(SpotType::classify(" fl "), SpotType::Fl);
    }

    #[test]
    fn classification_is_total() {
        // Any input maps to a defined member, never a failure.
        assert_eq!(SpotType::classify("ZZ-NEW-CODE"), SpotType::Unknown);
        assert_eq!(SpotType::classify(""), SpotType::Unknown);
        assert_eq!(StartMode::classify("whenever"), StartMode::Unknown);
        assert_eq!(EndMode::classify("\u{fffd}"), EndMode::Unknown);
    }

    #[test]
    fn modes_have_distinct_tables() {
        // SEQUENTIAL is a start mode only; DURATION an end mode only.
        assert_eq!(StartMode::classify("SEQUENTIAL"), StartMode::Sequential);
        assert_eq!(EndMode::classify("SEQUENTIAL"), EndMode::Unknown);
        assert_eq!(EndMode::classify("DURATION"), EndMode::Duration);
        assert_eq!(StartMode::classify("DURATION"), StartMode::Unknown);
    }

    #[test]
    fn as_str_round_trips_through_classify() {
        for mode in [
            StartMode::Fixed,
            StartMode::Follow,
            StartMode::Sequential,
            StartMode::Manual,
        ] {
            assert_eq!(StartMode::classify(mode.as_str()), mode);
        }
    }
}
