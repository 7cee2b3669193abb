//! Dimension and filter vocabulary
//!
//! Closed enums for every dimension the data platform understands. The
//! planner addresses these by their snake_case (dimensions) or display
//! (business lines, capital measures) names; parsing happens once at the
//! plan boundary so everything downstream is typed.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level business line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Business {
    #[serde(rename = "Prime")]
    Prime,
    #[serde(rename = "Equities Ex Prime")]
    EquitiesExPrime,
    #[serde(rename = "FICC")]
    Ficc,
}

impl Business {
    pub const ALL: [Business; 3] = [Business::Prime, Business::EquitiesExPrime, Business::Ficc];

    pub fn name(&self) -> &'static str {
        match self {
            Business::Prime => "Prime",
            Business::EquitiesExPrime => "Equities Ex Prime",
            Business::Ficc => "FICC",
        }
    }
}

/// A business filter as the planner states it. "Equities" is an umbrella
/// covering Prime and Equities Ex Prime and expands at filter time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum BusinessFilter {
    #[serde(rename = "Prime")]
    Prime,
    #[serde(rename = "Equities Ex Prime")]
    EquitiesExPrime,
    #[serde(rename = "FICC")]
    Ficc,
    #[serde(rename = "Equities")]
    Equities,
}

impl BusinessFilter {
    /// The concrete business lines this filter admits.
    pub fn members(&self) -> &'static [Business] {
        match self {
            BusinessFilter::Prime => &[Business::Prime],
            BusinessFilter::EquitiesExPrime => &[Business::EquitiesExPrime],
            BusinessFilter::Ficc => &[Business::Ficc],
            BusinessFilter::Equities => &[Business::Prime, Business::EquitiesExPrime],
        }
    }
}

/// Sub-business line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Subbusiness {
    #[serde(rename = "PB")]
    Pb,
    #[serde(rename = "SPG")]
    Spg,
    Futures,
    #[serde(rename = "DCS")]
    Dcs,
    #[serde(rename = "One Delta")]
    OneDelta,
    #[serde(rename = "Eq Deriv")]
    EqDeriv,
    Credit,
    Macro,
}

impl Subbusiness {
    pub const ALL: [Subbusiness; 8] = [
        Subbusiness::Pb,
        Subbusiness::Spg,
        Subbusiness::Futures,
        Subbusiness::Dcs,
        Subbusiness::OneDelta,
        Subbusiness::EqDeriv,
        Subbusiness::Credit,
        Subbusiness::Macro,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Subbusiness::Pb => "PB",
            Subbusiness::Spg => "SPG",
            Subbusiness::Futures => "Futures",
            Subbusiness::Dcs => "DCS",
            Subbusiness::OneDelta => "One Delta",
            Subbusiness::EqDeriv => "Eq Deriv",
            Subbusiness::Credit => "Credit",
            Subbusiness::Macro => "Macro",
        }
    }

    /// Whether this sub-business books PB-style balance types
    /// (Debit/Credit/Physical Shorts) as opposed to SPG synthetics.
    pub fn is_pb_family(&self) -> bool {
        !matches!(self, Subbusiness::Spg)
    }
}

/// Geographic region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    Americas,
    Emea,
    Asia,
    Na,
}

impl Region {
    pub const ALL: [Region; 4] = [Region::Americas, Region::Emea, Region::Asia, Region::Na];

    pub fn name(&self) -> &'static str {
        match self {
            Region::Americas => "AMERICAS",
            Region::Emea => "EMEA",
            Region::Asia => "ASIA",
            Region::Na => "NA",
        }
    }

    /// Countries booked under this region.
    pub fn countries(&self) -> &'static [Country] {
        match self {
            Region::Americas => &[Country::Usa, Country::Can, Country::Bra],
            Region::Emea => &[Country::Gbr, Country::Fra, Country::Deu],
            Region::Asia => &[Country::Jpn, Country::Hkg, Country::Aus],
            Region::Na => &[Country::Usa, Country::Can],
        }
    }
}

/// Country (ISO alpha-3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Country {
    Usa,
    Can,
    Bra,
    Gbr,
    Fra,
    Deu,
    Jpn,
    Hkg,
    Aus,
}

impl Country {
    pub const ALL: [Country; 9] = [
        Country::Usa,
        Country::Can,
        Country::Bra,
        Country::Gbr,
        Country::Fra,
        Country::Deu,
        Country::Jpn,
        Country::Hkg,
        Country::Aus,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Country::Usa => "USA",
            Country::Can => "CAN",
            Country::Bra => "BRA",
            Country::Gbr => "GBR",
            Country::Fra => "FRA",
            Country::Deu => "DEU",
            Country::Jpn => "JPN",
            Country::Hkg => "HKG",
            Country::Aus => "AUS",
        }
    }
}

/// Balance type. PB-family books Debit/Credit/Physical Shorts; SPG books
/// Synthetic Longs/Shorts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum BalanceType {
    Debit,
    Credit,
    #[serde(rename = "Physical Shorts")]
    PhysicalShorts,
    #[serde(rename = "Synthetic Longs")]
    SyntheticLongs,
    #[serde(rename = "Synthetic Shorts")]
    SyntheticShorts,
}

impl BalanceType {
    pub fn name(&self) -> &'static str {
        match self {
            BalanceType::Debit => "Debit",
            BalanceType::Credit => "Credit",
            BalanceType::PhysicalShorts => "Physical Shorts",
            BalanceType::SyntheticLongs => "Synthetic Longs",
            BalanceType::SyntheticShorts => "Synthetic Shorts",
        }
    }

    pub fn is_pb_style(&self) -> bool {
        matches!(
            self,
            BalanceType::Debit | BalanceType::Credit | BalanceType::PhysicalShorts
        )
    }
}

/// Financing vs execution revenue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum FinOrExec {
    Financing,
    Execution,
}

impl FinOrExec {
    pub fn name(&self) -> &'static str {
        match self {
            FinOrExec::Financing => "Financing",
            FinOrExec::Execution => "Execution",
        }
    }
}

/// Primary vs secondary revenue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum PrimaryOrSecondary {
    Primary,
    Secondary,
}

impl PrimaryOrSecondary {
    pub fn name(&self) -> &'static str {
        match self {
            PrimaryOrSecondary::Primary => "Primary",
            PrimaryOrSecondary::Secondary => "Secondary",
        }
    }
}

/// A grouping dimension for result granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Aggregate,
    Client,
    Date,
    Business,
    Subbusiness,
    Region,
    Country,
    BalanceType,
    FinOrExec,
    PrimaryOrSecondary,
}

impl Dimension {
    pub fn name(&self) -> &'static str {
        match self {
            Dimension::Aggregate => "aggregate",
            Dimension::Client => "client",
            Dimension::Date => "date",
            Dimension::Business => "business",
            Dimension::Subbusiness => "subbusiness",
            Dimension::Region => "region",
            Dimension::Country => "country",
            Dimension::BalanceType => "balance_type",
            Dimension::FinOrExec => "fin_or_exec",
            Dimension::PrimaryOrSecondary => "primary_or_secondary",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Capital measure. Display names are the platform's own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum CapitalMeasure {
    #[serde(rename = "Total RWA")]
    TotalRwa,
    #[serde(rename = "Portfolio RWA")]
    PortfolioRwa,
    #[serde(rename = "Borrow RWA")]
    BorrowRwa,
    #[serde(rename = "Balance Sheet")]
    BalanceSheet,
    #[serde(rename = "Supplemental Balance Sheet")]
    SupplementalBalanceSheet,
    #[serde(rename = "GSIB Points")]
    GsibPoints,
    #[serde(rename = "Total AE")]
    TotalAe,
    #[serde(rename = "Preferred AE")]
    PreferredAe,
}

impl CapitalMeasure {
    pub fn name(&self) -> &'static str {
        match self {
            CapitalMeasure::TotalRwa => "Total RWA",
            CapitalMeasure::PortfolioRwa => "Portfolio RWA",
            CapitalMeasure::BorrowRwa => "Borrow RWA",
            CapitalMeasure::BalanceSheet => "Balance Sheet",
            CapitalMeasure::SupplementalBalanceSheet => "Supplemental Balance Sheet",
            CapitalMeasure::GsibPoints => "GSIB Points",
            CapitalMeasure::TotalAe => "Total AE",
            CapitalMeasure::PreferredAe => "Preferred AE",
        }
    }

    pub fn parse(s: &str) -> Option<CapitalMeasure> {
        let normalized = s.trim().to_lowercase();
        [
            CapitalMeasure::TotalRwa,
            CapitalMeasure::PortfolioRwa,
            CapitalMeasure::BorrowRwa,
            CapitalMeasure::BalanceSheet,
            CapitalMeasure::SupplementalBalanceSheet,
            CapitalMeasure::GsibPoints,
            CapitalMeasure::TotalAe,
            CapitalMeasure::PreferredAe,
        ]
        .into_iter()
        .find(|m| m.name().to_lowercase() == normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_serde_names() {
        let json = serde_json::to_string(&Dimension::FinOrExec).unwrap();
        assert_eq!(json, "\"fin_or_exec\"");
        let back: Dimension = serde_json::from_str("\"balance_type\"").unwrap();
        assert_eq!(back, Dimension::BalanceType);
    }

    #[test]
    fn test_equities_umbrella_expands() {
        let members = BusinessFilter::Equities.members();
        assert_eq!(members, &[Business::Prime, Business::EquitiesExPrime]);
    }

    #[test]
    fn test_capital_measure_parse_display_names() {
        assert_eq!(CapitalMeasure::parse("Total AE"), Some(CapitalMeasure::TotalAe));
        assert_eq!(CapitalMeasure::parse("total rwa"), Some(CapitalMeasure::TotalRwa));
        assert_eq!(CapitalMeasure::parse("equity"), None);
    }

    #[test]
    fn test_region_country_membership() {
        assert!(Region::Emea.countries().contains(&Country::Gbr));
        assert!(!Region::Asia.countries().contains(&Country::Usa));
    }

    #[test]
    fn test_balance_type_families() {
        assert!(BalanceType::Debit.is_pb_style());
        assert!(!BalanceType::SyntheticLongs.is_pb_style());
        assert!(Subbusiness::Pb.is_pb_family());
        assert!(!Subbusiness::Spg.is_pb_family());
    }
}
