//! Common data types for the nostalgia/turnout analysis

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One sampled advertisement, attributed to a media market (DMA).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdRecord {
    /// Media-market identifier the ad aired in
    pub dma: String,
    /// Whether the ad was flagged as invoking nostalgic appeal
    pub nostalgic: bool,
}

/// County-level turnout for one election cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnoutRecord {
    /// County FIPS code
    pub county_fips: u32,
    /// Total votes cast
    pub total_votes: f64,
    /// Voting-eligible population
    pub population: f64,
}

/// County-level demographic covariates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemographicRecord {
    /// County FIPS code
    pub county_fips: u32,
    /// Population share identifying as white (percent)
    pub pct_white: f64,
    /// Population share with a college degree (percent)
    pub pct_college: f64,
    /// Median household income (dollars)
    pub median_income: f64,
}

/// One row of the market→county mapping.
///
/// Many counties may share one DMA; a county belongs to exactly one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountyMarket {
    /// County FIPS code
    pub county_fips: u32,
    /// Parent state
    pub state: String,
    /// County name
    pub county_name: String,
    /// Media market covering the county
    pub dma: String,
}

/// Numeric panel columns addressable by name.
///
/// Covariates may be NaN when the demographics join found no row for the
/// county; the regression engine rejects NaN at fit time.
pub const PANEL_COLUMNS: [&str; 9] = [
    "nostalgia_year1",
    "nostalgia_year2",
    "delta_nostalgia",
    "turnout_year1",
    "turnout_year2",
    "delta_turnout",
    "pct_white",
    "pct_college",
    "median_income",
];

/// One retained county in the differenced panel.
///
/// Invariants (enforced by the dataset builder): nostalgia and turnout are
/// finite for both years, and `delta_* = year2 − year1` exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelRow {
    /// County FIPS code
    pub county_fips: u32,
    /// Parent state
    pub state: String,
    /// County name
    pub county_name: String,
    /// Nostalgia percentage, first cycle (possibly state-mean imputed)
    pub nostalgia_year1: f64,
    /// Nostalgia percentage, second cycle (possibly state-mean imputed)
    pub nostalgia_year2: f64,
    /// Turnout percentage, first cycle
    pub turnout_year1: f64,
    /// Turnout percentage, second cycle
    pub turnout_year2: f64,
    /// `nostalgia_year2 − nostalgia_year1`
    pub delta_nostalgia: f64,
    /// `turnout_year2 − turnout_year1`
    pub delta_turnout: f64,
    /// Population share white (NaN if demographics missing)
    pub pct_white: f64,
    /// Population share college-educated (NaN if demographics missing)
    pub pct_college: f64,
    /// Median household income (NaN if demographics missing)
    pub median_income: f64,
}

impl PanelRow {
    /// Look up a numeric column by name.
    ///
    /// Unknown names are a [`Error::MissingColumn`]; a known column may
    /// still hold NaN (unjoined covariates).
    pub fn value(&self, column: &str) -> Result<f64> {
        match column {
            "nostalgia_year1" => Ok(self.nostalgia_year1),
            "nostalgia_year2" => Ok(self.nostalgia_year2),
            "delta_nostalgia" => Ok(self.delta_nostalgia),
            "turnout_year1" => Ok(self.turnout_year1),
            "turnout_year2" => Ok(self.turnout_year2),
            "delta_turnout" => Ok(self.delta_turnout),
            "pct_white" => Ok(self.pct_white),
            "pct_college" => Ok(self.pct_college),
            "median_income" => Ok(self.median_income),
            _ => Err(Error::MissingColumn(column.to_string())),
        }
    }
}

/// The final unit of analysis: one row per retained county.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Panel {
    /// Retained county rows, in builder output order
    pub rows: Vec<PanelRow>,
}

impl Panel {
    /// Create a panel from rows.
    pub fn new(rows: Vec<PanelRow>) -> Self {
        Self { rows }
    }

    /// Number of counties in the panel.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the panel has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Extract a numeric column by name, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<f64>> {
        self.rows.iter().map(|r| r.value(name)).collect()
    }

    /// Distinct states present, sorted.
    pub fn states(&self) -> Vec<String> {
        let mut states: Vec<String> = self.rows.iter().map(|r| r.state.clone()).collect();
        states.sort();
        states.dedup();
        states
    }

    /// Sub-panel of one state.
    pub fn filter_state(&self, state: &str) -> Panel {
        self.filter(|r| r.state == state)
    }

    /// Sub-panel of rows matching a predicate.
    pub fn filter<F: Fn(&PanelRow) -> bool>(&self, pred: F) -> Panel {
        Panel::new(self.rows.iter().filter(|r| pred(r)).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fips: u32, state: &str) -> PanelRow {
        PanelRow {
            county_fips: fips,
            state: state.to_string(),
            county_name: format!("County {fips}"),
            nostalgia_year1: 10.0,
            nostalgia_year2: 15.0,
            turnout_year1: 60.0,
            turnout_year2: 62.0,
            delta_nostalgia: 5.0,
            delta_turnout: 2.0,
            pct_white: 80.0,
            pct_college: 30.0,
            median_income: 55_000.0,
        }
    }

    #[test]
    fn test_column_lookup() {
        let panel = Panel::new(vec![row(1001, "A"), row(2001, "B")]);
        let deltas = panel.column("delta_turnout").unwrap();
        assert_eq!(deltas, vec![2.0, 2.0]);
        for name in PANEL_COLUMNS {
            assert!(panel.column(name).is_ok(), "column {name} should resolve");
        }
    }

    #[test]
    fn test_unknown_column_is_missing_column() {
        let panel = Panel::new(vec![row(1001, "A")]);
        match panel.column("turnout_2028") {
            Err(Error::MissingColumn(name)) => assert_eq!(name, "turnout_2028"),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn test_states_and_filter() {
        let panel = Panel::new(vec![row(1001, "B"), row(1002, "A"), row(1003, "A")]);
        assert_eq!(panel.states(), vec!["A".to_string(), "B".to_string()]);
        assert_eq!(panel.filter_state("A").len(), 2);
        assert!(panel.filter_state("Z").is_empty());
    }
}
