//! Panel construction: market-level ad aggregation, state-mean imputation
//! and the county-level differenced merge.
//!
//! The imputation is an explicit two-pass aggregate-then-join: state means
//! are computed once per year into a map, then a single fill pass replaces
//! missing county values. Each year's means come only from that year's
//! joined values, so there is no cross-year leakage.

use std::collections::HashMap;

use nt_core::types::{AdRecord, CountyMarket, DemographicRecord, Panel, PanelRow, TurnoutRecord};

/// Nostalgic percentage per DMA: `100 * nostalgic_count / total_count`.
fn market_nostalgia_pct(ads: &[AdRecord]) -> HashMap<String, f64> {
    let mut counts: HashMap<&str, (u64, u64)> = HashMap::new();
    for ad in ads {
        let entry = counts.entry(ad.dma.as_str()).or_insert((0, 0));
        if ad.nostalgic {
            entry.0 += 1;
        }
        entry.1 += 1;
    }
    counts
        .into_iter()
        .map(|(dma, (nostalgic, total))| (dma.to_string(), 100.0 * nostalgic as f64 / total as f64))
        .collect()
}

/// Turnout percentage per county: `100 * total_votes / population`.
fn turnout_pct(turnout: &[TurnoutRecord]) -> HashMap<u32, f64> {
    turnout
        .iter()
        .map(|t| (t.county_fips, 100.0 * t.total_votes / t.population))
        .collect()
}

/// County nostalgia values for one year, state-mean imputed.
///
/// Returns one value per mapping row, in mapping order. Counties whose DMA
/// is absent from the year's ad sample get the mean over the same state's
/// non-missing county values. A state with no covered county at all yields
/// NaN, which the merge step later drops.
fn county_nostalgia(market_map: &[CountyMarket], market_pct: &HashMap<String, f64>) -> Vec<f64> {
    let joined: Vec<Option<f64>> =
        market_map.iter().map(|cm| market_pct.get(&cm.dma).copied()).collect();

    // Pass 1: aggregate per-state sums over the joined county values.
    let mut sums: HashMap<&str, (f64, usize)> = HashMap::new();
    for (cm, value) in market_map.iter().zip(&joined) {
        if let Some(v) = value {
            let entry = sums.entry(cm.state.as_str()).or_insert((0.0, 0));
            entry.0 += v;
            entry.1 += 1;
        }
    }
    let state_means: HashMap<&str, f64> =
        sums.into_iter().map(|(state, (sum, n))| (state, sum / n as f64)).collect();

    // Pass 2: fill missing values from the state mean.
    market_map
        .iter()
        .zip(&joined)
        .map(|(cm, value)| match value {
            Some(v) => *v,
            None => match state_means.get(cm.state.as_str()) {
                Some(&mean) => mean,
                None => {
                    log::warn!(
                        "state {} has no county with market data; imputing NaN for {}",
                        cm.state,
                        cm.county_name
                    );
                    f64::NAN
                }
            },
        })
        .collect()
}

/// Build the county-level differenced panel from both cycles' inputs.
///
/// Steps: aggregate ads to DMA percentages per year, join onto counties via
/// the market mapping, impute missing counties at the same-state same-year
/// mean, compute turnout percentages, merge with demographics, difference,
/// and drop counties missing either delta.
///
/// Demographic covariates are joined left: counties without a demographics
/// row carry NaN covariates and are still retained (the regression engine
/// rejects NaN at fit time).
pub fn build_panel(
    ads_year1: &[AdRecord],
    ads_year2: &[AdRecord],
    turnout_year1: &[TurnoutRecord],
    turnout_year2: &[TurnoutRecord],
    demographics: &[DemographicRecord],
    market_map: &[CountyMarket],
) -> Panel {
    let pct_year1 = market_nostalgia_pct(ads_year1);
    let pct_year2 = market_nostalgia_pct(ads_year2);

    let nostalgia_year1 = county_nostalgia(market_map, &pct_year1);
    let nostalgia_year2 = county_nostalgia(market_map, &pct_year2);

    let turnout_year1 = turnout_pct(turnout_year1);
    let turnout_year2 = turnout_pct(turnout_year2);

    let demo: HashMap<u32, &DemographicRecord> =
        demographics.iter().map(|d| (d.county_fips, d)).collect();

    let mut rows = Vec::with_capacity(market_map.len());
    for (i, cm) in market_map.iter().enumerate() {
        let n1 = nostalgia_year1[i];
        let n2 = nostalgia_year2[i];
        let t1 = turnout_year1.get(&cm.county_fips).copied().unwrap_or(f64::NAN);
        let t2 = turnout_year2.get(&cm.county_fips).copied().unwrap_or(f64::NAN);

        let delta_nostalgia = n2 - n1;
        let delta_turnout = t2 - t1;
        if delta_nostalgia.is_nan() || delta_turnout.is_nan() {
            continue;
        }

        let (pct_white, pct_college, median_income) = match demo.get(&cm.county_fips) {
            Some(d) => (d.pct_white, d.pct_college, d.median_income),
            None => (f64::NAN, f64::NAN, f64::NAN),
        };

        rows.push(PanelRow {
            county_fips: cm.county_fips,
            state: cm.state.clone(),
            county_name: cm.county_name.clone(),
            nostalgia_year1: n1,
            nostalgia_year2: n2,
            turnout_year1: t1,
            turnout_year2: t2,
            delta_nostalgia,
            delta_turnout,
            pct_white,
            pct_college,
            median_income,
        });
    }

    Panel::new(rows)
}
