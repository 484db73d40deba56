use crate::utils::error::{DssatError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    PlantGro,
    PlantN,
    SoilNi,
    SoilWat,
    Et,
    Weather,
    Summary,
    SoilWatBal,
    CnRatio,
    Observed,
}

impl ReportKind {
    pub const ALL: [ReportKind; 10] = [
        ReportKind::PlantGro,
        ReportKind::PlantN,
        ReportKind::SoilNi,
        ReportKind::SoilWat,
        ReportKind::Et,
        ReportKind::Weather,
        ReportKind::Summary,
        ReportKind::SoilWatBal,
        ReportKind::CnRatio,
        ReportKind::Observed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::PlantGro => "plant_gro",
            ReportKind::PlantN => "plant_n",
            ReportKind::SoilNi => "soil_ni",
            ReportKind::SoilWat => "soil_wat",
            ReportKind::Et => "et",
            ReportKind::Weather => "weather",
            ReportKind::Summary => "summary",
            ReportKind::SoilWatBal => "soil_wat_bal",
            ReportKind::CnRatio => "cn_ratio",
            ReportKind::Observed => "observed",
        }
    }

    /// Files the report is built from, relative to the run directory.
    /// Observed data has no fixed name and must be configured per request.
    pub fn default_files(&self) -> &'static [&'static str] {
        match self {
            ReportKind::PlantGro => &["PlantGro.OUT"],
            ReportKind::PlantN => &["PlantN.OUT"],
            ReportKind::SoilNi => &["SoilNi.OUT"],
            ReportKind::SoilWat => &["SoilWat.OUT"],
            ReportKind::Et => &["ET.OUT"],
            ReportKind::Weather => &["Weather.OUT"],
            ReportKind::Summary => &["Summary.OUT"],
            ReportKind::SoilWatBal => &["SoilWatBal.OUT"],
            ReportKind::CnRatio => &["SOMLITC.OUT", "SOMLITN.OUT"],
            ReportKind::Observed => &[],
        }
    }

    pub fn table_name(&self) -> &'static str {
        match self {
            ReportKind::PlantGro => "PlantGro",
            ReportKind::PlantN => "PlantN",
            ReportKind::SoilNi => "SoilNi",
            ReportKind::SoilWat => "SoilWat",
            ReportKind::Et => "ET",
            ReportKind::Weather => "Weather",
            ReportKind::Summary => "Summary",
            ReportKind::SoilWatBal => "SoilWatBal",
            ReportKind::CnRatio => "CN_Ratio",
            ReportKind::Observed => "Observed",
        }
    }

    /// Variables DSSAT reports as running totals for this file.
    pub fn cumulative_params(&self) -> &'static [&'static str] {
        match self {
            ReportKind::PlantGro => &["SNW0C", "SNW1C"],
            ReportKind::PlantN => &["NUPC", "SNN0C", "SNN1C"],
            ReportKind::SoilNi => &[
                "NAPC", "NMNC", "NITC", "NDNC", "NIMC", "AMLC", "NNMNC", "NUCM", "NLCC", "TDFC",
            ],
            ReportKind::SoilWat => &["ROFC", "DRNC", "PREC", "IR#C", "IRRC", "TDFC"],
            ReportKind::Et => &["ETAC", "EPAC", "ESAC", "EFAC", "EMAC"],
            _ => &[],
        }
    }

    /// Daily time-series outputs with `YEAR`/`DOY` columns.
    pub fn is_daily(&self) -> bool {
        matches!(
            self,
            ReportKind::PlantGro
                | ReportKind::PlantN
                | ReportKind::SoilNi
                | ReportKind::SoilWat
                | ReportKind::Et
                | ReportKind::Weather
        )
    }

    /// Only plant outputs carry a ` MODEL` line per run worth keeping.
    pub fn supports_crop_sequence(&self) -> bool {
        matches!(self, ReportKind::PlantGro | ReportKind::PlantN)
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = DssatError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        ReportKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| DssatError::InvalidConfigValueError {
                field: "report".to_string(),
                value: s.to_string(),
                reason: format!(
                    "Unknown report. Valid reports: {}",
                    ReportKind::ALL
                        .iter()
                        .map(ReportKind::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_round_trips_names() {
        for kind in ReportKind::ALL {
            assert_eq!(kind.as_str().parse::<ReportKind>().unwrap(), kind);
        }
        assert_eq!("PLANT_GRO".parse::<ReportKind>().unwrap(), ReportKind::PlantGro);
        assert!("plantgro".parse::<ReportKind>().is_err());
    }

    #[test]
    fn test_weather_has_no_cumulative_params() {
        assert!(ReportKind::Weather.cumulative_params().is_empty());
        assert!(ReportKind::Weather.is_daily());
        assert!(ReportKind::SoilWat.cumulative_params().contains(&"IR#C"));
    }

    #[test]
    fn test_serde_names_match_as_str() {
        let json = serde_json::to_string(&ReportKind::SoilWatBal).unwrap();
        assert_eq!(json, "\"soil_wat_bal\"");
        let kind: ReportKind = serde_json::from_str("\"cn_ratio\"").unwrap();
        assert_eq!(kind, ReportKind::CnRatio);
    }
}
