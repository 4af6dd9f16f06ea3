//! In-memory grid model handed from the case loader to the solver.
//!
//! Element tables are positional: the index of a record in its `Vec` is the
//! identifier used everywhere else (solver result arrays, summary tables).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Extra per-element attributes the service does not interpret.
///
/// Electrical parameters (impedances, ratings, tap settings, ...) live here
/// and are forwarded to the solver untouched.
pub type Params = BTreeMap<String, Value>;

/// A complete static grid case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridModel {
    /// Case name, if the file carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Nominal system frequency (Hz), stamped by the loader.
    #[serde(default)]
    pub f_hz: f64,
    /// System base power (MVA).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sn_mva: Option<f64>,
    #[serde(default)]
    pub bus: Vec<Bus>,
    #[serde(default)]
    pub line: Vec<Line>,
    #[serde(default)]
    pub trafo: Vec<Transformer>,
    #[serde(default)]
    pub load: Vec<Load>,
    #[serde(default, rename = "gen")]
    pub generators: Vec<Generator>,
}

/// Network node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Nominal voltage (kV).
    #[serde(default)]
    pub vn_kv: f64,
    #[serde(flatten)]
    pub params: Params,
}

/// Line between two buses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub from_bus: usize,
    pub to_bus: usize,
    #[serde(flatten)]
    pub params: Params,
}

/// Two-winding transformer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transformer {
    pub hv_bus: usize,
    pub lv_bus: usize,
    #[serde(flatten)]
    pub params: Params,
}

/// Constant-power load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Load {
    pub bus: usize,
    /// Active power (MW).
    pub p_mw: f64,
    /// Reactive power (Mvar).
    #[serde(default)]
    pub q_mvar: f64,
    #[serde(flatten)]
    pub params: Params,
}

/// Voltage-controlled generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    pub bus: usize,
    /// Active power set-point (MW).
    pub p_mw: f64,
    #[serde(flatten)]
    pub params: Params,
}

impl GridModel {
    /// Total active load (MW); `0.0` for an empty load table.
    pub fn total_load_mw(&self) -> f64 {
        self.load.iter().map(|l| l.p_mw).sum()
    }

    /// Total active generation (MW); `0.0` for an empty generator table.
    pub fn total_gen_mw(&self) -> f64 {
        self.generators.iter().map(|g| g.p_mw).sum()
    }

    /// Checks that every element references an existing bus.
    ///
    /// Returns one message per dangling reference, empty when consistent.
    pub fn dangling_references(&self) -> Vec<String> {
        let n_bus = self.bus.len();
        let mut problems = Vec::new();
        let mut check = |table: &str, idx: usize, field: &str, bus: usize| {
            if bus >= n_bus {
                problems.push(format!(
                    "{table}[{idx}].{field} = {bus} but the case has {n_bus} buses"
                ));
            }
        };

        for (i, l) in self.line.iter().enumerate() {
            check("line", i, "from_bus", l.from_bus);
            check("line", i, "to_bus", l.to_bus);
        }
        for (i, t) in self.trafo.iter().enumerate() {
            check("trafo", i, "hv_bus", t.hv_bus);
            check("trafo", i, "lv_bus", t.lv_bus);
        }
        for (i, l) in self.load.iter().enumerate() {
            check("load", i, "bus", l.bus);
        }
        for (i, g) in self.generators.iter().enumerate() {
            check("gen", i, "bus", g.bus);
        }

        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_bus() -> GridModel {
        GridModel {
            bus: vec![Bus::default(), Bus::default()],
            line: vec![Line {
                from_bus: 0,
                to_bus: 1,
                ..Line::default()
            }],
            load: vec![
                Load {
                    bus: 1,
                    p_mw: 10.0,
                    q_mvar: 2.0,
                    ..Load::default()
                },
                Load {
                    bus: 1,
                    p_mw: 5.5,
                    q_mvar: 1.0,
                    ..Load::default()
                },
            ],
            generators: vec![Generator {
                bus: 0,
                p_mw: 12.0,
                ..Generator::default()
            }],
            ..GridModel::default()
        }
    }

    #[test]
    fn totals_sum_active_power() {
        let model = two_bus();
        assert_eq!(model.total_load_mw(), 15.5);
        assert_eq!(model.total_gen_mw(), 12.0);
    }

    #[test]
    fn empty_tables_total_zero() {
        let model = GridModel::default();
        assert_eq!(model.total_load_mw(), 0.0);
        assert_eq!(model.total_gen_mw(), 0.0);
    }

    #[test]
    fn consistent_model_has_no_dangling_refs() {
        assert!(two_bus().dangling_references().is_empty());
    }

    #[test]
    fn dangling_line_endpoint_reported() {
        let mut model = two_bus();
        model.line[0].to_bus = 7;
        let problems = model.dangling_references();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("line[0].to_bus"));
    }

    #[test]
    fn unknown_fields_round_through_params() {
        let json = r#"{"from_bus": 0, "to_bus": 1, "r_ohm_per_km": 0.12, "max_i_ka": 0.4}"#;
        let line: Line = serde_json::from_str(json).unwrap();
        assert_eq!(line.params.len(), 2);
        let back = serde_json::to_value(&line).unwrap();
        assert_eq!(back["r_ohm_per_km"], 0.12);
        assert_eq!(back["from_bus"], 0);
    }

    #[test]
    fn generators_use_gen_on_the_wire() {
        let json = r#"{"bus": [{}], "gen": [{"bus": 0, "p_mw": 3.5}]}"#;
        let model: GridModel = serde_json::from_str(json).unwrap();
        assert_eq!(model.generators.len(), 1);
        assert_eq!(model.total_gen_mw(), 3.5);

        let back = serde_json::to_value(&model).unwrap();
        assert_eq!(back["gen"][0]["p_mw"], 3.5);
        assert!(back.get("generators").is_none());
    }
}
