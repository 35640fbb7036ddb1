//! Runtime-tunable engine parameters.
//!
//! Defaults come from [`crate::constants`]. Parameters can be changed by
//! name, which is how the command line `--param` flag and the GTP `param`
//! command reach them.

use thiserror::Error;

use crate::constants::*;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),
    #[error("invalid value {value:?} for parameter {name}")]
    InvalidValue { name: String, value: String },
}

/// Search, prior and playout tunables.
#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    pub n_sims: usize,
    pub rave_equiv: u32,
    pub expand_visits: u32,
    pub prior_even: u32,
    pub prior_selfatari: u32,
    pub prior_capture_one: u32,
    pub prior_capture_many: u32,
    pub prior_pat3: u32,
    pub prior_largepattern: u32,
    pub prior_cfg: [u32; 3],
    pub prior_emptyarea: u32,
    pub prob_heuristic_capture: f64,
    pub prob_heuristic_pat3: f64,
    pub prob_ssareject: f64,
    pub prob_rsareject: f64,
    pub resign_thres: f64,
    pub fastplay20_thres: f64,
    pub fastplay5_thres: f64,
    pub report_period: usize,
    /// 0 draws a seed from system entropy.
    pub random_seed: u32,
    /// Never pass early, even when safely ahead.
    pub play_until_the_end: bool,
    pub use_dynamic_komi: bool,
    pub komi_per_handicap_stone: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            n_sims: N_SIMS,
            rave_equiv: RAVE_EQUIV,
            expand_visits: EXPAND_VISITS,
            prior_even: PRIOR_EVEN,
            prior_selfatari: PRIOR_SELFATARI,
            prior_capture_one: PRIOR_CAPTURE_ONE,
            prior_capture_many: PRIOR_CAPTURE_MANY,
            prior_pat3: PRIOR_PAT3,
            prior_largepattern: PRIOR_LARGEPATTERN,
            prior_cfg: PRIOR_CFG,
            prior_emptyarea: PRIOR_EMPTYAREA,
            prob_heuristic_capture: PROB_HEURISTIC_CAPTURE,
            prob_heuristic_pat3: PROB_HEURISTIC_PAT3,
            prob_ssareject: PROB_SSAREJECT,
            prob_rsareject: PROB_RSAREJECT,
            resign_thres: RESIGN_THRES,
            fastplay20_thres: FASTPLAY20_THRES,
            fastplay5_thres: FASTPLAY5_THRES,
            report_period: REPORT_PERIOD,
            random_seed: 1,
            play_until_the_end: false,
            use_dynamic_komi: false,
            komi_per_handicap_stone: KOMI_PER_HANDICAP_STONE,
        }
    }
}

fn parse<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ParamError> {
    value.trim().parse().map_err(|_| ParamError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    })
}

fn parse_flag(name: &str, value: &str) -> Result<bool, ParamError> {
    match value.trim() {
        "1" | "true" | "on" => Ok(true),
        "0" | "false" | "off" => Ok(false),
        _ => Err(ParamError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

impl Params {
    /// Set a parameter from its (case-insensitive) upper-case name.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), ParamError> {
        let key = name.to_ascii_uppercase();
        match key.as_str() {
            "N_SIMS" => self.n_sims = parse(&key, value)?,
            "RAVE_EQUIV" => self.rave_equiv = parse(&key, value)?,
            "EXPAND_VISITS" => self.expand_visits = parse(&key, value)?,
            "PRIOR_EVEN" => self.prior_even = parse(&key, value)?,
            "PRIOR_SELFATARI" => self.prior_selfatari = parse(&key, value)?,
            "PRIOR_CAPTURE_ONE" => self.prior_capture_one = parse(&key, value)?,
            "PRIOR_CAPTURE_MANY" => self.prior_capture_many = parse(&key, value)?,
            "PRIOR_PAT3" => self.prior_pat3 = parse(&key, value)?,
            "PRIOR_LARGEPATTERN" => self.prior_largepattern = parse(&key, value)?,
            "PRIOR_CFG0" => self.prior_cfg[0] = parse(&key, value)?,
            "PRIOR_CFG1" => self.prior_cfg[1] = parse(&key, value)?,
            "PRIOR_CFG2" => self.prior_cfg[2] = parse(&key, value)?,
            "PRIOR_EMPTYAREA" => self.prior_emptyarea = parse(&key, value)?,
            "PROB_HEURISTIC_CAPTURE" => self.prob_heuristic_capture = parse(&key, value)?,
            "PROB_HEURISTIC_PAT3" => self.prob_heuristic_pat3 = parse(&key, value)?,
            "PROB_SSAREJECT" => self.prob_ssareject = parse(&key, value)?,
            "PROB_RSAREJECT" => self.prob_rsareject = parse(&key, value)?,
            "RESIGN_THRES" => self.resign_thres = parse(&key, value)?,
            "FASTPLAY20_THRES" => self.fastplay20_thres = parse(&key, value)?,
            "FASTPLAY5_THRES" => self.fastplay5_thres = parse(&key, value)?,
            "REPORT_PERIOD" => self.report_period = parse(&key, value)?,
            "RANDOM_SEED" => self.random_seed = parse(&key, value)?,
            "PLAY_UNTIL_THE_END" => self.play_until_the_end = parse_flag(&key, value)?,
            "USE_DYNAMIC_KOMI" => self.use_dynamic_komi = parse_flag(&key, value)?,
            "KOMI_PER_HANDICAP_STONE" => self.komi_per_handicap_stone = parse(&key, value)?,
            _ => return Err(ParamError::UnknownParameter(name.to_string())),
        }
        log::debug!("param {key} = {value}");
        Ok(())
    }

    /// Parse a `NAME=VALUE` assignment and apply it.
    pub fn apply_assignment(&mut self, assignment: &str) -> Result<(), ParamError> {
        match assignment.split_once('=') {
            Some((name, value)) => self.set(name.trim(), value),
            None => Err(ParamError::InvalidValue {
                name: assignment.to_string(),
                value: String::new(),
            }),
        }
    }

    /// All parameters as (name, value) pairs, in a stable order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("N_SIMS", self.n_sims.to_string()),
            ("RAVE_EQUIV", self.rave_equiv.to_string()),
            ("EXPAND_VISITS", self.expand_visits.to_string()),
            ("PRIOR_EVEN", self.prior_even.to_string()),
            ("PRIOR_SELFATARI", self.prior_selfatari.to_string()),
            ("PRIOR_CAPTURE_ONE", self.prior_capture_one.to_string()),
            ("PRIOR_CAPTURE_MANY", self.prior_capture_many.to_string()),
            ("PRIOR_PAT3", self.prior_pat3.to_string()),
            ("PRIOR_LARGEPATTERN", self.prior_largepattern.to_string()),
            ("PRIOR_CFG0", self.prior_cfg[0].to_string()),
            ("PRIOR_CFG1", self.prior_cfg[1].to_string()),
            ("PRIOR_CFG2", self.prior_cfg[2].to_string()),
            ("PRIOR_EMPTYAREA", self.prior_emptyarea.to_string()),
            ("PROB_HEURISTIC_CAPTURE", self.prob_heuristic_capture.to_string()),
            ("PROB_HEURISTIC_PAT3", self.prob_heuristic_pat3.to_string()),
            ("PROB_SSAREJECT", self.prob_ssareject.to_string()),
            ("PROB_RSAREJECT", self.prob_rsareject.to_string()),
            ("RESIGN_THRES", self.resign_thres.to_string()),
            ("FASTPLAY20_THRES", self.fastplay20_thres.to_string()),
            ("FASTPLAY5_THRES", self.fastplay5_thres.to_string()),
            ("REPORT_PERIOD", self.report_period.to_string()),
            ("RANDOM_SEED", self.random_seed.to_string()),
            ("PLAY_UNTIL_THE_END", u8::from(self.play_until_the_end).to_string()),
            ("USE_DYNAMIC_KOMI", u8::from(self.use_dynamic_komi).to_string()),
            ("KOMI_PER_HANDICAP_STONE", self.komi_per_handicap_stone.to_string()),
        ]
    }
}
