//! Deadlock analyzer (spec §4.12): structural risk via unmarked siphons
//! (§4.4) plus behavioral risk via current enablement. Constructor-injected
//! with the siphon analyzer it consults.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::analyzers::siphons::{Siphon, SiphonAnalyzer, SiphonOptions};
use crate::error::{Result, TopologyError};
use crate::framework::{timed, AnalysisResult, Analyzer, AnalyzerOptions, ResultCache};
use crate::model::{PetriNet, TransitionIndex};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadlockOptions {
    pub check_siphons: bool,
    pub check_enablement: bool,
    pub suggest_recovery: bool,
}

impl Default for DeadlockOptions {
    fn default() -> Self {
        Self {
            check_siphons: true,
            check_enablement: true,
            suggest_recovery: true,
        }
    }
}

impl AnalyzerOptions for DeadlockOptions {
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeadlockType {
    None,
    Structural,
    Behavioral,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    None,
}

pub struct DeadlockAnalyzer {
    model: Arc<PetriNet>,
    siphons: SiphonAnalyzer,
    cache: ResultCache,
}

impl DeadlockAnalyzer {
    pub fn new(model: Arc<PetriNet>) -> Self {
        let siphons = SiphonAnalyzer::new(Arc::clone(&model));
        Self {
            model,
            siphons,
            cache: ResultCache::new(),
        }
    }

    /// Exposes the behavioral half of the contract without the siphon
    /// dependency, for the liveness analyzer's conservative downgrade rule
    /// (spec §4.11) which only needs "is this exact marking a deadlock".
    pub fn marking_is_deadlock(net: &PetriNet, marking: &[u64]) -> bool {
        (0..net.transition_count()).all(|i| !net.is_enabled(TransitionIndex(i), marking))
    }

    fn compute(&mut self, options: &DeadlockOptions) -> AnalysisResult {
        let net = Arc::clone(&self.model);
        let mut warnings = Vec::new();

        let mut empty_siphons: Vec<Siphon> = Vec::new();
        let mut structural = false;
        if options.check_siphons {
            let result = self.siphons.analyze(SiphonOptions::default());
            if result.success {
                let siphons: Vec<Siphon> = serde_json::from_value(result.data["siphons"].clone()).unwrap_or_default();
                empty_siphons = siphons.into_iter().filter(|s| !s.is_marked).collect();
                structural = !empty_siphons.is_empty();
            } else {
                warnings.push("dependency unavailable: siphons could not be computed".to_string());
            }
        }

        let marking = net.current_marking();
        let mut disabled_transitions = Vec::new();
        let mut behavioral = false;
        if options.check_enablement {
            for i in 0..net.transition_count() {
                let t = TransitionIndex(i);
                if !net.is_enabled(t, &marking) {
                    disabled_transitions.push(net.transition(t).id.clone());
                }
            }
            behavioral = net.transition_count() > 0 && disabled_transitions.len() == net.transition_count();
        }

        let deadlock_type = match (structural, behavioral) {
            (true, true) => DeadlockType::Both,
            (false, true) => DeadlockType::Behavioral,
            (true, false) => DeadlockType::Structural,
            (false, false) => DeadlockType::None,
        };
        let has_deadlock = deadlock_type != DeadlockType::None;

        let severity = if structural && behavioral {
            Severity::Critical
        } else if behavioral {
            Severity::High
        } else if structural {
            Severity::Medium
        } else if !disabled_transitions.is_empty() {
            Severity::Low
        } else {
            Severity::None
        };

        let mut recovery_suggestions = Vec::new();
        if options.suggest_recovery {
            for siphon in &empty_siphons {
                if let Some(place) = siphon.places.first() {
                    recovery_suggestions.push(format!("add token to place {place}"));
                }
            }
            for t_id in &disabled_transitions {
                if let Some(t) = net.transition_by_id(t_id) {
                    let unsatisfied: Vec<String> = net
                        .transition_preset(t)
                        .iter()
                        .filter(|&&p| marking[p.0] < net.weight_place_to_transition(p, t) as u64)
                        .map(|&p| net.place(p).id.clone())
                        .collect();
                    if !unsatisfied.is_empty() {
                        recovery_suggestions.push(format!("unsatisfied input place(s) for {t_id}: {}", unsatisfied.join(", ")));
                    }
                }
            }
        }

        let mut data = HashMap::new();
        data.insert("has_deadlock".into(), json!(has_deadlock));
        data.insert("deadlock_type".into(), json!(deadlock_type));
        data.insert("empty_siphons".into(), json!(empty_siphons));
        data.insert("disabled_transitions".into(), json!(disabled_transitions));
        data.insert("recovery_suggestions".into(), json!(recovery_suggestions));
        data.insert("severity".into(), json!(severity));

        let summary_text = if has_deadlock {
            format!("deadlock risk detected ({:?})", deadlock_type)
        } else {
            "no deadlock risk detected".to_string()
        };
        let mut result = AnalysisResult::success(data, summary_text);
        for w in warnings {
            result = result.with_warning(w);
        }
        result
    }
}

impl Analyzer for DeadlockAnalyzer {
    type Options = DeadlockOptions;

    fn analyze(&mut self, options: Self::Options) -> AnalysisResult {
        if let Err(e) = options.validate() {
            return AnalysisResult::failure(e.to_string());
        }
        let model_hash = self.model.structural_hash();
        if let Some(cached) = self.cache.get(model_hash, &options) {
            return cached;
        }
        let (result, metadata) = timed(serde_json::to_value(&options).unwrap_or(Value::Null), || self.compute(&options));
        let result = result.with_metadata(metadata);
        self.cache.put(model_hash, &options, result.clone());
        result
    }

    fn invalidate(&mut self) {
        self.cache.clear();
        self.siphons.invalidate();
    }

    fn clear_cache(&mut self) {
        self.cache.clear();
    }
}
