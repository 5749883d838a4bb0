//! Siphon analyzer (spec §4.4): minimal place sets S with •S ⊆ S• — once
//! empty, nothing can refill them. The enumeration in [`find_minimal_siphons`]
//! is shared with [`super::traps`], which runs it over the reversed net
//! (spec §8 duality: minimal traps of a net are minimal siphons of its
//! reverse).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{Result, TopologyError};
use crate::framework::{timed, AnalysisResult, Analyzer, AnalyzerOptions, ResultCache};
use crate::model::{PetriNet, PlaceIndex};

const DEFAULT_MAX_SIZE: usize = 8;
const DEFAULT_MAX_SIZE_EXHAUSTIVE: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiphonOptions {
    pub max_size: usize,
    pub max_size_exhaustive: usize,
}

impl Default for SiphonOptions {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            max_size_exhaustive: DEFAULT_MAX_SIZE_EXHAUSTIVE,
        }
    }
}

impl AnalyzerOptions for SiphonOptions {
    fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(TopologyError::InvalidOption("max_size must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Criticality {
    Critical,
    High,
    Medium,
    Low,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Siphon {
    pub places: Vec<String>,
    pub size: usize,
    pub is_marked: bool,
    pub criticality: Criticality,
}

pub struct SiphonAnalyzer {
    model: Arc<PetriNet>,
    cache: ResultCache,
}

impl SiphonAnalyzer {
    pub fn new(model: Arc<PetriNet>) -> Self {
        Self {
            model,
            cache: ResultCache::new(),
        }
    }

    pub fn find_siphons_containing_place(&mut self, options: SiphonOptions, place_id: &str) -> Vec<Siphon> {
        let result = self.analyze(options);
        if !result.success {
            return Vec::new();
        }
        let siphons: Vec<Siphon> = result
            .data
            .get("siphons")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        siphons.into_iter().filter(|s| s.places.iter().any(|p| p == place_id)).collect()
    }

    fn compute(&self, options: &SiphonOptions) -> AnalysisResult {
        let net = &self.model;
        if net.place_count() == 0 {
            return AnalysisResult::success(empty_data(), "empty model: no places, so no siphons");
        }

        let (sets, enumeration_truncated) = find_minimal_siphons(net, options.max_size, options.max_size_exhaustive);

        let mut siphons: Vec<Siphon> = sets
            .into_iter()
            .map(|set| {
                let is_marked = set.iter().any(|&p| net.place(p).tokens > 0);
                let size = set.len();
                let criticality = if !is_marked && size <= 3 {
                    Criticality::Critical
                } else if is_marked && size > 5 {
                    Criticality::None
                } else {
                    size_bucket(size)
                };
                Siphon {
                    places: set.iter().map(|&p| net.place(p).id.clone()).collect(),
                    size,
                    is_marked,
                    criticality,
                }
            })
            .collect();
        siphons.sort_by(|a, b| a.places.cmp(&b.places));

        let empty_siphons: Vec<String> = siphons
            .iter()
            .filter(|s| !s.is_marked)
            .flat_map(|s| s.places.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let mut empty_siphons = empty_siphons;
        empty_siphons.sort();

        let count = siphons.len();
        let mut data = HashMap::new();
        data.insert("siphons".into(), json!(siphons));
        data.insert("count".into(), json!(count));
        data.insert("empty_siphons".into(), json!(empty_siphons));

        let mut result = AnalysisResult::success(data, format!("found {count} minimal siphon(s)"));
        if enumeration_truncated {
            result = result.with_warning(format!(
                "enumeration limited to subsets up to size {}; results are a conservative under-approximation",
                options.max_size
            ));
        }
        result
    }
}

fn size_bucket(size: usize) -> Criticality {
    match size {
        1..=2 => Criticality::High,
        3..=5 => Criticality::Medium,
        _ => Criticality::Low,
    }
}

fn empty_data() -> HashMap<String, Value> {
    let mut data = HashMap::new();
    data.insert("siphons".into(), json!([]));
    data.insert("count".into(), json!(0));
    data.insert("empty_siphons".into(), json!([] as [String; 0]));
    data
}

/// Preset of a place set: transitions with an arc into any place in `set`.
fn preset_of_set(net: &PetriNet, set: &[PlaceIndex]) -> HashSet<usize> {
    set.iter().flat_map(|&p| net.place_preset(p).iter().map(|t| t.0)).collect()
}

/// Postset of a place set: transitions with an arc out of any place in `set`.
fn postset_of_set(net: &PetriNet, set: &[PlaceIndex]) -> HashSet<usize> {
    set.iter().flat_map(|&p| net.place_postset(p).iter().map(|t| t.0)).collect()
}

/// Minimal non-empty place subsets `S` with `•S ⊆ S•`, enumerated by
/// increasing size up to `max_size`. A candidate is rejected if it is a
/// superset of an already-accepted minimal siphon.
///
/// Returns `true` for the second element when the net exceeds
/// `max_size_exhaustive` places (the enumeration is then a conservative
/// under-approximation, per spec §4.4's edge case) or when `max_size` itself
/// cut the search short of covering every place subset.
pub(crate) fn find_minimal_siphons(net: &PetriNet, max_size: usize, max_size_exhaustive: usize) -> (Vec<Vec<PlaceIndex>>, bool) {
    let n = net.place_count();
    let effective_max = max_size.min(n);
    let truncated = n > max_size_exhaustive || effective_max < n;
    let mut accepted: Vec<Vec<PlaceIndex>> = Vec::new();

    for size in 1..=effective_max {
        let mut combo = vec![0usize; size];
        if !first_combination(&mut combo, n, size) {
            continue;
        }
        loop {
            let set: Vec<PlaceIndex> = combo.iter().map(|&i| PlaceIndex(i)).collect();
            if !accepted.iter().any(|a| is_subset(a, &set)) {
                let pre = preset_of_set(net, &set);
                let post = postset_of_set(net, &set);
                if pre.is_subset(&post) {
                    accepted.push(set);
                }
            }
            if !next_combination(&mut combo, n) {
                break;
            }
        }
    }
    (accepted, truncated)
}

fn is_subset(smaller: &[PlaceIndex], larger: &[PlaceIndex]) -> bool {
    smaller.iter().all(|s| larger.contains(s))
}

fn first_combination(combo: &mut [usize], n: usize, k: usize) -> bool {
    if k > n {
        return false;
    }
    for (i, slot) in combo.iter_mut().enumerate() {
        *slot = i;
    }
    true
}

/// Advances `combo` (strictly increasing indices into `0..n`) to the next
/// combination in lexicographic order. Returns `false` once exhausted.
fn next_combination(combo: &mut [usize], n: usize) -> bool {
    let k = combo.len();
    let mut i = k;
    loop {
        if i == 0 {
            return false;
        }
        i -= 1;
        if combo[i] < n - (k - i) {
            combo[i] += 1;
            for j in (i + 1)..k {
                combo[j] = combo[j - 1] + 1;
            }
            return true;
        }
    }
}

impl Analyzer for SiphonAnalyzer {
    type Options = SiphonOptions;

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
    }

    fn clear_cache(&mut self) {
        self.cache.clear();
    }
}
