//! Trial source: reads the prepared training and experiment lists from JSON.
//!
//! ```json
//! {
//!   "colors": ["red", "green", "blue", "yellow"],
//!   "training": [[{"trial_type": "congruent", "text": "CZERWONY", "color": "red"}]],
//!   "experiment": [{"trial_type": "neutral", "text": "XXXX", "color": "blue"}]
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use stroop_core::{KeyMapping, Stimulus, Trial, TrialKind};
use stroop_experiment::TrialPlan;

use crate::terminal;

/// A word printed in an ink colour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColoredWord {
    pub text: String,
    pub color: String,
}

impl Stimulus for ColoredWord {
    fn label(&self) -> &str {
        &self.text
    }
}

#[derive(Debug, Deserialize)]
struct TrialFile {
    colors: Vec<String>,
    #[serde(default)]
    training: Vec<Vec<TrialEntry>>,
    experiment: Vec<TrialEntry>,
}

#[derive(Debug, Deserialize)]
struct TrialEntry {
    trial_type: TrialKind,
    text: String,
    color: String,
}

pub fn load_plan(path: &Path) -> Result<TrialPlan<ColoredWord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read trial file {}", path.display()))?;
    parse_plan(&raw).with_context(|| format!("invalid trial file {}", path.display()))
}

pub fn parse_plan(raw: &str) -> Result<TrialPlan<ColoredWord>> {
    let file: TrialFile = serde_json::from_str(raw)?;

    for color in &file.colors {
        if terminal::ink(color).is_none() {
            bail!("colour '{color}' cannot be displayed");
        }
    }
    let mapping = KeyMapping::assign(&file.colors)
        .ok_or_else(|| anyhow!("expected up to four distinct colours, got {:?}", file.colors))?;

    let training = file
        .training
        .into_iter()
        .map(|block| build_all(block, &mapping))
        .collect::<Result<Vec<_>>>()?;
    let experiment = build_all(file.experiment, &mapping)?;
    if experiment.is_empty() {
        bail!("no experiment trials");
    }

    Ok(TrialPlan {
        training,
        experiment,
        mapping,
    })
}

fn build_all(entries: Vec<TrialEntry>, mapping: &KeyMapping) -> Result<Vec<Trial<ColoredWord>>> {
    entries.into_iter().map(|e| build(e, mapping)).collect()
}

fn build(entry: TrialEntry, mapping: &KeyMapping) -> Result<Trial<ColoredWord>> {
    let key = mapping
        .key_for(&entry.color)
        .ok_or_else(|| anyhow!("trial '{}' uses unmapped colour '{}'", entry.text, entry.color))?;
    let word = ColoredWord {
        text: entry.text.clone(),
        color: entry.color.clone(),
    };
    Ok(Trial::new(
        entry.trial_type,
        entry.text,
        entry.color,
        key,
        vec![word],
    ))
}
