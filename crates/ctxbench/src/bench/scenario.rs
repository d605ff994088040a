//! Scenario fixtures.
//!
//! A scenario is an ordered list of history steps, one question per step
//! and one ground-truth answer per question. It is loaded whole before a
//! run and never mutated.

use crate::error::{ContextError, ContextResult};
use crate::history::HistoryStep;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Scenario {
    pub scenario_type: String,
    #[serde(default)]
    pub description: String,
    /// Declared step count; checked against `steps` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_steps: Option<usize>,
    pub steps: Vec<HistoryStep>,
    pub questions: Vec<String>,
    pub ground_truth: Vec<String>,
}

/// The question asked at one step and its expected answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioProbe<'a> {
    pub question: &'a str,
    pub ground_truth: &'a str,
}

impl Scenario {
    /// Read and validate a JSON scenario file.
    pub fn load(path: impl AsRef<Path>) -> ContextResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let scenario: Scenario = serde_json::from_str(&text)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn num_steps(&self) -> usize {
        self.steps.len()
    }

    /// The probe for 1-based `step`, if it exists.
    pub fn probe(&self, step: usize) -> Option<ScenarioProbe<'_>> {
        let idx = step.checked_sub(1)?;
        Some(ScenarioProbe {
            question: self.questions.get(idx)?,
            ground_truth: self.ground_truth.get(idx)?,
        })
    }

    /// Steps numbered 1..=N in order, one question and one answer each.
    pub fn validate(&self) -> ContextResult<()> {
        if self.steps.is_empty() {
            return Err(ContextError::Configuration("scenario has no steps".into()));
        }
        let n = self.steps.len();
        if self.questions.len() != n || self.ground_truth.len() != n {
            return Err(ContextError::Configuration(format!(
                "scenario has {n} steps but {} questions and {} ground-truth answers",
                self.questions.len(),
                self.ground_truth.len()
            )));
        }
        if let Some(declared) = self.num_steps
            && declared != n
        {
            return Err(ContextError::Configuration(format!(
                "scenario declares num_steps={declared} but has {n} steps"
            )));
        }
        for (i, step) in self.steps.iter().enumerate() {
            let expected = i as u32 + 1;
            if step.step != expected {
                return Err(ContextError::Configuration(format!(
                    "scenario step {} is out of order (expected {expected})",
                    step.step
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> Scenario {
        Scenario {
            scenario_type: "test".into(),
            description: String::new(),
            num_steps: None,
            steps: vec![
                HistoryStep::new(1, "a", "x", "t1"),
                HistoryStep::new(2, "b", "y", "t2"),
            ],
            questions: vec!["q1".into(), "q2".into()],
            ground_truth: vec!["g1".into(), "g2".into()],
        }
    }

    #[test]
    fn valid_scenario_passes() {
        let s = scenario();
        assert!(s.validate().is_ok());
        assert_eq!(s.num_steps(), 2);
        assert_eq!(s.probe(2).unwrap().ground_truth, "g2");
        assert!(s.probe(0).is_none());
        assert!(s.probe(3).is_none());
    }

    #[test]
    fn mismatched_lengths_rejected() {
        let mut s = scenario();
        s.questions.pop();
        assert!(matches!(s.validate(), Err(ContextError::Configuration(_))));
    }

    #[test]
    fn out_of_order_steps_rejected() {
        let mut s = scenario();
        s.steps.swap(0, 1);
        assert!(s.validate().is_err());
    }

    #[test]
    fn declared_count_must_match() {
        let mut s = scenario();
        s.num_steps = Some(3);
        assert!(s.validate().is_err());
    }

    #[test]
    fn loads_fixture_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");
        std::fs::write(
            &path,
            r#"{
              "scenario_type": "detective_investigation",
              "num_steps": 1,
              "steps": [{"step": 1, "action": "Arrive", "observations": "Window broken.", "time": "9:00"}],
              "questions": ["What happened?"],
              "ground_truth": ["A break-in"]
            }"#,
        )
        .unwrap();
        let s = Scenario::load(&path).unwrap();
        assert_eq!(s.steps[0].observations, "Window broken.");
        assert_eq!(s.description, "");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Scenario::load("/nonexistent/scenario.json").unwrap_err();
        assert!(matches!(err, ContextError::Io(_)));
    }
}
