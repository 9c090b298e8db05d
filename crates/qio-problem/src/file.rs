//! Problem files.
//!
//! A problem file is a JSON object of the form
//!
//! ```json
//! {
//!   "name": "maxcut-4",
//!   "type": "ising",
//!   "terms": [{"c": 1, "ids": [0, 1]}, {"w": -0.5, "ids": [2]}],
//!   "initial_configuration": {"0": 1, "1": -1}
//! }
//! ```
//!
//! `type` defaults to `ising` and `initial_configuration` is optional. Each
//! term goes through the same validation as [`Term::try_new`].

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::coefficient::Coefficient;
use crate::error::{ProblemError, ProblemResult};
use crate::problem::{Problem, ProblemType};
use crate::term::Term;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProblemFile {
    name: String,
    #[serde(default, rename = "type")]
    problem_type: ProblemType,
    #[serde(default)]
    terms: Vec<TermEntry>,
    #[serde(default)]
    initial_configuration: BTreeMap<String, i64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TermEntry {
    #[serde(default)]
    c: Option<serde_json::Value>,
    #[serde(default)]
    w: Option<serde_json::Value>,
    #[serde(default)]
    ids: Option<Vec<u32>>,
}

impl TermEntry {
    fn into_term(self, position: usize) -> ProblemResult<Term> {
        let coefficient = |value: Option<serde_json::Value>| {
            value.as_ref().map(Coefficient::try_from).transpose()
        };
        Term::try_new(self.ids, coefficient(self.w)?, coefficient(self.c)?).map_err(|e| match e {
            ProblemError::Validation(msg) => ProblemError::Validation(format!("term {position}: {msg}")),
            other => other,
        })
    }
}

impl Problem {
    /// Parse a problem file from a JSON string.
    pub fn from_json(json: &str) -> ProblemResult<Self> {
        let file: ProblemFile = serde_json::from_str(json)?;
        Self::from_file(file)
    }

    /// Parse a problem file from a reader.
    pub fn from_reader(reader: impl Read) -> ProblemResult<Self> {
        let file: ProblemFile = serde_json::from_reader(reader)?;
        Self::from_file(file)
    }

    /// Read and parse a problem file.
    pub fn load(path: impl AsRef<Path>) -> ProblemResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ProblemError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    fn from_file(file: ProblemFile) -> ProblemResult<Self> {
        if file.name.is_empty() {
            return Err(ProblemError::Validation(
                "problem name must not be empty".to_string(),
            ));
        }

        let terms = file
            .terms
            .into_iter()
            .enumerate()
            .map(|(i, entry)| entry.into_term(i))
            .collect::<ProblemResult<Vec<_>>>()?;

        Ok(Problem::new(file.name)
            .with_problem_type(file.problem_type)
            .with_terms(terms)
            .with_init_config(file.initial_configuration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_full() {
        let problem = Problem::from_json(
            r#"{
                "name": "maxcut-4",
                "type": "pubo",
                "terms": [{"c": 1, "ids": [0, 1]}, {"w": -0.5, "ids": [2]}],
                "initial_configuration": {"0": 1, "1": 0}
            }"#,
        )
        .unwrap();

        assert_eq!(problem.name(), "maxcut-4");
        assert_eq!(problem.problem_type(), ProblemType::Pubo);
        assert_eq!(problem.terms()[0], Term::new(1, vec![0, 1]).unwrap());
        assert_eq!(problem.terms()[1], Term::new(-0.5, vec![2]).unwrap());
        assert_eq!(problem.init_config().get("1"), Some(&0));
    }

    #[test]
    fn test_from_json_defaults() {
        let problem = Problem::from_json(r#"{"name": "p", "terms": [{"c": 2}]}"#).unwrap();
        assert_eq!(problem.problem_type(), ProblemType::Ising);
        assert_eq!(problem.terms()[0].variable_indices(), None);
        assert!(problem.init_config().is_empty());
    }

    #[test]
    fn test_from_json_rejects_bad_terms() {
        let both = Problem::from_json(r#"{"name": "p", "terms": [{"c": 1, "w": 1, "ids": [0]}]}"#);
        assert!(matches!(both, Err(ProblemError::Validation(ref m)) if m.starts_with("term 0")));

        let neither = Problem::from_json(r#"{"name": "p", "terms": [{"c": 1}, {"ids": [0]}]}"#);
        assert!(matches!(neither, Err(ProblemError::Validation(ref m)) if m.starts_with("term 1")));

        let text = Problem::from_json(r#"{"name": "p", "terms": [{"c": "1", "ids": [0]}]}"#);
        assert!(matches!(text, Err(ProblemError::Validation(_))));
    }

    #[test]
    fn test_from_json_rejects_unknown_fields_and_types() {
        assert!(matches!(
            Problem::from_json(r#"{"name": "p", "terms": [], "solver": "x"}"#),
            Err(ProblemError::Serialization(_))
        ));
        assert!(Problem::from_json(r#"{"name": "p", "type": "qubo"}"#).is_err());
        assert!(Problem::from_json(r#"{"name": "", "terms": []}"#).is_err());
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("problem.json");
        std::fs::write(&path, r#"{"name": "disk", "terms": [{"c": 1.5, "ids": [3]}]}"#).unwrap();

        let problem = Problem::load(&path).unwrap();
        assert_eq!(problem.name(), "disk");
        assert_eq!(problem.terms().len(), 1);

        let missing = Problem::load(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(ProblemError::Io { .. })));
    }
}
