//! Suites of expected verdicts and their text / JSON reports.

use std::fmt;

use serde::Serialize;

use crate::checker::{CheckError, PropertyChecker};
use crate::query::VerificationQuery;
use crate::result::{Verdict, Witness};

/// What a case is supposed to come out as. Sanity cases expect a
/// violation: they show the model can reach the situation a property
/// rules out, so a proof of the real property is not vacuous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    Proved,
    Violated,
}

#[derive(Debug, Clone)]
pub struct CheckCase {
    pub query: VerificationQuery,
    pub expect: Expectation,
}

impl CheckCase {
    pub fn proved(query: VerificationQuery) -> Self {
        Self {
            query,
            expect: Expectation::Proved,
        }
    }

    pub fn violated(query: VerificationQuery) -> Self {
        Self {
            query,
            expect: Expectation::Violated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The verdict matches the expectation.
    Pass,
    /// The verdict contradicts the expectation.
    Fail,
    /// The solver could not decide.
    Inconclusive,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseReport {
    pub query: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub expected: Expectation,
    pub verdict: &'static str,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub witness: Option<Witness>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CaseReport {
    pub fn new(case: &CheckCase, verdict: Verdict) -> Self {
        let outcome = match (&verdict, case.expect) {
            (Verdict::Unknown { .. }, _) => Outcome::Inconclusive,
            (Verdict::Proved, Expectation::Proved)
            | (Verdict::Violated(_), Expectation::Violated) => Outcome::Pass,
            _ => Outcome::Fail,
        };
        let verdict_class = verdict.verdict_class();
        let (witness, reason) = match verdict {
            Verdict::Proved => (None, None),
            Verdict::Violated(w) => (Some(w), None),
            Verdict::Unknown { reason } => (None, Some(reason)),
        };
        Self {
            query: case.query.name.clone(),
            description: case.query.description.clone(),
            expected: case.expect,
            verdict: verdict_class,
            outcome,
            witness,
            reason,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub cases: Vec<CaseReport>,
}

impl RunReport {
    pub fn count(&self, outcome: Outcome) -> usize {
        self.cases.iter().filter(|c| c.outcome == outcome).count()
    }

    /// `0` when every case passed, `1` on any contradicted expectation,
    /// `2` when something was left undecided.
    pub fn exit_code(&self) -> i32 {
        if self.count(Outcome::Fail) > 0 {
            1
        } else if self.count(Outcome::Inconclusive) > 0 {
            2
        } else {
            0
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for case in &self.cases {
            let tag = match case.outcome {
                Outcome::Pass => "ok",
                Outcome::Fail => "FAIL",
                Outcome::Inconclusive => "??",
            };
            let expected = match case.expected {
                Expectation::Proved => "proved",
                Expectation::Violated => "violated",
            };
            writeln!(
                f,
                "[{tag:>4}] {}: {} (expected {expected})",
                case.query, case.verdict
            )?;
            if !case.description.is_empty() {
                writeln!(f, "       {}", case.description)?;
            }
            if let Some(reason) = &case.reason {
                writeln!(f, "       reason: {reason}")?;
            }
            if let Some(witness) = &case.witness {
                writeln!(f, "       counterexample:")?;
                for (label, value) in witness.iter() {
                    writeln!(f, "         {label} = {value}")?;
                }
            }
        }
        write!(
            f,
            "{} passed, {} failed, {} inconclusive",
            self.count(Outcome::Pass),
            self.count(Outcome::Fail),
            self.count(Outcome::Inconclusive)
        )
    }
}

/// Check every case in parallel and collect a report. The first backend or
/// modeling error aborts the run.
pub fn run_cases(checker: &PropertyChecker, cases: &[CheckCase]) -> Result<RunReport, CheckError> {
    let queries: Vec<VerificationQuery> = cases.iter().map(|c| c.query.clone()).collect();
    let verdicts = checker.check_batch(&queries);
    let mut report = RunReport::default();
    for (case, verdict) in cases.iter().zip(verdicts) {
        report.cases.push(CaseReport::new(case, verdict?));
    }
    Ok(report)
}
