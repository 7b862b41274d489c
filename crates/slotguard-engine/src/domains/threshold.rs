//! Threshold-approval authorization (multi-signature admin gate).
//!
//! Storage:
//!
//! | slot         | type                                      |
//! |--------------|-------------------------------------------|
//! | `isAdmin`    | `mapping(address => bool)`                |
//! | `approvedBy` | `mapping(address => mapping(address => bool))`, keyed `(target, approver)` |
//! | `approvals`  | `mapping(address => uint256)`             |
//! | `executed`   | `bool`                                    |
//!
//! The constructor registers `admins` distinct admin addresses. `approve`
//! lets an admin approve a target once; `execute` fires once a target has
//! `required` approvals.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use slotguard_ir::encoder::Step;
use slotguard_ir::properties::SafetyProperty;
use slotguard_ir::state::{State, StorageLayout};
use slotguard_ir::transition::{Inputs, Transition};
use slotguard_ir::types::SlotType;
use slotguard_ir::value::{Predicate, SymbolicValue};
use slotguard_ir::vocab::Vocabulary;
use slotguard_ir::ModelResult;
use slotguard_smt::backends::smtlib_printer::to_smtlib;
use slotguard_smt::terms::SmtTerm;

use crate::config::ConfigError;
use crate::report::CheckCase;
use crate::scenario::{Scenario, Setup};

pub const DEFAULT_REQUIRED: u64 = 3;
pub const DEFAULT_ADMINS: usize = 4;
/// Largest admin set the constructor will register. Admin distinctness is
/// encoded pairwise, so the constructor grows quadratically in this.
pub const MAX_ADMINS: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Approvals needed before `execute` may fire.
    pub required: u64,
    /// Number of distinct admins the constructor registers.
    pub admins: usize,
    /// Exploration depth; falls back to the engine's depth when unset.
    pub depth: Option<usize>,
    /// Drop the "already approved" check from `approve`.
    pub relax_repeat_guard: bool,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            required: DEFAULT_REQUIRED,
            admins: DEFAULT_ADMINS,
            depth: None,
            relax_repeat_guard: false,
        }
    }
}

impl ThresholdConfig {
    pub fn with_required(mut self, required: u64) -> Self {
        self.required = required;
        self
    }

    pub fn with_admins(mut self, admins: usize) -> Self {
        self.admins = admins;
        self
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn relaxed(mut self) -> Self {
        self.relax_repeat_guard = true;
        self
    }
}

fn address(name: &str) -> SymbolicValue {
    SymbolicValue::new(SlotType::Address, SmtTerm::var(name))
}

fn admin_name(i: usize) -> String {
    format!("admin{i}")
}

/// The multi-signature model for one configuration.
#[derive(Debug, Clone)]
pub struct ThresholdModel {
    config: ThresholdConfig,
    depth: usize,
    layout: Arc<StorageLayout>,
}

impl ThresholdModel {
    pub fn new(config: ThresholdConfig, default_depth: usize) -> Result<Self, ConfigError> {
        if config.required == 0 {
            return Err(ConfigError::Invalid("required approvals must be at least 1".into()));
        }
        if config.admins > MAX_ADMINS {
            return Err(ConfigError::Invalid(format!(
                "too many admins: {} registered, at most {MAX_ADMINS} supported",
                config.admins
            )));
        }
        if (config.admins as u64) < config.required {
            return Err(ConfigError::Invalid(format!(
                "not enough admins: {} registered, {} approvals required",
                config.admins, config.required
            )));
        }
        let layout = Self::layout()
            .map_err(|e| ConfigError::Invalid(format!("storage layout: {e}")))?;
        let depth = config.depth.unwrap_or(default_depth);
        Ok(Self {
            config,
            depth,
            layout,
        })
    }

    pub fn layout() -> ModelResult<Arc<StorageLayout>> {
        StorageLayout::builder()
            .slot("isAdmin", SlotType::map(SlotType::Address, SlotType::Bool))
            .slot(
                "approvedBy",
                SlotType::map(
                    SlotType::Address,
                    SlotType::map(SlotType::Address, SlotType::Bool),
                ),
            )
            .slot("approvals", SlotType::map(SlotType::Address, SlotType::uint256()))
            .slot("executed", SlotType::Bool)
            .build()
    }

    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    fn required(&self) -> SymbolicValue {
        SymbolicValue::uint(self.config.required, 256)
    }

    pub fn approve(&self) -> Transition {
        let check_repeat = !self.config.relax_repeat_guard;
        Transition::new("approve")
            .input("sender", SlotType::Address)
            .input("target", SlotType::Address)
            .guard(move |pre, args| {
                let sender = args.get("sender")?;
                let target = args.get("target")?;
                let is_admin = pre.read_at("isAdmin", &[sender])?.truthy()?;
                if !check_repeat {
                    return Ok(is_admin);
                }
                let already = pre.read_at("approvedBy", &[target, sender])?.truthy()?;
                Ok(is_admin.and(already.not()))
            })
            .effect(|pre, args| {
                let sender = args.get("sender")?;
                let target = args.get("target")?;
                let count = pre.read_at("approvals", &[target])?.add_const(1u8)?;
                pre.write_at("approvedBy", &[target, sender], SymbolicValue::bool(true))?
                    .write_at("approvals", &[target], count)
            })
    }

    pub fn execute(&self) -> Transition {
        let required = self.required();
        Transition::new("execute")
            .input("target", SlotType::Address)
            .guard(move |pre, args| pre.read_at("approvals", &[args.get("target")?])?.uge(&required))
            .effect(|pre, _| pre.write("executed", SymbolicValue::bool(true)))
    }

    /// Deployment: `admin0..adminN` are pairwise distinct and registered
    /// in `isAdmin`; every other slot keeps its default.
    fn construct(admins: usize, base: &State, vocab: &mut Vocabulary) -> ModelResult<Setup> {
        let mut state = base.clone();
        let mut registered = Vec::with_capacity(admins);
        for i in 0..admins {
            let admin = vocab.fresh(&admin_name(i), &SlotType::Address)?;
            state = state.write_at("isAdmin", &[&admin], SymbolicValue::bool(true))?;
            registered.push(admin);
        }
        let mut distinct = Vec::new();
        for (i, a) in registered.iter().enumerate() {
            for b in &registered[i + 1..] {
                distinct.push(a.ne(b)?);
            }
        }
        Ok(Setup::new(state).assume(Predicate::all(distinct)))
    }

    fn observe_approvals(
        _initial: &State,
        steps: &[Step],
        _constants: &Inputs,
    ) -> ModelResult<Vec<(String, SymbolicValue)>> {
        let mut out = Vec::new();
        for step in steps {
            for branch in &step.branches {
                if let Ok(target) = branch.inputs.get("target") {
                    let label = format!("{}.approvals[{}]", step.label, to_smtlib(target.term()));
                    out.push((label, step.post.read_at("approvals", &[target])?));
                }
            }
        }
        Ok(out)
    }

    fn deployed(&self, name: &str) -> Scenario {
        let admins = self.config.admins;
        Scenario::new(name, &self.layout)
            .setup(move |base, _, vocab| Self::construct(admins, base, vocab))
            .observe(Self::observe_approvals)
    }

    /// Bounded exploration from deployment over `approve` and `execute`.
    pub fn exploration(&self, depth: usize) -> Scenario {
        self.deployed("threshold")
            .explore(vec![self.approve(), self.execute()], depth)
    }

    /// One admin calls `approve` twice on the same target.
    pub fn double_approval_scenario(&self) -> Scenario {
        let admins = self.config.admins;
        let approve = self.approve();
        Scenario::new("threshold", &self.layout)
            .constant("who", SlotType::Address)
            .constant("tgt", SlotType::Address)
            .setup(move |base, constants, vocab| {
                let setup = Self::construct(admins, base, vocab)?;
                let who = constants.get("who")?;
                let is_admin = setup.state.read_at("isAdmin", &[who])?.truthy()?;
                Ok(setup.assume(is_admin))
            })
            .call(&approve, &[("sender", "who"), ("target", "tgt")])
            .call(&approve, &[("sender", "who"), ("target", "tgt")])
            .observe(Self::observe_approvals)
    }

    /// Any step that sets `executed` started with enough approvals for its
    /// target.
    pub fn authorization_property(&self) -> SafetyProperty {
        let required = self.required();
        SafetyProperty::per_step("authorization", move |v| {
            let was = v.pre.read("executed")?.truthy()?;
            let now = v.post.read("executed")?.truthy()?;
            let target = v.inputs.get("target")?;
            let enough = v.pre.read_at("approvals", &[target])?.uge(&required)?;
            Ok(was.not().and(now).implies(enough))
        })
        .describe("execution requires the approval threshold")
    }

    /// Sanity check: claims `executed` is never set. Expected to fail once
    /// the bound allows `required` approvals plus the execution.
    pub fn execution_unreachable_property(&self) -> SafetyProperty {
        SafetyProperty::per_step("execution_unreachable", |v| {
            Ok(v.post.read("executed")?.truthy()?.not())
        })
        .describe("sanity: execution is reachable within the bound")
    }

    /// `approvals[t]` equals the number of registered admins that approved
    /// `t`, for every target `t`.
    pub fn accounting_property(&self) -> SafetyProperty {
        let admins = self.config.admins;
        SafetyProperty::final_state("approval_accounting", move |_, last, u| {
            let t = u.get("t")?;
            let one = SymbolicValue::uint(1u8, 256);
            let zero = SymbolicValue::uint(0u8, 256);
            let mut tally = zero.clone();
            for i in 0..admins {
                let approved = last
                    .read_at("approvedBy", &[t, &address(&admin_name(i))])?
                    .truthy()?;
                tally = tally.add(&SymbolicValue::ite(&approved, &one, &zero)?)?;
            }
            last.read_at("approvals", &[t])?.eq(&tally)
        })
        .for_all("t", SlotType::Address)
        .describe("approval count matches distinct approving admins")
    }

    /// After the double approval the target holds exactly one approval.
    pub fn double_approval_property(&self) -> SafetyProperty {
        SafetyProperty::final_state("double_approval", |_, last, u| {
            let tgt = u.get("tgt")?;
            last.read_at("approvals", &[tgt])?
                .eq(&SymbolicValue::uint(1u8, 256))
        })
        .describe("a repeated approval does not inflate the count")
    }

    pub fn cases(&self) -> ModelResult<Vec<CheckCase>> {
        let explore = self.exploration(self.depth);
        let enough_to_execute = usize::try_from(self.config.required)
            .unwrap_or(usize::MAX)
            .saturating_add(1);
        let sanity_depth = self.depth.max(enough_to_execute);
        Ok(vec![
            CheckCase::proved(explore.query(&self.authorization_property())?),
            CheckCase::violated(
                self.exploration(sanity_depth)
                    .query(&self.execution_unreachable_property())?,
            ),
            CheckCase::proved(explore.query(&self.accounting_property())?),
            CheckCase::proved(
                self.double_approval_scenario()
                    .query(&self.double_approval_property())?,
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotguard_ir::encoder::encode;
    use slotguard_ir::state::declare_state;

    #[test]
    fn too_few_admins_is_rejected() {
        let err = ThresholdModel::new(ThresholdConfig::default().with_admins(2), 4).unwrap_err();
        assert!(err.to_string().contains("not enough admins"));
        assert!(ThresholdModel::new(ThresholdConfig::default().with_required(0), 4).is_err());
    }

    #[test]
    fn oversized_configs_are_rejected() {
        let huge: ThresholdConfig = serde_json::from_str(
            r#"{"required": 18446744073709551615, "admins": 18446744073709551615, "depth": 0}"#,
        )
        .expect("fits the field types");
        let err = ThresholdModel::new(huge, 4).unwrap_err();
        assert!(err.to_string().contains("too many admins"), "{err}");

        let err = ThresholdModel::new(
            ThresholdConfig::default().with_admins(MAX_ADMINS).with_required(u64::MAX),
            4,
        )
        .unwrap_err();
        assert!(err.to_string().contains("not enough admins"), "{err}");

        let largest = ThresholdConfig::default()
            .with_admins(MAX_ADMINS)
            .with_required(MAX_ADMINS as u64);
        assert!(ThresholdModel::new(largest, 0).is_ok());
    }

    #[test]
    fn config_depth_overrides_engine_depth() {
        let model = ThresholdModel::new(ThresholdConfig::default().with_depth(2), 6).expect("valid");
        assert_eq!(model.depth(), 2);
        let model = ThresholdModel::new(ThresholdConfig::default(), 6).expect("valid");
        assert_eq!(model.depth(), 6);
    }

    #[test]
    fn execute_from_deployment_has_unmet_guard() {
        let model = ThresholdModel::new(ThresholdConfig::default(), 4).expect("valid");
        let mut vocab = Vocabulary::new();
        let init = State::initial(&model.layout);
        let step = encode(&model.execute(), &init, "s0", &mut vocab).expect("encode");
        // the approvals read folds to the default; the comparison is left to the solver
        assert_eq!(
            step.branches[0].guard.term(),
            &SmtTerm::bv(0u8, 256).bvuge(SmtTerm::bv(3u8, 256))
        );
    }

    #[test]
    fn relaxed_guard_only_checks_admin() {
        let strict = ThresholdModel::new(ThresholdConfig::default(), 4).expect("valid");
        let relaxed = ThresholdModel::new(ThresholdConfig::default().relaxed(), 4).expect("valid");
        let mut vocab = Vocabulary::new();
        let pre = declare_state(&strict.layout, "pre", &mut vocab).expect("declare");
        let g_strict = encode(&strict.approve(), &pre, "a", &mut vocab).expect("encode");
        let g_relaxed = encode(&relaxed.approve(), &pre, "b", &mut vocab).expect("encode");
        assert!(matches!(g_strict.branches[0].guard.term(), SmtTerm::And(_)));
        assert!(matches!(g_relaxed.branches[0].guard.term(), SmtTerm::Select(..)));
    }

    #[test]
    fn suite_has_one_sanity_case() {
        let model = ThresholdModel::new(ThresholdConfig::default().with_depth(2), 4).expect("valid");
        let cases = model.cases().expect("cases");
        assert_eq!(cases.len(), 4);
        let sanity: Vec<_> = cases
            .iter()
            .filter(|c| c.expect == crate::report::Expectation::Violated)
            .collect();
        assert_eq!(sanity.len(), 1);
        // sanity exploration is deep enough to reach execution
        assert!(sanity[0].query.vocabulary.contains("s3.choice"));
        assert!(!cases[0].query.vocabulary.contains("s2.choice"));
    }
}
