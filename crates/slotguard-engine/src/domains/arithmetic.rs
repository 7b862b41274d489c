//! Guarded withdrawal over a wrapping unsigned balance.

use std::sync::Arc;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use slotguard_ir::properties::SafetyProperty;
use slotguard_ir::state::StorageLayout;
use slotguard_ir::transition::Transition;
use slotguard_ir::types::{SlotType, WORD_WIDTH};
use slotguard_ir::value::{Predicate, SymbolicValue};
use slotguard_ir::ModelResult;

use crate::config::ConfigError;
use crate::report::CheckCase;
use crate::scenario::{Scenario, Setup, Start};

/// Precondition placed on `withdraw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardKind {
    /// `balance > amount`.
    #[default]
    Strict,
    /// `balance >= amount`.
    NonStrict,
    /// No precondition at all.
    Unguarded,
}

impl GuardKind {
    fn holds(self, balance: &SymbolicValue, amount: &SymbolicValue) -> ModelResult<Predicate> {
        match self {
            GuardKind::Strict => balance.ugt(amount),
            GuardKind::NonStrict => balance.uge(amount),
            GuardKind::Unguarded => Ok(Predicate::always()),
        }
    }

    fn admits(self, balance: &BigUint, amount: &BigUint) -> bool {
        match self {
            GuardKind::Strict => balance > amount,
            GuardKind::NonStrict => balance >= amount,
            GuardKind::Unguarded => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArithmeticConfig {
    pub guard: GuardKind,
    /// Bit width of the balance.
    pub width: u32,
    /// Pin the starting balance (decimal).
    pub balance: Option<String>,
    /// Pin the withdrawn amount (decimal).
    pub amount: Option<String>,
}

impl Default for ArithmeticConfig {
    fn default() -> Self {
        Self {
            guard: GuardKind::Strict,
            width: WORD_WIDTH,
            balance: None,
            amount: None,
        }
    }
}

impl ArithmeticConfig {
    pub fn with_guard(mut self, guard: GuardKind) -> Self {
        self.guard = guard;
        self
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn pinned(mut self, balance: impl ToString, amount: impl ToString) -> Self {
        self.balance = Some(balance.to_string());
        self.amount = Some(amount.to_string());
        self
    }
}

fn parse_pin(field: &str, text: Option<&str>, width: u32) -> Result<Option<BigUint>, ConfigError> {
    let Some(text) = text else {
        return Ok(None);
    };
    let value: BigUint = text
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{field} '{text}' is not a decimal number")))?;
    if value.bits() > u64::from(width) {
        return Err(ConfigError::Invalid(format!(
            "{field} {value} does not fit in {width} bits"
        )));
    }
    Ok(Some(value))
}

/// The withdrawal model for one configuration.
#[derive(Debug, Clone)]
pub struct ArithmeticModel {
    guard: GuardKind,
    width: u32,
    balance: Option<BigUint>,
    amount: Option<BigUint>,
    layout: Arc<StorageLayout>,
}

impl ArithmeticModel {
    pub fn new(config: ArithmeticConfig) -> Result<Self, ConfigError> {
        if config.width == 0 || config.width > 512 {
            return Err(ConfigError::Invalid(format!(
                "balance width {} outside 1..=512",
                config.width
            )));
        }
        let balance = parse_pin("balance", config.balance.as_deref(), config.width)?;
        let amount = parse_pin("amount", config.amount.as_deref(), config.width)?;
        if let (Some(b), Some(a)) = (&balance, &amount) {
            if !config.guard.admits(b, a) {
                return Err(ConfigError::Invalid(format!(
                    "pinned balance {b} and amount {a} never pass the {:?} guard",
                    config.guard
                )));
            }
        }
        let layout = StorageLayout::builder()
            .slot("balance", SlotType::Uint(config.width))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("storage layout: {e}")))?;
        Ok(Self {
            guard: config.guard,
            width: config.width,
            balance,
            amount,
            layout,
        })
    }

    pub fn guard_kind(&self) -> GuardKind {
        self.guard
    }

    pub fn withdraw(&self) -> Transition {
        let guard = self.guard;
        Transition::new("withdraw")
            .input("amount", SlotType::Uint(self.width))
            .guard(move |pre, args| guard.holds(&pre.read("balance")?, args.get("amount")?))
            .effect(|pre, args| pre.write("balance", pre.read("balance")?.sub(args.get("amount")?)?))
    }

    /// One `withdraw(amount)` from an arbitrary balance, with the guard
    /// (and any pins) assumed on the pre-state.
    pub fn scenario(&self) -> Scenario {
        let guard = self.guard;
        let ty = SlotType::Uint(self.width);
        let pins = (self.balance.clone(), self.amount.clone());
        let pin_ty = ty.clone();
        Scenario::new("arithmetic", &self.layout)
            .start(Start::Arbitrary)
            .constant("amount", ty)
            .setup(move |base, constants, _| {
                let balance = base.read("balance")?;
                let amount = constants.get("amount")?;
                let mut setup = Setup::new(base.clone()).assume(guard.holds(&balance, amount)?);
                if let Some(b) = &pins.0 {
                    let pinned = SymbolicValue::literal(pin_ty.clone(), b.clone())?;
                    setup = setup.assume(balance.eq(&pinned)?);
                }
                if let Some(a) = &pins.1 {
                    let pinned = SymbolicValue::literal(pin_ty.clone(), a.clone())?;
                    setup = setup.assume(amount.eq(&pinned)?);
                }
                Ok(setup)
            })
            .call(&self.withdraw(), &[("amount", "amount")])
    }

    /// A withdrawal never leaves more than it started with. Its negation,
    /// `post.balance > pre.balance`, is exactly a wrapped subtraction.
    pub fn no_underflow_property(&self) -> SafetyProperty {
        SafetyProperty::per_step("no_underflow", |v| {
            v.post.read("balance")?.ule(&v.pre.read("balance")?)
        })
        .describe("withdraw never increases the balance")
    }

    /// Sanity check: claims the balance never changes. Violated as long
    /// as the guard admits some positive withdrawal.
    pub fn balance_frozen_property(&self) -> SafetyProperty {
        SafetyProperty::per_step("balance_frozen", |v| {
            v.post.read("balance")?.eq(&v.pre.read("balance")?)
        })
        .describe("sanity: a withdrawal can change the balance")
    }

    /// Sanity check for pinned runs: its negation is `true`, so it is
    /// violated exactly when the guard and pins admit some withdrawal.
    pub fn withdrawal_unreachable_property(&self) -> SafetyProperty {
        SafetyProperty::final_state("withdrawal_unreachable", |_, _, _| Ok(Predicate::never()))
            .describe("sanity: the assumed withdrawal can happen")
    }

    /// The safety case plus one sanity case. A pinned balance or amount may
    /// fix the withdrawal to zero, so pinned runs check reachability
    /// instead of a balance change.
    pub fn cases(&self) -> ModelResult<Vec<CheckCase>> {
        let scenario = self.scenario();
        let sanity = if self.balance.is_none() && self.amount.is_none() {
            self.balance_frozen_property()
        } else {
            self.withdrawal_unreachable_property()
        };
        Ok(vec![
            CheckCase::proved(scenario.query(&self.no_underflow_property())?),
            CheckCase::violated(scenario.query(&sanity)?),
        ])
    }
}
