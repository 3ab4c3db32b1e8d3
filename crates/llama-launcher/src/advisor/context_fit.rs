//! Context Fit Advisor
//!
//! Prices a context window with a flat per-token cost that approximates KV
//! cache growth, proposes a default context length for the selected model,
//! and gates the user's choice behind a confirmation when the model plus its
//! context would exceed the safe limit. The coefficient ignores model
//! architecture.

use crate::error::Result;
use crate::memory::SafeLimit;
use crate::prompt::{parse_number, Prompter};
use crate::utils::TextUtils;
use tracing::{debug, info, warn};

const MIB: f64 = 1024.0 * 1024.0;

pub const DEFAULT_MIB_PER_TOKEN: f64 = 0.25;

/// Default suggestions, largest first.
pub const CONTEXT_CANDIDATES: [i64; 4] = [65536, 32768, 16384, 8192];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextCostModel {
    bytes_per_token: f64,
}

impl Default for ContextCostModel {
    fn default() -> Self {
        Self::from_mib_per_token(DEFAULT_MIB_PER_TOKEN)
    }
}

impl ContextCostModel {
    pub fn from_mib_per_token(mib_per_token: f64) -> Self {
        Self {
            bytes_per_token: mib_per_token * MIB,
        }
    }

    pub fn bytes_per_token(&self) -> f64 {
        self.bytes_per_token
    }

    pub fn estimated_context_bytes(&self, context_length: i64) -> f64 {
        context_length as f64 * self.bytes_per_token
    }
}

/// First element of `candidates` accepted by `fits`.
pub fn first_fit<T: Copy>(candidates: &[T], fits: impl Fn(T) -> bool) -> Option<T> {
    candidates.iter().copied().find(|&c| fits(c))
}

/// Largest candidate whose context cost fits in `safe_limit - model_size`,
/// or `baseline` when the model alone leaves no budget or nothing fits.
pub fn suggest_default_context(
    safe_limit: SafeLimit,
    model_size_bytes: u64,
    baseline: i64,
    cost: &ContextCostModel,
) -> i64 {
    let budget = safe_limit.bytes() as i128 - model_size_bytes as i128;
    if budget <= 0 {
        return baseline;
    }
    let budget = budget as f64;
    first_fit(&CONTEXT_CANDIDATES, |c| cost.estimated_context_bytes(c) <= budget)
        .unwrap_or(baseline)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitAssessment {
    pub context_length: i64,
    pub model_bytes: u64,
    pub context_bytes: f64,
    pub safe_limit: SafeLimit,
}

impl FitAssessment {
    pub fn total_estimate(&self) -> f64 {
        self.model_bytes as f64 + self.context_bytes
    }

    pub fn fits(&self) -> bool {
        self.total_estimate() <= self.safe_limit.bytes() as f64
    }

    pub fn warning(&self) -> String {
        format!(
            "[WARNING] Context {} needs an estimated {} (model {} + context {}), \
             more than the {} of safe usable memory.",
            self.context_length,
            TextUtils::format_signed_bytes(self.total_estimate()),
            TextUtils::format_bytes(self.model_bytes),
            TextUtils::format_signed_bytes(self.context_bytes),
            TextUtils::format_bytes(self.safe_limit.bytes()),
        )
    }
}

/// Advisor for one session. Either input being unknown disables every check.
#[derive(Debug, Clone, Copy)]
pub struct ContextFitAdvisor {
    safe_limit: Option<SafeLimit>,
    model_size_bytes: Option<u64>,
    cost: ContextCostModel,
}

impl ContextFitAdvisor {
    pub fn new(safe_limit: Option<SafeLimit>, model_size_bytes: Option<u64>, cost: ContextCostModel) -> Self {
        Self {
            safe_limit,
            model_size_bytes,
            cost,
        }
    }

    pub fn is_active(&self) -> bool {
        self.safe_limit.is_some() && self.model_size_bytes.is_some()
    }

    pub fn suggest_default(&self, baseline: i64) -> i64 {
        match (self.safe_limit, self.model_size_bytes) {
            (Some(limit), Some(size)) => {
                let suggested = suggest_default_context(limit, size, baseline, &self.cost);
                if suggested != baseline {
                    info!("Suggested context {} (baseline {})", suggested, baseline);
                }
                suggested
            }
            _ => baseline,
        }
    }

    /// `None` when no advisory is possible.
    pub fn assess(&self, context_length: i64) -> Option<FitAssessment> {
        Some(FitAssessment {
            context_length,
            model_bytes: self.model_size_bytes?,
            context_bytes: self.cost.estimated_context_bytes(context_length),
            safe_limit: self.safe_limit?,
        })
    }

    /// Validation loop. Returns once the value fits, the user confirms it
    /// despite the warning, or no advisory is possible.
    pub fn negotiate<P: Prompter + ?Sized>(&self, prompter: &mut P, initial: String) -> Result<i64> {
        let replacement_default = self
            .safe_limit
            .zip(self.model_size_bytes)
            .and_then(|(limit, size)| {
                let budget = limit.bytes() as f64 - size as f64;
                first_fit(&CONTEXT_CANDIDATES, |c| self.cost.estimated_context_bytes(c) <= budget)
            })
            .map(|c| c.to_string());

        let mut raw = initial;
        loop {
            let context_length = match parse_number::<i64>(&raw, "context size") {
                Ok(c) => c,
                Err(e) => {
                    prompter.warn(&format!("{}. Please enter the context size as a whole number of tokens.", e));
                    raw = prompter.input("Context Size (-c)", replacement_default.as_deref(), None)?;
                    continue;
                }
            };

            let Some(assessment) = self.assess(context_length) else {
                debug!("No memory advisory available, accepting context {}", context_length);
                return Ok(context_length);
            };

            if assessment.fits() {
                debug!(
                    "Context {} fits: {:.0} of {} bytes",
                    context_length,
                    assessment.total_estimate(),
                    assessment.safe_limit.bytes()
                );
                return Ok(context_length);
            }

            prompter.warn(&assessment.warning());
            if prompter.confirm("Use this context size anyway?", false, None)? {
                warn!("Context {} accepted despite memory warning", context_length);
                return Ok(context_length);
            }

            raw = prompter.input(
                "Enter a smaller context size (-c)",
                replacement_default.as_deref(),
                None,
            )?;
        }
    }
}
