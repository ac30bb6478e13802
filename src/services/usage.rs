// Session-scoped token usage accumulation
// Every generation call's usage is folded into one running total which
// ends up stored on the committed project.

use crate::models::TokenUsage;

/// Running token/cost totals across the calls of one generation session.
#[derive(Debug, Clone, Default)]
pub struct UsageAccumulator {
    total: TokenUsage,
}

impl UsageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one call's usage into the running total.
    pub fn add(&mut self, usage: &TokenUsage) {
        self.total.accumulate(usage);
        tracing::debug!(
            "Accumulated usage: {} input, {} output tokens = ${:.5} total",
            self.total.input_tokens,
            self.total.output_tokens,
            self.total.estimated_cost
        );
    }

    pub fn total(&self) -> TokenUsage {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_sums_individual_calls() {
        let calls = [
            TokenUsage {
                input_tokens: 1200,
                output_tokens: 340,
                estimated_cost: 0.00026,
            },
            TokenUsage {
                input_tokens: 5000,
                output_tokens: 2100,
                estimated_cost: 0.00134,
            },
            TokenUsage {
                input_tokens: 800,
                output_tokens: 90,
                estimated_cost: 0.00012,
            },
        ];

        let mut acc = UsageAccumulator::new();
        for call in &calls {
            acc.add(call);
        }

        let total = acc.total();
        assert_eq!(total.input_tokens, 7000);
        assert_eq!(total.output_tokens, 2530);

        let expected: f64 = calls.iter().map(|c| c.estimated_cost).sum();
        assert!((total.estimated_cost - expected).abs() < 1e-5);
    }

    #[test]
    fn test_empty_accumulator_is_zero() {
        let acc = UsageAccumulator::new();
        assert_eq!(acc.total(), TokenUsage::zero());
    }
}
