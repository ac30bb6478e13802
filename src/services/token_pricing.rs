// Token pricing calculation service
// Prices are in USD per million tokens (estimated, not billing-grade)
// Last updated: 2026-08-06

use crate::models::TokenUsage;

/// Economy tier, the default for drafts.
pub const FLASH_MODEL: &str = "gemini-2.0-flash";
/// Pro tier, slower and pricier, for final scripts.
pub const PRO_MODEL: &str = "gemini-3-pro-preview";

/// Per-model pricing in USD per million tokens.
pub struct ModelPricing {
    pub input_price: f64,
    pub output_price: f64,
}

impl ModelPricing {
    /// Gemini 2.0 Flash
    /// Source: https://ai.google.dev/gemini-api/docs/pricing
    pub fn gemini_2_0_flash() -> Self {
        Self {
            input_price: 0.10,
            output_price: 0.40,
        }
    }

    /// Gemini 3 Pro (preview pricing)
    pub fn gemini_3_pro_preview() -> Self {
        Self {
            input_price: 1.25,
            output_price: 5.00,
        }
    }

    /// Models without a pricing entry cost nothing rather than failing.
    pub fn unknown() -> Self {
        Self {
            input_price: 0.0,
            output_price: 0.0,
        }
    }

    /// Estimated USD cost for one call, rounded to 5 decimal places.
    pub fn calculate_cost(&self, input_tokens: u32, output_tokens: u32) -> f64 {
        let cost = (input_tokens as f64 / 1_000_000.0) * self.input_price
            + (output_tokens as f64 / 1_000_000.0) * self.output_price;
        TokenUsage::round_cost(cost)
    }
}

/// Look up pricing for a model id.
pub fn pricing_for_model(model: &str) -> ModelPricing {
    match model {
        FLASH_MODEL => ModelPricing::gemini_2_0_flash(),
        PRO_MODEL => ModelPricing::gemini_3_pro_preview(),
        _ => {
            tracing::warn!("Unknown model for pricing: {}, costing at zero", model);
            ModelPricing::unknown()
        }
    }
}

/// Build the usage record for one API call against the given model.
pub fn compute_usage(model: &str, input_tokens: u32, output_tokens: u32) -> TokenUsage {
    let pricing = pricing_for_model(model);
    TokenUsage {
        input_tokens,
        output_tokens,
        estimated_cost: pricing.calculate_cost(input_tokens, output_tokens),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flash_cost_calculation() {
        let pricing = ModelPricing::gemini_2_0_flash();

        // (10000/1M) * 0.10 + (3000/1M) * 0.40 = 0.001 + 0.0012 = 0.0022
        let cost = pricing.calculate_cost(10_000, 3_000);
        assert!((cost - 0.0022).abs() < 1e-9);
    }

    #[test]
    fn test_pro_cost_calculation() {
        let pricing = ModelPricing::gemini_3_pro_preview();

        // (5000/1M) * 1.25 + (2000/1M) * 5.00 = 0.00625 + 0.01 = 0.01625
        let cost = pricing.calculate_cost(5_000, 2_000);
        assert!((cost - 0.01625).abs() < 1e-9);
    }

    #[test]
    fn test_cost_rounds_to_five_decimals() {
        let pricing = ModelPricing::gemini_2_0_flash();

        // (7/1M) * 0.10 = 0.0000007 which rounds to 0.0
        assert_eq!(pricing.calculate_cost(7, 0), 0.0);
        // (37/1M) * 0.40 = 0.0000148 which rounds to 0.00001
        assert!((pricing.calculate_cost(0, 37) - 0.00001).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_model_costs_zero() {
        let usage = compute_usage("imagen-4.0-generate-001", 123_456, 654_321);
        assert_eq!(usage.input_tokens, 123_456);
        assert_eq!(usage.output_tokens, 654_321);
        assert_eq!(usage.estimated_cost, 0.0);
    }

    #[test]
    fn test_compute_usage_for_flash() {
        let usage = compute_usage(FLASH_MODEL, 1_000_000, 1_000_000);
        assert!((usage.estimated_cost - 0.50).abs() < 1e-9);
    }
}
