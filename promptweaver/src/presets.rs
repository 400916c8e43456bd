//! Built-in starter instructions.

/// A named instruction that can seed a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    /// Display name, unique within [`PRESETS`].
    pub name: &'static str,
    /// The instruction text.
    pub instruction: &'static str,
}

const fn preset(name: &'static str, instruction: &'static str) -> Preset {
    Preset { name, instruction }
}

/// Every built-in preset, in display order.
pub static PRESETS: [Preset; 15] = [
    preset(
        "Breakthrough Business Idea",
        "Create a unique online business concept that requires zero upfront investment, \
         leverages existing platforms, and has potential to scale to 7-figures. Include \
         target audience, revenue model, and first 30-day action plan.",
    ),
    preset(
        "Passive Income Generator",
        "Design a scalable online business that can generate $5,000/month in passive income \
         within 12 months. Focus on minimal maintenance, automation, and leveraging digital \
         assets or platforms.",
    ),
    preset(
        "AI-Powered Startup",
        "Develop a business concept that uses AI tools to solve a meaningful problem for a \
         specific industry. Include monetization strategy, competitive advantage, and why now \
         is the perfect timing for this solution.",
    ),
    preset(
        "Micro-SaaS Opportunity",
        "Create a highly focused SaaS concept targeting a specific business pain point. \
         Outline the solution, target market, pricing strategy, and how to build a minimum \
         viable product with limited resources.",
    ),
    preset(
        "Bootstrapped Empire",
        "Design a business that can start with under $1,000 investment and scale to $1M+ \
         annual revenue. Focus on high-margin digital products, viral growth mechanisms, and \
         strategic partnerships.",
    ),
    preset(
        "Product Manager - Feature Pitch",
        "Create a compelling one-pager to pitch a new feature that drives user engagement. \
         Include problem statement, proposed solution, success metrics, implementation \
         timeline, and ROI projection.",
    ),
    preset(
        "Developer - API Documentation",
        "Generate comprehensive API documentation for a microservice. Include authentication \
         methods, endpoints with request/response examples, error handling, rate limits, and \
         integration best practices.",
    ),
    preset(
        "Newsletter Growth Strategy",
        "Develop a comprehensive plan to grow an email newsletter from 100 to 10,000 engaged \
         subscribers in 6 months. Include content strategy, growth tactics, monetization \
         options, and automation workflows.",
    ),
    preset(
        "QA Test Suite Creator",
        "Create detailed test cases for a critical user flow in a web/mobile application. \
         Include happy paths, edge cases, security considerations, and performance testing \
         scenarios.",
    ),
    preset(
        "Personal Brand Builder",
        "Design a 90-day strategy to establish yourself as a thought leader in your industry. \
         Include content pillars, platform strategy, networking tactics, and visibility \
         milestones.",
    ),
    preset(
        "Digital Product Launch",
        "Create a step-by-step launch strategy for a digital product (course, ebook, \
         template, etc.) that maximizes initial sales and builds long-term momentum. Include \
         pre-launch, launch day, and post-launch phases.",
    ),
    preset(
        "Niche Marketplace Concept",
        "Develop a concept for a specialized marketplace connecting buyers and sellers in an \
         underserved niche. Include platform features, monetization model, and critical mass \
         acquisition strategy.",
    ),
    preset(
        "Content Creator Expansion",
        "Design a strategy to expand a successful social media presence on one platform into \
         a multi-channel brand with diverse revenue streams. Include content repurposing, \
         audience migration, and monetization diversification.",
    ),
    preset(
        "B2B Service Positioning",
        "Create positioning for a B2B service that commands premium pricing. Include unique \
         value proposition, ideal client profile, competitive differentiation, and sales \
         messaging framework.",
    ),
    preset(
        "Community-Based Business",
        "Design a business model built around a passionate community. Include community \
         structure, value exchange, monetization approach, and growth strategy that preserves \
         culture.",
    ),
];

/// Looks up a preset by name, ignoring ASCII case and surrounding whitespace.
#[must_use]
pub fn find(name: &str) -> Option<&'static Preset> {
    let name = name.trim();
    PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name))
}

/// Returns the preset names in display order.
#[must_use]
pub fn names() -> Vec<&'static str> {
    PRESETS.iter().map(|p| p.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_find_preset() {
        let preset = find("  qa test suite creator ").unwrap();
        assert_eq!(preset.name, "QA Test Suite Creator");
        assert!(preset.instruction.starts_with("Create detailed test cases"));
        assert!(find("Unknown").is_none());
    }

    #[test]
    fn test_presets_are_unique_and_nonempty() {
        let names: HashSet<&str> = names().into_iter().collect();
        assert_eq!(names.len(), PRESETS.len());
        for preset in &PRESETS {
            assert!(!preset.instruction.trim().is_empty());
            assert!(!preset.instruction.contains("  "), "{}", preset.name);
        }
    }
}
