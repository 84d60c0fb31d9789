//! Fixed prompt and output-shape constants sent to the provider.
//!
//! The schema descriptor is defense in depth: the system instruction asks
//! for pure JSON, and `responseSchema` makes the provider enforce the shape
//! at generation time. Neither alone is trusted.

/// Advisor role and output contract. The 8 categories are a prompt-level
/// instruction; the handler does not reject responses with a different count.
pub const SYSTEM_INSTRUCTION: &str = "\
You are an expert PC hardware advisor. Given a user's build requirement and \
optional reference hardware data, recommend a complete build covering exactly \
these 8 categories, one component each, in this order: motherboard, CPU, CPU \
cooler, memory, GPU, storage, power supply, case. For every component, name a \
concrete current model, state its key specifications, and explain briefly why \
it fits the requirement and is compatible with the other chosen components. \
Treat the reference hardware data as advisory; it may be incomplete or \
outdated. Respond with pure JSON only: no surrounding prose, no markdown, no \
code fences.";

/// Output Schema Descriptor in the provider's schema dialect: an ARRAY of
/// OBJECTs with both string fields required, in fixed field order.
pub fn response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "componentName": { "type": "STRING" },
                "componentDescription": { "type": "STRING" }
            },
            "required": ["componentName", "componentDescription"],
            "propertyOrdering": ["componentName", "componentDescription"]
        }
    })
}

/// Interpolate the user requirement and the advisory reference data into
/// the user-content string. An absent reference table is forwarded as an
/// empty section rather than omitted.
pub fn build_user_prompt(prompt: &str, hardware_data: Option<&str>) -> String {
    let hardware = hardware_data.unwrap_or("");
    format!(
        "User requirement:\n{prompt}\n\n\
         Reference hardware data (advisory, may be incomplete):\n{hardware}"
    )
}
