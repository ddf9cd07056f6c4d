use crate::models::LabResult;

/// Returned instead of a summary when nothing is out of range.
pub const ALL_NORMAL_SUMMARY: &str = "Great news! All your lab results are within normal ranges. Keep up the good work with your health!";

/// Returned when the language model fails.
pub const GENERATION_ERROR: &str = "Sorry, I encountered an error generating the explanation.";

/// Prompt asking for a plain-language explanation of one result.
pub fn build_explain_prompt(result: &LabResult, context: &str) -> String {
    format!(
        "You are a helpful medical assistant. Explain this lab result in simple terms.

Medical Information:
{context}

Lab Test: {name}
Value: {value} {unit}
Reference Range: {range}
Status: {status}

Please explain:
1. What this test measures
2. What this result means
3. Possible causes if abnormal
4. Dietary recommendations if applicable

Keep it simple and clear. Answer:",
        name = result.test_name,
        value = result.value,
        unit = result.unit,
        range = result.reference_range,
        status = result.status,
    )
}

/// One line per result: `Name: value unit (Status: s, Range: r)`.
pub fn format_results_context(results: &[LabResult]) -> String {
    results
        .iter()
        .map(|r| {
            format!(
                "{}: {} {} (Status: {}, Range: {})",
                r.test_name, r.value, r.unit, r.status, r.reference_range
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_followup_prompt(question: &str, results: &[LabResult], context: &str) -> String {
    format!(
        "You are a medical assistant. Answer this question based on the patient's lab results and medical information.

Patient's Lab Results:
{results}

Medical Information:
{context}

Question: {question}

Provide a clear, helpful answer. Answer:",
        results = format_results_context(results),
    )
}

pub fn build_summary_prompt(normal_count: usize, abnormal: &[&LabResult], context: &str) -> String {
    let abnormal_list = abnormal
        .iter()
        .map(|r| format!("- {}: {} {} ({})", r.test_name, r.value, r.unit, r.status))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Provide a brief summary of these lab results.

Normal Results: {normal_count} tests
Abnormal Results: {abnormal_count} tests

Abnormal Tests:
{abnormal_list}

Medical Context:
{context}

Write a 2-3 paragraph summary explaining what these results mean overall and general recommendations. Be reassuring but honest. Summary:",
        abnormal_count = abnormal.len(),
    )
}
