//! Instruction prompt sent alongside the document.

/// Block the model is told to emit wherever the original has a figure.
pub const FIGURE_PLACEHOLDER: &str = "<div style=\"background:#f8fafc; border: 1px dashed #cbd5e1; padding:2rem; text-align:center; margin: 1rem 0; color: #64748b; border-radius: 4px;\">[Original Image/Figure]</div>";

/// Build the translation instructions for a target language display name.
pub fn build_prompt(target_language: &str) -> String {
    format!(
        "You are a professional document translator and layout reconstruction expert.
Task: Translate the attached document into {target_language} while STRICTLY PRESERVING the original visual structure, layout, and formatting.

CRITICAL INSTRUCTIONS:
1. LAYOUT & COLUMNS: If the original is multi-column (e.g., 2 columns), you MUST use HTML/CSS to replicate this (e.g., <div style=\"display: grid; grid-template-columns: 1fr 1fr; gap: 2rem;\">).
2. EXACT POSITIONING: Titles, patent numbers, dates, and metadata must remain in their exact visual locations (e.g., top-right, centered). Match font weights (bold) and styles (italic).
3. NO EXTERNAL IMAGES: Do NOT generate <img> tags with external URLs.
4. IMAGE PLACEHOLDERS: Wherever an image, diagram, barcode, or figure appears, strictly use this placeholder:
   {FIGURE_PLACEHOLDER}
5. TABLES: Replicate tables using HTML <table> tags with borders and padding that match the original.
6. OUTPUT: Return ONLY the raw HTML string inside a container. Use inline CSS for styling. Do not use markdown code blocks.

Translate all text accurately."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_names_target_language() {
        let prompt = build_prompt("Chinese (Simplified)");
        assert!(prompt.contains("into Chinese (Simplified) while"));
    }

    #[test]
    fn test_prompt_carries_layout_rules() {
        let prompt = build_prompt("German");
        assert!(prompt.contains("grid-template-columns"));
        assert!(prompt.contains(FIGURE_PLACEHOLDER));
        assert!(prompt.contains("<table>"));
        assert!(prompt.contains("Do not use markdown code blocks"));
    }
}
