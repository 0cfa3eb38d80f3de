//! Prompt assembly for the extraction request.

/// System instruction sent with every extraction request.
pub const SYSTEM_INSTRUCTION: &str = "You are an expert invoice data extraction system. \
You MUST return ONLY a valid JSON object with no additional text before or after.";

/// Default bound on how much OCR text is embedded in the request.
pub const MAX_PROMPT_CHARS: usize = 4000;

/// Build the user prompt, embedding at most `limit` characters of OCR
/// text. Text beyond the bound is never sent; this is a cost/latency
/// bound, not a correctness requirement.
pub fn build_prompt(ocr_text: &str, limit: usize) -> String {
    let snippet = truncate_chars(ocr_text, limit);

    format!(
        r#"Extract ALL invoice data from the OCR text and return ONLY a JSON object.

OCR TEXT:
{snippet}

Return this EXACT JSON structure (no text before or after):
{{
  "invoice_number": "string",
  "order_number": "string or null",
  "invoice_date": "YYYY-MM-DD",
  "order_date": "YYYY-MM-DD or null",
  "due_date": "YYYY-MM-DD or null",
  "vendor": {{
    "name": "full company name",
    "address": "complete address",
    "phone": "phone or null",
    "email": "email or null"
  }},
  "customer": {{
    "name": "full customer name",
    "address": "complete address",
    "phone": "phone or null",
    "customer_id": "id or null"
  }},
  "amounts": {{
    "subtotal": 0.0,
    "tax": 0.0,
    "discount": 0.0,
    "freight": 0.0,
    "total": 0.0
  }},
  "line_items": [
    {{
      "product_id": "id or null",
      "description": "full product name",
      "quantity": 0.0,
      "unit": "CS/EA/LB",
      "unit_price": 0.0,
      "total_price": 0.0
    }}
  ],
  "payment_terms": "terms",
  "currency": "USD"
}}

RULES:
- Return ONLY the JSON object
- No explanations or markdown
- Use null for missing values (not "null" string)
- All prices as numbers not strings
- Extract ALL line items"#
    )
}

/// Slice off the first `limit` characters without splitting a UTF-8
/// sequence.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
