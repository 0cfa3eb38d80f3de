//! Invoice record model produced by structured extraction.
//!
//! All record fields are optional so a parsed-but-incomplete reply still
//! counts as a successful extraction; completeness is a separate, post-hoc
//! classification (`validation_issues`). Numeric fields keep whatever the
//! model emitted, including non-numeric text, so the validator can flag it.

use serde::{Deserialize, Serialize};

/// Outcome of one structured-extraction run.
///
/// Callers must branch: a `Failed` outcome carries the retry history and the
/// last raw reply, never a partial record.
#[derive(Debug, Clone)]
pub enum ExtractionOutcome {
    /// A record was recovered from the model reply.
    Record(InvoiceRecord),
    /// Every attempt failed.
    Failed(ExtractionFailure),
}

/// Terminal extraction failure after the retry budget is spent.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionFailure {
    /// What kind of step failed last.
    pub reason: FailureReason,
    /// Message from the last failed attempt.
    pub message: String,
    /// Number of attempts made.
    pub attempts: u32,
    /// Raw reply text from the last attempt, when one was received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

/// Classification of a terminal extraction failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The completion service itself failed.
    Service,
    /// The reply text never yielded a valid record.
    Malformed,
}

/// A structured invoice record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,

    /// Dates are kept as the model emitted them; no date parsing happens
    /// at the extraction boundary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<PartyRecord>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<PartyRecord>,

    pub amounts: Amounts,

    pub line_items: Vec<LineItem>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_terms: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

/// A vendor or customer on the invoice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartyRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Customer account code, present on customer records only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
}

/// Monetary totals block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Amounts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<Numeric>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax: Option<Numeric>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<Numeric>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub freight: Option<Numeric>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<Numeric>,
}

/// A single line item on the invoice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Numeric>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Numeric>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_price: Option<Numeric>,
}

/// A value the model was asked to emit as a number.
///
/// Models occasionally emit quoted numbers or placeholder text; the variant
/// preserves the original shape so the validator can classify it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Numeric {
    /// Whether the value is a JSON number.
    pub fn is_number(&self) -> bool {
        !matches!(self, Numeric::Text(_))
    }

    /// Numeric value, when there is one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Numeric::Int(value) => Some(*value as f64),
            Numeric::Float(value) => Some(*value),
            Numeric::Text(_) => None,
        }
    }
}

impl InvoiceRecord {
    /// Check semantic completeness and return any issues found.
    ///
    /// Issues never trigger re-extraction; the caller reports them as a
    /// warning classification.
    pub fn validation_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.invoice_number.is_none() {
            issues.push("missing invoice_number".to_string());
        }

        if self.vendor.is_none() {
            issues.push("missing vendor".to_string());
        }

        if self.customer.is_none() {
            issues.push("missing customer".to_string());
        }

        match &self.amounts.total {
            Some(total) if total.is_number() => {}
            Some(_) => issues.push("amounts.total is not numeric".to_string()),
            None => issues.push("missing amounts.total".to_string()),
        }

        if self.line_items.is_empty() {
            issues.push("no line items".to_string());
        }

        issues
    }

    /// Whether the record passes every completeness check.
    pub fn is_complete(&self) -> bool {
        self.validation_issues().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn complete_record() -> InvoiceRecord {
        serde_json::from_str(
            r#"{
                "invoice_number": "1001",
                "vendor": {"name": "Acme", "address": "1 Rd"},
                "customer": {"name": "Bob", "customer_id": "C-7"},
                "amounts": {"subtotal": 100, "tax": 23.45, "total": 123.45},
                "line_items": [
                    {"description": "Widget", "quantity": 1, "unit": "EA",
                     "unit_price": 123.45, "total_price": 123.45}
                ],
                "payment_terms": "Net 30",
                "currency": "USD"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_complete_record_has_no_issues() {
        let record = complete_record();
        assert!(record.is_complete());
        assert_eq!(record.amounts.total.as_ref().unwrap().as_f64(), Some(123.45));
        assert_eq!(record.amounts.subtotal, Some(Numeric::Int(100)));
    }

    #[test]
    fn test_missing_fields_are_reported() {
        let record: InvoiceRecord =
            serde_json::from_str(r#"{"invoice_number": "1001"}"#).unwrap();
        let issues = record.validation_issues();
        assert!(issues.contains(&"missing vendor".to_string()));
        assert!(issues.contains(&"missing customer".to_string()));
        assert!(issues.contains(&"missing amounts.total".to_string()));
        assert!(issues.contains(&"no line items".to_string()));
    }

    #[test]
    fn test_null_counts_as_missing() {
        let record: InvoiceRecord =
            serde_json::from_str(r#"{"invoice_number": null, "vendor": null}"#).unwrap();
        let issues = record.validation_issues();
        assert!(issues.contains(&"missing invoice_number".to_string()));
        assert!(issues.contains(&"missing vendor".to_string()));
    }

    #[test]
    fn test_text_total_is_flagged_not_rejected() {
        let record: InvoiceRecord = serde_json::from_str(
            r#"{"invoice_number": "1", "amounts": {"total": "123.45"}}"#,
        )
        .unwrap();
        assert_eq!(
            record.amounts.total,
            Some(Numeric::Text("123.45".to_string()))
        );
        assert!(record
            .validation_issues()
            .contains(&"amounts.total is not numeric".to_string()));
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let record: InvoiceRecord = serde_json::from_str(
            r#"{"invoice_number": "1", "totally_unexpected": {"x": 1}}"#,
        )
        .unwrap();
        assert_eq!(record.invoice_number.as_deref(), Some("1"));
    }

    #[test]
    fn test_wrong_party_shape_is_an_error() {
        let result: std::result::Result<InvoiceRecord, _> =
            serde_json::from_str(r#"{"invoice_number": "1", "vendor": "Acme"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_record_serialization_skips_absent_fields() {
        let record: InvoiceRecord =
            serde_json::from_str(r#"{"invoice_number": "1001", "vendor": {}}"#).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["invoice_number"], "1001");
        assert!(json.get("order_number").is_none());
        assert_eq!(json["vendor"], serde_json::json!({}));
    }
}
