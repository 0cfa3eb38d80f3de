//! Relational normalization of extracted invoice records.
//!
//! Vendors and customers deduplicate on a composite (name, address) key;
//! invoices and line items get one surrogate ID per call. All state lives
//! in the store object, created fresh per normalization run.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::error::StoreError;
use crate::models::record::{InvoiceRecord, LineItem, Numeric, PartyRecord};

/// Composite dedup key for vendors and customers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    name: String,
    address: String,
}

impl EntityKey {
    /// Key of a party; missing parts contribute empty strings.
    pub fn of(party: &PartyRecord) -> Self {
        Self {
            name: party.name.clone().unwrap_or_default(),
            address: party.address.clone().unwrap_or_default(),
        }
    }
}

/// One row of the vendors table.
#[derive(Debug, Clone, Serialize)]
pub struct VendorRow {
    pub vendor_id: u32,
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// One row of the customers table.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerRow {
    pub customer_id: u32,
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub customer_code: Option<String>,
}

/// One row of the invoices table.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceRow {
    pub invoice_id: u32,
    pub invoice_number: Option<String>,
    pub order_number: Option<String>,
    pub invoice_date: Option<String>,
    pub order_date: Option<String>,
    pub due_date: Option<String>,
    pub vendor_id: u32,
    pub customer_id: u32,
    pub subtotal: Option<Numeric>,
    pub tax: Option<Numeric>,
    pub discount: Option<Numeric>,
    pub freight: Option<Numeric>,
    pub total: Option<Numeric>,
    pub payment_terms: Option<String>,
    pub currency: Option<String>,
    pub source_file: String,
}

/// One row of the line_items table.
#[derive(Debug, Clone, Serialize)]
pub struct LineItemRow {
    pub line_item_id: u32,
    pub invoice_id: u32,
    pub product_id: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<Numeric>,
    pub unit: Option<String>,
    pub unit_price: Option<Numeric>,
    pub total_price: Option<Numeric>,
}

/// IDs assigned while ingesting one record.
#[derive(Debug, Clone, Copy)]
pub struct IngestOutcome {
    pub vendor_id: u32,
    pub customer_id: u32,
    pub invoice_id: u32,
    pub line_items: usize,
}

/// In-memory normalization store with process-lifetime ID maps.
#[derive(Debug, Default)]
pub struct NormalizationStore {
    vendors: Vec<VendorRow>,
    customers: Vec<CustomerRow>,
    invoices: Vec<InvoiceRow>,
    line_items: Vec<LineItemRow>,
    vendor_map: HashMap<EntityKey, u32>,
    customer_map: HashMap<EntityKey, u32>,
    next_invoice_id: u32,
    next_line_item_id: u32,
}

impl NormalizationStore {
    /// Create an empty store; surrogate IDs start at 1.
    pub fn new() -> Self {
        Self {
            next_invoice_id: 1,
            next_line_item_id: 1,
            ..Default::default()
        }
    }

    /// Discard all rows and ID maps for a fresh normalization run.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Add a vendor, deduplicating on (name, address).
    ///
    /// The first-seen record wins the ID; later duplicates fold into it
    /// silently without updating stored fields.
    pub fn add_vendor(&mut self, party: &PartyRecord) -> u32 {
        let key = EntityKey::of(party);
        if let Some(&id) = self.vendor_map.get(&key) {
            return id;
        }

        let id = self.vendors.len() as u32 + 1;
        self.vendor_map.insert(key, id);
        self.vendors.push(VendorRow {
            vendor_id: id,
            name: party.name.clone(),
            address: party.address.clone(),
            phone: party.phone.clone(),
            email: party.email.clone(),
        });

        id
    }

    /// Add a customer, deduplicating on (name, address).
    pub fn add_customer(&mut self, party: &PartyRecord) -> u32 {
        let key = EntityKey::of(party);
        if let Some(&id) = self.customer_map.get(&key) {
            return id;
        }

        let id = self.customers.len() as u32 + 1;
        self.customer_map.insert(key, id);
        self.customers.push(CustomerRow {
            customer_id: id,
            name: party.name.clone(),
            address: party.address.clone(),
            phone: party.phone.clone(),
            customer_code: party.customer_id.clone(),
        });

        id
    }

    /// Add an invoice row. Every call assigns a fresh surrogate ID;
    /// `invoice_number` is not a dedup key.
    pub fn add_invoice(
        &mut self,
        record: &InvoiceRecord,
        source_file: &str,
        vendor_id: u32,
        customer_id: u32,
    ) -> u32 {
        let id = self.next_invoice_id;
        self.next_invoice_id += 1;

        let amounts = &record.amounts;
        self.invoices.push(InvoiceRow {
            invoice_id: id,
            invoice_number: record.invoice_number.clone(),
            order_number: record.order_number.clone(),
            invoice_date: record.invoice_date.clone(),
            order_date: record.order_date.clone(),
            due_date: record.due_date.clone(),
            vendor_id,
            customer_id,
            subtotal: amounts.subtotal.clone(),
            tax: amounts.tax.clone(),
            discount: amounts.discount.clone(),
            freight: amounts.freight.clone(),
            total: amounts.total.clone(),
            payment_terms: record.payment_terms.clone(),
            currency: record.currency.clone(),
            source_file: source_file.to_string(),
        });

        id
    }

    /// Add a line item row linked to an invoice.
    pub fn add_line_item(&mut self, invoice_id: u32, item: &LineItem) -> u32 {
        let id = self.next_line_item_id;
        self.next_line_item_id += 1;

        self.line_items.push(LineItemRow {
            line_item_id: id,
            invoice_id,
            product_id: item.product_id.clone(),
            description: item.description.clone(),
            quantity: item.quantity.clone(),
            unit: item.unit.clone(),
            unit_price: item.unit_price.clone(),
            total_price: item.total_price.clone(),
        });

        id
    }

    /// Normalize one record into rows.
    ///
    /// Records without line items cannot produce valid rows and are
    /// rejected here; extraction already reported them as a warning.
    pub fn ingest(
        &mut self,
        record: &InvoiceRecord,
        source_file: &str,
    ) -> Result<IngestOutcome, StoreError> {
        if record.line_items.is_empty() {
            return Err(StoreError::NoLineItems);
        }
        let vendor = record.vendor.as_ref().ok_or(StoreError::MissingParty("vendor"))?;
        let customer = record
            .customer
            .as_ref()
            .ok_or(StoreError::MissingParty("customer"))?;

        let vendor_id = self.add_vendor(vendor);
        let customer_id = self.add_customer(customer);
        let invoice_id = self.add_invoice(record, source_file, vendor_id, customer_id);
        for item in &record.line_items {
            self.add_line_item(invoice_id, item);
        }

        debug!(
            "ingested {} as invoice {} (vendor {}, customer {})",
            source_file, invoice_id, vendor_id, customer_id
        );

        Ok(IngestOutcome {
            vendor_id,
            customer_id,
            invoice_id,
            line_items: record.line_items.len(),
        })
    }

    /// Rows of the vendors table.
    pub fn vendors(&self) -> &[VendorRow] {
        &self.vendors
    }

    /// Rows of the customers table.
    pub fn customers(&self) -> &[CustomerRow] {
        &self.customers
    }

    /// Rows of the invoices table.
    pub fn invoices(&self) -> &[InvoiceRow] {
        &self.invoices
    }

    /// Rows of the line_items table.
    pub fn line_items(&self) -> &[LineItemRow] {
        &self.line_items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn party(name: &str, address: &str) -> PartyRecord {
        PartyRecord {
            name: Some(name.to_string()),
            address: Some(address.to_string()),
            ..Default::default()
        }
    }

    fn record_with_items(invoice_number: &str) -> InvoiceRecord {
        serde_json::from_str(&format!(
            r#"{{
                "invoice_number": "{invoice_number}",
                "vendor": {{"name": "Acme", "address": "1 Rd"}},
                "customer": {{"name": "Bob", "address": "2 Ave"}},
                "amounts": {{"total": 123.45}},
                "line_items": [
                    {{"description": "Widget", "quantity": 2, "unit_price": 10.0,
                      "total_price": 20.0}},
                    {{"description": "Gadget", "quantity": 1, "unit_price": 103.45,
                      "total_price": 103.45}}
                ]
            }}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_vendor_dedup_by_composite_key() {
        let mut store = NormalizationStore::new();
        let first = store.add_vendor(&party("Acme", "1 Rd"));
        let second = store.add_vendor(&party("Acme", "1 Rd"));
        let third = store.add_vendor(&party("Acme", "9 Other St"));

        assert_eq!(first, second);
        assert_ne!(first, third);
        assert_eq!(store.vendors().len(), 2);
    }

    #[test]
    fn test_duplicate_vendor_keeps_first_seen_fields() {
        let mut store = NormalizationStore::new();
        let mut original = party("Acme", "1 Rd");
        original.phone = Some("555-0100".to_string());
        let mut later = party("Acme", "1 Rd");
        later.phone = Some("555-9999".to_string());

        let id = store.add_vendor(&original);
        assert_eq!(store.add_vendor(&later), id);
        assert_eq!(store.vendors()[0].phone.as_deref(), Some("555-0100"));
    }

    #[test]
    fn test_invoice_number_is_not_a_dedup_key() {
        let mut store = NormalizationStore::new();
        let record = record_with_items("1001");

        let first = store.ingest(&record, "a.json").unwrap();
        let second = store.ingest(&record, "b.json").unwrap();

        assert_ne!(first.invoice_id, second.invoice_id);
        assert_eq!(first.vendor_id, second.vendor_id);
        assert_eq!(store.invoices().len(), 2);
    }

    #[test]
    fn test_ingest_links_line_items() {
        let mut store = NormalizationStore::new();
        let outcome = store.ingest(&record_with_items("1001"), "a.json").unwrap();

        assert_eq!(outcome.line_items, 2);
        assert_eq!(store.line_items().len(), 2);
        assert!(store
            .line_items()
            .iter()
            .all(|row| row.invoice_id == outcome.invoice_id));
        assert_eq!(store.line_items()[0].line_item_id, 1);
        assert_eq!(store.line_items()[1].line_item_id, 2);
    }

    #[test]
    fn test_ingest_rejects_empty_line_items() {
        let mut store = NormalizationStore::new();
        let record: InvoiceRecord = serde_json::from_str(
            r#"{"invoice_number": "1", "vendor": {"name": "A"}, "customer": {"name": "B"}}"#,
        )
        .unwrap();

        let result = store.ingest(&record, "a.json");
        assert!(matches!(result, Err(StoreError::NoLineItems)));
        assert!(store.invoices().is_empty());
        assert!(store.vendors().is_empty());
    }

    #[test]
    fn test_ingest_rejects_missing_party() {
        let mut store = NormalizationStore::new();
        let record: InvoiceRecord = serde_json::from_str(
            r#"{"invoice_number": "1", "customer": {"name": "B"},
                "line_items": [{"description": "x"}]}"#,
        )
        .unwrap();

        let result = store.ingest(&record, "a.json");
        assert!(matches!(result, Err(StoreError::MissingParty("vendor"))));
    }

    #[test]
    fn test_reset_starts_a_fresh_run() {
        let mut store = NormalizationStore::new();
        store.ingest(&record_with_items("1001"), "a.json").unwrap();
        store.reset();

        assert!(store.invoices().is_empty());
        let outcome = store.ingest(&record_with_items("1001"), "a.json").unwrap();
        assert_eq!(outcome.invoice_id, 1);
        assert_eq!(outcome.vendor_id, 1);
    }
}
