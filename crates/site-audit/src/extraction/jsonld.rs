// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

//! JSON-LD as a typed tree, with a visitor that collects `@type`
//! occurrences and type-specific field completeness.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Generic JSON-LD value.
#[derive(Debug, Clone, PartialEq)]
pub enum LdNode {
    Object(BTreeMap<String, LdNode>),
    Array(Vec<LdNode>),
    Text(String),
    Number(f64),
    Bool(bool),
    Null,
}

impl From<Value> for LdNode {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => {
                LdNode::Object(map.into_iter().map(|(k, v)| (k, LdNode::from(v))).collect())
            }
            Value::Array(items) => LdNode::Array(items.into_iter().map(LdNode::from).collect()),
            Value::String(s) => LdNode::Text(s),
            Value::Number(n) => LdNode::Number(n.as_f64().unwrap_or_default()),
            Value::Bool(b) => LdNode::Bool(b),
            Value::Null => LdNode::Null,
        }
    }
}

impl LdNode {
    /// Parse one `<script type="application/ld+json">` body.
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str::<Value>(text.trim()).ok().map(LdNode::from)
    }

    pub fn get(&self, key: &str) -> Option<&LdNode> {
        match self {
            LdNode::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Present and not empty: non-blank text, non-empty container, any number.
    pub fn is_filled(&self) -> bool {
        match self {
            LdNode::Object(map) => !map.is_empty(),
            LdNode::Array(items) => items.iter().any(LdNode::is_filled),
            LdNode::Text(s) => !s.trim().is_empty(),
            LdNode::Number(_) | LdNode::Bool(_) => true,
            LdNode::Null => false,
        }
    }

    /// `@type` values of this node: a string or an array of strings.
    pub fn types(&self) -> Vec<&str> {
        match self.get("@type") {
            Some(LdNode::Text(t)) => vec![t.as_str()],
            Some(LdNode::Array(items)) => items
                .iter()
                .filter_map(|i| match i {
                    LdNode::Text(t) => Some(t.as_str()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    fn has(&self, key: &str) -> bool {
        self.get(key).map(LdNode::is_filled).unwrap_or(false)
    }
}

/// LocalBusiness and its common subtypes.
const LOCAL_BUSINESS_TYPES: &[&str] = &[
    "LocalBusiness",
    "ProfessionalService",
    "Store",
    "Restaurant",
    "FoodEstablishment",
    "MedicalBusiness",
    "Dentist",
    "Physician",
    "LegalService",
    "Attorney",
    "HomeAndConstructionBusiness",
    "Electrician",
    "Plumber",
    "RoofingContractor",
    "GeneralContractor",
    "AutomotiveBusiness",
    "AutoRepair",
    "HealthAndBeautyBusiness",
    "BeautySalon",
    "HairSalon",
    "LodgingBusiness",
    "Hotel",
    "FinancialService",
    "AccountingService",
    "RealEstateAgent",
    "TravelAgency",
];

const ARTICLE_TYPES: &[&str] = &["Article", "NewsArticle", "BlogPosting"];

/// Name/Address/Phone presence across LocalBusiness objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NapCompleteness {
    pub present: bool,
    pub name: bool,
    pub address: bool,
    pub telephone: bool,
}

impl NapCompleteness {
    pub fn complete(&self) -> bool {
        self.name && self.address && self.telephone
    }
}

/// Offer/price/currency presence across Product objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferCompleteness {
    pub present: bool,
    pub has_offer: bool,
    pub has_price: bool,
    pub has_currency: bool,
}

impl OfferCompleteness {
    pub fn complete(&self) -> bool {
        self.has_offer && self.has_price && self.has_currency
    }
}

/// Author/datePublished presence across Article objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleCompleteness {
    pub present: bool,
    pub has_author: bool,
    pub has_date_published: bool,
}

impl ArticleCompleteness {
    pub fn complete(&self) -> bool {
        self.has_author && self.has_date_published
    }
}

/// Everything the visitor collects from the JSON-LD blocks of one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeReport {
    /// `@type` → occurrence count.
    pub types: BTreeMap<String, u32>,
    pub nap: NapCompleteness,
    pub offer: OfferCompleteness,
    pub article: ArticleCompleteness,
}

impl TypeReport {
    /// Visit `node` and every nested object, including `@graph` members.
    pub fn visit(&mut self, node: &LdNode) {
        match node {
            LdNode::Object(map) => {
                let types = node.types();
                for t in &types {
                    *self.types.entry((*t).to_string()).or_insert(0) += 1;
                }
                self.record_completeness(node, &types);
                for value in map.values() {
                    self.visit(value);
                }
            }
            LdNode::Array(items) => {
                for item in items {
                    self.visit(item);
                }
            }
            _ => {}
        }
    }

    /// True when every type-specific check that applies is complete.
    /// Pages without any of the tracked types count as complete.
    pub fn type_specific_complete(&self) -> bool {
        (!self.nap.present || self.nap.complete())
            && (!self.offer.present || self.offer.complete())
            && (!self.article.present || self.article.complete())
    }

    fn record_completeness(&mut self, node: &LdNode, types: &[&str]) {
        if types.iter().any(|t| LOCAL_BUSINESS_TYPES.contains(t)) {
            self.nap.present = true;
            self.nap.name |= node.has("name");
            self.nap.address |= node.has("address");
            self.nap.telephone |= node.has("telephone");
        }

        if types.contains(&"Product") {
            self.offer.present = true;
            let offers: Vec<&LdNode> = match node.get("offers") {
                Some(LdNode::Array(items)) => items.iter().collect(),
                Some(o @ LdNode::Object(_)) => vec![o],
                _ => Vec::new(),
            };
            self.offer.has_offer |= !offers.is_empty();
            self.offer.has_price |= offers
                .iter()
                .any(|o| o.has("price") || o.has("lowPrice"));
            self.offer.has_currency |= offers.iter().any(|o| o.has("priceCurrency"));
        }

        if types.iter().any(|t| ARTICLE_TYPES.contains(t)) {
            self.article.present = true;
            self.article.has_author |= node.has("author");
            self.article.has_date_published |= node.has("datePublished");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(json: &str) -> TypeReport {
        let mut report = TypeReport::default();
        report.visit(&LdNode::parse(json).unwrap());
        report
    }

    #[test]
    fn test_invalid_json_is_none() {
        assert!(LdNode::parse("{ not json").is_none());
        assert!(LdNode::parse("").is_none());
    }

    #[test]
    fn test_graph_types_are_counted() {
        let r = report(
            r#"{"@context":"https://schema.org","@graph":[
                {"@type":"Organization","name":"A"},
                {"@type":["WebPage","FAQPage"]},
                {"@type":"Organization"}
            ]}"#,
        );
        assert_eq!(r.types.get("Organization"), Some(&2));
        assert_eq!(r.types.get("WebPage"), Some(&1));
        assert_eq!(r.types.get("FAQPage"), Some(&1));
    }

    #[test]
    fn test_local_business_nap() {
        let r = report(
            r#"{"@type":"Dentist","name":"Praxis","address":{"@type":"PostalAddress","streetAddress":"Hauptstr. 1"}}"#,
        );
        assert!(r.nap.present);
        assert!(r.nap.name && r.nap.address);
        assert!(!r.nap.telephone);
        assert!(!r.type_specific_complete());
        assert_eq!(r.types.get("PostalAddress"), Some(&1));
    }

    #[test]
    fn test_product_offer_variants() {
        let r = report(
            r#"{"@type":"Product","name":"X","offers":{"@type":"AggregateOffer","lowPrice":"9.99","priceCurrency":"EUR"}}"#,
        );
        assert!(r.offer.complete());

        let r = report(r#"{"@type":"Product","name":"X","offers":[{"price":5}]}"#);
        assert!(r.offer.has_offer && r.offer.has_price);
        assert!(!r.offer.has_currency);

        let r = report(r#"{"@type":"Product","name":"X"}"#);
        assert!(!r.offer.has_offer);
    }

    #[test]
    fn test_article_fields_merge_across_objects() {
        let r = report(
            r#"[{"@type":"BlogPosting","author":{"@type":"Person","name":"A"}},
                {"@type":"Article","datePublished":"2024-01-01"}]"#,
        );
        assert!(r.article.complete());
    }

    #[test]
    fn test_no_tracked_types_counts_complete() {
        let r = report(r#"{"@type":"WebSite","name":"x"}"#);
        assert!(r.type_specific_complete());
    }

    #[test]
    fn test_blank_values_do_not_count() {
        let r = report(r#"{"@type":"LocalBusiness","name":"  ","address":null,"telephone":[]}"#);
        assert!(!r.nap.name && !r.nap.address && !r.nap.telephone);
    }
}
