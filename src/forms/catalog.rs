//! Concrete forms: partner registration and product creation

use super::field::{FieldKind, FieldSpec, TaxIdKind};
use super::key::FieldKey;
use super::schema::{FormSchema, SuggestionPlan};
use crate::error::Result;
use once_cell::sync::Lazy;
use std::sync::Arc;

const CATEGORIES: [&str; 6] = [
    "restaurant",
    "grocery",
    "fashion",
    "electronics",
    "salon",
    "pharmacy",
];

const DAYS: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

static PARTNER_REGISTRATION: Lazy<Arc<FormSchema>> = Lazy::new(|| {
    Arc::new(build_partner_registration().expect("partner registration schema is valid"))
});

static PRODUCT_CREATION: Lazy<Arc<FormSchema>> = Lazy::new(|| {
    Arc::new(build_product_creation().expect("product creation schema is valid"))
});

/// Which catalog form to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormKind {
    #[default]
    PartnerRegistration,
    ProductCreation,
}

impl FormKind {
    /// Parse the command-line name of a form
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "registration" | "partner" => Some(Self::PartnerRegistration),
            "product" => Some(Self::ProductCreation),
            _ => None,
        }
    }

    pub fn schema(self) -> Arc<FormSchema> {
        match self {
            Self::PartnerRegistration => partner_registration(),
            Self::ProductCreation => product_creation(),
        }
    }
}

pub fn partner_registration() -> Arc<FormSchema> {
    Arc::clone(&PARTNER_REGISTRATION)
}

pub fn product_creation() -> Arc<FormSchema> {
    Arc::clone(&PRODUCT_CREATION)
}

fn field(key: &str, label: &str, kind: FieldKind) -> Result<FieldSpec> {
    Ok(FieldSpec::new(FieldKey::parse(key)?, label, kind))
}

fn options(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn build_partner_registration() -> Result<FormSchema> {
    FormSchema::builder("partner_registration", "Partner Registration")
        .step(
            "Business",
            "Tell us about your business",
            vec![
                field("businessName", "Business Name", FieldKind::Text)?.required(),
                field(
                    "category",
                    "Category",
                    FieldKind::Select {
                        options: options(&CATEGORIES),
                    },
                )?
                .required(),
                field("profileSlug", "Profile URL", FieldKind::Slug)?
                    .required()
                    .unique()
                    .help("Lowercase letters, digits, '-' and '_'"),
            ],
        )
        .step(
            "Contact",
            "How customers and our team reach you",
            vec![
                field("ownerName", "Owner Name", FieldKind::Text)?.required(),
                field("email", "Email", FieldKind::Email)?.required().unique(),
                field("phone", "Phone", FieldKind::Phone)?
                    .required()
                    .unique()
                    .help("10 digits, optionally prefixed with 91"),
            ],
        )
        .step(
            "Location",
            "Where the store is",
            vec![
                field("address", "Address", FieldKind::Text)?.required(),
                field("locality", "Locality", FieldKind::Text)?,
                field("city", "City", FieldKind::Text)?.required(),
                field("region", "State", FieldKind::Text)?.required(),
                field("pincode", "Pincode", FieldKind::Pincode)?.required(),
            ],
        )
        .step(
            "Tax",
            "Government registrations",
            vec![
                field("panNumber", "PAN", FieldKind::TaxId(TaxIdKind::Pan))?
                    .required()
                    .unique(),
                field("gstNumber", "GSTIN", FieldKind::TaxId(TaxIdKind::Gst))?.unique(),
            ],
        )
        .step(
            "Operations",
            "When you are open",
            vec![
                field("businessHours.open", "Opens At", FieldKind::Time)?.required(),
                field("businessHours.close", "Closes At", FieldKind::Time)?.required(),
                field(
                    "operatingDays",
                    "Operating Days",
                    FieldKind::MultiSelect {
                        options: options(&DAYS),
                    },
                )?
                .required(),
            ],
        )
        .step(
            "Agreement",
            "Review and accept the partner terms",
            vec![field("acceptTerms", "I accept the partner terms", FieldKind::Checkbox)?.required()],
        )
        .suggestions(SuggestionPlan {
            target: FieldKey::parse("profileSlug")?,
            primary: FieldKey::parse("businessName")?,
            secondary: vec![
                FieldKey::parse("locality")?,
                FieldKey::parse("city")?,
                FieldKey::parse("category")?,
                FieldKey::parse("region")?,
            ],
        })
        .build()
}

fn build_product_creation() -> Result<FormSchema> {
    FormSchema::builder("product_creation", "New Product")
        .step(
            "Basics",
            "What are you selling",
            vec![
                field("name", "Product Name", FieldKind::Text)?.required(),
                field(
                    "category",
                    "Category",
                    FieldKind::Select {
                        options: options(&CATEGORIES),
                    },
                )?
                .required(),
                field("description", "Description", FieldKind::Text)?,
            ],
        )
        .step(
            "Pricing",
            "Price shown to customers",
            vec![
                field("price", "Price", FieldKind::Amount)?.required(),
                field("discountPrice", "Discounted Price", FieldKind::Amount)?,
            ],
        )
        .step(
            "Inventory",
            "Stock keeping",
            vec![
                field("sku", "SKU", FieldKind::Slug)?.required().unique(),
                field("stock", "Units In Stock", FieldKind::Integer)?.required(),
                field("tags", "Tags", FieldKind::MultiSelect { options: Vec::new() })?,
            ],
        )
        .build()
}
