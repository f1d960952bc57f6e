//! Product form input
//!
//! Admin forms submit every field as text. `ProductForm` turns that input
//! into a product row: malformed numbers fall back to defaults instead of
//! being rejected, blank optional fields become null and the slug is
//! derived from the name when left empty.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use store_object::Row;
use type_mapping::{coerce_f64, coerce_i64, coerce_optional_f64, non_blank};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductForm {
    pub name: String,
    pub slug: String,
    pub sku: String,
    pub brand_id: String,
    pub category_id: String,
    pub gender_category: String,
    pub price: String,
    pub compare_price: String,
    pub cost_price: String,
    pub description: String,
    pub short_description: String,
    pub ingredients: String,
    pub usage_instructions: String,
    pub benefits: String,
    pub images: Vec<String>,
    pub video_url: String,
    pub weight: String,
    pub stock_quantity: String,
    pub low_stock_threshold: String,
    pub track_inventory: bool,
    pub allow_backorder: bool,
    pub featured: bool,
    pub status: String,
    pub seo_title: String,
    pub seo_description: String,
    pub tags: Vec<String>,
    pub sort_order: String,
}

impl Default for ProductForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            slug: String::new(),
            sku: String::new(),
            brand_id: String::new(),
            category_id: String::new(),
            gender_category: "Unisex".to_string(),
            price: "0".to_string(),
            compare_price: String::new(),
            cost_price: String::new(),
            description: String::new(),
            short_description: String::new(),
            ingredients: String::new(),
            usage_instructions: String::new(),
            benefits: String::new(),
            images: vec![String::new()],
            video_url: String::new(),
            weight: String::new(),
            stock_quantity: "0".to_string(),
            low_stock_threshold: "5".to_string(),
            track_inventory: true,
            allow_backorder: false,
            featured: false,
            status: "active".to_string(),
            seo_title: String::new(),
            seo_description: String::new(),
            tags: Vec::new(),
            sort_order: "0".to_string(),
        }
    }
}

/// Lowercase, runs of anything but `a-z0-9` become one dash, no edge dashes
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn optional_text(input: &str) -> Value {
    non_blank(input).map(Value::String).unwrap_or(Value::Null)
}

fn optional_number(input: &str) -> Value {
    coerce_optional_f64(input).map(|v| json!(v)).unwrap_or(Value::Null)
}

fn visible(entries: &[String]) -> Vec<String> {
    entries
        .iter()
        .filter_map(|entry| non_blank(entry))
        .collect()
}

fn text_of(row: &Row, column: &str) -> String {
    match row.get(column) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn strings_of(row: &Row, column: &str) -> Vec<String> {
    row.get(column)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

impl ProductForm {
    /// Prefill the form from a stored product
    pub fn from_row(row: &Row) -> Self {
        let defaults = Self::default();
        let or_default = |column: &str, default: &str| {
            let value = text_of(row, column);
            if value.is_empty() { default.to_string() } else { value }
        };
        let flag = |column: &str, default: bool| row.get(column).and_then(Value::as_bool).unwrap_or(default);

        let images = strings_of(row, "images");
        Self {
            name: text_of(row, "name"),
            slug: text_of(row, "slug"),
            sku: text_of(row, "sku"),
            brand_id: text_of(row, "brand_id"),
            category_id: text_of(row, "category_id"),
            gender_category: or_default("gender_category", &defaults.gender_category),
            price: or_default("price", &defaults.price),
            compare_price: text_of(row, "compare_price"),
            cost_price: text_of(row, "cost_price"),
            description: text_of(row, "description"),
            short_description: text_of(row, "short_description"),
            ingredients: text_of(row, "ingredients"),
            usage_instructions: text_of(row, "usage_instructions"),
            benefits: text_of(row, "benefits"),
            images: if images.is_empty() { defaults.images } else { images },
            video_url: text_of(row, "video_url"),
            weight: text_of(row, "weight"),
            stock_quantity: or_default("stock_quantity", &defaults.stock_quantity),
            low_stock_threshold: or_default("low_stock_threshold", &defaults.low_stock_threshold),
            track_inventory: flag("track_inventory", true),
            allow_backorder: flag("allow_backorder", false),
            featured: flag("featured", false),
            status: or_default("status", &defaults.status),
            seo_title: text_of(row, "seo_title"),
            seo_description: text_of(row, "seo_description"),
            tags: strings_of(row, "tags"),
            sort_order: or_default("sort_order", &defaults.sort_order),
        }
    }

    fn fields(&self) -> Row {
        let mut row = Row::new();
        row.insert("name".to_string(), json!(self.name.trim()));
        row.insert("sku".to_string(), optional_text(&self.sku));
        row.insert("brand_id".to_string(), optional_text(&self.brand_id));
        row.insert("category_id".to_string(), optional_text(&self.category_id));
        row.insert(
            "gender_category".to_string(),
            json!(non_blank(&self.gender_category).unwrap_or_else(|| "Unisex".to_string())),
        );
        row.insert("price".to_string(), json!(coerce_f64(&self.price, 0.0)));
        row.insert("compare_price".to_string(), optional_number(&self.compare_price));
        row.insert("cost_price".to_string(), optional_number(&self.cost_price));
        for (column, value) in [
            ("description", &self.description),
            ("short_description", &self.short_description),
            ("ingredients", &self.ingredients),
            ("usage_instructions", &self.usage_instructions),
            ("benefits", &self.benefits),
            ("video_url", &self.video_url),
            ("seo_title", &self.seo_title),
            ("seo_description", &self.seo_description),
        ] {
            row.insert(column.to_string(), optional_text(value));
        }
        row.insert("images".to_string(), json!(visible(&self.images)));
        row.insert("weight".to_string(), optional_number(&self.weight));
        row.insert("stock_quantity".to_string(), json!(coerce_i64(&self.stock_quantity, 0)));
        row.insert(
            "low_stock_threshold".to_string(),
            json!(coerce_i64(&self.low_stock_threshold, 5)),
        );
        row.insert("track_inventory".to_string(), json!(self.track_inventory));
        row.insert("allow_backorder".to_string(), json!(self.allow_backorder));
        row.insert("featured".to_string(), json!(self.featured));
        row.insert(
            "status".to_string(),
            json!(non_blank(&self.status).unwrap_or_else(|| "active".to_string())),
        );
        row.insert("tags".to_string(), json!(visible(&self.tags)));
        row.insert("sort_order".to_string(), json!(coerce_i64(&self.sort_order, 0)));
        row
    }

    /// Row for a new product; a blank slug is derived from the name
    pub fn to_insert_row(&self) -> Row {
        let mut row = self.fields();
        let slug = non_blank(&self.slug).unwrap_or_else(|| slugify(&self.name));
        row.insert("slug".to_string(), json!(slug));
        row
    }

    /// Patch for an existing product; a blank slug leaves the stored one alone
    pub fn to_update_patch(&self) -> Row {
        let mut row = self.fields();
        if let Some(slug) = non_blank(&self.slug) {
            row.insert("slug".to_string(), json!(slug));
        }
        row
    }
}
