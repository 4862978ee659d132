use std::fmt::Write as _;

use serde_json::Value;

use crate::domain::{Column, Record};
use crate::download::asset_path;
use crate::naming::asset_filename;

pub const DEFAULT_TITLE: &str = "Artwork Catalog";
pub const UNTITLED: &str = "Untitled";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Inventory,
    Series,
    Year,
    Edition,
}

/// One extraction rule: a column whose lowercased name satisfies `matches`
/// feeds `field`. Rules are tried in order and a column is claimed by the
/// first rule it matches.
pub struct FieldRule {
    pub field: Field,
    pub matches: fn(&str) -> bool,
}

pub const FIELD_RULES: [FieldRule; 5] = [
    FieldRule {
        field: Field::Title,
        matches: is_title,
    },
    FieldRule {
        field: Field::Inventory,
        matches: is_inventory,
    },
    FieldRule {
        field: Field::Series,
        matches: is_series,
    },
    FieldRule {
        field: Field::Year,
        matches: is_year,
    },
    FieldRule {
        field: Field::Edition,
        matches: is_edition,
    },
];

fn is_title(name: &str) -> bool {
    name.contains("title") || name.contains("name")
}

fn is_inventory(name: &str) -> bool {
    name.contains("inventory") || name.contains("inv")
}

fn is_series(name: &str) -> bool {
    name.contains("collection") || name.contains("series")
}

fn is_year(name: &str) -> bool {
    name.contains("year") || name.contains("date")
}

fn is_edition(name: &str) -> bool {
    name.contains("edition") && !name.contains("desc")
}

pub fn classify_column(name: &str) -> Option<Field> {
    let lowered = name.to_lowercase();
    FIELD_RULES
        .iter()
        .find(|rule| (rule.matches)(&lowered))
        .map(|rule| rule.field)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardFields {
    pub title: Option<String>,
    pub inventory: Option<String>,
    pub series: Option<String>,
    pub year: Option<String>,
    pub edition: Option<String>,
}

impl CardFields {
    pub fn title_or_default(&self) -> &str {
        self.title.as_deref().unwrap_or(UNTITLED)
    }

    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Title => &mut self.title,
            Field::Inventory => &mut self.inventory,
            Field::Series => &mut self.series,
            Field::Year => &mut self.year,
            Field::Edition => &mut self.edition,
        }
    }
}

pub fn extract_fields(record: &Record, columns: &[Column]) -> CardFields {
    let mut fields = CardFields::default();
    for column in columns {
        let Some(field) = classify_column(&column.name) else {
            continue;
        };
        let slot = fields.slot(field);
        if slot.is_some() {
            continue;
        }
        let Some(value) = record.get(&column.name).and_then(display_value) else {
            continue;
        };
        *slot = Some(match field {
            Field::Year => truncate_date(&value),
            _ => value,
        });
    }
    fields
}

/// Text shown for a cell, or `None` when the cell counts as empty.
pub fn display_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null | Value::Bool(false) => return None,
        Value::Bool(true) => "Yes".to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(map) => map
            .get("display_value")
            .or_else(|| map.get("name"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    };
    if text.is_empty() { None } else { Some(text) }
}

fn truncate_date(value: &str) -> String {
    match value.split_once('-') {
        Some((year, _)) => year.to_string(),
        None => value.to_string(),
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub image_filename: String,
    pub fields: CardFields,
}

/// Card for a record, or `None` when it has no image to show. A reference
/// outside the base's asset root can never be fetched, so it gets no card.
pub fn build_card(record: &Record, image_column: &str, columns: &[Column]) -> Option<Card> {
    let reference = record.first_asset(image_column)?;
    asset_path(&reference).ok()?;
    Some(Card {
        image_filename: asset_filename(&reference),
        fields: extract_fields(record, columns),
    })
}

#[derive(Debug, Clone)]
pub struct CatalogDocument {
    pub html: String,
    pub cards: usize,
}

pub fn render_document(
    title: &str,
    records: &[Record],
    image_column: &str,
    columns: &[Column],
) -> CatalogDocument {
    let cards = records
        .iter()
        .filter_map(|record| build_card(record, image_column, columns))
        .collect::<Vec<_>>();

    let mut html = String::new();
    html.push_str(&HEADER.replace("{title}", &escape_html(title)));
    for card in &cards {
        write_card(&mut html, card);
    }
    html.push_str(FOOTER);

    CatalogDocument {
        html,
        cards: cards.len(),
    }
}

fn write_card(html: &mut String, card: &Card) {
    let title = escape_html(card.fields.title_or_default());
    let filename = escape_html(&card.image_filename);
    // Writing into a String never fails.
    let _ = write!(
        html,
        r#"            <div class="artwork-card">
                <div class="artwork-image">
                    <img src="images/{filename}" alt="{title}">
                </div>
                <div class="artwork-info">
                    <div class="artwork-title">{title}</div>
                    <div class="artwork-meta">
"#
    );
    if let Some(inventory) = &card.fields.inventory {
        let _ = writeln!(
            html,
            r#"                        <div class="inv-number">{}</div>"#,
            escape_html(inventory)
        );
    }
    let labelled = [
        ("Series", &card.fields.series),
        ("Year", &card.fields.year),
        ("Edition", &card.fields.edition),
    ];
    for (label, value) in labelled {
        if let Some(value) = value {
            let _ = writeln!(
                html,
                "                        <div><strong>{label}:</strong> {}</div>",
                escape_html(value)
            );
        }
    }
    html.push_str(
        "                    </div>\n                </div>\n            </div>\n",
    );
}

const HEADER: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
        * {
            margin: 0;
            padding: 0;
            box-sizing: border-box;
        }

        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
            background: #fff;
            padding: 20px;
        }

        .container {
            max-width: 1400px;
            margin: 0 auto;
        }

        h1 {
            font-size: 2rem;
            margin-bottom: 30px;
            font-weight: 300;
            text-align: center;
        }

        .grid {
            display: grid;
            grid-template-columns: repeat(auto-fill, minmax(300px, 1fr));
            gap: 30px;
        }

        .artwork-card {
            background: #f9f9f9;
            border-radius: 2px;
            overflow: hidden;
            box-shadow: 0 1px 3px rgba(0,0,0,0.1);
            transition: box-shadow 0.2s;
        }

        .artwork-card:hover {
            box-shadow: 0 4px 12px rgba(0,0,0,0.15);
        }

        .artwork-image {
            width: 100%;
            height: 300px;
            background: #f9f9f9;
            display: flex;
            align-items: center;
            justify-content: center;
            padding: 20px;
        }

        .artwork-image img {
            max-width: 100%;
            max-height: 300px;
            width: auto;
            height: auto;
            object-fit: contain;
            display: block;
        }

        .artwork-info {
            padding: 20px;
        }

        .artwork-title {
            font-size: 1.1rem;
            font-weight: 600;
            margin-bottom: 8px;
            color: #222;
        }

        .artwork-meta {
            font-size: 0.9rem;
            color: #666;
            line-height: 1.6;
        }

        .artwork-meta div {
            margin-bottom: 4px;
        }

        .inv-number {
            font-family: monospace;
            color: #999;
            font-size: 0.85rem;
            margin-bottom: 8px;
        }
    </style>
</head>
<body>
    <div class="container">
        <h1>{title}</h1>
        <div class="grid">
"#;

const FOOTER: &str = r#"        </div>
    </div>
</body>
</html>
"#;
