//! Typed request body for creating a database page
//!
//! ```json
//! {
//!   "parent": { "type": "database_id", "database_id": "..." },
//!   "properties": {
//!     "Name": { "type": "title", "title": [{ "type": "text", "text": { "content": "..." } }] },
//!     "Due Date": { "date": { "start": "2024-06-02" } }
//!   }
//! }
//! ```
//!
//! `Name` is always present. `Due Date` exists only when the task has a date,
//! and then holds that string unchanged as the range start with no end.

use crate::task::StructuredTask;
use serde::Serialize;

/// Name of the title property in the target database
pub const TITLE_PROPERTY: &str = "Name";
/// Name of the date property in the target database
pub const DUE_DATE_PROPERTY: &str = "Due Date";

#[derive(Debug, Serialize)]
pub struct PageRequest<'a> {
    parent: Parent<'a>,
    properties: Properties<'a>,
}

#[derive(Debug, Serialize)]
struct Parent<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    database_id: &'a str,
}

#[derive(Debug, Serialize)]
struct Properties<'a> {
    #[serde(rename = "Name")]
    name: TitleProperty<'a>,

    #[serde(rename = "Due Date", skip_serializing_if = "Option::is_none")]
    due_date: Option<DateProperty<'a>>,
}

#[derive(Debug, Serialize)]
struct TitleProperty<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    title: [RichText<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RichText<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: TextContent<'a>,
}

#[derive(Debug, Serialize)]
struct TextContent<'a> {
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct DateProperty<'a> {
    date: DateRange<'a>,
}

#[derive(Debug, Serialize)]
struct DateRange<'a> {
    start: &'a str,
}

impl<'a> PageRequest<'a> {
    /// Build the page body for `task` in database `database_id`
    pub fn new(database_id: &'a str, task: &'a StructuredTask) -> Self {
        Self {
            parent: Parent {
                kind: "database_id",
                database_id,
            },
            properties: Properties {
                name: TitleProperty {
                    kind: "title",
                    title: [RichText {
                        kind: "text",
                        text: TextContent {
                            content: &task.title,
                        },
                    }],
                },
                due_date: task.date.as_deref().map(|start| DateProperty {
                    date: DateRange { start },
                }),
            },
        }
    }

    pub fn has_due_date(&self) -> bool {
        self.properties.due_date.is_some()
    }
}
