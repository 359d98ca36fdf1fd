//! Page templates, compiled into the binary.

use handlebars::Handlebars;
use serde_json::json;

use crate::error::Result;
use crate::validation::{MAX_RATING, MIN_RATING};

const PARTIALS: [(&str, &str); 2] = [
    ("header", include_str!("../../templates/header.hbs")),
    ("footer", include_str!("../../templates/footer.hbs")),
];

const PAGES: [(&str, &str); 3] = [
    ("index", include_str!("../../templates/index.hbs")),
    ("feedback", include_str!("../../templates/feedback.hbs")),
    ("ticket", include_str!("../../templates/ticket.hbs")),
];

/// Compiled page templates.
#[derive(Debug)]
pub struct Templates {
    registry: Handlebars<'static>,
}

impl Templates {
    /// Compile every page and partial.
    ///
    /// # Errors
    ///
    /// Returns an error if a template does not parse.
    pub fn new() -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        for (name, source) in PARTIALS {
            registry.register_partial(name, source)?;
        }
        for (name, source) in PAGES {
            registry.register_template_string(name, source)?;
        }
        Ok(Self { registry })
    }

    /// Navigation page.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn index(&self) -> Result<String> {
        Ok(self.registry.render("index", &json!({ "title": "Home" }))?)
    }

    /// Feedback form.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn feedback(&self) -> Result<String> {
        let ratings: Vec<i64> = (MIN_RATING..=MAX_RATING).collect();
        Ok(self.registry.render(
            "feedback",
            &json!({ "title": "Feedback", "ratings": ratings }),
        )?)
    }

    /// Ticket form listing the given housing blocks.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn ticket(&self, housing_blocks: &[String]) -> Result<String> {
        Ok(self.registry.render(
            "ticket",
            &json!({ "title": "Maintenance ticket", "housing_blocks": housing_blocks }),
        )?)
    }
}
