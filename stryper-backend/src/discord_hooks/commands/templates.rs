//! Template commands

use catalog_types::Template;

use super::{CommandReply, parse_index};
use crate::catalog::{CatalogError, CatalogStore, Collection};

pub fn add_template(store: &CatalogStore, text: &str) -> CommandReply {
    let template = match Template::parse(text) {
        Ok(t) => t,
        Err(check) => {
            let mut msg = format!("ERROR in '{}':", text);
            for token in check.missing() {
                let name = token.trim_matches(|c| c == '{' || c == '}');
                msg.push_str(&format!("\n\tRequires {} code '{}'", name, token));
            }
            return CommandReply::err(CatalogError::Validation(msg).to_string());
        }
    };

    match store.add_template(template) {
        Ok(true) => CommandReply::ok("Success"),
        Ok(false) => CommandReply::err(CatalogError::Duplicate("Template already exists!".to_string()).to_string()),
        Err(e) => CommandReply::err(format!("ERROR: {}", e)),
    }
}

pub fn remove_template(store: &CatalogStore, raw_index: &str) -> CommandReply {
    let Some(index) = parse_index(raw_index) else {
        return CommandReply::err(format!("ERROR: '{}' is not a valid index", raw_index));
    };
    match store.remove_by_index(Collection::Templates, index) {
        Ok(removed) => CommandReply::ok(format!("Removed template: {}", removed)),
        Err(e) => CommandReply::err(format!("ERROR: {}", e)),
    }
}

pub fn list_templates(store: &CatalogStore) -> CommandReply {
    match store.list_templates() {
        Ok(templates) if templates.is_empty() => {
            CommandReply::ok("No templates yet, the default greeting will be used")
        }
        Ok(templates) => {
            let lines: Vec<String> = templates
                .iter()
                .enumerate()
                .map(|(i, t)| format!("`{}` {}", i, t))
                .collect();
            CommandReply::ok(lines.join("\n"))
        }
        Err(e) => CommandReply::err(format!("ERROR: {}", e)),
    }
}
