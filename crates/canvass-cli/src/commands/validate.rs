//! The `canvass validate` command.

use std::path::PathBuf;

use anyhow::Result;

use canvass_core::schema;
use canvass_core::validate::validate_form_definition;

pub fn execute(form_path: PathBuf) -> Result<()> {
    let drafts = if form_path.is_dir() {
        schema::load_forms_directory(&form_path)?
    } else {
        vec![schema::parse_form_file(&form_path)?]
    };

    let mut total_errors = 0;

    for draft in &drafts {
        println!(
            "Form: {} ({}, {} fields)",
            draft.title,
            draft.form_type,
            draft.fields.len()
        );

        let outcome = validate_form_definition(draft);
        for v in &outcome.violations {
            let prefix = v
                .field
                .as_ref()
                .map(|id| format!("  [{id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} ERROR: {}", v.message);
        }
        total_errors += outcome.violations.len();
    }

    if total_errors == 0 {
        println!("All form definitions valid.");
        Ok(())
    } else {
        anyhow::bail!("{total_errors} validation error(s) found")
    }
}
