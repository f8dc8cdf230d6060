//! The `canvass init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create canvass.toml
    if std::path::Path::new("canvass.toml").exists() {
        println!("canvass.toml already exists, skipping.");
    } else {
        std::fs::write("canvass.toml", SAMPLE_CONFIG)?;
        println!("Created canvass.toml");
    }

    // Create example form definition
    std::fs::create_dir_all("forms")?;
    let example_path = std::path::Path::new("forms/example.toml");
    if example_path.exists() {
        println!("forms/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_FORM)?;
        println!("Created forms/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit forms/example.toml to describe your form");
    println!("  2. Run: canvass validate --form forms/example.toml");
    println!("  3. Run: canvass submit --form forms/example.toml --payload payload.json");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# canvass configuration

# Optional AI summarization backend for `canvass` insights.
# [summarizer]
# type = "openai"
# api_key = "${OPENAI_API_KEY}"
# model = "gpt-4.1-mini"
"#;

const EXAMPLE_FORM: &str = r#"[form]
title = "Example Feedback"
description = "A simple example form to get started"
type = "survey"

[form.settings]
allow_anonymous = true

[[fields]]
id = "rating"
label = "How would you rate this?"
kind = "radio"
required = true
options = ["1", "2", "3", "4", "5"]

[[fields]]
id = "comment"
label = "Anything to add?"
kind = "long_text"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_form_parses_and_validates() {
        let draft = canvass_core::schema::parse_form_str(
            EXAMPLE_FORM,
            &std::path::PathBuf::from("example.toml"),
        )
        .unwrap();
        let outcome = canvass_core::validate::validate_form_definition(&draft);
        assert!(outcome.valid);
    }
}
