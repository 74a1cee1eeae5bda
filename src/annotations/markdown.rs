//! Markdown export of highlights
//!
//! Highlights are written in page order under a fixed header. Each one is
//! rendered through a template whose `{field}` placeholders are replaced;
//! `{{` and `}}` produce literal braces.

use thiserror::Error;

use super::Annotation;

/// Template used when none is supplied
pub const DEFAULT_TEMPLATE: &str = "\n---\nPage {page_number}\n=={highlight}==\n\n{text}\n";

/// Placeholders a template may use
pub const TEMPLATE_FIELDS: &[&str] = &[
    "text",
    "page_number",
    "highlight",
    "iteration",
    "preceding",
    "succeeding",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unknown template field '{0}'")]
    UnknownField(String),

    #[error("Unclosed '{{' in template")]
    Unclosed,

    #[error("Single '}}' encountered in template")]
    StrayClosingBrace,
}

/// Render `annotations` as a Markdown document titled after `document_name`
///
/// Sorting by page is stable, so highlights on the same page keep their
/// sidecar order. `iteration` counts from 1 in output order.
pub fn render_markdown(
    document_name: &str,
    annotations: &[Annotation],
    template: Option<&str>,
) -> Result<String, TemplateError> {
    let template = template.unwrap_or(DEFAULT_TEMPLATE);

    let mut sorted: Vec<&Annotation> = annotations.iter().collect();
    sorted.sort_by_key(|annotation| annotation.page);

    let mut output = format!("# Annotations and Highlights\nDocument: {}\n", document_name);
    for (iteration, annotation) in sorted.into_iter().enumerate() {
        output.push_str(&render_template(template, annotation, iteration + 1)?);
    }
    output.push('\n');
    Ok(output)
}

/// Fill one annotation into `template`
pub fn render_template(
    template: &str,
    annotation: &Annotation,
    iteration: usize,
) -> Result<String, TemplateError> {
    let mut output = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                output.push('{');
            }
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => field.push(c),
                        None => return Err(TemplateError::Unclosed),
                    }
                }
                output.push_str(&field_value(&field, annotation, iteration)?);
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                output.push('}');
            }
            '}' => return Err(TemplateError::StrayClosingBrace),
            c => output.push(c),
        }
    }

    Ok(output)
}

fn field_value(
    field: &str,
    annotation: &Annotation,
    iteration: usize,
) -> Result<String, TemplateError> {
    let context = annotation.context.as_ref();
    let value = match field {
        "text" => annotation.text.clone(),
        "page_number" => annotation.page.to_string(),
        "highlight" => annotation.highlight.clone(),
        "iteration" => iteration.to_string(),
        "preceding" => context.map(|c| c.preceding.clone()).unwrap_or_default(),
        "succeeding" => context.map(|c| c.succeeding.clone()).unwrap_or_default(),
        other => return Err(TemplateError::UnknownField(other.to_string())),
    };
    Ok(value)
}
