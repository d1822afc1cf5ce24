//! Prompt construction for product descriptions.

use std::fmt::Write;

use crate::Product;

/// Prompt for the full (long-form) product description.
pub fn full_description_prompt(product: &Product) -> String {
    let mut prompt = format!(
        "Write a detailed, SEO-optimised product description for \"{}\".",
        product.name.trim()
    );
    push_attributes(&mut prompt, product);
    if !product.description.trim().is_empty() {
        let _ = write!(
            prompt,
            "\n\nCurrent description (rewrite and improve it, keep all facts):\n{}",
            product.description.trim()
        );
    }
    prompt.push_str(
        "\n\nUse short paragraphs, highlight the key benefits and features, \
         and do not invent specifications that are not listed above.",
    );
    prompt
}

/// Prompt for the short description (excerpt).
///
/// A freshly generated full description, when available, is given as
/// context so both texts agree.
pub fn short_description_prompt(product: &Product, full_description: Option<&str>) -> String {
    let mut prompt = format!(
        "Write a short product description (2-3 sentences, at most 300 characters) for \"{}\".",
        product.name.trim()
    );
    push_attributes(&mut prompt, product);
    if !product.short_description.trim().is_empty() {
        let _ = write!(
            prompt,
            "\n\nCurrent short description:\n{}",
            product.short_description.trim()
        );
    }
    if let Some(full) = full_description.map(str::trim).filter(|f| !f.is_empty()) {
        let _ = write!(prompt, "\n\nFull description for reference:\n{full}");
    }
    prompt
}

fn push_attributes(prompt: &mut String, product: &Product) {
    if product.attributes.is_empty() {
        return;
    }
    prompt.push_str("\n\nAttributes:");
    for (name, value) in &product.attributes {
        let _ = write!(prompt, "\n- {name}: {value}");
    }
}
