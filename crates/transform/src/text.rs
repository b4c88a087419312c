//! String normalization helpers.
//!
//! # Title casing
//!
//! A word starts at any letter that follows a non-letter (start of string,
//! space, digit, apostrophe, hyphen...). The first letter of a word is
//! upper-cased and every following letter lower-cased:
//!
//! ```rust
//! use transform::title_case;
//!
//! assert_eq!(title_case("notebook DELL"), "Notebook Dell");
//! assert_eq!(title_case("3d printer"), "3D Printer");
//! assert_eq!(title_case("o'neil-smith"), "O'Neil-Smith");
//! ```

/// Trims the edges, then title-cases. This is the `product_name` normalization.
pub fn normalize_product_name(name: &str) -> String {
    title_case(name.trim())
}

/// Lower-cases an email address.
pub fn normalize_email(email: &str) -> String {
    email.to_lowercase()
}

/// Title-cases `text` word by word. Non-letters pass through untouched.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_cased = false;

    for ch in text.chars() {
        let cased = ch.is_lowercase() || ch.is_uppercase();
        if cased {
            // Case mapping can expand one char into several (e.g. 'ß').
            if prev_cased {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
        } else {
            out.push(ch);
        }
        prev_cased = cased;
    }

    out
}
