//! Project API key generation

use rand::Rng;

/// Prefix identifying keys issued by this service
const API_KEY_PREFIX: &str = "opm_";

/// Longest name slug embedded in a key
const MAX_SLUG_LEN: usize = 24;

/// Lower-case the project name, collapse every run of other characters
/// into one dash, trim dashes and cap the length.
/// `"My Checkout API"` becomes `"my-checkout-api"`.
fn slugify_name(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut prev_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }
    let mut slug = slug.trim_end_matches('-').to_string();
    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
        slug = slug.trim_end_matches('-').to_string();
    }
    slug
}

/// Generate a key of the form `opm_<name-slug>_<16 hex chars>`, or
/// `opm_<16 hex chars>` when the name has no usable characters.
///
/// Keys are stored as issued so owners can list them.
pub fn generate_api_key(project_name: &str) -> String {
    let random_bytes: [u8; 8] = rand::thread_rng().gen();
    let random_hex = hex::encode(random_bytes);

    let slug = slugify_name(project_name);
    if slug.is_empty() {
        format!("{}{}", API_KEY_PREFIX, random_hex)
    } else {
        format!("{}{}_{}", API_KEY_PREFIX, slug, random_hex)
    }
}
