//! Identifier helpers for tuple field names.

/// Converts a snake_case name into UpperCamelCase.
///
/// Every `_`-separated segment gets its first character uppercased; the
/// underscores are dropped. A name made only of underscores becomes empty.
pub fn to_camel_case(input: &str) -> String {
    input
        .split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Returns the first name not rejected by `used`.
///
/// The raw name is tried first, then `name0`, `name1`, ... so that with
/// `send` and `send0` taken the result is `send1`.
pub fn resolve_name_conflict<F>(raw_name: &str, used: F) -> String
where
    F: Fn(&str) -> bool,
{
    if !used(raw_name) {
        return raw_name.to_string();
    }
    (0usize..)
        .map(|idx| format!("{raw_name}{idx}"))
        .find(|candidate| !used(candidate))
        .unwrap_or_default()
}

/// Reports whether `name` is an identifier: a letter or `_` followed by
/// letters, decimal digits `0-9` or `_`.
pub fn is_valid_field_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if is_letter(first) => chars.all(|c| is_letter(c) || c.is_ascii_digit()),
        _ => false,
    }
}

fn is_letter(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}
