use std::{env, fmt};

pub fn separated_by<T, F>(
    out: &mut String,
    values: impl IntoIterator<Item = T>,
    mut f: F,
    separator: &str,
) where
    F: FnMut(&mut String, T),
{
    let mut len = out.len();
    for v in values {
        if out.len() > len {
            out.push_str(separator);
        }
        len = out.len();
        f(out, v);
    }
}

/// Longest prefix of `text` that fits in `max` bytes without splitting a character.
pub fn truncate_at(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Display adapter produced by [`truncate_long!`].
pub struct Truncated<'a>(pub &'a str);

impl fmt::Display for Truncated<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cut = truncate_at(self.0, 497);
        f.write_str(cut.trim_end())?;
        if cut.len() < self.0.len() {
            f.write_str("...")?;
        }
        Ok(())
    }
}

#[macro_export]
macro_rules! truncate_long {
    ($text:expr) => {
        $crate::Truncated(::std::convert::AsRef::<str>::as_ref(&$text))
    };
}

/// Removes the last `name` pair from `pairs` and returns its value, falling back to the
/// environment variable `env_name`.
pub fn take_param(pairs: &mut Vec<(String, String)>, name: &str, env_name: &str) -> Option<String> {
    let mut found = None;
    pairs.retain(|(k, v)| {
        if k == name {
            found = Some(v.clone());
            false
        } else {
            true
        }
    });
    found.or_else(|| env::var(env_name).ok().filter(|v| !v.is_empty()))
}

/// Parses the pairs of a `?key=value&...` query string.
pub fn split_query(url: &str) -> (&str, Vec<(String, String)>) {
    match url.split_once('?') {
        Some((base, query)) => (
            base,
            url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        ),
        None => (url, Vec::new()),
    }
}

/// Inverse of [`split_query`].
pub fn join_query(base: &str, pairs: &[(String, String)]) -> String {
    if pairs.is_empty() {
        return base.to_owned();
    }
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    format!("{base}?{query}")
}
