//! Free-text query sanitizing.
//!
//! User text goes into a `query_string` query, so the full Lucene syntax
//! stays available (`title:map*`, `"exact phrase"`, `a OR b`). The one
//! character escaped is `/`, which would otherwise open a regular
//! expression and turn a search for a date like `1/2/1900` into a
//! regex match.

pub(crate) fn sanitize_query_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut prev_backslash = false;
    for c in input.trim().chars() {
        if c == '/' && !prev_backslash {
            out.push('\\');
        }
        prev_backslash = c == '\\' && !prev_backslash;
        out.push(c);
    }
    out
}
