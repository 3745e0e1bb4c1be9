//! Resolver for CSS *computed* length values.
//!
//! The measurement collaborator hands us computed styles, which a
//! standards-compliant engine only ever emits in three shapes: `<n>px`,
//! `<n>%`, or `calc(<percentage> ± <pixel>)`. There is no general
//! arithmetic to evaluate — a computed `calc()` is always a flat sum of
//! signed percentage and pixel terms, so parsing stays purely lexical.
//!
//! Bad input never aborts rendering: it is logged and resolved to `0.0`.

/// Resolve a computed length value to pixels.
///
/// Percentages resolve against `reference`. Anything that is not a
/// px/percentage term (or a `calc()` sum of them) logs one warning and
/// yields `0.0`.
pub fn resolve_value(computed: &str, reference: f64) -> f64 {
    let trimmed = computed.trim();

    let body = if let Some(inner) = trimmed
        .strip_prefix("calc(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        inner
    } else {
        trimmed
    };

    match sum_terms(body, reference) {
        Some(px) => px,
        None => {
            log::warn!("unresolvable CSS length {computed:?}, using 0");
            0.0
        }
    }
}

/// Resolve a 1- or 2-token computed pair (border-radius shorthand form).
///
/// The first token resolves against `width`, the second against `height`.
/// A single token is repeated for both axes.
pub fn resolve_values(pair: &str, width: f64, height: f64) -> (f64, f64) {
    let mut tokens = split_top_level(pair);
    let first = tokens.next().unwrap_or("");
    let second = tokens.next();

    let x = resolve_value(first, width);
    let y = match second {
        Some(tok) => resolve_value(tok, height),
        None => resolve_value(first, height),
    };
    (x, y)
}

/// Sum the signed px/percentage terms of `body`.
///
/// Tokens are whitespace-delimited. A bare `+`/`-` token sets the sign of
/// the following term; a term may also carry its own sign. Returns `None`
/// on the first token that is neither.
fn sum_terms(body: &str, reference: f64) -> Option<f64> {
    let mut total = 0.0;
    let mut sign = 1.0;
    let mut saw_term = false;

    for token in body.split_whitespace() {
        match token {
            "+" => sign = 1.0,
            "-" => sign = -1.0,
            _ => {
                total += sign * term_px(token, reference)?;
                sign = 1.0;
                saw_term = true;
            }
        }
    }

    saw_term.then_some(total)
}

/// A single `<n>px` or `<n>%` term, in pixels.
fn term_px(token: &str, reference: f64) -> Option<f64> {
    if let Some(num) = token.strip_suffix("px") {
        return num.parse::<f64>().ok();
    }
    if let Some(num) = token.strip_suffix('%') {
        return num.parse::<f64>().ok().map(|p| p / 100.0 * reference);
    }
    None
}

/// Split on whitespace, but keep `calc(...)` groups as single tokens.
fn split_top_level(s: &str) -> impl Iterator<Item = &str> {
    let mut depth = 0u32;
    s.split(move |c: char| {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
        c.is_whitespace() && depth == 0
    })
    .filter(|tok| !tok.is_empty())
}
