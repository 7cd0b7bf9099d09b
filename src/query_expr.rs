// LogQL expression helpers: metrics-query detection, volume rewrite, interval interpolation.

use crate::models::QueryRequest;

/// Range and aggregation functions that turn a log query into a metrics query.
const METRIC_FUNCTIONS: &[&str] = &[
    "count_over_time",
    "rate",
    "bytes_rate",
    "bytes_over_time",
    "absent_over_time",
    "sum_over_time",
    "avg_over_time",
    "max_over_time",
    "min_over_time",
    "first_over_time",
    "last_over_time",
    "stdvar_over_time",
    "stddev_over_time",
    "quantile_over_time",
    "sum",
    "avg",
    "min",
    "max",
    "stddev",
    "stdvar",
    "count",
    "topk",
    "bottomk",
    "sort",
    "sort_desc",
];

pub const INTERVAL_VARIABLE: &str = "$__interval";
pub const INTERVAL_MS_VARIABLE: &str = "$__interval_ms";

/// True if `expr` calls a range or aggregation function. String literals and `#` comments are skipped.
pub fn is_metrics_query(expr: &str) -> bool {
    let chars: Vec<char> = expr.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => i = skip_quoted(&chars, i, '"', true),
            '`' => i = skip_quoted(&chars, i, '`', false),
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            c if is_ident_start(c) => {
                let start = i;
                while i < chars.len() && is_ident_continue(chars[i]) {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect::<String>().to_lowercase();
                let mut j = i;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                if j < chars.len() && chars[j] == '(' && METRIC_FUNCTIONS.contains(&ident.as_str())
                {
                    return true;
                }
            }
            _ => i += 1,
        }
    }
    false
}

/// Index just past the closing quote (or the end of input if unterminated).
fn skip_quoted(chars: &[char], open: usize, quote: char, escapes: bool) -> usize {
    let mut i = open + 1;
    while i < chars.len() {
        if escapes && chars[i] == '\\' {
            i += 2;
            continue;
        }
        if chars[i] == quote {
            return i + 1;
        }
        i += 1;
    }
    chars.len()
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// `count_over_time(<expr>[$__interval])`
pub fn volume_expr(expr: &str) -> String {
    format!("count_over_time({}[{}])", expr, INTERVAL_VARIABLE)
}

/// Builds the volume request from a base request. Metrics queries are dropped;
/// remaining targets are rewritten to count log lines per interval.
pub fn volume_request(base: &QueryRequest) -> QueryRequest {
    let mut request = base.clone();
    request.targets = base
        .targets
        .iter()
        .filter(|target| !is_metrics_query(&target.expr))
        .map(|target| {
            let mut target = target.clone();
            target.expr = volume_expr(&target.expr);
            target
        })
        .collect();
    request
}

/// Substitutes the interval variables. `$__interval_ms` first since it shares a prefix.
pub fn interpolate_interval(expr: &str, interval: &str, interval_ms: u64) -> String {
    expr.replace(INTERVAL_MS_VARIABLE, &interval_ms.to_string())
        .replace(INTERVAL_VARIABLE, interval)
}
