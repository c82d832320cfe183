/// Lowercase a name and replace spaces with hyphens, for use in document ids.
pub fn slug(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}

/// Collapse runs of whitespace (including newlines from nested markup) into single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a decimal price cell.
///
/// Blank cells and the "-" placeholder the page uses for a closed market mean
/// "no price" and yield `Ok(None)`. Anything else must be a finite positive number;
/// otherwise the trimmed raw text comes back as the error.
pub fn parse_price(raw: &str) -> Result<Option<f64>, String> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "-" {
        return Ok(None);
    }

    match raw.parse::<f64>() {
        Ok(price) if price.is_finite() && price > 0.0 => Ok(Some(price)),
        _ => Err(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug() {
        assert_eq!(slug("Roland Garros"), "roland-garros");
        assert_eq!(slug("Ana"), "ana");
        assert_eq!(slug("ATP Madrid - Singles"), "atp-madrid---singles");
        assert_eq!(slug("Świątek I."), "świątek-i.");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  Alcaraz\n   C. "), "Alcaraz C.");
        assert_eq!(collapse_whitespace(""), "");
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("1.50"), Ok(Some(1.5)));
        assert_eq!(parse_price(" 2.5 "), Ok(Some(2.5)));
        assert_eq!(parse_price(""), Ok(None));
        assert_eq!(parse_price("-"), Ok(None));
        assert_eq!(parse_price("n/a"), Err("n/a".to_string()));
        assert_eq!(parse_price("inf"), Err("inf".to_string()));
        assert_eq!(parse_price("0"), Err("0".to_string()));
    }
}
