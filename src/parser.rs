use anyhow::{Context, Result};
use regex::Regex;

/// `/inmueble/104512345/` -> `104512345`
pub fn extract_listing_id(href: &str) -> Result<String> {
    let re = Regex::new(r"/inmueble/(\d+)")?;
    let captures = re.captures(href).context("Listing id not found in link")?;

    Ok(captures[1].to_string())
}

/// `"350.000€"` or `"1.250 €/mes"` -> whole euros.
pub fn extract_price(text: &str) -> Result<u64> {
    let re = Regex::new(r"([\d.]+)\s*€")?;
    let captures = re.captures(text).context("Price not found in text")?;

    // Spanish formatting uses '.' as thousands separator
    let price_str = captures[1].replace('.', "");
    let price = price_str
        .parse::<u64>()
        .context("Failed to parse price as number")?;

    Ok(price)
}

/// `"3 hab."` -> 3
pub fn extract_rooms(text: &str) -> Result<u32> {
    let re = Regex::new(r"(\d+)\s*hab")?;
    let captures = re.captures(text).context("Rooms not found in text")?;

    captures[1]
        .parse::<u32>()
        .context("Failed to parse rooms as number")
}

/// `"85 m²"` or `"1.200 m2"` -> square metres.
pub fn extract_size(text: &str) -> Result<f64> {
    let re = Regex::new(r"([\d.,]+)\s*m(?:²|2)")?;
    let captures = re.captures(text).context("Size not found in text")?;

    let size_str = captures[1].replace('.', "").replace(',', ".");
    size_str
        .parse::<f64>()
        .context("Failed to parse size as number")
}

/// Floor details such as `"Planta 3ª exterior con ascensor"` or `"Bajo"`.
pub fn is_floor_detail(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("planta") || lower.contains("bajo") || lower.contains("entreplanta")
}
