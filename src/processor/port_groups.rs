use std::collections::HashMap;

/// Expand port-group placeholders into concrete (origin, destination) name
/// pairs. Group dictionaries are keyed by the literal uppercase short code
/// as written in the sheet, so expansion happens before any location
/// resolution. Non-group values pass through as singletons.
pub fn expand_route(
    origin: &str,
    destination: &str,
    groups: &HashMap<String, Vec<String>>,
) -> Vec<(String, String)> {
    let origins = expand_side(origin, groups);
    let destinations = expand_side(destination, groups);

    let mut pairs = Vec::with_capacity(origins.len() * destinations.len());
    for o in &origins {
        for d in &destinations {
            pairs.push((o.clone(), d.clone()));
        }
    }
    pairs
}

fn expand_side(value: &str, groups: &HashMap<String, Vec<String>>) -> Vec<String> {
    match groups.get(value.trim()) {
        Some(ports) => ports.clone(),
        None => vec![value.trim().to_string()],
    }
}
