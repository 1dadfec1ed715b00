//! Database access layer

pub mod activity;
pub mod holidays;
pub mod notifications;
pub mod overtime;
pub mod password_resets;
pub mod preferences;
pub mod push_subscriptions;
pub mod reportage;
pub mod settings;
pub mod shifts;
pub mod stations;
pub mod swaps;
pub mod users;
pub mod weekday_configs;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Schema applied by `sqlx::migrate!`
#[cfg(test)]
pub(crate) const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

/// Column definition of `column` inside `CREATE TABLE table`, whitespace collapsed
#[cfg(test)]
pub(crate) fn schema_column(table: &str, column: &str) -> Option<String> {
    let start = SCHEMA.find(&format!("CREATE TABLE {table} ("))?;
    let body = &SCHEMA[start..];
    let body = &body[..body.find("\n);")?];
    body.lines()
        .map(str::trim)
        .find(|line| line.split_whitespace().next() == Some(column))
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// `(table, column definition)` for every column referencing `target(id)`
#[cfg(test)]
pub(crate) fn schema_references(target: &str) -> Vec<(String, String)> {
    let needle = format!("REFERENCES {target}(id)");
    let mut table = String::new();
    let mut found = Vec::new();
    for line in SCHEMA.lines().map(str::trim) {
        if let Some(rest) = line.strip_prefix("CREATE TABLE ") {
            table = rest.split_whitespace().next().unwrap_or_default().to_string();
        } else if line.contains(&needle) {
            found.push((table.clone(), line.to_string()));
        }
    }
    found
}
